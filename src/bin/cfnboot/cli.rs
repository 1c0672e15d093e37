//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// cfnboot - bootstrap trust infrastructure for CloudFormation deployments
#[derive(Parser)]
#[command(name = "cfnboot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect the account identity cache
    Cache(CacheArgs),

    /// Evaluate the intrinsic functions in a JSON expression
    Eval(EvalArgs),

    /// Show the version and variant of a bootstrap template
    Template(TemplateArgs),
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Print the location of the identity cache file
    Path,

    /// List cached account identities
    List,

    /// Remove every cached account identity
    Clear,
}

#[derive(Args)]
pub struct EvalArgs {
    /// JSON file holding the expression to evaluate
    pub file: PathBuf,

    /// JSON file with exports, as `{"Name": "value"}` or `[{"Name": .., "Value": ..}]`
    #[arg(long)]
    pub exports: Option<PathBuf>,

    /// JSON file with template parameter values
    #[arg(long)]
    pub parameters: Option<PathBuf>,

    /// Account id for `AWS::AccountId`
    #[arg(long, env = "CDK_DEFAULT_ACCOUNT")]
    pub account: String,

    /// Region for `AWS::Region`
    #[arg(long, env = "CDK_DEFAULT_REGION")]
    pub region: String,

    /// Partition for `AWS::Partition`
    #[arg(long, default_value = "aws")]
    pub partition: String,

    /// Stack name for `AWS::StackName`
    #[arg(long)]
    pub stack_name: Option<String>,
}

#[derive(Args)]
pub struct TemplateArgs {
    /// Bootstrap template file (JSON or YAML)
    pub file: PathBuf,

    /// Print the template as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}
