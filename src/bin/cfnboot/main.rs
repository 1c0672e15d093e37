//! cfnboot CLI - bootstrap trust infrastructure for CloudFormation deployments

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cfnboot::cfn::EvaluationError;
use cfnboot::util::diagnostic::emit;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        match e.downcast_ref::<EvaluationError>() {
            Some(eval) => emit(&eval.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("cfnboot=debug")
    } else {
        EnvFilter::new("cfnboot=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Cache(args) => commands::cache::execute(args),
        Commands::Eval(args) => commands::eval::execute(args),
        Commands::Template(args) => commands::template::execute(args),
    }
}
