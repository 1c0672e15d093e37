//! `cfnboot template` command

use anyhow::Result;

use crate::cli::TemplateArgs;
use cfnboot::core::BootstrapTemplate;

pub fn execute(args: TemplateArgs) -> Result<()> {
    let template = BootstrapTemplate::load(&args.file)?;

    if args.json {
        println!("{}", template.to_pretty_json()?);
    } else {
        println!("version: {}", template.version());
        println!("variant: {}", template.variant());
    }

    Ok(())
}
