//! `cfnboot cache` command
//!
//! Inspect the account identity cache.

use anyhow::Result;

use crate::cli::{CacheArgs, CacheCommands};
use cfnboot::util::GlobalContext;

pub fn execute(args: CacheArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = ctx.config();
    let cache = ctx.account_cache(&config);

    match args.command {
        CacheCommands::Path => {
            println!("{}", cache.path().display());
        }
        CacheCommands::List => {
            let entries = cache.entries();
            if entries.is_empty() {
                println!("(empty)");
            }
            for (fingerprint, identity) in entries {
                println!(
                    "{}  {} ({})",
                    short_fingerprint(&fingerprint),
                    identity.account_id,
                    identity.partition
                );
            }
        }
        CacheCommands::Clear => {
            let count = cache.entries().len();
            cache.clear()?;
            eprintln!(
                "     Removed {} cached account identit{}",
                count,
                if count == 1 { "y" } else { "ies" }
            );
        }
    }

    Ok(())
}

fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
