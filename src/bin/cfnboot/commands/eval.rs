//! `cfnboot eval` command
//!
//! Evaluates an expression offline. `Fn::ImportValue` is served from an
//! exports file instead of a live export listing.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::cli::EvalArgs;
use cfnboot::cfn::{CfnEvaluator, EvaluationContext};
use cfnboot::remote::{Export, ExportLister, ExportPage, RemoteResult};
use cfnboot::util::fs::read_to_string;

/// Exports file, either a name to value map or a list of exports.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportsFile {
    Map(BTreeMap<String, Option<String>>),
    List(Vec<ExportEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExportEntry {
    name: String,
    #[serde(default)]
    value: Option<String>,
}

/// Export listing read from a file, served as a single page.
struct FileExports {
    exports: Vec<Export>,
}

impl FileExports {
    fn empty() -> Self {
        FileExports {
            exports: Vec::new(),
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        let file: ExportsFile = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse exports file: {}", path.display()))?;

        let exports = match file {
            ExportsFile::Map(map) => map
                .into_iter()
                .map(|(name, value)| Export { name, value })
                .collect(),
            ExportsFile::List(list) => list
                .into_iter()
                .map(|e| Export {
                    name: e.name,
                    value: e.value,
                })
                .collect(),
        };

        Ok(FileExports { exports })
    }
}

#[async_trait]
impl ExportLister for FileExports {
    async fn list_exports(&self, _next_token: Option<&str>) -> RemoteResult<ExportPage> {
        Ok(ExportPage {
            exports: self.exports.clone(),
            next_token: None,
        })
    }
}

fn load_json(path: &Path) -> Result<Value> {
    let contents = read_to_string(path)?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse JSON: {}", path.display()))
}

pub fn execute(args: EvalArgs) -> Result<()> {
    let expression = load_json(&args.file)?;

    let exports = match &args.exports {
        Some(path) => FileExports::load(path)?,
        None => FileExports::empty(),
    };

    let mut context =
        EvaluationContext::new(&args.account, &args.region).with_partition(&args.partition);
    if let Some(stack_name) = &args.stack_name {
        context = context.with_stack_name(stack_name);
    }
    if let Some(path) = &args.parameters {
        let parameters: BTreeMap<String, Value> = serde_json::from_value(load_json(path)?)
            .with_context(|| format!("parameters must be a JSON object: {}", path.display()))?;
        context.parameters = parameters;
    }

    let evaluator = CfnEvaluator::new(context, Arc::new(exports));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(evaluator.evaluate(&expression))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
