//! Test fixtures for common test scenarios.
//!
//! Pre-built bootstrap templates, stack descriptions and export lists.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::core::{BootstrapStackInfo, BootstrapTemplate};
use crate::ops::bootstrap::TemplateProvider;
use crate::remote::Export;

/// A bootstrap template declaring `version` and `variant`.
///
/// Version 0 produces a template without a version output, like the legacy
/// template.
pub fn bootstrap_template(version: u32, variant: &str) -> BootstrapTemplate {
    let mut body = json!({
        "Parameters": {
            "BootstrapVariant": {
                "Type": "String",
                "Default": variant
            }
        },
        "Resources": {
            "StagingBucket": { "Type": "AWS::S3::Bucket" }
        }
    });

    if version > 0 {
        body["Outputs"] = json!({
            "BootstrapVersion": { "Value": version.to_string() }
        });
    }

    BootstrapTemplate::new(body)
}

/// Stack description of an existing modern bootstrap stack.
pub fn deployed_stack(version: u32, variant: &str) -> BootstrapStackInfo {
    BootstrapStackInfo::found(
        "arn:aws:cloudformation:us-east-1:123456789012:stack/CDKToolkit/abc",
        version,
        variant,
    )
}

/// Exports from `(name, value)` pairs.
pub fn exports(pairs: &[(&str, &str)]) -> Vec<Export> {
    pairs
        .iter()
        .map(|(name, value)| Export::new(*name, *value))
        .collect()
}

/// Template provider serving fixed templates.
#[derive(Debug, Clone)]
pub struct StaticTemplates {
    legacy: BootstrapTemplate,
    default: BootstrapTemplate,
}

impl StaticTemplates {
    pub fn new(legacy: BootstrapTemplate, default: BootstrapTemplate) -> Self {
        StaticTemplates { legacy, default }
    }
}

impl TemplateProvider for StaticTemplates {
    fn legacy_template(&self) -> anyhow::Result<BootstrapTemplate> {
        Ok(self.legacy.clone())
    }

    fn default_template(&self) -> anyhow::Result<BootstrapTemplate> {
        Ok(self.default.clone())
    }
}

/// Common template file contents.
pub mod templates {
    /// A modern template in YAML with the version on the version resource.
    pub fn modern_yaml(version: u32, variant: &str) -> String {
        format!(
            r#"Parameters:
  BootstrapVariant:
    Type: String
    Default: "{variant}"
Resources:
  CdkBootstrapVersion:
    Type: AWS::SSM::Parameter
    Properties:
      Type: String
      Name: /cdk-bootstrap/hnb659fds/version
      Value: "{version}"
Outputs:
  BootstrapVersion:
    Value:
      Fn::GetAtt: [CdkBootstrapVersion, Value]
"#
        )
    }

    /// A template using intrinsics, for evaluator tests.
    pub fn with_intrinsics() -> String {
        r#"{
  "Outputs": {
    "BucketArn": {
      "Value": { "Fn::Sub": "arn:${AWS::Partition}:s3:::${BucketName}" }
    },
    "Joined": {
      "Value": { "Fn::Join": ["-", ["a", { "Ref": "AWS::Region" }]] }
    }
  }
}
"#
        .to_string()
    }
}

/// Write `contents` to `dir/name`, creating `dir` if needed.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bootstrap_template_fixture() {
        let template = bootstrap_template(21, "aws-cdk");
        assert_eq!(template.version(), 21);
        assert_eq!(template.variant(), "aws-cdk");

        assert_eq!(bootstrap_template(0, "aws-cdk").version(), 0);
    }

    #[test]
    fn test_yaml_template_fixture_loads() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(tmp.path(), "bootstrap.yaml", &templates::modern_yaml(19, "x")).unwrap();

        let template = BootstrapTemplate::load(&path).unwrap();
        assert_eq!(template.version(), 19);
        assert_eq!(template.variant(), "x");
    }
}
