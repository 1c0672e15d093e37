//! Bootstrap templates and the version/variant they declare.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::core::stack_info::DEFAULT_BOOTSTRAP_VARIANT;

/// Output carrying the template's bootstrap version.
pub const BOOTSTRAP_VERSION_OUTPUT: &str = "BootstrapVersion";

/// Resource carrying the template's bootstrap version (newer templates).
pub const BOOTSTRAP_VERSION_RESOURCE: &str = "CdkBootstrapVersion";

/// Parameter whose default names the template's variant.
pub const BOOTSTRAP_VARIANT_PARAMETER: &str = "BootstrapVariant";

/// A CloudFormation template for the bootstrap stack.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapTemplate {
    body: Value,
}

impl BootstrapTemplate {
    /// Wrap an already parsed template body.
    pub fn new(body: Value) -> Self {
        BootstrapTemplate { body }
    }

    /// Load a template from a JSON or YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read template: {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let body: Value = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse template: {}", path.display()))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse template: {}", path.display()))?
        };

        Ok(BootstrapTemplate { body })
    }

    /// The template body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Bootstrap version declared by the template, `0` if it declares none.
    pub fn version(&self) -> u32 {
        let sources = [
            self.body
                .pointer(&format!("/Outputs/{}/Value", BOOTSTRAP_VERSION_OUTPUT)),
            self.body.pointer(&format!(
                "/Resources/{}/Properties/Value",
                BOOTSTRAP_VERSION_RESOURCE
            )),
        ];

        for source in sources.into_iter().flatten() {
            match source {
                Value::Number(n) => {
                    if let Some(v) = n.as_u64().and_then(|v| u32::try_from(v).ok()) {
                        return v;
                    }
                }
                Value::String(s) => {
                    if let Ok(v) = s.trim().parse::<u32>() {
                        return v;
                    }
                }
                _ => {}
            }
        }

        0
    }

    /// Variant declared by the template.
    pub fn variant(&self) -> String {
        self.body
            .pointer(&format!("/Parameters/{}/Default", BOOTSTRAP_VARIANT_PARAMETER))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BOOTSTRAP_VARIANT)
            .to_string()
    }

    /// Render as pretty-printed JSON.
    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.body).context("failed to serialize template")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_version_from_output() {
        let template = BootstrapTemplate::new(json!({
            "Outputs": { "BootstrapVersion": { "Value": 14 } }
        }));
        assert_eq!(template.version(), 14);
    }

    #[test]
    fn test_version_from_resource_string() {
        let template = BootstrapTemplate::new(json!({
            "Resources": {
                "CdkBootstrapVersion": { "Type": "AWS::SSM::Parameter", "Properties": { "Value": "21" } }
            }
        }));
        assert_eq!(template.version(), 21);
    }

    #[test]
    fn test_oversized_version_falls_through() {
        let template = BootstrapTemplate::new(json!({
            "Outputs": { "BootstrapVersion": { "Value": 4_294_967_297u64 } },
            "Resources": {
                "CdkBootstrapVersion": { "Properties": { "Value": "21" } }
            }
        }));
        assert_eq!(template.version(), 21);

        let template = BootstrapTemplate::new(json!({
            "Outputs": { "BootstrapVersion": { "Value": 4_294_967_297u64 } }
        }));
        assert_eq!(template.version(), 0);
    }

    #[test]
    fn test_version_defaults_to_zero() {
        let template = BootstrapTemplate::new(json!({ "Resources": {} }));
        assert_eq!(template.version(), 0);
    }

    #[test]
    fn test_variant() {
        let template = BootstrapTemplate::new(json!({
            "Parameters": { "BootstrapVariant": { "Type": "String", "Default": "aws-cdk" } }
        }));
        assert_eq!(template.variant(), "aws-cdk");

        let template = BootstrapTemplate::new(json!({}));
        assert_eq!(template.variant(), DEFAULT_BOOTSTRAP_VARIANT);
    }

    #[test]
    fn test_load_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bootstrap.yaml");
        std::fs::write(
            &path,
            r#"
Parameters:
  BootstrapVariant:
    Type: String
    Default: custom-variant
Outputs:
  BootstrapVersion:
    Value: "3"
"#,
        )
        .unwrap();

        let template = BootstrapTemplate::load(&path).unwrap();
        assert_eq!(template.version(), 3);
        assert_eq!(template.variant(), "custom-variant");
    }
}
