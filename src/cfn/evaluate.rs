//! Evaluation of CloudFormation intrinsic functions.
//!
//! Only the functions needed to resolve deployment context are evaluated:
//! `Fn::Join`, `Fn::Split`, `Fn::Select`, `Fn::Sub`, `Fn::ImportValue` and
//! `Ref`. Any other function is left in place for the template consumer.
//!
//! Exports are listed once per evaluator, on the first `Fn::ImportValue`,
//! by following continuation tokens until the listing is exhausted.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::cfn::errors::EvaluationError;
use crate::core::DEFAULT_PARTITION;
use crate::remote::ExportLister;

pub const FN_JOIN: &str = "Fn::Join";
pub const FN_SPLIT: &str = "Fn::Split";
pub const FN_SELECT: &str = "Fn::Select";
pub const FN_SUB: &str = "Fn::Sub";
pub const FN_IMPORT_VALUE: &str = "Fn::ImportValue";
pub const REF: &str = "Ref";

const FUNCTIONS: [&str; 6] = [FN_JOIN, FN_SPLIT, FN_SELECT, FN_SUB, FN_IMPORT_VALUE, REF];

/// `${name}` tokens in an `Fn::Sub` template.
static SUB_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("valid substitution regex"));

type EvalFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, EvaluationError>> + Send + 'a>>;

/// What `Ref` and pseudo parameters resolve against.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    pub account: String,
    pub region: String,
    pub partition: String,
    pub stack_name: Option<String>,
    /// Template parameter values.
    pub parameters: BTreeMap<String, Value>,
    /// Physical ids of the stack's resources, by logical id.
    pub resources: BTreeMap<String, String>,
}

impl EvaluationContext {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        EvaluationContext {
            account: account.into(),
            region: region.into(),
            partition: DEFAULT_PARTITION.to_string(),
            ..Default::default()
        }
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = Some(stack_name.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_resource(mut self, logical_id: impl Into<String>, physical_id: impl Into<String>) -> Self {
        self.resources.insert(logical_id.into(), physical_id.into());
        self
    }

    /// Domain suffix of service endpoints in this partition.
    pub fn url_suffix(&self) -> &'static str {
        match self.partition.as_str() {
            "aws-cn" => "amazonaws.com.cn",
            _ => "amazonaws.com",
        }
    }

    fn resolve_ref(&self, name: &str) -> Result<Value, EvaluationError> {
        let pseudo = match name {
            "AWS::AccountId" => Some(self.account.clone()),
            "AWS::Region" => Some(self.region.clone()),
            "AWS::Partition" => Some(self.partition.clone()),
            "AWS::URLSuffix" => Some(self.url_suffix().to_string()),
            "AWS::StackName" => self.stack_name.clone(),
            _ => None,
        };
        if let Some(value) = pseudo {
            return Ok(Value::String(value));
        }

        if let Some(value) = self.parameters.get(name) {
            return Ok(value.clone());
        }
        if let Some(physical_id) = self.resources.get(name) {
            return Ok(Value::String(physical_id.clone()));
        }

        Err(EvaluationError::UnresolvedRef {
            name: name.to_string(),
        })
    }
}

/// Evaluates intrinsic functions in template values.
pub struct CfnEvaluator {
    context: EvaluationContext,
    exports: Arc<dyn ExportLister>,
    export_cache: OnceCell<HashMap<String, Option<String>>>,
}

impl CfnEvaluator {
    pub fn new(context: EvaluationContext, exports: Arc<dyn ExportLister>) -> Self {
        CfnEvaluator {
            context,
            exports,
            export_cache: OnceCell::new(),
        }
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Evaluate every intrinsic function in `value`.
    pub async fn evaluate(&self, value: &Value) -> Result<Value, EvaluationError> {
        self.evaluate_inner(value).await
    }

    fn evaluate_inner<'a>(&'a self, value: &'a Value) -> EvalFuture<'a> {
        Box::pin(async move {
            match value {
                Value::Object(map) => {
                    if map.len() == 1 {
                        if let Some((name, args)) = map.iter().next() {
                            if let Some(function) = FUNCTIONS.iter().find(|f| **f == name.as_str()) {
                                let args = self.evaluate_inner(args).await?;
                                return self.call(*function, args).await;
                            }
                        }
                    }

                    let mut evaluated = serde_json::Map::with_capacity(map.len());
                    for (key, child) in map {
                        evaluated.insert(key.clone(), self.evaluate_inner(child).await?);
                    }
                    Ok(Value::Object(evaluated))
                }
                Value::Array(items) => {
                    let mut evaluated = Vec::with_capacity(items.len());
                    for item in items {
                        evaluated.push(self.evaluate_inner(item).await?);
                    }
                    Ok(Value::Array(evaluated))
                }
                scalar => Ok(scalar.clone()),
            }
        })
    }

    async fn call(&self, function: &'static str, args: Value) -> Result<Value, EvaluationError> {
        match function {
            FN_JOIN => join(args),
            FN_SPLIT => split(args),
            FN_SELECT => select(args),
            FN_SUB => self.sub(args),
            FN_IMPORT_VALUE => {
                let name = as_str(FN_IMPORT_VALUE, &args, "export name")?;
                self.import_value(name).await.map(Value::String)
            }
            REF => {
                let name = as_str(REF, &args, "logical name")?;
                self.context.resolve_ref(name)
            }
            _ => Err(EvaluationError::invalid(function, "unsupported function")),
        }
    }

    fn sub(&self, args: Value) -> Result<Value, EvaluationError> {
        let (template, substitutions) = match args {
            Value::String(template) => (template, serde_json::Map::new()),
            Value::Array(mut items) if items.len() == 2 => {
                let substitutions = match items.pop() {
                    Some(Value::Object(map)) => map,
                    _ => {
                        return Err(EvaluationError::invalid(
                            FN_SUB,
                            "second argument must be a map of substitutions",
                        ))
                    }
                };
                match items.pop() {
                    Some(Value::String(template)) => (template, substitutions),
                    _ => return Err(EvaluationError::invalid(FN_SUB, "template must be a string")),
                }
            }
            _ => {
                return Err(EvaluationError::invalid(
                    FN_SUB,
                    "expected a string or [template, substitutions]",
                ))
            }
        };

        let mut failure = None;
        let result = SUB_TOKEN.replace_all(&template, |caps: &Captures| {
            let token = &caps[1];
            if let Some(literal) = token.strip_prefix('!') {
                return format!("${{{}}}", literal);
            }

            let resolved = match substitutions.get(token) {
                Some(value) => Some(value.clone()),
                None => self.context.resolve_ref(token).ok(),
            };
            match resolved.as_ref().and_then(scalar_to_string) {
                Some(text) => text,
                None => {
                    failure.get_or_insert_with(|| token.to_string());
                    String::new()
                }
            }
        });

        match failure {
            Some(token) => Err(EvaluationError::UnresolvedSubstitution { token }),
            None => Ok(Value::String(result.into_owned())),
        }
    }

    async fn import_value(&self, name: &str) -> Result<String, EvaluationError> {
        let exports = self
            .export_cache
            .get_or_try_init(|| self.list_all_exports())
            .await?;

        match exports.get(name) {
            None => Err(EvaluationError::UnresolvedExport {
                name: name.to_string(),
            }),
            Some(None) => Err(EvaluationError::ExportWithoutValue {
                name: name.to_string(),
            }),
            Some(Some(value)) => Ok(value.clone()),
        }
    }

    async fn list_all_exports(&self) -> Result<HashMap<String, Option<String>>, EvaluationError> {
        let mut exports = HashMap::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.exports.list_exports(next_token.as_deref()).await?;
            pages += 1;
            for export in page.exports {
                let value = export.value.filter(|v| !v.is_empty());
                exports.insert(export.name, value);
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("listed {} exports in {} page(s)", exports.len(), pages);
        Ok(exports)
    }
}

fn join(args: Value) -> Result<Value, EvaluationError> {
    let [delimiter, list] = two_args(FN_JOIN, args)?;
    let delimiter = as_str(FN_JOIN, &delimiter, "delimiter")?;
    let Value::Array(items) = list else {
        return Err(EvaluationError::invalid(FN_JOIN, "second argument must be a list"));
    };

    let parts = items
        .iter()
        .map(|item| {
            scalar_to_string(item)
                .ok_or_else(|| EvaluationError::invalid(FN_JOIN, "list elements must be strings"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::String(parts.join(delimiter)))
}

fn split(args: Value) -> Result<Value, EvaluationError> {
    let [delimiter, source] = two_args(FN_SPLIT, args)?;
    let delimiter = as_str(FN_SPLIT, &delimiter, "delimiter")?;
    if delimiter.is_empty() {
        return Err(EvaluationError::invalid(FN_SPLIT, "delimiter must not be empty"));
    }
    let source = as_str(FN_SPLIT, &source, "source")?;

    Ok(Value::Array(
        source
            .split(delimiter)
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}

fn select(args: Value) -> Result<Value, EvaluationError> {
    let [index, list] = two_args(FN_SELECT, args)?;
    let index = match &index {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| EvaluationError::invalid(FN_SELECT, "index must be an integer"))?;

    let Value::Array(mut items) = list else {
        return Err(EvaluationError::invalid(FN_SELECT, "second argument must be a list"));
    };

    let len = items.len();
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(items.swap_remove(i)),
        _ => Err(EvaluationError::SelectOutOfRange {
            function: FN_SELECT,
            index,
            len,
        }),
    }
}

fn two_args(function: &'static str, args: Value) -> Result<[Value; 2], EvaluationError> {
    match args {
        Value::Array(items) => <[Value; 2]>::try_from(items)
            .map_err(|items| EvaluationError::invalid(function, format!("expected 2 arguments, got {}", items.len()))),
        _ => Err(EvaluationError::invalid(function, "expected a list of 2 arguments")),
    }
}

fn as_str<'a>(function: &'static str, value: &'a Value, what: &str) -> Result<&'a str, EvaluationError> {
    value
        .as_str()
        .ok_or_else(|| EvaluationError::invalid(function, format!("{} must be a string", what)))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Export;
    use crate::test_support::{exports, FakeExportLister};
    use serde_json::json;

    fn evaluator() -> (CfnEvaluator, Arc<FakeExportLister>) {
        let lister = Arc::new(FakeExportLister::paged(vec![
            exports(&[("VpcId", "vpc-123"), ("SubnetA", "subnet-a")]),
            exports(&[("BucketName", "my-bucket")]),
            vec![Export {
                name: "Empty".to_string(),
                value: None,
            }],
        ]));
        let context = EvaluationContext::new("123456789012", "eu-west-1")
            .with_stack_name("MyStack")
            .with_parameter("Env", json!("prod"))
            .with_resource("Bucket", "mystack-bucket-1a2b");
        (CfnEvaluator::new(context, lister.clone()), lister)
    }

    async fn eval(value: Value) -> Result<Value, EvaluationError> {
        evaluator().0.evaluate(&value).await
    }

    #[tokio::test]
    async fn test_join_split_select_sub() {
        assert_eq!(
            eval(json!({"Fn::Join": [":", ["a", "b", "c"]]})).await.unwrap(),
            json!("a:b:c")
        );
        assert_eq!(
            eval(json!({"Fn::Split": ["|", "a|b|c"]})).await.unwrap(),
            json!(["a", "b", "c"])
        );
        assert_eq!(
            eval(json!({"Fn::Select": ["1", ["x", "y", "z"]]})).await.unwrap(),
            json!("y")
        );
        assert_eq!(
            eval(json!({"Fn::Sub": ["Foo=${Foo}", {"Foo": "bar"}]}))
                .await
                .unwrap(),
            json!("Foo=bar")
        );
    }

    #[tokio::test]
    async fn test_nested_functions() {
        let value = json!({
            "Fn::Join": ["-", [
                {"Fn::Select": [0, {"Fn::Split": [",", "first,second"]}]},
                {"Ref": "Env"}
            ]]
        });
        assert_eq!(eval(value).await.unwrap(), json!("first-prod"));
    }

    #[tokio::test]
    async fn test_containers_keep_their_shape() {
        let value = json!({
            "Name": {"Fn::Join": ["", ["a", "b"]]},
            "List": [1, {"Ref": "AWS::Region"}, null],
            "Flag": true
        });
        assert_eq!(
            eval(value).await.unwrap(),
            json!({"Name": "ab", "List": [1, "eu-west-1", null], "Flag": true})
        );
    }

    #[tokio::test]
    async fn test_unknown_functions_pass_through() {
        let value = json!({"Fn::GetAtt": ["Bucket", "Arn"]});
        assert_eq!(eval(value.clone()).await.unwrap(), value);

        // Two keys is not a function call
        let value = json!({"Ref": "Env", "Other": 1});
        assert_eq!(eval(value.clone()).await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_select_out_of_range() {
        let err = eval(json!({"Fn::Select": [3, ["x", "y", "z"]]}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::SelectOutOfRange { index: 3, len: 3, .. }
        ));

        let err = eval(json!({"Fn::Select": ["-1", ["x"]]})).await.unwrap_err();
        assert!(matches!(err, EvaluationError::SelectOutOfRange { index: -1, .. }));
    }

    #[tokio::test]
    async fn test_sub_forms() {
        assert_eq!(
            eval(json!({"Fn::Sub": "arn:${AWS::Partition}:s3:::${Bucket}"}))
                .await
                .unwrap(),
            json!("arn:aws:s3:::mystack-bucket-1a2b")
        );
        assert_eq!(
            eval(json!({"Fn::Sub": "${!Literal}-${AWS::StackName}"}))
                .await
                .unwrap(),
            json!("${Literal}-MyStack")
        );
        assert_eq!(
            eval(json!({"Fn::Sub": ["${Count} in ${AWS::Region}", {"Count": 3}]}))
                .await
                .unwrap(),
            json!("3 in eu-west-1")
        );
    }

    #[tokio::test]
    async fn test_sub_unresolved_token() {
        let err = eval(json!({"Fn::Sub": ["${Foo}-${Missing}", {"Foo": "bar"}]}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::UnresolvedSubstitution { token } if token == "Missing"
        ));
    }

    #[tokio::test]
    async fn test_ref_pseudo_parameters() {
        let (evaluator, _) = evaluator();
        assert_eq!(
            evaluator.evaluate(&json!({"Ref": "AWS::AccountId"})).await.unwrap(),
            json!("123456789012")
        );
        assert_eq!(
            evaluator.evaluate(&json!({"Ref": "AWS::URLSuffix"})).await.unwrap(),
            json!("amazonaws.com")
        );

        let china = CfnEvaluator::new(
            EvaluationContext::new("1", "cn-north-1").with_partition("aws-cn"),
            Arc::new(FakeExportLister::default()),
        );
        assert_eq!(
            china.evaluate(&json!({"Ref": "AWS::URLSuffix"})).await.unwrap(),
            json!("amazonaws.com.cn")
        );
        assert!(matches!(
            china.evaluate(&json!({"Ref": "AWS::StackName"})).await,
            Err(EvaluationError::UnresolvedRef { .. })
        ));
    }

    #[tokio::test]
    async fn test_import_value_lists_exports_once() {
        let (evaluator, lister) = evaluator();

        for (name, expected) in [
            ("VpcId", "vpc-123"),
            ("BucketName", "my-bucket"),
            ("SubnetA", "subnet-a"),
            ("VpcId", "vpc-123"),
        ] {
            let value = evaluator
                .evaluate(&json!({"Fn::ImportValue": name}))
                .await
                .unwrap();
            assert_eq!(value, json!(expected));
        }

        assert_eq!(lister.calls(), 3);
    }

    #[tokio::test]
    async fn test_import_value_errors() {
        let (evaluator, lister) = evaluator();

        let err = evaluator
            .evaluate(&json!({"Fn::ImportValue": "Nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::UnresolvedExport { name } if name == "Nope"));

        let err = evaluator
            .evaluate(&json!({"Fn::ImportValue": "Empty"}))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::ExportWithoutValue { .. }));

        assert_eq!(lister.calls(), 3);
    }

    #[tokio::test]
    async fn test_import_value_name_is_evaluated() {
        let (evaluator, _) = evaluator();
        let value = json!({"Fn::ImportValue": {"Fn::Sub": "${Prefix}Id"}});
        let err = evaluator.evaluate(&value).await.unwrap_err();
        assert!(matches!(err, EvaluationError::UnresolvedSubstitution { .. }));

        let value = json!({"Fn::ImportValue": {"Fn::Join": ["", ["Vpc", "Id"]]}});
        assert_eq!(evaluator.evaluate(&value).await.unwrap(), json!("vpc-123"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let err = eval(json!({"Fn::Join": [":"]})).await.unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::InvalidArguments { function: "Fn::Join", .. }
        ));

        let err = eval(json!({"Fn::Split": ["", "abc"]})).await.unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidArguments { .. }));
    }
}
