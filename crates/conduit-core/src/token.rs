//! CloudFormation tokens.
//!
//! A token is a value that is only known once the provider deploys the
//! template. It serializes to the matching intrinsic function.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::LogicalId;

pub const PSEUDO_ACCOUNT_ID: &str = "AWS::AccountId";
pub const PSEUDO_REGION: &str = "AWS::Region";
pub const PSEUDO_PARTITION: &str = "AWS::Partition";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A plain string known at synthesis time.
    Literal(String),
    /// `{"Ref": ...}` on a logical id or pseudo parameter.
    Ref(String),
    /// `{"Fn::GetAtt": [logical_id, attribute]}`
    GetAtt { logical_id: String, attribute: String },
    /// `{"Fn::ImportValue": export_name}`
    ImportValue(String),
    /// `{"Fn::Join": [delimiter, [parts...]]}`
    Join { delimiter: String, parts: Vec<Token> },
    /// `{"Fn::Select": [index, list]}`
    Select { index: usize, list: Box<Token> },
    /// `{"Fn::Split": [delimiter, source]}`
    Split { delimiter: String, source: Box<Token> },
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    pub fn reference(id: &LogicalId) -> Self {
        Token::Ref(id.to_string())
    }

    pub fn get_att(id: &LogicalId, attribute: &str) -> Self {
        Token::GetAtt {
            logical_id: id.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn import_value(export_name: impl Into<String>) -> Self {
        Token::ImportValue(export_name.into())
    }

    pub fn join(delimiter: &str, parts: Vec<Token>) -> Self {
        Token::Join {
            delimiter: delimiter.to_string(),
            parts,
        }
    }

    pub fn select(index: usize, list: Token) -> Self {
        Token::Select {
            index,
            list: Box::new(list),
        }
    }

    pub fn split(delimiter: &str, source: Token) -> Self {
        Token::Split {
            delimiter: delimiter.to_string(),
            source: Box::new(source),
        }
    }

    pub fn account_id() -> Self {
        Token::Ref(PSEUDO_ACCOUNT_ID.to_string())
    }

    pub fn region() -> Self {
        Token::Ref(PSEUDO_REGION.to_string())
    }

    pub fn partition() -> Self {
        Token::Ref(PSEUDO_PARTITION.to_string())
    }

    /// `arn:<partition>:<service>:<region>:<account>:<resource>`
    pub fn format_arn(service: &str, resource: Token) -> Self {
        Token::join(
            "",
            vec![
                Token::literal("arn:"),
                Token::partition(),
                Token::literal(format!(":{service}:")),
                Token::region(),
                Token::literal(":"),
                Token::account_id(),
                Token::literal(":"),
                resource,
            ],
        )
    }

    /// Extract the bucket name from a bucket ARN (`arn:aws:s3:::name`).
    pub fn bucket_name_from_arn(arn: Token) -> Self {
        Token::select(
            0,
            Token::split("/", Token::select(5, Token::split(":", arn))),
        )
    }

    /// ARN of an AWS managed IAM policy.
    pub fn managed_policy_arn(policy_name: &str) -> Self {
        Token::join(
            "",
            vec![
                Token::literal("arn:"),
                Token::partition(),
                Token::literal(format!(":iam::aws:policy/{policy_name}")),
            ],
        )
    }

    /// Export names this token imports, in order of appearance.
    pub fn imports(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_imports(&mut out);
        out
    }

    fn collect_imports<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Token::ImportValue(name) => out.push(name),
            Token::Join { parts, .. } => parts.iter().for_each(|p| p.collect_imports(out)),
            Token::Select { list, .. } => list.collect_imports(out),
            Token::Split { source, .. } => source.collect_imports(out),
            Token::Literal(_) | Token::Ref(_) | Token::GetAtt { .. } => {}
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Literal(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Token::Literal(s) => serializer.serialize_str(s),
            Token::Ref(target) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", target)?;
                map.end()
            }
            Token::GetAtt {
                logical_id,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id, attribute])?;
                map.end()
            }
            Token::ImportValue(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::ImportValue", name)?;
                map.end()
            }
            Token::Join { delimiter, parts } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(delimiter, parts))?;
                map.end()
            }
            Token::Select { index, list } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Select", &(index, list))?;
                map.end()
            }
            Token::Split { delimiter, source } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Split", &(delimiter, source))?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_serializes_as_string() {
        let value = serde_json::to_value(Token::literal("hello")).unwrap();
        assert_eq!(value, json!("hello"));
    }

    #[test]
    fn test_get_att() {
        let id = LogicalId::literal("Bucket").unwrap();
        let value = serde_json::to_value(Token::get_att(&id, "Arn")).unwrap();
        assert_eq!(value, json!({"Fn::GetAtt": ["Bucket", "Arn"]}));
    }

    #[test]
    fn test_bucket_name_from_arn() {
        let token = Token::bucket_name_from_arn(Token::import_value("storage:BucketArn"));
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(
            value,
            json!({
                "Fn::Select": [0, {"Fn::Split": ["/", {
                    "Fn::Select": [5, {"Fn::Split": [":", {"Fn::ImportValue": "storage:BucketArn"}]}]
                }]}]
            })
        );
        assert_eq!(token.imports(), vec!["storage:BucketArn"]);
    }

    #[test]
    fn test_managed_policy_arn() {
        let value = serde_json::to_value(Token::managed_policy_arn("IAMFullAccess")).unwrap();
        assert_eq!(
            value,
            json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                ":iam::aws:policy/IAMFullAccess"
            ]]})
        );
    }

    #[test]
    fn test_format_arn_has_no_imports() {
        let token = Token::format_arn("codepipeline", Token::Ref("Pipeline".to_string()));
        assert!(token.imports().is_empty());
    }
}
