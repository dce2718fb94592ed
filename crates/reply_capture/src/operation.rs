use serde_json::{Map, Value};

use crate::config::CaptureConfig;
use crate::error::DiagnosticCode;

/// One entry of a batched or bare operation list.
#[derive(Debug, Clone, PartialEq)]
pub struct SubOp {
    pub path: Option<String>,
    pub op_kind: Option<String>,
    pub value: Value,
}

/// The known payload encodings, normalized.
///
/// Several encodings express the same "append to content" event; the legacy
/// snapshot resends the whole message so far.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `{"o": "patch", "v": [{p, o, v}, ...]}`
    PatchBatch(Vec<SubOp>),
    /// `{"v": [{p, o, v}, ...]}` or a top-level `[{p, o, v}, ...]`
    BareOpArray(Vec<SubOp>),
    /// `{"p": "...", "o": "append", "v": "text"}`
    DirectAppend { path: String, value: String },
    /// `{"v": "text"}`, continuing the primary content slot.
    RawValue(String),
    /// `{"message": {"id": ..., "content": {"parts": [...]}}}`
    LegacySnapshot {
        parts: Vec<String>,
        message_id: Option<String>,
    },
}

/// A parsed payload: its operation (if any shape matched) plus identifiers
/// carried alongside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpretedPayload {
    pub operation: Option<Operation>,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("payload is not valid JSON: {source}")]
pub struct PayloadError {
    #[source]
    source: serde_json::Error,
}

impl PayloadError {
    pub fn code(&self) -> DiagnosticCode {
        DiagnosticCode::JsonParse
    }

    /// Position-only description; never echoes payload text.
    pub fn redacted_summary(&self) -> String {
        format!(
            "{:?} error at column {}",
            self.source.classify(),
            self.source.column()
        )
    }

    pub fn full_details(&self) -> String {
        self.source.to_string()
    }
}

pub fn interpret_payload(
    payload: &str,
    config: &CaptureConfig,
) -> Result<InterpretedPayload, PayloadError> {
    let value: Value = serde_json::from_str(payload).map_err(|source| PayloadError { source })?;
    Ok(InterpretedPayload {
        operation: classify(&value, config),
        conversation_id: extract_id(&value, "conversation_id"),
        message_id: extract_id(&value, "message_id"),
    })
}

/// Maps a parsed payload onto its [`Operation`] by shape, first match wins.
pub fn classify(value: &Value, config: &CaptureConfig) -> Option<Operation> {
    let obj = match value {
        Value::Array(items) => return Some(Operation::BareOpArray(sub_ops(items))),
        Value::Object(obj) => obj,
        _ => return None,
    };

    let path = obj.get("p");
    let op_kind = obj.get("o");
    let v = obj.get("v");

    if op_kind.and_then(Value::as_str) == Some(config.patch_op.as_str()) {
        if let Some(Value::Array(items)) = v {
            return Some(Operation::PatchBatch(sub_ops(items)));
        }
    }

    if path.is_none() && op_kind.is_none() {
        if let Some(Value::Array(items)) = v {
            return Some(Operation::BareOpArray(sub_ops(items)));
        }
    }

    if let (Some(Value::String(path)), Some(Value::String(value))) = (path, v) {
        if op_kind.and_then(Value::as_str) == Some(config.append_op.as_str()) {
            return Some(Operation::DirectAppend {
                path: path.clone(),
                value: value.clone(),
            });
        }
    }

    if path.is_none() && op_kind.is_none() {
        if let Some(Value::String(value)) = v {
            return Some(Operation::RawValue(value.clone()));
        }
    }

    snapshot(obj).or_else(|| match v {
        Some(Value::Object(inner)) => snapshot(inner),
        _ => None,
    })
}

fn sub_ops(items: &[Value]) -> Vec<SubOp> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| SubOp {
            path: item.get("p").and_then(Value::as_str).map(str::to_string),
            op_kind: item.get("o").and_then(Value::as_str).map(str::to_string),
            value: item.get("v").cloned().unwrap_or(Value::Null),
        })
        .collect()
}

fn snapshot(obj: &Map<String, Value>) -> Option<Operation> {
    let message = obj.get("message")?.as_object()?;
    let parts = message.get("content")?.get("parts")?.as_array()?;
    Some(Operation::LegacySnapshot {
        parts: parts
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        message_id: non_empty_str(message.get("id")),
    })
}

fn extract_id(value: &Value, key: &str) -> Option<String> {
    non_empty_str(value.get(key)).or_else(|| {
        value
            .get("v")
            .filter(|inner| inner.is_object())
            .and_then(|inner| non_empty_str(inner.get(key)))
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn op(value: Value) -> Option<Operation> {
        classify(&value, &CaptureConfig::default())
    }

    const CONTENT: &str = "/message/content/parts/0";

    #[test]
    fn patch_batch_wins_over_other_shapes() {
        let parsed = op(json!({
            "p": "",
            "o": "patch",
            "v": [
                {"p": CONTENT, "o": "append", "v": "Hel"},
                {"p": "/message/status", "o": "replace", "v": "finished_successfully"},
                "junk"
            ]
        }));
        let Some(Operation::PatchBatch(ops)) = parsed else {
            panic!("expected patch batch, got {parsed:?}");
        };
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].path.as_deref(), Some(CONTENT));
        assert_eq!(ops[0].op_kind.as_deref(), Some("append"));
        assert_eq!(ops[0].value, json!("Hel"));
    }

    #[test]
    fn bare_arrays_in_both_spellings() {
        let wrapped = op(json!({"v": [{"p": CONTENT, "o": "append", "v": "a"}]}));
        let top_level = op(json!([{"p": CONTENT, "o": "append", "v": "a"}]));
        assert!(matches!(wrapped, Some(Operation::BareOpArray(ref ops)) if ops.len() == 1));
        assert_eq!(wrapped, top_level);
    }

    #[test]
    fn array_with_path_marker_is_not_bare() {
        assert_eq!(op(json!({"p": CONTENT, "v": [1, 2]})), None);
    }

    #[test]
    fn direct_append_and_raw_value() {
        assert_eq!(
            op(json!({"p": CONTENT, "o": "append", "v": "Hello"})),
            Some(Operation::DirectAppend {
                path: CONTENT.to_string(),
                value: "Hello".to_string()
            })
        );
        assert_eq!(
            op(json!({"v": "Hi"})),
            Some(Operation::RawValue("Hi".to_string()))
        );
        assert_eq!(op(json!({"p": CONTENT, "o": "replace", "v": "x"})), None);
        assert_eq!(op(json!({"o": "append", "v": "x"})), None);
    }

    #[test]
    fn legacy_snapshot_keeps_string_parts_only() {
        assert_eq!(
            op(json!({
                "message": {"id": "m1", "content": {"parts": ["Hi", {"image": 1}, " there"]}}
            })),
            Some(Operation::LegacySnapshot {
                parts: vec!["Hi".to_string(), " there".to_string()],
                message_id: Some("m1".to_string())
            })
        );
    }

    #[test]
    fn snapshot_nested_under_add_operation() {
        let parsed = op(json!({
            "p": "",
            "o": "add",
            "v": {"message": {"id": "m2", "content": {"parts": [""]}}, "conversation_id": "c9"}
        }));
        assert_eq!(
            parsed,
            Some(Operation::LegacySnapshot {
                parts: vec![String::new()],
                message_id: Some("m2".to_string())
            })
        );
    }

    #[test]
    fn unknown_shapes_are_not_operations() {
        assert_eq!(op(json!({"type": "title_generation", "title": "x"})), None);
        assert_eq!(op(json!("text")), None);
        assert_eq!(op(json!({"v": 3})), None);
    }

    #[test]
    fn identifiers_are_read_from_top_level_or_value() {
        let config = CaptureConfig::default();
        let top = interpret_payload(r#"{"conversation_id":"c1","message_id":"m1"}"#, &config)
            .unwrap();
        assert_eq!(top.conversation_id.as_deref(), Some("c1"));
        assert_eq!(top.message_id.as_deref(), Some("m1"));
        assert!(top.operation.is_none());

        let nested = interpret_payload(r#"{"o":"add","v":{"conversation_id":"c2"}}"#, &config)
            .unwrap();
        assert_eq!(nested.conversation_id.as_deref(), Some("c2"));
    }

    #[test]
    fn parse_error_summary_is_redacted() {
        let err = interpret_payload("{not-json", &CaptureConfig::default()).unwrap_err();
        assert_eq!(err.code(), DiagnosticCode::JsonParse);
        assert!(!err.redacted_summary().contains("not-json"));
        assert!(err.redacted_summary().starts_with("Syntax"));
    }
}
