use serde_json::Value;

use crate::error::CaptureError;

/// Fields of the intercepted outbound request that end up on the record.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OutboundRequest {
    pub url: Option<String>,
    pub conversation_id: Option<String>,
    pub model: Option<String>,
    pub action: Option<String>,
    pub parent_message_id: Option<String>,
    pub user_message: Option<String>,
}

impl OutboundRequest {
    pub fn from_body(body: &Value) -> Self {
        Self {
            url: None,
            conversation_id: extract_str(body, "conversation_id"),
            model: extract_str(body, "model"),
            action: extract_str(body, "action"),
            parent_message_id: extract_str(body, "parent_message_id"),
            user_message: extract_user_message(body),
        }
    }

    pub fn from_json_str(body: &str) -> Result<Self, CaptureError> {
        let value: Value =
            serde_json::from_str(body).map_err(|source| CaptureError::RequestParse { source })?;
        Ok(Self::from_body(&value))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// `messages[0].content.parts` string entries joined, or a plain string
/// `messages[0].content`.
pub fn extract_user_message(body: &Value) -> Option<String> {
    let content = body.get("messages")?.get(0)?.get("content")?;
    if let Some(parts) = content.get("parts").and_then(Value::as_array) {
        return Some(parts.iter().filter_map(Value::as_str).collect());
    }
    content.as_str().map(str::to_string)
}

fn extract_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
