use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the API on non-2xx responses. Either field may be
/// present; `detail` wins when both are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl ApiErrorBody {
    pub fn detail(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(Value::String(detail.into())),
            message: None,
        }
    }

    fn first_message(&self) -> Option<String> {
        [&self.detail, &self.message]
            .into_iter()
            .flatten()
            .find_map(non_empty_text)
    }
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Null | Value::Bool(false) | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

/// Derives the user-visible message for a failed response.
///
/// Order: `detail`, then `message` from a JSON body; when the body does not
/// parse, the status reason phrase; finally `HTTP {status}`.
pub fn error_message_from_body(status: u16, reason: Option<&str>, body: &[u8]) -> String {
    let fallback = format!("HTTP {status}");
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.first_message().unwrap_or(fallback),
        Err(_) => reason
            .filter(|reason| !reason.is_empty())
            .map(str::to_string)
            .unwrap_or(fallback),
    }
}
