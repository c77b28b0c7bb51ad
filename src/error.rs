use serde_json::Value;
use thiserror::Error;

/// Categorized backend failure. Carried inside `anyhow::Error` so callers can
/// `downcast_ref::<ApiError>()` when they care which kind it was.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error calling {path}: {message}")]
    Network { path: String, message: String },

    #[error("{message}")]
    Status { path: String, status: u16, message: String },

    #[error("could not decode response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a status error, preferring the backend's own message.
    pub fn from_status(path: &str, status: u16, body: &str) -> Self {
        let message = extract_message(body)
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        ApiError::Status {
            path: path.to_string(),
            status,
            message,
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .filter_map(|k| value.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(inner) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
}
