use serde_json::Value;

/// Message shown when the remote service cannot be reached at all
pub const UNREACHABLE_MESSAGE: &str = "Unable to reach the recommendation service";

/// Client-level errors
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Remote service returned status {status}")]
    Api { status: u16, detail: Option<String> },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Preferences are not being edited")]
    NotEditing,

    #[error("Cannot {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

impl ClientError {
    /// Builds an API error from a non-2xx status and the raw response body.
    ///
    /// The service reports failures as `{"detail": ...}` where `detail` is either a
    /// plain string or a list of validation entries carrying a `msg` field.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value.get("detail").and_then(detail_text));

        ClientError::Api { status, detail }
    }

    /// True when the request never produced an HTTP response
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::HttpClient(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }

    /// Text suitable for showing to the user.
    ///
    /// `fallback` is used when the service rejected the request without saying why.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ClientError::Api { detail: None, .. } => fallback.to_string(),
            ClientError::HttpClient(_) if self.is_transport() => UNREACHABLE_MESSAGE.to_string(),
            ClientError::HttpClient(_) | ClientError::Serialization(_) => fallback.to_string(),
            ClientError::InvalidInput(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_string_detail() {
        let err = ClientError::from_response(401, r#"{"detail": "Incorrect password"}"#);
        assert_eq!(err.user_message("Authentication failed"), "Incorrect password");
    }

    #[test]
    fn test_from_response_validation_list() {
        let body = r#"{"detail": [
            {"loc": ["body", "email"], "msg": "value is not a valid email address"},
            {"loc": ["body", "password"], "msg": "field required"}
        ]}"#;
        let err = ClientError::from_response(422, body);
        assert_eq!(
            err.user_message("Signup failed"),
            "value is not a valid email address; field required"
        );
    }

    #[test]
    fn test_from_response_without_detail_uses_fallback() {
        let err = ClientError::from_response(500, "Internal Server Error");
        assert!(matches!(err, ClientError::Api { status: 500, detail: None }));
        assert_eq!(err.user_message("Authentication failed"), "Authentication failed");
    }

    #[test]
    fn test_invalid_input_message_is_shown_verbatim() {
        let err = ClientError::InvalidInput("Password must be at least 6 characters".to_string());
        assert_eq!(
            err.user_message("ignored"),
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = ClientError::InvalidTransition {
            state: "landing",
            event: "log out",
        };
        assert_eq!(err.to_string(), "Cannot log out while landing");
    }
}
