use uuid::Uuid;

/// Header the service reads to correlate its logs with ours
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id attached to every outgoing request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Fresh id for one call to the service
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span wrapping one outgoing call, tagged with its request ID
pub fn outgoing_span(method: &reqwest::Method, path: &str, request_id: &RequestId) -> tracing::Span {
    tracing::info_span!(
        "outgoing_http",
        method = %method,
        path = %path,
        request_id = %request_id,
    )
}
