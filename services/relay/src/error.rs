use axum::http::StatusCode;
use relay_protocol::error_codes;

/// Unifies the relay's wire-visible error taxonomy behind a single typed
/// surface. Every variant maps to exactly one `(code, message)` pair on the
/// WS side and one HTTP status on the REST side.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("key material is malformed: {0}")]
    Signing(String),
    #[error("Not registered")]
    NotRegistered,
    #[error("sender does not match")]
    SenderMismatch,
    #[error("Invalid envelope")]
    InvalidEnvelope(&'static str),
    #[error("recipient not connected")]
    RecipientNotConnected,
    #[error("recipient queue is full")]
    QueueFull,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
}

impl RelayError {
    /// The wire-visible error code from the frozen taxonomy.
    pub fn wire_code(&self) -> &'static str {
        match self {
            RelayError::Signing(_) => error_codes::BAD_REQUEST,
            RelayError::NotRegistered => error_codes::NOT_REGISTERED,
            RelayError::SenderMismatch => error_codes::SENDER_MISMATCH,
            RelayError::InvalidEnvelope(_) => error_codes::INVALID_ENVELOPE,
            RelayError::RecipientNotConnected => error_codes::RECIPIENT_NOT_CONNECTED,
            RelayError::QueueFull => error_codes::QUEUE_FULL,
            RelayError::Unauthorized => error_codes::UNAUTHORIZED,
            RelayError::BadRequest(_) => error_codes::BAD_REQUEST,
        }
    }

    /// Text sent inside a WS `{type:"error", message}` frame. Kept short and
    /// stable since callers assert on exact wording.
    pub fn ws_message(&self) -> String {
        self.to_string()
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            RelayError::Signing(_) | RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::NotRegistered => StatusCode::BAD_REQUEST,
            RelayError::SenderMismatch => StatusCode::BAD_REQUEST,
            RelayError::InvalidEnvelope(_) => StatusCode::BAD_REQUEST,
            RelayError::RecipientNotConnected => StatusCode::NOT_FOUND,
            RelayError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}
