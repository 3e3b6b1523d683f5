use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::FieldErrors,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("malformed response body (status {status}): {source}")]
    MalformedBody {
        status: u16,
        source: serde_json::Error,
    },
    #[error("invalid settings: {0}")]
    Settings(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 400 with field-level messages; shown inline on the form.
    Validation,
    NotFound,
    Unauthorized,
    /// 5xx, transport failure or unreadable body.
    Server,
}

/// Terminal failure of one request, as carried by failure actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub id: Uuid,
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
    pub field_errors: FieldErrors,
    pub occurred_at: DateTime<Utc>,
}

impl Failure {
    pub fn new(kind: FailureKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status,
            message: message.into(),
            field_errors: FieldErrors::default(),
            occurred_at: Utc::now(),
        }
    }

    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Server, status, message)
    }

    pub fn not_found(status: u16) -> Self {
        Self::new(FailureKind::NotFound, Some(status), "not found")
    }

    /// Builds the failure for a non-success response.
    pub fn from_response(status: u16, body: &Value) -> Self {
        let detail = body
            .get("detail")
            .and_then(Value::as_str)
            .map(str::to_string);
        match ErrorCode::from_status(status) {
            ErrorCode::Validation => {
                let field_errors = FieldErrors::from_body(body);
                let message = field_errors
                    .first_message()
                    .unwrap_or_else(|| "validation failed".to_string());
                Self {
                    field_errors,
                    ..Self::new(FailureKind::Validation, Some(status), message)
                }
            }
            ErrorCode::Unauthorized | ErrorCode::Forbidden => Self::new(
                FailureKind::Unauthorized,
                Some(status),
                detail.unwrap_or_else(|| "unauthorized".to_string()),
            ),
            ErrorCode::NotFound | ErrorCode::RateLimited => Self::new(
                FailureKind::NotFound,
                Some(status),
                detail.unwrap_or_else(|| "not found".to_string()),
            ),
            ErrorCode::Internal => Self::server(
                Some(status),
                detail.unwrap_or_else(|| format!("server error {status}")),
            ),
        }
    }

    /// Only server-side and transport failures reach the global error slice.
    pub fn is_global(&self) -> bool {
        self.kind == FailureKind::Server
    }

    pub fn code(&self) -> ErrorCode {
        match self.kind {
            FailureKind::Validation => ErrorCode::Validation,
            FailureKind::NotFound => ErrorCode::NotFound,
            FailureKind::Unauthorized => ErrorCode::Unauthorized,
            FailureKind::Server => ErrorCode::Internal,
        }
    }
}

impl From<ClientError> for Failure {
    fn from(value: ClientError) -> Self {
        let status = match &value {
            ClientError::MalformedBody { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        };
        Failure::server(status, value.to_string())
    }
}

impl From<&Failure> for ApiError {
    fn from(value: &Failure) -> Self {
        ApiError::new(value.code(), value.message.clone())
    }
}
