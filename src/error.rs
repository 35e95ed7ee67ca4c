use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TierError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("certificate is not valid base64: {0}")]
    CertificateDecode(#[from] base64::DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("missing credential field `{0}`")]
    MissingCredential(&'static str),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("{0} connection unavailable")]
    BackendUnavailable(&'static str),

    #[error("object store returned {status} for key `{key}`")]
    ObjectStore { status: StatusCode, key: String },

    #[error("object `{0}` not visible yet")]
    ObjectNotVisible(String),

    #[error("counter document is malformed: {0}")]
    MalformedCounter(String),

    #[error("counter table corrupt: {0}")]
    CounterCorrupt(String),

    #[error("IAM token request failed with status {0}")]
    IamToken(StatusCode),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl From<figment::Error> for TierError {
    fn from(e: figment::Error) -> Self {
        TierError::Config(Box::new(e))
    }
}

impl IntoResponse for TierError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            TierError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            TierError::BackendUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "BACKEND_UNAVAILABLE",
                self.to_string(),
            ),
            TierError::Reqwest(_)
            | TierError::ObjectStore { .. }
            | TierError::ObjectNotVisible(_)
            | TierError::IamToken(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.".to_string(),
            ),
            TierError::CounterCorrupt(_) | TierError::MalformedCounter(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COUNTER_CORRUPT",
                self.to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
