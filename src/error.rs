use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the Tradegate application
#[derive(Error, Debug)]
pub enum GateError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    // Webhook errors
    #[error("Webhook not found: {id}")]
    WebhookNotFound { id: String },

    #[error("Webhook is inactive: {id}")]
    WebhookInactive { id: String },

    #[error("Invalid signal payload")]
    InvalidSignal,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Missing webhook signature")]
    MissingSignature,

    #[error("Rate limit exceeded for webhook {webhook_id}")]
    RateLimitExceeded { webhook_id: String },

    #[error("Not found: {0}")]
    NotFound(String),

    // Backend errors
    #[error("Backend request failed: {0}")]
    Backend(String),

    // Authentication errors
    #[error("Missing session")]
    MissingSession,

    #[error("Invalid session")]
    InvalidSession,

    // Vault errors
    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed")]
    Decryption,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Tradegate operations
pub type Result<T> = std::result::Result<T, GateError>;

impl GateError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            GateError::InvalidRequest(_)
            | GateError::InvalidSignal
            | GateError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            GateError::MissingSession
            | GateError::InvalidSession
            | GateError::InvalidSignature
            | GateError::MissingSignature => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            GateError::WebhookInactive { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            GateError::WebhookNotFound { .. } | GateError::NotFound(_) => StatusCode::NOT_FOUND,

            // 429 Too Many Requests
            GateError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 502 Bad Gateway
            GateError::Backend(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            GateError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            GateError::Database(_)
            | GateError::Io(_)
            | GateError::Encryption
            | GateError::Decryption
            | GateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        GateError::Backend(err.to_string())
    }
}

impl From<url::ParseError> for GateError {
    fn from(err: url::ParseError) -> Self {
        GateError::InvalidConfig(err.to_string())
    }
}
