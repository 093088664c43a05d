//! Application-wide error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use escrow_engine::Error as EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::ProjectNotFound(_)
                | EngineError::CertificateNotFound(_)
                | EngineError::MilestoneIndexOutOfRange { .. } => StatusCode::NOT_FOUND,
                EngineError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                EngineError::ArityMismatch { .. } | EngineError::InvalidAmount(_) => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::ProjectAlreadyComplete(_)
                | EngineError::ContributionExceedsRemaining { .. }
                | EngineError::InvalidStateTransition { .. }
                | EngineError::InsufficientFunds { .. }
                | EngineError::ProjectNotComplete(_) => StatusCode::CONFLICT,
                EngineError::MintFailure(_) | EngineError::InvariantViolation(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) | Self::Migrate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
