use std::io::Error as IoError;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use sitepulse_service::config;
use sitepulse_service::monitoring::scheduler::IntervalError;
use sitepulse_service::{BootstrapError, RegistryError, ValidationError};
use thiserror::Error;
use tracing::error;

/// Failures that stop the server from starting
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("Startup error: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("Scheduler error: {0}")]
    Interval(#[from] IntervalError),
}

/// Failures returned by request handlers, rendered as `{"error": message}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Registry(RegistryError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Registry(RegistryError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Registry(RegistryError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Registry(RegistryError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorBody { error: message })
    }
}
