use std::path::PathBuf;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::{error, warn};
use thiserror::Error;

use crate::models::ApiResponse;

/// Fatal at startup: the service never binds with a broken artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("cannot read artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode artifact {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact does not match the customer schema: {0}")]
    Schema(String),
    #[error("cannot load ONNX model {}: {message}", .path.display())]
    Onnx { path: PathBuf, message: String },
}

/// Per-request failures. None of them produce a fallback label.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("data contract violation: {0}")]
    DataContract(String),
    #[error("model failure: {0}")]
    Model(String),
}

impl PredictionError {
    pub fn data_contract(msg: impl Into<String>) -> Self {
        PredictionError::DataContract(msg.into())
    }

    /// Logged once, where the failure becomes a response.
    pub fn log(&self) {
        if self.status_code().is_server_error() {
            error!("prediction failed: {}", self);
        } else {
            warn!("prediction rejected: {}", self);
        }
    }
}

impl ResponseError for PredictionError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PredictionError::DataContract(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictionError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(&self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            PredictionError::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PredictionError::data_contract("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            PredictionError::Model("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn artifact_error_names_the_path() {
        let err = ArtifactError::Io {
            path: PathBuf::from("/nope/bundle.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nope/bundle.json"));
    }
}
