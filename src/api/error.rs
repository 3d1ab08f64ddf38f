use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::pipeline::PipelineError;
use crate::scheduler::{RunFailure, SchedulerError};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

/// JSON `{error, kind}` で返すエラー。
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(kind: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, kind, message)
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// 内部エラー。詳細はログにだけ出す。
    pub(crate) fn internal(err: &anyhow::Error) -> Self {
        error!(error = %format!("{err:#}"), "request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            kind: self.kind,
        });
        (self.status, body).into_response()
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        let status = match err {
            SchedulerError::RunInProgress
            | SchedulerError::AlreadyRunning
            | SchedulerError::NotRunning => StatusCode::CONFLICT,
            SchedulerError::InvalidInterval => StatusCode::BAD_REQUEST,
            SchedulerError::Ledger(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

impl From<RunFailure> for ApiError {
    fn from(err: RunFailure) -> Self {
        let status = match err {
            RunFailure::Pipeline(PipelineError::Generation(_)) => StatusCode::BAD_GATEWAY,
            RunFailure::Pipeline(PipelineError::Persistence(_)) | RunFailure::Aborted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.kind(), err.to_string())
    }
}
