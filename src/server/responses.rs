//! JSON envelope shared by every `/v1` route.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::background_jobs::StartJobError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
        .into_response()
}

/// A started job. The work itself continues in the background.
pub fn accepted(message: impl Into<String>) -> Response {
    ok(Message {
        message: message.into(),
    })
}

pub fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(error.into()),
        }),
    )
        .into_response()
}

impl IntoResponse for StartJobError {
    fn into_response(self) -> Response {
        let status = match &self {
            StartJobError::Store(e) => {
                error!("Failed to start job: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StartJobError::AlreadyInProgress
            | StartJobError::ConfigNotFound
            | StartJobError::Validation(_) => StatusCode::BAD_REQUEST,
        };
        failure(status, self.to_string())
    }
}
