use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::ServiceError;
use tracing::{error, warn};

/// Store access failures surfaced to HTTP clients without enrichment.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ServiceError::Store(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Validation(_) | ServiceError::Encode(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = self.0.to_string();
        if status.is_server_error() {
            error!(error = %msg, "store call failed");
        } else {
            warn!(error = %msg, "request rejected");
        }
        (status, Json(ErrorBody { error: msg })).into_response()
    }
}
