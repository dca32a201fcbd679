use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::VerifyError;
use crate::recipe::MalformedRecord;

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid authentication token";
pub const MISSING_HEADER_MESSAGE: &str = "Authorization header missing";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    MalformedRecord(#[from] MalformedRecord),

    #[error("{context}: {cause:#}")]
    Upstream {
        context: &'static str,
        cause: anyhow::Error,
    },

    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn upstream(context: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |cause| Self::Upstream { context, cause }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MalformedRecord(_) | Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            // Rejection reasons stay in the log, never in the response.
            VerifyError::InvalidCredential(reason) => {
                tracing::debug!(%reason, "credential rejected");
                Self::Unauthorized(INVALID_TOKEN_MESSAGE)
            }
            VerifyError::NotConfigured => {
                Self::Unavailable(VerifyError::NotConfigured.to_string())
            }
            VerifyError::Unavailable(cause) => Self::Upstream {
                context: "Error verifying token",
                cause,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            tracing::error!(%status, error = %detail, "request failed");
        } else {
            tracing::warn!(%status, error = %detail, "request rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "detail": detail,
        });
        (status, Json(body)).into_response()
    }
}
