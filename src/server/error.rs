use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use renamer_engine::error::{Error as EngineError, ErrorKind as EngineErrorKind};
use serde_json::json;
use tracing::error;

/// A failed request, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn engine_status(kind: &EngineErrorKind) -> StatusCode {
    match kind {
        EngineErrorKind::NoFilesStaged | EngineErrorKind::InvalidMode(_) => StatusCode::BAD_REQUEST,
        EngineErrorKind::AlreadyRunning | EngineErrorKind::InvalidState(_) => StatusCode::CONFLICT,
        EngineErrorKind::MissingCredential => StatusCode::UNAUTHORIZED,
        EngineErrorKind::NothingToExport => StatusCode::NOT_FOUND,
        EngineErrorKind::Storage | EngineErrorKind::Archive => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = engine_status(&err);
        if status.is_server_error() {
            // The client only gets the summary; the tree goes to the log.
            error!(error = ?err, "request failed");
        }
        Self::new(status, (*err).to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EngineErrorKind::NoFilesStaged, StatusCode::BAD_REQUEST)]
    #[case(EngineErrorKind::InvalidMode("x".into()), StatusCode::BAD_REQUEST)]
    #[case(EngineErrorKind::AlreadyRunning, StatusCode::CONFLICT)]
    #[case(EngineErrorKind::InvalidState("change mode"), StatusCode::CONFLICT)]
    #[case(EngineErrorKind::MissingCredential, StatusCode::UNAUTHORIZED)]
    #[case(EngineErrorKind::NothingToExport, StatusCode::NOT_FOUND)]
    #[case(EngineErrorKind::Storage, StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_engine_status(#[case] kind: EngineErrorKind, #[case] expected: StatusCode) {
        let message = kind.to_string();
        let api_error = ApiError::from(exn::Exn::from(kind));
        assert_eq!(api_error.status(), expected);
        assert_eq!(api_error.message, message);
    }
}
