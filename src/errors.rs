use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failures talking to the academic records API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("records API is unreachable: {0}")]
    Offline(String),

    #[error("records API returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("records API transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ApiError::Offline(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
