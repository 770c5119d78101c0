use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Represents the different types of errors that can occur while serving predictions.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// A request field failed validation
    #[error("Validation error: {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    /// Error occurred while loading the model artifact
    #[error("Model error: {0}")]
    Model(String),
    /// Error occurred while running a prediction
    #[error("Prediction error: {0}")]
    Prediction(String),
}

impl From<ort::Error> for ServeError {
    fn from(err: ort::Error) -> Self {
        ServeError::Model(err.to_string())
    }
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ServeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Model(_) | Self::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts the error into the `(status, body)` pair handlers return.
    pub fn into_parts(self) -> (StatusCode, Json<ErrorResponse>) {
        let status = self.status_code();
        let field = match &self {
            Self::Validation { field, .. } => Some((*field).to_string()),
            _ => None,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                field,
            }),
        )
    }
}
