use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::bad_gateway(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Failures reported by a realtime store listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("listener at '{path}' failed: {message}")]
    Subscription { path: String, message: String },

    #[error("store connection closed")]
    Closed,
}

/// Rejected user input: company ids and navigation requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("company id must not be empty")]
    EmptyCompanyId,

    #[error("company id '{0}' contains a reserved character")]
    InvalidCompanyId(String),

    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("Please select a company before accessing Route or Dispatch Management.")]
    CompanyRequired,
}
