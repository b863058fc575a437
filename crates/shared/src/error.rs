use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidCredentials,
    ProviderDenied,
    ConnectionTimeout,
    ConnectionRefused,
    Validation,
    OperationPending,
    Internal,
}

impl ErrorCode {
    /// Transient failures may be retried locally; credential and provider
    /// failures need the user to act first.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorCode::ConnectionTimeout | ErrorCode::ConnectionRefused
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
