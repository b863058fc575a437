use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity provider denied consent")]
    ProviderDenied,
    #[error("connection to {address} timed out")]
    ConnectionTimeout { address: String },
    #[error("connection to {address} refused")]
    ConnectionRefused { address: String },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{operation} is already in progress")]
    OperationPending { operation: &'static str },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::InvalidCredentials => ErrorCode::InvalidCredentials,
            ClientError::ProviderDenied => ErrorCode::ProviderDenied,
            ClientError::ConnectionTimeout { .. } => ErrorCode::ConnectionTimeout,
            ClientError::ConnectionRefused { .. } => ErrorCode::ConnectionRefused,
            ClientError::Validation(_) => ErrorCode::Validation,
            ClientError::OperationPending { .. } => ErrorCode::OperationPending,
            ClientError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.code().is_transient()
    }

    /// Inline text shown next to the control that failed.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::InvalidCredentials => {
                "Email or password did not match; check them and sign in again.".to_string()
            }
            ClientError::ProviderDenied => {
                "Google sign-in was cancelled; choose an account to continue.".to_string()
            }
            ClientError::ConnectionTimeout { address } => {
                format!("{address} did not answer in time; check the NAS is online and retry.")
            }
            ClientError::ConnectionRefused { address } => {
                format!("{address} refused the connection; check the URL and port and retry.")
            }
            ClientError::Validation(message) => message.clone(),
            ClientError::OperationPending { operation } => {
                format!("Please wait, {operation} is still running.")
            }
            ClientError::Internal(err) => format!("Something went wrong: {err}"),
        }
    }
}

impl From<&ClientError> for ApiError {
    fn from(value: &ClientError) -> Self {
        ApiError::new(value.code(), value.user_message())
    }
}
