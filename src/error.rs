use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    StdIoError(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] anyhow::Error),

    #[error("Command execution error: {0}")]
    CommandExecutionError(String),

    #[error("Extension error ({extension}): {message}")]
    ExtensionError { extension: String, message: String },

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("Invalid input argument: {0}")]
    InvalidInputArgument(String),
}

impl AppError {
    pub fn extension(extension: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ExtensionError {
            extension: extension.into(),
            message: message.into(),
        }
    }
}

// Lets a host bridge surface errors as plain strings
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.to_string()
    }
}
