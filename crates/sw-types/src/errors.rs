use thiserror::Error;

/// Main error type for the Stepwise system
#[derive(Error, Debug)]
pub enum SwError {
    /// Malformed flag declarations, an empty search space, or invalid
    /// optimizer options.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A model-guided suggestion was requested before any history exists.
    #[error("Sequencing error: {0}")]
    Sequencing(String),

    /// Replayed history does not agree with the declared search space.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// The surrogate model could not be fitted.
    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`SwError`], used to pick process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Sequencing,
    DataIntegrity,
    Other,
}

impl SwError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Sequencing(_) => ErrorKind::Sequencing,
            Self::DataIntegrity(_) => ErrorKind::DataIntegrity,
            _ => ErrorKind::Other,
        }
    }
}

/// Result type alias for Stepwise operations
pub type SwResult<T> = Result<T, SwError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::SwError::Configuration(format!($($arg)*))
    };
}

/// Macro for creating sequencing errors
#[macro_export]
macro_rules! sequencing_error {
    ($($arg:tt)*) => {
        $crate::SwError::Sequencing(format!($($arg)*))
    };
}

/// Macro for creating data integrity errors
#[macro_export]
macro_rules! data_integrity_error {
    ($($arg:tt)*) => {
        $crate::SwError::DataIntegrity(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::SwError::Internal(format!($($arg)*))
    };
}
