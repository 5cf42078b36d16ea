//! Error types for the eKYC workspace.
//!
//! Library crates use [`EkycError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::StatusCode;

/// Top-level error type for all eKYC operations.
#[derive(Debug, thiserror::Error)]
pub enum EkycError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// None of name, date of birth or identity number could be extracted.
    #[error("no identity fields found in document text")]
    NoFields,

    /// Date of birth is not a valid `DD/MM/YYYY` date.
    #[error("cannot parse date of birth {input:?}: {message}")]
    DobParse { input: String, message: String },

    /// Malformed or unknown decision token.
    #[error("dispatcher error: {message}")]
    Dispatch { message: String },

    /// Customer record could not be written.
    #[error("insert failed for {id_number}: {message}")]
    InsertFailed { id_number: String, message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Notification transport error (webhook, network).
    #[error("notification error: {0}")]
    Notify(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing field, malformed input).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EkycError>;

impl EkycError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a dispatcher error from any displayable message.
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch {
            message: msg.into(),
        }
    }

    /// Create a date-of-birth parse error.
    pub fn dob_parse(input: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::DobParse {
            input: input.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Status code reported to callers for this failure.
    ///
    /// Infrastructure failures that have no dedicated code (config, I/O,
    /// notification) are `None`.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Self::NoFields => Some(StatusCode::Err97),
            Self::DobParse { .. } => Some(StatusCode::DobParseError),
            Self::Dispatch { .. } => Some(StatusCode::DispatcherError),
            Self::InsertFailed { .. } => Some(StatusCode::InsertFailed),
            Self::Config { .. }
            | Self::Storage(_)
            | Self::Notify(_)
            | Self::Io { .. }
            | Self::Validation { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = EkycError::config("missing recipient");
        assert_eq!(err.to_string(), "config error: missing recipient");

        let err = EkycError::dob_parse("31-02-2001", "invalid date");
        assert!(err.to_string().contains("31-02-2001"));
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(EkycError::NoFields.code(), Some(StatusCode::Err97));
        assert_eq!(
            EkycError::dispatch("missing action").code(),
            Some(StatusCode::DispatcherError)
        );
        assert_eq!(
            EkycError::InsertFailed {
                id_number: "123412341234".into(),
                message: "disk full".into(),
            }
            .code(),
            Some(StatusCode::InsertFailed)
        );
        assert_eq!(EkycError::Storage("locked".into()).code(), None);
    }
}
