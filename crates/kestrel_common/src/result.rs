//! Common result and error types for the Kestrel engine.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates an unrecoverable internal error (a bug in Kestrel), not a
/// user-facing problem. User errors are reported as structured diagnostics
/// and mapped to their exit codes by the CLI.
pub type KestrelResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Kestrel, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("binding table out of sync");
        assert_eq!(format!("{err}"), "internal error: binding table out of sync");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "oops".to_string().into();
        assert_eq!(err.message, "oops");
    }
}
