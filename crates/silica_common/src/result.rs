//! Common result and error types.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates an unrecoverable internal invariant violation (a bug in
/// Silica), not a user-facing problem. User-facing problems are reported
/// through the diagnostic sink and the operation still returns `Ok` with a
/// possibly degraded value.
pub type SilicaResult<T> = Result<T, InternalError>;

/// An internal invariant violation: a refcount mismatch, a link pointing at
/// a future index, a walker visiting an unmapped entry.
///
/// These should never occur during normal operation; one firing means a
/// logic error in the synthesis core.
#[derive(Debug, thiserror::Error)]
#[error("internal invariant violated: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
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
    fn message_in_display() {
        let err = InternalError::new("refcount underflow at entry 3");
        assert!(err.to_string().contains("refcount underflow"));
    }

    #[test]
    fn from_string() {
        let err: InternalError = String::from("bad link").into();
        assert_eq!(err.message, "bad link");
    }
}
