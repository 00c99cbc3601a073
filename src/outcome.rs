//! Typed outcome of a single operation run
//!
//! An [`Outcome`] is what the executor hands to the delivery callback: either
//! the operation's value or an [`ErrorInfo`] describing why it failed. Failure
//! is data here, never a panic crossing the task boundary.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Terminal outcome of one operation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    Failure(ErrorInfo),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Consume the outcome, keeping only the success value
    #[must_use]
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// Consume the outcome, keeping only the failure payload
    #[must_use]
    pub fn failure(self) -> Option<ErrorInfo> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(info) => Some(info),
        }
    }

    #[must_use]
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(info) => Outcome::Failure(info),
        }
    }

    /// Convert into a standard `Result` for `?`-style handling in callers
    ///
    /// # Errors
    /// Returns the [`ErrorInfo`] if the outcome is a failure.
    pub fn into_result(self) -> Result<T, ErrorInfo> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(info) => Err(info),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T>
where
    E: std::error::Error,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(ErrorInfo::from_error(&err)),
        }
    }
}

/// Category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The operation returned a failure, or an error converted into one
    Operation,
    /// The operation panicked while running
    Panic,
    /// The operation rejected its parameters
    InvalidInput,
    /// A dependency of the operation was unavailable
    Unavailable,
    /// The executor's run deadline elapsed before the operation finished
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Operation => "operation",
            ErrorKind::Panic => "panic",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// Failure payload carried by [`Outcome::Failure`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorInfo>>,
}

impl ErrorInfo {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: ErrorInfo) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Build from any error, turning its `source()` chain into nested causes
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + '_)) -> Self {
        let mut info = Self::new(ErrorKind::Operation, err.to_string());
        if let Some(source) = err.source() {
            info.cause = Some(Box::new(Self::from_error(source)));
        }
        info
    }

    /// Build from the payload of a caught panic
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::new(ErrorKind::Panic, panic_message(payload))
    }

    /// Iterate over this error and its causes, outermost first
    pub fn chain(&self) -> impl Iterator<Item = &ErrorInfo> {
        std::iter::successors(Some(self), |info| info.cause.as_deref())
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by {cause})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorInfo {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection refused")
        }
    }

    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("failed to load account")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_from_result_preserves_source_chain() {
        let outcome: Outcome<u32> = Err::<u32, _>(Outer(Inner)).into();
        let info = outcome.failure().unwrap();

        let messages: Vec<&str> = info.chain().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["failed to load account", "connection refused"]);
        assert!(info.chain().all(|i| i.kind == ErrorKind::Operation));
    }

    #[test]
    fn test_panic_payloads() {
        let static_str: Box<dyn Any + Send> = Box::new("boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(ErrorInfo::from_panic(static_str.as_ref()).message, "boom");
        assert_eq!(ErrorInfo::from_panic(owned.as_ref()).message, "owned boom");
        assert_eq!(ErrorInfo::from_panic(other.as_ref()).message, "unknown panic");
        assert_eq!(ErrorInfo::from_panic(other.as_ref()).kind, ErrorKind::Panic);
    }

    #[test]
    fn test_display_includes_cause() {
        let info = ErrorInfo::new(ErrorKind::Unavailable, "profile service down")
            .with_cause(ErrorInfo::new(ErrorKind::Timeout, "no reply in 2s"));
        assert_eq!(
            info.to_string(),
            "unavailable: profile service down (caused by timeout: no reply in 2s)"
        );
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let ok: Outcome<&str> = Outcome::Success("ok");
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({ "status": "success", "value": "ok" })
        );

        let failed: Outcome<&str> =
            Outcome::Failure(ErrorInfo::new(ErrorKind::InvalidInput, "negative amount"));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({
                "status": "failure",
                "value": { "kind": "invalid_input", "message": "negative amount" }
            })
        );
    }

    #[test]
    fn test_map_and_into_result() {
        let doubled = Outcome::Success(21).map(|v| v * 2);
        assert_eq!(doubled.into_result().unwrap(), 42);

        let failed: Outcome<i32> = Outcome::Failure(ErrorInfo::new(ErrorKind::Operation, "nope"));
        assert!(failed.clone().map(|v| v * 2).is_failure());
        assert_eq!(failed.into_result().unwrap_err().message, "nope");
    }
}
