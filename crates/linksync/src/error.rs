use std::fmt;
use thiserror::Error as ThisError;

///
/// SyncError
///
/// Structured runtime error with a stable internal classification.
/// Config-class errors are raised at attach time, Usage-class errors at
/// call time; Store-origin errors propagate unchanged from the host.
///

#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct SyncError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl SyncError {
    /// Construct a SyncError from a class/origin pair and a message.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct an attach-origin configuration error.
    pub(crate) fn config_attach(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::Attach, message.into())
    }

    /// Construct a reference-origin usage error.
    pub(crate) fn usage_reference(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Usage, ErrorOrigin::Reference, message.into())
    }

    /// Construct a store-origin conflict error (e.g. stale-row unlink).
    #[must_use]
    pub fn store_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conflict, ErrorOrigin::Store, message.into())
    }

    /// Construct a store-origin not-found error.
    #[must_use]
    pub fn store_not_found(key: impl Into<String>) -> Self {
        let key = key.into();

        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Store,
            format!("record not found: {key}"),
        )
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self.class, ErrorClass::Config)
    }

    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self.class, ErrorClass::Usage)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Config,
    Usage,
    Conflict,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Usage => "usage",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Attach,
    Reference,
    Store,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Attach => "attach",
            Self::Reference => "reference",
            Self::Store => "store",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_includes_origin_and_class() {
        let err = SyncError::config_attach("the relation name must be defined");

        assert_eq!(
            err.display_with_class(),
            "attach:config: the relation name must be defined"
        );
        assert!(err.is_config());
        assert!(!err.is_usage());
    }

    #[test]
    fn store_not_found_formats_key() {
        let err = SyncError::store_not_found("category:42");

        assert_eq!(err.class, ErrorClass::NotFound);
        assert_eq!(err.origin, ErrorOrigin::Store);
        assert_eq!(err.to_string(), "record not found: category:42");
    }
}
