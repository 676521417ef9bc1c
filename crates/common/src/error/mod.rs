//! Error classification taxonomy shared by the retry machinery
//!
//! Remote control planes report failures in many shapes. This module reduces
//! every failure to a closed [`ErrorClass`] so that retry decisions are made
//! in exactly one place: the [`ErrorClassifier`] supplied by the remote-client
//! adapter.
//!
//! | Class | Meaning | Retry behaviour |
//! |-------|---------|-----------------|
//! | **Transient** | Network blips, throttling, busy resources | Retried until the profile deadline |
//! | **NotFound** | The addressed resource does not exist | Never retried; the call site decides whether absence is an error |
//! | **Fatal** | Anything else | Never retried, surfaced with the original cause |
//!
//! ## Example
//!
//! ```rust
//! use convergent_common::error::{ErrorClass, ErrorClassifier, FnClassifier};
//!
//! let classifier = FnClassifier::new(|code: &String| {
//!     if code.starts_with("RequestLimitExceeded") {
//!         ErrorClass::Transient
//!     } else {
//!         ErrorClass::Fatal
//!     }
//! });
//!
//! assert_eq!(classifier.classify(&"RequestLimitExceeded".to_string()), ErrorClass::Transient);
//! assert_eq!(classifier.classify(&"InvalidParameter".to_string()), ErrorClass::Fatal);
//! ```

use std::fmt;
use std::sync::Arc;

/// Closed classification of a remote failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Retry within the current deadline
    Transient,
    /// The addressed resource is absent
    NotFound,
    /// Abort immediately
    Fatal,
}

impl ErrorClass {
    /// Whether the retry loop should keep going after this failure
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::NotFound => write!(f, "not_found"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Pluggable classification capability
///
/// Implemented by the remote-client adapter. No other layer inspects concrete
/// error shapes.
pub trait ErrorClassifier<E: ?Sized>: Send + Sync {
    /// Classify a single failure
    fn classify(&self, error: &E) -> ErrorClass;
}

impl<E: ?Sized, T: ErrorClassifier<E> + ?Sized> ErrorClassifier<E> for Arc<T> {
    fn classify(&self, error: &E) -> ErrorClass {
        (**self).classify(error)
    }
}

impl<E: ?Sized, T: ErrorClassifier<E> + ?Sized> ErrorClassifier<E> for Box<T> {
    fn classify(&self, error: &E) -> ErrorClass {
        (**self).classify(error)
    }
}

/// Default classifier: every failure is fatal
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFatal;

impl<E: ?Sized> ErrorClassifier<E> for AlwaysFatal {
    fn classify(&self, _error: &E) -> ErrorClass {
        ErrorClass::Fatal
    }
}

/// Closure-backed classifier
pub struct FnClassifier<F> {
    classify: F,
}

impl<F> FnClassifier<F> {
    /// Wrap a classification closure
    pub const fn new(classify: F) -> Self {
        Self { classify }
    }
}

impl<F> fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnClassifier").finish_non_exhaustive()
    }
}

impl<E, F> ErrorClassifier<E> for FnClassifier<F>
where
    E: ?Sized,
    F: Fn(&E) -> ErrorClass + Send + Sync,
{
    fn classify(&self, error: &E) -> ErrorClass {
        (self.classify)(error)
    }
}
