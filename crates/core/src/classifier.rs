//! Code-table error classifier

use convergent_common::error::{ErrorClass, ErrorClassifier};
use convergent_domain::{ClassifierConfig, RemoteError};

/// Classifies remote errors by their code
///
/// Not-found codes are checked before transient codes. Anything unlisted is
/// fatal, so an empty table behaves like `AlwaysFatal`.
#[derive(Debug, Clone, Default)]
pub struct CodeTableClassifier {
    transient: Vec<String>,
    not_found: Vec<String>,
}

impl CodeTableClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            transient: config.transient_codes.clone(),
            not_found: config.not_found_codes.clone(),
        }
    }

    pub fn transient(mut self, code: impl Into<String>) -> Self {
        self.transient.push(code.into());
        self
    }

    pub fn not_found(mut self, code: impl Into<String>) -> Self {
        self.not_found.push(code.into());
        self
    }
}

impl ErrorClassifier<RemoteError> for CodeTableClassifier {
    fn classify(&self, error: &RemoteError) -> ErrorClass {
        if self.not_found.iter().any(|code| error.code_matches(code)) {
            ErrorClass::NotFound
        } else if self.transient.iter().any(|code| error.code_matches(code)) {
            ErrorClass::Transient
        } else {
            ErrorClass::Fatal
        }
    }
}
