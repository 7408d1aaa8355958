//! Payload-plus-diagnostics result type
//!
//! Parsers never fail fast on recoverable problems. They return whatever they
//! could build together with every diagnostic found in the same pass.

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;

/// An optional value paired with the diagnostics produced while building it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    /// The produced value, absent when an all-or-nothing check failed
    pub value: Option<T>,

    /// Every diagnostic from the call, in discovery order
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    /// A value with no diagnostics
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            diagnostics: Vec::new(),
        }
    }

    /// No value, only diagnostics
    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            value: None,
            diagnostics,
        }
    }

    /// A value that is always kept, alongside whatever was reported
    pub fn partial(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            value: Some(value),
            diagnostics,
        }
    }

    /// Keep the value only if no error-severity diagnostic was raised
    pub fn all_or_nothing(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        if diagnostics.iter().any(Diagnostic::is_error) {
            Self::failed(diagnostics)
        } else {
            Self::partial(value, diagnostics)
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Error-severity diagnostics only
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: self.value.map(f),
            diagnostics: self.diagnostics,
        }
    }

    /// Split into the value and the diagnostics
    pub fn into_parts(self) -> (Option<T>, Vec<Diagnostic>) {
        (self.value, self.diagnostics)
    }
}
