//! Error Reporter
//!
//! Forwards validation failures to the host's notification channel as one
//! `invalid:<path>` signal per failing attribute followed by a single
//! `invalid` signal carrying the whole error map.

use serde_json::Value;

use crate::rules::ErrorCode;
use crate::validator::ValidationErrors;

/// Name of the aggregate signal
pub const INVALID: &str = "invalid";

/// A notification produced for a failed validation
#[derive(Debug, Clone, Copy)]
pub enum Signal<'a> {
    /// Every failing attribute
    Invalid(&'a ValidationErrors),
    /// One failing attribute
    InvalidAttribute {
        path: &'a str,
        codes: &'a [ErrorCode],
    },
}

impl Signal<'_> {
    /// Event name: `invalid` or `invalid:<path>`
    pub fn name(&self) -> String {
        match self {
            Signal::Invalid(_) => INVALID.to_string(),
            Signal::InvalidAttribute { path, .. } => format!("{}:{}", INVALID, path),
        }
    }

    /// The error payload as JSON
    pub fn payload(&self) -> Value {
        match self {
            Signal::Invalid(errors) => errors.to_json(),
            Signal::InvalidAttribute { codes, .. } => Value::from(codes.to_vec()),
        }
    }
}

/// Receives validation signals
pub trait EventSink {
    fn trigger(&mut self, signal: &Signal<'_>);
}

impl<F> EventSink for F
where
    F: FnMut(&Signal<'_>),
{
    fn trigger(&mut self, signal: &Signal<'_>) {
        self(signal)
    }
}

/// Emit the signals for `errors`, unless the caller handles errors itself
pub fn report(errors: &ValidationErrors, sink: &mut dyn EventSink, overridden: bool) {
    if overridden {
        tracing::debug!(attributes = errors.len(), "error handler supplied, signals suppressed");
        return;
    }

    for (path, codes) in errors.iter() {
        sink.trigger(&Signal::InvalidAttribute { path, codes });
    }
    sink.trigger(&Signal::Invalid(errors));
}
