//! Error types for the SQL composition engine.

use thiserror::Error;

/// Result type alias used throughout this crate.
pub type CompositionResult<T> = Result<T, CompositionError>;

/// Errors produced while parsing an API document or composing SQL from it.
///
/// Every variant is a permanent input error: the caller should surface it as
/// a 4xx response, not retry it. None of these terminate the process; a
/// missing dictionary entry or unresolved token is always returned as a
/// value, never a panic.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// The YAML document failed to parse, or failed document-level validation
    /// (empty `subject`, duplicate field names within a group, ...).
    #[error("bad document: {message}")]
    BadDocument { message: String },

    /// `register_token` was called with a name the document does not declare.
    #[error("token {name} not defined")]
    UnknownToken { name: String },

    /// A filter's value did not match the shape its operator requires
    /// (e.g. `starts_with` on a non-string, `between` on a sequence whose
    /// length isn't 2, `in` with an empty sequence).
    #[error("bad value for {attr}: {message}")]
    BadValue { attr: String, message: String },

    /// A `%placeholder` in a template has no corresponding context entry, or
    /// the context entry is a value that is neither a string nor a
    /// `TokenReplacer`.
    #[error("placeholder %{placeholder} not defined: {message}")]
    BadContext { placeholder: String, message: String },

    /// `build(TemplateKey::Total)` / `rebind(TemplateKey::Total)` was called
    /// on a document with no `composition.total` template.
    #[error("document has no total template")]
    NoTotal,
}

impl CompositionError {
    pub(crate) fn bad_document(message: impl Into<String>) -> Self {
        Self::BadDocument {
            message: message.into(),
        }
    }

    pub(crate) fn bad_value(attr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadValue {
            attr: attr.into(),
            message: message.into(),
        }
    }

    pub(crate) fn bad_context(placeholder: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadContext {
            placeholder: placeholder.into(),
            message: message.into(),
        }
    }
}
