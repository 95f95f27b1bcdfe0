//! Document model for the YAML "API document".
//!
//! An [`ApiDocument`] is parsed once from a YAML blob and is immutable
//! thereafter. It carries no SQL-execution behaviour of its own; it is pure
//! data that a [`crate::builder::Builder`] is seeded with.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{CompositionError, CompositionResult};

/// Top level `info:` block. `path`/`db` are opaque to this crate; they exist
/// for the HTTP layer that publishes a document, not for composition itself.
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub db: String,
}

/// One `{name, expr}` entry inside a field group.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub expr: String,
}

/// One declared parameter of a token (`composition.tokens.<name>.params`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenParam {
    pub name: String,
    pub value: String,
}

/// A declared token: the document only carries its parameters, not an
/// implementation. The host code supplies that via
/// [`crate::builder::Builder::register_token`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TokenDefinition {
    #[serde(default)]
    pub params: Vec<TokenParam>,
}

/// The `composition:` block: templates plus the fragments they reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Composition {
    pub subject: String,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, Vec<FieldDef>>,
    #[serde(default)]
    pub tokens: HashMap<String, TokenDefinition>,
}

/// The parsed, validated YAML API document.
///
/// Constructed once via [`ApiDocument::parse`] and never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDocument {
    pub info: Info,
    pub composition: Composition,
}

impl ApiDocument {
    /// Parse and validate a YAML blob.
    ///
    /// Fails with [`CompositionError::BadDocument`] when the YAML is
    /// malformed, `composition.subject` is absent or empty, or a field group
    /// contains a duplicate member name.
    pub fn parse(yaml: &str) -> CompositionResult<Self> {
        let doc: ApiDocument = serde_yaml::from_str(yaml)
            .map_err(|e| CompositionError::bad_document(e.to_string()))?;

        doc.validate()?;

        tracing::debug!(
            document = %doc.info.name,
            fields = doc.composition.fields.len(),
            tokens = doc.composition.tokens.len(),
            "parsed api document"
        );

        Ok(doc)
    }

    fn validate(&self) -> CompositionResult<()> {
        if self.composition.subject.trim().is_empty() {
            return Err(CompositionError::bad_document(
                "composition.subject is required and must be non-empty",
            ));
        }

        for (group, fields) in &self.composition.fields {
            let mut seen = std::collections::HashSet::new();
            for field in fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(CompositionError::bad_document(format!(
                        "field group '{group}' has a duplicate member name '{}'",
                        field.name
                    )));
                }
            }
        }

        Ok(())
    }
}
