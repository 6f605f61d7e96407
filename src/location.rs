//! Location records: candidate places to edit.

use crate::symbol::SymbolId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of one document in the codebase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Create a document id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Half-open byte range within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextSpan {
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl TextSpan {
    /// Create a span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Free-form text region a text-scan candidate was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextContext {
    /// Line or block comment.
    Comment,
    /// String literal.
    StringLiteral,
}

/// A reference reported by the reference search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceLocation {
    /// Document containing the reference.
    pub document: DocumentId,
    /// Span of the reference.
    pub span: TextSpan,
    /// Whether the reference has no literal source text.
    pub is_implicit: bool,
}

impl ReferenceLocation {
    /// Create an explicit reference.
    pub fn new(document: impl Into<DocumentId>, span: TextSpan) -> Self {
        Self {
            document: document.into(),
            span,
            is_implicit: false,
        }
    }

    /// Mark the reference implicit.
    pub fn implicit(mut self) -> Self {
        self.is_implicit = true;
        self
    }
}

/// One candidate place to edit.
///
/// Two records for the same span of the same document are the same
/// candidate: equality, hashing and ordering use `(document, span)` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Document containing the location.
    pub document: DocumentId,

    /// Span to edit.
    pub span: TextSpan,

    /// Whether the location stands for an implicit reference.
    #[serde(default)]
    pub is_implicit: bool,

    /// Definition symbol whose search produced this location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<SymbolId>,

    /// Set for candidates found by scanning comments or strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_context: Option<TextContext>,
}

impl LocationRecord {
    /// Create an explicit, non-text location.
    pub fn new(document: impl Into<DocumentId>, span: TextSpan) -> Self {
        Self {
            document: document.into(),
            span,
            is_implicit: false,
            definition: None,
            text_context: None,
        }
    }

    /// Attach the originating definition symbol.
    pub fn from_definition(mut self, definition: SymbolId) -> Self {
        self.definition = Some(definition);
        self
    }

    /// Attach a text-scan context.
    pub fn in_text(mut self, context: TextContext) -> Self {
        self.text_context = Some(context);
        self
    }

    /// Record for an implicit reference.
    pub fn implicit_reference(reference: &ReferenceLocation, definition: SymbolId) -> Self {
        Self {
            document: reference.document.clone(),
            span: reference.span,
            is_implicit: true,
            definition: Some(definition),
            text_context: None,
        }
    }
}

impl PartialEq for LocationRecord {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document && self.span == other.span
    }
}

impl Eq for LocationRecord {}

impl Hash for LocationRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.document.hash(state);
        self.span.hash(state);
    }
}

impl PartialOrd for LocationRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocationRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.document
            .cmp(&other.document)
            .then_with(|| self.span.cmp(&other.span))
    }
}

impl fmt::Display for LocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.document, self.span)
    }
}
