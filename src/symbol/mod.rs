//! Symbol handles.
//!
//! The engine treats symbols as opaque: it compares them by identity and
//! asks the symbol table for their containing type's members when looking
//! for overloads. Everything else about a symbol belongs to the search
//! collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u64);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a renameable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Method or free function.
    Method,
    /// Indexer (parameterized property).
    Indexer,
    /// Property.
    Property,
    /// Field.
    Field,
    /// Event.
    Event,
    /// Class, struct, interface or enum.
    Type,
    /// Namespace or module.
    Namespace,
    /// Local variable.
    Local,
    /// Parameter.
    Parameter,
}

impl SymbolKind {
    /// Convert kind to string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Method => "method",
            SymbolKind::Indexer => "indexer",
            SymbolKind::Property => "property",
            SymbolKind::Field => "field",
            SymbolKind::Event => "event",
            SymbolKind::Type => "type",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Local => "local",
            SymbolKind::Parameter => "parameter",
        }
    }

    /// Whether members of this kind can overload each other.
    pub fn is_overloadable(&self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Indexer)
    }
}

/// A symbol being renamed, or one discovered while searching.
///
/// Equality and hashing use `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol identity.
    pub id: SymbolId,

    /// Source name (e.g., `Foo`).
    pub name: String,

    /// Unqualified metadata name; overloads share it.
    pub metadata_name: String,

    /// Symbol kind.
    pub kind: SymbolKind,

    /// Type that declares this symbol, if any.
    pub containing_type: Option<SymbolId>,
}

impl Symbol {
    /// Create a symbol whose metadata name equals its source name.
    pub fn new(id: u64, name: impl Into<String>, kind: SymbolKind) -> Self {
        let name = name.into();
        Self {
            id: SymbolId(id),
            metadata_name: name.clone(),
            name,
            kind,
            containing_type: None,
        }
    }

    /// Set the declaring type.
    pub fn in_type(mut self, containing_type: SymbolId) -> Self {
        self.containing_type = Some(containing_type);
        self
    }

    /// Whether `other` overloads this symbol.
    ///
    /// Overloads are distinct members of the same type with the same kind
    /// and metadata name.
    pub fn is_overload_of(&self, other: &Symbol) -> bool {
        self.id != other.id
            && self.kind.is_overloadable()
            && self.kind == other.kind
            && self.containing_type.is_some()
            && self.containing_type == other.containing_type
            && self.metadata_name == other.metadata_name
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.kind.as_str(), self.name, self.id)
    }
}
