//! Savepoint handles
//!
//! A savepoint is a named or anonymous marker within a transaction that can be
//! rolled back to or released independently of the enclosing transaction.

/// A savepoint within a transaction.
///
/// The `id` is the creation index on the owning connection (0-based) and is
/// what identifies the savepoint; anonymous savepoints have no name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Savepoint {
    id: usize,
    name: Option<String>,
}

impl Savepoint {
    /// Create a named savepoint handle.
    pub fn named(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }

    /// Create an anonymous savepoint handle.
    pub fn anonymous(id: usize) -> Self {
        Self { id, name: None }
    }

    /// Get the creation index of the savepoint.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get the name of the savepoint, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl std::fmt::Display for Savepoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "savepoint {} (\"{}\")", self.id, name),
            None => write!(f, "savepoint {}", self.id),
        }
    }
}
