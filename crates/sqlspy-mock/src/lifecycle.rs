//! Open/closed bookkeeping for the connection, its statements and result sets
//!
//! The tracker only observes. Closing the connection records the
//! connection's own flag and nothing else.

use indexmap::IndexMap;

use crate::{ResultSetKey, StatementId};

/// A resource whose closed state is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Connection,
    Statement(StatementId),
    ResultSet(ResultSetKey),
}

/// Group of resources queried by [`LifecycleTracker::all_closed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Connection,
    Statements,
    ResultSets,
    All,
}

impl Scope {
    fn contains(&self, resource: &Resource) -> bool {
        match (self, resource) {
            (Scope::All, _) => true,
            (Scope::Connection, Resource::Connection) => true,
            (Scope::Statements, Resource::Statement(_)) => true,
            (Scope::ResultSets, Resource::ResultSet(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LifecycleTracker {
    closed: IndexMap<Resource, bool>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a resource as open; already tracked resources keep their state
    pub fn track(&mut self, resource: Resource) {
        self.closed.entry(resource).or_insert(false);
    }

    /// Mark a tracked resource closed; untracked resources are ignored
    pub fn mark_closed(&mut self, resource: Resource) {
        if let Some(closed) = self.closed.get_mut(&resource) {
            *closed = true;
        }
    }

    /// Untracked resources report open
    pub fn is_closed(&self, resource: Resource) -> bool {
        self.closed.get(&resource).copied().unwrap_or(false)
    }

    /// True iff every tracked resource in `scope` is closed; vacuously true
    /// for an empty scope
    pub fn all_closed(&self, scope: Scope) -> bool {
        self.closed
            .iter()
            .filter(|(resource, _)| scope.contains(resource))
            .all(|(_, closed)| *closed)
    }

    /// Resources in `scope` that are still open, in tracking order
    pub fn open_resources(&self, scope: Scope) -> Vec<Resource> {
        self.closed
            .iter()
            .filter(|(resource, closed)| scope.contains(resource) && !**closed)
            .map(|(resource, _)| *resource)
            .collect()
    }
}
