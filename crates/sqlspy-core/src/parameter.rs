//! Bound statement parameters
//!
//! A [`ParameterMap`] holds the values bound to one execution of a statement,
//! keyed either by 1-based position or by name. A [`ParameterSets`] is the
//! ordered log of those maps, one per execution (or per batch entry).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Value;

/// Key of a bound parameter: a 1-based position or a name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterKey {
    /// Positional parameter (1-based)
    Index(usize),
    /// Named parameter
    Name(String),
}

impl std::fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterKey::Index(i) => write!(f, "{}", i),
            ParameterKey::Name(n) => write!(f, "\"{}\"", n),
        }
    }
}

impl From<usize> for ParameterKey {
    fn from(index: usize) -> Self {
        ParameterKey::Index(index)
    }
}

/// Lets untyped integer literals be used as positions. Negative values map to
/// position 0, which no bound parameter ever uses.
impl From<i32> for ParameterKey {
    fn from(index: i32) -> Self {
        ParameterKey::Index(usize::try_from(index).unwrap_or(0))
    }
}

impl From<&str> for ParameterKey {
    fn from(name: &str) -> Self {
        ParameterKey::Name(name.to_string())
    }
}

impl From<String> for ParameterKey {
    fn from(name: String) -> Self {
        ParameterKey::Name(name)
    }
}

impl From<&ParameterKey> for ParameterKey {
    fn from(key: &ParameterKey) -> Self {
        key.clone()
    }
}

/// Parameters bound to a single statement execution
///
/// A key is present at most once. A key bound to [`Value::Null`] is present;
/// `get` returns `Some(&Value::Null)` for it and `None` only for keys that were
/// never set. Iteration follows insertion order, equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    entries: IndexMap<ParameterKey, Value>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a parameter
    pub fn set(&mut self, key: impl Into<ParameterKey>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`ParameterMap::set`]
    pub fn with(mut self, key: impl Into<ParameterKey>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: impl Into<ParameterKey>) -> Option<&Value> {
        self.entries.get(&key.into())
    }

    pub fn contains(&self, key: impl Into<ParameterKey>) -> bool {
        self.entries.contains_key(&key.into())
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &ParameterKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterKey, &Value)> {
        self.entries.iter()
    }

    /// Whether every entry of `subset` is present here with an equal value
    pub fn contains_all(&self, subset: &ParameterMap) -> bool {
        subset
            .iter()
            .all(|(key, value)| self.entries.get(key) == Some(value))
    }
}

impl PartialEq for ParameterMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.contains_all(other)
    }
}

impl std::fmt::Display for ParameterMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<ParameterKey>, V: Into<Value>> FromIterator<(K, V)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParameterMap::new();
        for (key, value) in iter {
            map.set(key, value);
        }
        map
    }
}

/// Ordered parameter snapshots of every execution of one statement text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSets {
    sets: Vec<ParameterMap>,
}

impl ParameterSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parameters: ParameterMap) {
        self.sets.push(parameters);
    }

    /// Number of recorded executions
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Parameters of the execution at `index` (0-based, execution order)
    pub fn get(&self, index: usize) -> Option<&ParameterMap> {
        self.sets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterMap> {
        self.sets.iter()
    }
}
