//! The immutable state tree.
//!
//! [`State`] mirrors the shape of a JSON document, but containers sit behind
//! [`Arc`] so that cloning a tree is O(1) and new versions produced by the
//! [`PathMerger`](crate::merge::PathMerger) share every untouched branch with
//! the version they were derived from.
//!
//! # Example
//!
//! ```rust
//! use sman_core::State;
//! use serde_json::json;
//!
//! let state = State::from(json!({"count": 0, "complex": {"arr": [{"id": 1}]}}));
//! assert_eq!(state.get("count").and_then(State::as_i64), Some(0));
//!
//! let copy = state.clone();
//! assert!(State::same(&state, &copy));
//! ```

use crate::path::{Path, Segment};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

/// Ordered mapping node of a state tree.
pub type StateMap = IndexMap<String, State>;

/// A node of the immutable state tree.
///
/// `PartialEq` compares by value. Use [`State::same`] to compare by
/// reference the way structural sharing is observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum State {
    /// Absent or explicit null.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A JSON number.
    Number(Number),
    /// A string.
    String(Arc<str>),
    /// An ordered sequence.
    Array(Arc<Vec<State>>),
    /// A mapping that keeps insertion order.
    Object(Arc<StateMap>),
}

impl State {
    /// An empty mapping.
    #[must_use]
    pub fn object() -> Self {
        Self::Object(Arc::new(StateMap::new()))
    }

    /// An empty sequence.
    #[must_use]
    pub fn array() -> Self {
        Self::Array(Arc::new(Vec::new()))
    }

    /// Identity comparison.
    ///
    /// Containers are the same only when they are the same allocation;
    /// scalars are the same when they are equal.
    #[must_use]
    pub fn same(a: &State, b: &State) -> bool {
        match (a, b) {
            (Self::Array(x), Self::Array(y)) => Arc::ptr_eq(x, y),
            (Self::Object(x), Self::Object(y)) => Arc::ptr_eq(x, y),
            (Self::Array(_) | Self::Object(_), _) | (_, Self::Array(_) | Self::Object(_)) => false,
            _ => a == b,
        }
    }

    /// Short name of the node kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "sequence",
            Self::Object(_) => "mapping",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[State]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&StateMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key of a mapping node.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&State> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Look up a position of a sequence node.
    #[must_use]
    pub fn index(&self, index: usize) -> Option<&State> {
        self.as_array().and_then(|items| items.get(index))
    }

    /// Follow a path, using the same segment rules as the merger.
    #[must_use]
    pub fn get_path(&self, path: &Path) -> Option<&State> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| match (node, segment) {
                (Self::Array(items), Segment::Index(i)) => items.get(*i),
                (Self::Object(map), segment) => map.get(&*segment.as_key()),
                _ => None,
            })
    }

    /// Convert to a `serde_json::Value`, copying the whole tree.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => JsonValue::Number(n.clone()),
            Self::String(s) => JsonValue::String(s.to_string()),
            Self::Array(items) => JsonValue::Array(items.iter().map(State::to_json).collect()),
            Self::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for State {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n),
            JsonValue::String(s) => Self::String(s.into()),
            JsonValue::Array(items) => {
                Self::Array(Arc::new(items.into_iter().map(State::from).collect()))
            }
            JsonValue::Object(map) => Self::Object(Arc::new(
                map.into_iter().map(|(k, v)| (k, State::from(v))).collect(),
            )),
        }
    }
}

impl From<&State> for JsonValue {
    fn from(state: &State) -> Self {
        state.to_json()
    }
}

impl From<State> for JsonValue {
    fn from(state: State) -> Self {
        state.to_json()
    }
}

impl From<bool> for State {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for State {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for State {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for State {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for State {
    /// Non-finite values have no JSON representation and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for State {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for State {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<Vec<State>> for State {
    fn from(items: Vec<State>) -> Self {
        Self::Array(Arc::new(items))
    }
}

impl From<StateMap> for State {
    fn from(map: StateMap) -> Self {
        Self::Object(Arc::new(map))
    }
}

impl Serialize for State {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => serializer.collect_seq(items.iter()),
            Self::Object(map) => serializer.collect_map(map.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        JsonValue::deserialize(deserializer).map(State::from)
    }
}

impl fmt::Display for State {
    /// Compact JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
