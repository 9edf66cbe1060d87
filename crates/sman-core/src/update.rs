//! Ordered, path-addressed partial updates.

use crate::error::{PathError, PathResult};
use crate::path::Path;
use crate::state::State;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value as JsonValue;

/// A sparse set of path writes, applied in insertion order.
///
/// Writing a path that is already present replaces its value but keeps
/// its original position.
///
/// # Example
///
/// ```rust
/// use sman_core::UpdateMapping;
///
/// let update = UpdateMapping::new()
///     .set("count", 10)?
///     .set("complex.arr.0.id", "X")?;
///
/// assert_eq!(update.len(), 2);
/// assert_eq!(update.top_level_keys(), vec!["count", "complex"]);
/// # Ok::<(), sman_core::PathError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMapping {
    writes: IndexMap<Path, State>,
}

/// How [`UpdateMapping::from_json`] interpreted its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// The input was a mapping of paths.
    Mapping,
    /// The input was `null`, meaning "no changes".
    Nothing,
    /// The input was some other value and was ignored.
    Malformed(&'static str),
}

impl UpdateMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `path` and add a write.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] if `path` is not a valid dotted path.
    pub fn set<P, V>(mut self, path: P, value: V) -> PathResult<Self>
    where
        P: TryInto<Path, Error = PathError>,
        V: Into<State>,
    {
        self.insert(path.try_into()?, value.into());
        Ok(self)
    }

    /// Add an already-parsed write, returning the value it replaced.
    pub fn insert(&mut self, path: Path, value: State) -> Option<State> {
        self.writes.insert(path, value)
    }

    /// Lenient conversion from a JSON value.
    ///
    /// Object keys are parsed as paths. `null` yields an empty mapping, and
    /// any other value yields an empty mapping flagged as
    /// [`Conversion::Malformed`].
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] if an object key is not a valid path.
    pub fn from_json(value: JsonValue) -> PathResult<(Self, Conversion)> {
        match value {
            JsonValue::Object(map) => {
                let writes = map
                    .into_iter()
                    .map(|(key, value)| Ok((Path::parse(&key)?, State::from(value))))
                    .collect::<PathResult<IndexMap<_, _>>>()?;
                Ok((Self { writes }, Conversion::Mapping))
            }
            JsonValue::Null => Ok((Self::new(), Conversion::Nothing)),
            other => {
                let kind = match other {
                    JsonValue::Bool(_) => "bool",
                    JsonValue::Number(_) => "number",
                    JsonValue::String(_) => "string",
                    _ => "sequence",
                };
                Ok((Self::new(), Conversion::Malformed(kind)))
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Look up the value written at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&State> {
        self.writes.get(path)
    }

    /// Iterate writes in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &State)> {
        self.writes.iter()
    }

    /// First segments of every path, deduplicated, in first-write order.
    #[must_use]
    pub fn top_level_keys(&self) -> Vec<String> {
        self.writes
            .keys()
            .map(|path| path.top_level_key().into_owned())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }
}

impl FromIterator<(Path, State)> for UpdateMapping {
    fn from_iter<T: IntoIterator<Item = (Path, State)>>(iter: T) -> Self {
        Self {
            writes: iter.into_iter().collect(),
        }
    }
}

impl Extend<(Path, State)> for UpdateMapping {
    fn extend<T: IntoIterator<Item = (Path, State)>>(&mut self, iter: T) {
        self.writes.extend(iter);
    }
}

impl<'a> IntoIterator for &'a UpdateMapping {
    type Item = (&'a Path, &'a State);
    type IntoIter = indexmap::map::Iter<'a, Path, State>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.iter()
    }
}
