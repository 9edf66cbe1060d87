//! Structural-sharing merge of path writes into a state tree.
//!
//! Each write rebuilds only the containers on the root-to-leaf chain of its
//! path. Siblings along that chain are carried over by reference, so any
//! branch the update does not touch is the very same allocation in the old
//! and the new tree.
//!
//! Writes are applied one after another: the tree produced by write `i` is
//! the input of write `i + 1`, which lets a later path land inside a branch
//! an earlier path just created.
//!
//! # Shape rules
//!
//! | node at segment | `Key` segment            | `Index` segment                  |
//! |-----------------|--------------------------|----------------------------------|
//! | mapping         | key                      | key spelled by the decimal       |
//! | sequence        | [`MergeError::KeyOnSequence`] | position, see [`IndexPolicy`] |
//! | missing / null  | new mapping              | new sequence                     |
//! | scalar          | [`MergeError::NotAContainer`] | [`MergeError::NotAContainer`] |

use crate::error::{MergeError, MergeResult};
use crate::path::{Path, Segment};
use crate::state::{State, StateMap};
use crate::update::UpdateMapping;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do with an index past the end of a sequence.
///
/// An index equal to the length always appends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPolicy {
    /// Extend the sequence, padding the gap with `Null`.
    #[default]
    Fill,
    /// Fail with [`MergeError::IndexOutOfRange`].
    Reject,
}

/// Applies [`UpdateMapping`]s to immutable [`State`] trees.
///
/// # Example
///
/// ```rust
/// use sman_core::{PathMerger, State, UpdateMapping};
/// use serde_json::json;
///
/// let before = State::from(json!({"count": 0, "other": {"x": 1}}));
/// let update = UpdateMapping::new().set("count", 10)?;
///
/// let after = PathMerger::default().merge(&before, &update)?;
/// assert_eq!(after.get("count").and_then(State::as_i64), Some(10));
/// assert!(State::same(before.get("other").unwrap(), after.get("other").unwrap()));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PathMerger {
    policy: IndexPolicy,
}

impl PathMerger {
    #[must_use]
    pub fn new(policy: IndexPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    /// Apply every write of `update` in order and return the new root.
    ///
    /// `state` is left untouched. An empty update returns a clone of
    /// `state`, which is the same root.
    ///
    /// # Errors
    ///
    /// Returns the first [`MergeError`] encountered; no partial result is
    /// produced.
    pub fn merge(&self, state: &State, update: &UpdateMapping) -> MergeResult<State> {
        update
            .iter()
            .try_fold(state.clone(), |current, (path, value)| {
                self.set(&current, path, value.clone())
            })
    }

    /// Write a single `value` at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeError`] when the existing tree does not have a shape
    /// the path can descend through.
    pub fn set(&self, state: &State, path: &Path, value: State) -> MergeResult<State> {
        self.set_at(Some(state), path, 0, value)
    }

    fn set_at(
        &self,
        node: Option<&State>,
        path: &Path,
        position: usize,
        value: State,
    ) -> MergeResult<State> {
        let Some(segment) = path.segments().get(position) else {
            return Ok(value);
        };

        match (node, segment) {
            (Some(State::Object(map)), segment) => {
                let key = segment.as_key();
                let child = self.set_at(map.get(&*key), path, position + 1, value)?;
                let mut next: StateMap = (**map).clone();
                next.insert(key.into_owned(), child);
                Ok(State::Object(Arc::new(next)))
            }
            (Some(State::Array(items)), Segment::Index(index)) => {
                let child = self.set_at(items.get(*index), path, position + 1, value)?;
                let mut next: Vec<State> = (**items).clone();
                self.place(&mut next, *index, child, path, position)?;
                Ok(State::Array(Arc::new(next)))
            }
            (Some(State::Array(_)), Segment::Key(key)) => Err(MergeError::KeyOnSequence {
                path: path.to_string(),
                position,
                key: key.clone(),
            }),
            (None | Some(State::Null), Segment::Key(key)) => {
                let child = self.set_at(None, path, position + 1, value)?;
                let mut next = StateMap::with_capacity(1);
                next.insert(key.clone(), child);
                Ok(State::Object(Arc::new(next)))
            }
            (None | Some(State::Null), Segment::Index(index)) => {
                let child = self.set_at(None, path, position + 1, value)?;
                let mut next = Vec::new();
                self.place(&mut next, *index, child, path, position)?;
                Ok(State::Array(Arc::new(next)))
            }
            (Some(scalar), _) => Err(MergeError::NotAContainer {
                path: path.to_string(),
                position,
                found: scalar.kind(),
            }),
        }
    }

    fn place(
        &self,
        items: &mut Vec<State>,
        index: usize,
        value: State,
        path: &Path,
        position: usize,
    ) -> MergeResult<()> {
        let len = items.len();
        if index < len {
            items[index] = value;
            return Ok(());
        }
        if index > len && self.policy == IndexPolicy::Reject {
            return Err(MergeError::IndexOutOfRange {
                path: path.to_string(),
                position,
                index,
                len,
            });
        }
        items.resize(index, State::Null);
        items.push(value);
        Ok(())
    }
}
