//! Core types for the sman state manager.
//!
//! - [`State`]: an immutable, cheaply cloned JSON-shaped tree.
//! - [`Path`]: a parsed dotted path (`"complex.arr.0.id"`).
//! - [`UpdateMapping`]: the ordered path writes an action returns.
//! - [`PathMerger`]: applies an update to a tree with structural sharing.

pub mod error;
pub mod merge;
pub mod path;
pub mod state;
pub mod update;

pub use error::{MergeError, MergeResult, PathError, PathResult};
pub use merge::{IndexPolicy, PathMerger};
pub use path::{Path, Segment};
pub use state::{State, StateMap};
pub use update::{Conversion, UpdateMapping};

/// Re-export to ensure the same type is used
pub use serde_json::Value as JsonValue;
