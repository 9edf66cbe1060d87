//! Error types for path parsing and path-addressed merges.

use thiserror::Error;

/// Errors raised while parsing a dotted path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
    /// The path text was empty.
    #[error("path is empty")]
    Empty,

    /// A segment between two dots (or at either end) was empty.
    #[error("empty segment at position {position} in path '{path}'")]
    EmptySegment {
        /// The full path text.
        path: String,
        /// Zero-based index of the empty segment.
        position: usize,
    },
}

/// Errors raised while merging a path write into a state tree.
///
/// Every variant names the full path being written and the zero-based
/// position of the segment that could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MergeError {
    /// An index segment pointed past the end of a sequence under
    /// [`IndexPolicy::Reject`](crate::merge::IndexPolicy::Reject).
    #[error("index {index} out of range (len {len}) at segment {position} of '{path}'")]
    IndexOutOfRange {
        /// The path being written.
        path: String,
        /// Position of the offending segment.
        position: usize,
        /// The requested index.
        index: usize,
        /// Length of the sequence at that point.
        len: usize,
    },

    /// A key segment was applied to a sequence.
    #[error("key '{key}' cannot address a sequence at segment {position} of '{path}'")]
    KeyOnSequence {
        /// The path being written.
        path: String,
        /// Position of the offending segment.
        position: usize,
        /// The key that was used.
        key: String,
    },

    /// The path tried to descend through a scalar value.
    #[error("cannot descend into {found} at segment {position} of '{path}'")]
    NotAContainer {
        /// The path being written.
        path: String,
        /// Position of the offending segment.
        position: usize,
        /// Kind of the scalar that was found.
        found: &'static str,
    },
}

impl MergeError {
    /// Position of the segment that failed.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::IndexOutOfRange { position, .. }
            | Self::KeyOnSequence { position, .. }
            | Self::NotAContainer { position, .. } => *position,
        }
    }
}

/// Result type alias for path parsing.
pub type PathResult<T> = Result<T, PathError>;

/// Result type alias for merges.
pub type MergeResult<T> = Result<T, MergeError>;
