//! Error handling for the state manager.
//!
//! # Error Philosophy
//!
//! - Dispatching an unknown action is not an error
//! - Handler failures propagate unchanged out of `trigger`
//! - A failed trigger never commits a partial update
//! - No panics in library code - all failures return `Result`
//!
//! # Example
//!
//! ```rust
//! use sman::error::ActionError;
//!
//! fn handle_error(err: ActionError) {
//!     match err {
//!         ActionError::Merge(merge) => {
//!             tracing::warn!(%merge, "update did not fit the state tree");
//!         }
//!         ActionError::ManagerDropped => {
//!             tracing::debug!("trigger outlived its manager");
//!         }
//!         _ => tracing::warn!(?err, "action failed"),
//!     }
//! }
//! ```

use sman_core::{MergeError, PathError};
use thiserror::Error;

/// Errors surfaced by `trigger` and by action handlers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ActionError {
    /// Failure raised by an action or hijack handler.
    #[error("{message}")]
    Handler {
        /// Error message.
        message: String,
        /// Optional source error for chaining.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A positional argument was missing or had the wrong shape.
    #[error("argument {index}: {reason}")]
    Argument {
        /// Zero-based argument position.
        index: usize,
        /// What went wrong.
        reason: String,
    },

    /// A handler produced an invalid path.
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// The update could not be merged into the current state.
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// A bound trigger was used after its manager was dropped.
    #[error("state manager has been dropped")]
    ManagerDropped,

    /// A subscriber tried to dispatch before being attached to a manager.
    #[error("subscriber is not attached to a state manager")]
    Unbound,
}

impl ActionError {
    /// Create a handler error with a message.
    #[must_use]
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            source: None,
        }
    }

    /// Create a handler error with a message and source.
    #[must_use]
    pub fn custom_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Handler {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if the error was raised by a handler rather than the manager.
    #[must_use]
    pub fn is_handler_failure(&self) -> bool {
        matches!(self, Self::Handler { .. } | Self::Argument { .. })
    }
}

/// Errors while loading a [`ManagerConfig`](crate::config::ManagerConfig).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid configuration: {source}")]
    Parse {
        /// The underlying `serde_json` error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for actions and triggers.
pub type ActionResult<T> = Result<T, ActionError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn custom_error_with_source() {
        let source = std::io::Error::other("underlying error");
        let err = ActionError::custom_with_source("operation failed", source);

        assert!(matches!(err, ActionError::Handler { .. }));
        assert!(err.source().is_some());
        assert!(err.is_handler_failure());
    }

    #[test]
    fn conversions_from_core_errors() {
        let err: ActionError = PathError::Empty.into();
        assert!(matches!(err, ActionError::Path(PathError::Empty)));
        assert!(!err.is_handler_failure());

        let err: ActionError = MergeError::KeyOnSequence {
            path: "arr.x".into(),
            position: 1,
            key: "x".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "merge failed: key 'x' cannot address a sequence at segment 1 of 'arr.x'"
        );
    }

    #[test]
    fn error_display_messages() {
        let err = ActionError::Argument {
            index: 0,
            reason: "expected a number".into(),
        };
        assert_eq!(err.to_string(), "argument 0: expected a number");
        assert_eq!(
            ActionError::ManagerDropped.to_string(),
            "state manager has been dropped"
        );
    }
}
