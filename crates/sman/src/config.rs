//! Manager configuration.
//!
//! The configuration can be built in code or deserialized from JSON; every
//! field has a default.
//!
//! ```rust
//! use sman::config::ManagerConfig;
//! use sman_core::IndexPolicy;
//!
//! let config = ManagerConfig::from_json_str(
//!     r#"{"state": {"count": 0}, "debug": true, "index_policy": "reject"}"#,
//! ).expect("valid config");
//!
//! assert!(config.debug);
//! assert!(!config.serialize_triggers);
//! assert_eq!(config.index_policy, IndexPolicy::Reject);
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use sman_core::{IndexPolicy, State};

/// Options recognized when constructing a
/// [`StateManager`](crate::manager::StateManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Initial state tree. Defaults to an empty mapping.
    pub state: State,
    /// Log every action with the state before and after it.
    pub debug: bool,
    /// Run normal actions one at a time, from handler start to commit.
    ///
    /// With this on, a normal handler must not await a nested normal
    /// trigger on the same manager.
    pub serialize_triggers: bool,
    /// How sequence indices past the end are handled.
    pub index_policy: IndexPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            state: State::object(),
            debug: false,
            serialize_triggers: false,
            index_policy: IndexPolicy::default(),
        }
    }
}

impl ManagerConfig {
    /// Configuration with the given initial state and default options.
    #[must_use]
    pub fn new(state: impl Into<State>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid JSON or
    /// a field has the wrong type.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse { source })
    }

    /// Set the debug flag.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set whether normal actions are serialized.
    #[must_use]
    pub fn with_serialized_triggers(mut self, serialize: bool) -> Self {
        self.serialize_triggers = serialize;
        self
    }

    /// Set the out-of-range index policy.
    #[must_use]
    pub fn with_index_policy(mut self, policy: IndexPolicy) -> Self {
        self.index_policy = policy;
        self
    }
}
