//! Action-driven state manager.
//!
//! A [`StateManager`] owns one immutable state tree. Named actions compute
//! path-addressed updates (`"complex.arr.0.id" => "X"`) which are merged into
//! a new tree that shares every untouched branch with the previous one.
//! Subscribers register interest in top-level keys and receive one batched
//! update per trigger.
//!
//! # Architecture
//!
//! 1. **[`StateManager`]** - owns the state, registries and subscriptions
//! 2. **[`ActionHandler`] / [`HijackHandler`]** - async handlers run with an
//!    [`ActionContext`]
//! 3. **[`Subscriber`]** - caches a slice of state keyed by top-level key
//!
//! The tree types and the merge itself live in [`sman_core`].
//!
//! # Quick Start
//!
//! ```rust
//! use sman::prelude::*;
//! use serde_json::json;
//!
//! async fn plus(ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
//!     let num: i64 = args.get(0)?;
//!     let count = ctx.get_state().get("count").and_then(State::as_i64).unwrap_or(0);
//!     Ok(UpdateMapping::new().set("count", count + num)?)
//! }
//!
//! # async fn demo() -> ActionResult<()> {
//! let manager = StateManager::new(State::from(json!({"count": 0})));
//! manager.register_action("PLUS", plus);
//!
//! let view = SliceSubscriber::shared();
//! manager.attach_state(&view, ["count"]);
//!
//! manager.trigger("PLUS", Args::one(10)).await?;
//! assert_eq!(view.get("count").and_then(|v| v.as_i64()), Some(10));
//! assert_eq!(view.deliveries(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Handlers may run concurrently. Commits are applied one at a time against
//! the state current at commit time, and subscribers are notified in commit
//! order. Set [`ManagerConfig::serialize_triggers`] to run normal actions
//! strictly one after another.
//!
//! # Error Handling
//!
//! All operations use structured error types from the [`error`] module.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
mod dispatcher;
pub mod error;
pub mod handler;
pub mod manager;
pub mod registry;
pub mod subscriber;
pub mod subscription;

pub use config::ManagerConfig;
pub use error::{ActionError, ActionResult, ConfigError, ConfigResult};
pub use handler::{ActionContext, ActionHandler, Args, HijackHandler, JsonAction};
pub use manager::StateManager;
pub use registry::{ActionRegistry, HijackRegistry, Registries, Resolution};
pub use subscriber::{Slice, SliceSubscriber, Subscriber, Trigger};
pub use subscription::{Notification, SubscriberId, SubscriptionIndex};

// Re-export the core crate for full access
pub use sman_core;

pub use sman_core::{IndexPolicy, MergeError, Path, PathError, State, UpdateMapping};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use sman::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::ManagerConfig;
    pub use crate::error::{ActionError, ActionResult};
    pub use crate::handler::{ActionContext, ActionHandler, Args, HijackHandler};
    pub use crate::manager::StateManager;
    pub use crate::subscriber::{Slice, SliceSubscriber, Subscriber, Trigger};

    pub use sman_core::{IndexPolicy, Path, State, UpdateMapping};

    pub use async_trait::async_trait;
}
