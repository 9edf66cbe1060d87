//! Action and hijack handlers, their arguments, and the context they run in.
//!
//! Handlers are async and receive an explicit [`ActionContext`] instead of
//! relying on an implicit receiver. Any async fn or closure of the right
//! shape can be registered directly:
//!
//! ```rust
//! use sman::prelude::*;
//!
//! async fn plus(ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
//!     let num: i64 = args.get(0)?;
//!     let count = ctx.get_state().get("count").and_then(State::as_i64).unwrap_or(0);
//!     Ok(UpdateMapping::new().set("count", count + num)?)
//! }
//!
//! # async fn demo() -> ActionResult<()> {
//! let manager = StateManager::new(State::from(serde_json::json!({"count": 0})));
//! manager.register_action("PLUS", plus);
//!
//! manager.trigger("PLUS", Args::one(10)).await?;
//! assert_eq!(manager.get_state().get("count").and_then(State::as_i64), Some(10));
//! # Ok(())
//! # }
//! ```

use crate::error::{ActionError, ActionResult};
use crate::manager::StateManager;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sman_core::{Conversion, State, UpdateMapping};
use std::future::Future;

/// Positional arguments of a trigger call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<JsonValue>);

impl Args {
    /// Arguments from a list of values.
    #[must_use]
    pub fn new(values: Vec<JsonValue>) -> Self {
        Self(values)
    }

    /// A single argument.
    #[must_use]
    pub fn one(value: impl Into<JsonValue>) -> Self {
        Self(vec![value.into()])
    }

    /// Deserialize the argument at `index`.
    ///
    /// A missing argument reads as `null`, so `Option<T>` yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Argument`] if the argument is missing and `T`
    /// does not accept `null`, or if it has the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> ActionResult<T> {
        let raw = self.0.get(index).unwrap_or(&JsonValue::Null);
        T::deserialize(raw).map_err(|e| ActionError::Argument {
            index,
            reason: if index < self.0.len() {
                e.to_string()
            } else {
                format!("missing ({e})")
            },
        })
    }

    /// The raw value at `index`.
    #[must_use]
    pub fn raw(&self, index: usize) -> Option<&JsonValue> {
        self.0.get(index)
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<()> for Args {
    fn from((): ()) -> Self {
        Self::default()
    }
}

impl From<Vec<JsonValue>> for Args {
    fn from(values: Vec<JsonValue>) -> Self {
        Self(values)
    }
}

impl FromIterator<JsonValue> for Args {
    fn from_iter<T: IntoIterator<Item = JsonValue>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The manager surface available to running handlers.
///
/// Cheap to clone; it holds a handle to the manager that dispatched the
/// handler.
#[derive(Clone, Debug)]
pub struct ActionContext {
    manager: StateManager,
}

impl ActionContext {
    pub(crate) fn new(manager: StateManager) -> Self {
        Self { manager }
    }

    /// Current state of the manager.
    #[must_use]
    pub fn get_state(&self) -> State {
        self.manager.get_state()
    }

    /// Dispatch another action on the same manager.
    ///
    /// # Errors
    ///
    /// Propagates the error of the dispatched action.
    pub async fn trigger(&self, name: &str, args: impl Into<Args>) -> ActionResult<()> {
        self.manager.trigger(name, args).await
    }

    /// Register (or replace) a normal action handler.
    pub fn register_action<H>(&self, name: impl Into<String>, handler: H)
    where
        H: ActionHandler + 'static,
    {
        self.manager.register_action(name, handler);
    }

    /// Register (or replace) a hijack handler.
    pub fn hijack<H>(&self, name: impl Into<String>, handler: H)
    where
        H: HijackHandler + 'static,
    {
        self.manager.hijack(name, handler);
    }
}

/// Computes the path writes of a normal action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the action and return the writes to commit.
    ///
    /// # Errors
    ///
    /// Any error aborts the trigger before anything is committed.
    async fn handle(&self, ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping>;
}

#[async_trait]
impl<F, Fut> ActionHandler for F
where
    F: Fn(ActionContext, Args) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult<UpdateMapping>> + Send + 'static,
{
    async fn handle(&self, ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
        (self)(ctx, args).await
    }
}

/// Replaces a normal action entirely.
///
/// A hijack's completion never commits or notifies by itself; it changes
/// state only by dispatching actions through its context.
#[async_trait]
pub trait HijackHandler: Send + Sync {
    /// Run the override.
    ///
    /// # Errors
    ///
    /// Errors propagate out of the trigger call.
    async fn handle(&self, ctx: ActionContext, args: Args) -> ActionResult<()>;
}

#[async_trait]
impl<F, Fut> HijackHandler for F
where
    F: Fn(ActionContext, Args) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult<()>> + Send + 'static,
{
    async fn handle(&self, ctx: ActionContext, args: Args) -> ActionResult<()> {
        (self)(ctx, args).await
    }
}

/// Adapter for handlers that build their update as JSON.
///
/// An object is read as a path mapping and `null` as "no changes". Any other
/// value is logged and treated as an empty update.
///
/// ```rust
/// use sman::prelude::*;
/// use sman::handler::JsonAction;
/// use serde_json::{json, Value};
///
/// async fn change_id(_ctx: ActionContext, args: Args) -> ActionResult<Value> {
///     let id: String = args.get(0)?;
///     Ok(json!({"complex.arr.0.id": id}))
/// }
///
/// # async fn demo() -> ActionResult<()> {
/// let manager = StateManager::new(State::from(json!({"complex": {"arr": [{"id": 1}]}})));
/// manager.register_action("CHANGE_ID", JsonAction::new(change_id));
/// manager.trigger("CHANGE_ID", Args::one("Homer Simpson")).await?;
/// # Ok(())
/// # }
/// ```
pub struct JsonAction<F> {
    f: F,
}

impl<F> JsonAction<F> {
    /// Wrap a JSON-returning handler.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ActionHandler for JsonAction<F>
where
    F: Fn(ActionContext, Args) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult<JsonValue>> + Send + 'static,
{
    async fn handle(&self, ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
        let value = (self.f)(ctx, args).await?;
        let (update, conversion) = UpdateMapping::from_json(value)?;
        if let Conversion::Malformed(kind) = conversion {
            tracing::warn!(returned = kind, "action returned a non-mapping value, ignoring it");
        }
        Ok(update)
    }
}

impl<F> std::fmt::Debug for JsonAction<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonAction").finish_non_exhaustive()
    }
}
