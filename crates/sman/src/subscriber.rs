//! Subscribers and the slices of state they cache.
//!
//! A subscriber registers interest in one or more top-level keys. It is seeded
//! with the current value of each key on attach and afterwards receives at
//! most one update per trigger, carrying the new value of every subscribed key
//! that trigger touched.

use crate::error::{ActionError, ActionResult};
use crate::handler::Args;
use crate::manager::{Inner, StateManager};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use sman_core::State;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

/// The cached subset of state a subscriber holds, keyed by top-level key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Slice(IndexMap<String, State>);

impl Slice {
    /// Create an empty slice.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value cached for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&State> {
        self.0.get(key)
    }

    /// Set the value for `key`, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: State) -> Option<State> {
        self.0.insert(key.into(), value)
    }

    /// Overlay `other` onto this slice; keys in `other` win.
    pub fn merge(&mut self, other: Slice) {
        self.0.extend(other.0);
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cached keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate cached entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &State)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, State)> for Slice {
    fn from_iter<T: IntoIterator<Item = (String, State)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Something that caches a slice of the managed state.
///
/// The manager reads the current slice with [`slice`](Subscriber::slice),
/// overlays the changed keys, and hands the result back through
/// [`set_slice`](Subscriber::set_slice).
pub trait Subscriber: Send + Sync {
    /// The currently cached slice.
    fn slice(&self) -> Slice;

    /// Replace the cached slice after a commit.
    fn set_slice(&self, slice: Slice);

    /// Replace the cached slice when attaching.
    ///
    /// Defaults to [`set_slice`](Subscriber::set_slice).
    fn seed(&self, slice: Slice) {
        self.set_slice(slice);
    }

    /// Receive a trigger bound to the manager this subscriber was attached to.
    fn bind(&self, trigger: Trigger) {
        let _ = trigger;
    }
}

/// A weak, cloneable handle for dispatching actions on a manager.
#[derive(Clone)]
pub struct Trigger {
    inner: Weak<Inner>,
}

impl Trigger {
    pub(crate) fn new(inner: Weak<Inner>) -> Self {
        Self { inner }
    }

    /// Dispatch `name` on the manager.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::ManagerDropped`] if the manager no longer
    /// exists, otherwise whatever the action returns.
    pub async fn call(&self, name: &str, args: impl Into<Args>) -> ActionResult<()> {
        let manager = StateManager::upgrade(&self.inner).ok_or(ActionError::ManagerDropped)?;
        manager.trigger(name, args).await
    }

    /// Check if the manager is still alive.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("is_live", &self.is_live())
            .finish()
    }
}

/// A ready-made [`Subscriber`].
///
/// Keeps its slice behind a lock, counts the updates it receives, publishes
/// every new slice on a [`watch`] channel, and remembers the trigger it was
/// bound to.
///
/// # Example
///
/// ```rust
/// use sman::prelude::*;
/// use serde_json::json;
///
/// let manager = StateManager::new(State::from(json!({"count": 0, "other": 1})));
/// let view = SliceSubscriber::shared();
/// manager.attach_state(&view, ["count"]);
///
/// assert_eq!(view.get("count").and_then(|v| v.as_i64()), Some(0));
/// assert!(view.get("other").is_none());
/// ```
#[derive(Debug)]
pub struct SliceSubscriber {
    slice: RwLock<Slice>,
    updates: watch::Sender<Slice>,
    deliveries: AtomicUsize,
    trigger: RwLock<Option<Trigger>>,
}

impl SliceSubscriber {
    /// Create an unattached subscriber.
    #[must_use]
    pub fn new() -> Self {
        let (updates, _) = watch::channel(Slice::new());
        Self {
            slice: RwLock::new(Slice::new()),
            updates,
            deliveries: AtomicUsize::new(0),
            trigger: RwLock::new(None),
        }
    }

    /// Create an unattached subscriber behind an [`Arc`], ready to attach.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Cached value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<State> {
        self.slice.read().get(key).cloned()
    }

    /// Number of updates delivered since attaching; seeding is not counted.
    #[must_use]
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }

    /// Receiver that observes every new slice.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Slice> {
        self.updates.subscribe()
    }

    /// Dispatch an action through the bound trigger.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unbound`] before the subscriber is attached,
    /// otherwise whatever [`Trigger::call`] returns.
    pub async fn trigger(&self, name: &str, args: impl Into<Args>) -> ActionResult<()> {
        let trigger = self.trigger.read().clone().ok_or(ActionError::Unbound)?;
        trigger.call(name, args).await
    }

    fn store(&self, slice: Slice) {
        *self.slice.write() = slice.clone();
        self.updates.send_replace(slice);
    }
}

impl Default for SliceSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber for SliceSubscriber {
    fn slice(&self) -> Slice {
        self.slice.read().clone()
    }

    fn set_slice(&self, slice: Slice) {
        self.store(slice);
        self.deliveries.fetch_add(1, Ordering::SeqCst);
    }

    fn seed(&self, slice: Slice) {
        self.store(slice);
    }

    fn bind(&self, trigger: Trigger) {
        *self.trigger.write() = Some(trigger);
    }
}
