//! `StateManager`: the owner of one state tree and its subscribers.

use crate::config::ManagerConfig;
use crate::handler::{ActionContext, ActionHandler, HijackHandler};
use crate::registry::Registries;
use crate::subscriber::{Subscriber, Trigger};
use crate::subscription::{SubscriberId, SubscriptionIndex};
use parking_lot::{ReentrantMutex, RwLock};
use sman_core::{PathMerger, State};
use std::sync::{Arc, Weak};

/// Shared state of a manager and all of its clones.
pub(crate) struct Inner {
    pub(crate) state: RwLock<State>,
    pub(crate) subscriptions: RwLock<SubscriptionIndex>,
    pub(crate) registries: RwLock<Registries>,
    pub(crate) merger: PathMerger,
    pub(crate) debug: bool,
    /// Held while committing and while attaching, so a subscriber is either
    /// seeded after a commit or notified by it.
    pub(crate) commit: ReentrantMutex<()>,
    /// Present when normal actions are serialized.
    pub(crate) serial: Option<tokio::sync::Mutex<()>>,
}

/// Action-driven state manager.
///
/// `StateManager` owns one immutable [`State`] tree and provides:
///
/// - Named actions that return path-addressed updates
/// - Hijacks that replace an action entirely
/// - Subscribers keyed by top-level state key, notified once per trigger
/// - Structural sharing between successive state versions
///
/// Cloning is cheap; clones share the same state, handlers and subscribers.
///
/// # Example
///
/// ```rust
/// use sman::prelude::*;
/// use serde_json::json;
///
/// async fn change_id(_ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
///     Ok(UpdateMapping::new().set("complex.arr.0.id", args.get::<String>(0)?)?)
/// }
///
/// # async fn demo() -> ActionResult<()> {
/// let manager = StateManager::new(State::from(json!({
///     "count": 0,
///     "complex": {"arr": [{"id": 1}]}
/// })));
/// manager.register_action("CHANGE_ID", change_id);
///
/// let before = manager.get_state();
/// manager.trigger("CHANGE_ID", Args::one("Homer Simpson")).await?;
/// let after = manager.get_state();
///
/// assert_eq!(after.to_json(), json!({"count": 0, "complex": {"arr": [{"id": "Homer Simpson"}]}}));
/// assert!(State::same(before.get("count").unwrap(), after.get("count").unwrap()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StateManager {
    inner: Arc<Inner>,
}

impl StateManager {
    /// Create a manager with the given initial state and default options.
    pub fn new(initial: impl Into<State>) -> Self {
        Self::from_config(ManagerConfig::new(initial))
    }

    /// Create a manager from a configuration.
    ///
    /// ```rust
    /// use sman::prelude::*;
    ///
    /// let manager = StateManager::from_config(
    ///     ManagerConfig::new(State::object()).with_debug(true),
    /// );
    /// assert!(manager.is_debug());
    /// ```
    #[must_use]
    pub fn from_config(config: ManagerConfig) -> Self {
        let ManagerConfig {
            state,
            debug,
            serialize_triggers,
            index_policy,
        } = config;

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                subscriptions: RwLock::new(SubscriptionIndex::new()),
                registries: RwLock::new(Registries::default()),
                merger: PathMerger::new(index_policy),
                debug,
                commit: ReentrantMutex::new(()),
                serial: serialize_triggers.then(|| tokio::sync::Mutex::new(())),
            }),
        }
    }

    pub(crate) fn upgrade(inner: &Weak<Inner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn inner(&self) -> &Inner {
        &self.inner
    }

    /// The current state.
    ///
    /// This is a snapshot: later commits produce new roots and never change
    /// the returned tree.
    #[must_use]
    pub fn get_state(&self) -> State {
        self.inner.state.read().clone()
    }

    /// Read the current state without cloning the root.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&State) -> R,
    {
        let guard = self.inner.state.read();
        f(&guard)
    }

    /// Attach a subscriber to the given top-level keys.
    ///
    /// The subscriber is seeded with the current value of every key (keys that
    /// do not exist read as `null`) and bound to this manager's trigger.
    /// Attaching the same subscriber to the same key twice has no further
    /// effect on the index.
    pub fn attach_state<S, I, K>(&self, subscriber: &Arc<S>, keys: I) -> &Self
    where
        S: Subscriber + 'static,
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let subscriber: Arc<dyn Subscriber> = subscriber.clone();
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();

        let _commit = self.inner.commit.lock();
        let id = {
            let mut index = self.inner.subscriptions.write();
            let id = index.register(&subscriber);
            index.subscribe(id, keys.iter().cloned());
            id
        };

        let mut slice = subscriber.slice();
        self.read(|state| {
            for key in &keys {
                slice.insert(key.clone(), state.get(key).cloned().unwrap_or_default());
            }
        });
        subscriber.seed(slice);
        subscriber.bind(self.trigger_handle());

        tracing::debug!(subscriber = %id, ?keys, "attached subscriber");
        self
    }

    /// Remove a subscriber from every key. Returns `false` if it was not
    /// attached.
    pub fn detach<S>(&self, subscriber: &Arc<S>) -> bool
    where
        S: Subscriber + 'static,
    {
        let subscriber: Arc<dyn Subscriber> = subscriber.clone();
        let mut index = self.inner.subscriptions.write();
        match index.id_of(&subscriber) {
            Some(id) => {
                tracing::debug!(subscriber = %id, "detached subscriber");
                index.remove(id)
            }
            None => false,
        }
    }

    /// Id of an attached subscriber.
    #[must_use]
    pub fn subscriber_id<S>(&self, subscriber: &Arc<S>) -> Option<SubscriberId>
    where
        S: Subscriber + 'static,
    {
        let subscriber: Arc<dyn Subscriber> = subscriber.clone();
        self.inner.subscriptions.read().id_of(&subscriber)
    }

    /// Register (or replace) the handler for a normal action.
    pub fn register_action<H>(&self, name: impl Into<String>, handler: H)
    where
        H: ActionHandler + 'static,
    {
        let name = name.into();
        let replaced = self
            .inner
            .registries
            .write()
            .actions
            .register(name.clone(), Arc::new(handler));
        tracing::trace!(action = %name, replaced = replaced.is_some(), "registered action");
    }

    /// Register (or replace) a hijack for an action name.
    pub fn hijack<H>(&self, name: impl Into<String>, handler: H)
    where
        H: HijackHandler + 'static,
    {
        let name = name.into();
        let replaced = self
            .inner
            .registries
            .write()
            .hijacks
            .register(name.clone(), Arc::new(handler));
        tracing::trace!(action = %name, replaced = replaced.is_some(), "registered hijack");
    }

    /// Check if a normal action is registered under `name`.
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.inner.registries.read().actions.contains(name)
    }

    /// Check if a hijack is registered under `name`.
    #[must_use]
    pub fn is_hijacked(&self, name: &str) -> bool {
        self.inner.registries.read().hijacks.contains(name)
    }

    /// Whether debug logging of actions is on.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.inner.debug
    }

    /// A weak trigger handle, as handed to attached subscribers.
    #[must_use]
    pub fn trigger_handle(&self) -> Trigger {
        Trigger::new(Arc::downgrade(&self.inner))
    }

    /// The context passed to handlers dispatched by this manager.
    #[must_use]
    pub fn context(&self) -> ActionContext {
        ActionContext::new(self.clone())
    }

    /// Number of handles sharing this manager.
    ///
    /// Useful for debugging or determining if the manager is shared.
    #[must_use]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::from_config(ManagerConfig::default())
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("debug", &self.inner.debug)
            .field("policy", &self.inner.merger.policy())
            .field("serialized", &self.inner.serial.is_some())
            .field("subscriptions", &*self.inner.subscriptions.read())
            .field("registries", &*self.inner.registries.read())
            .finish_non_exhaustive()
    }
}
