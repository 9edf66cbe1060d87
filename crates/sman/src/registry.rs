//! Named action and hijack handlers.
//!
//! Registration always overwrites: the last handler registered under a name
//! wins. Resolution prefers a hijack over a normal action and falls back to
//! [`Resolution::Unknown`], which the dispatcher treats as a silent no-op.

use crate::handler::{ActionHandler, HijackHandler};
use std::collections::HashMap;
use std::sync::Arc;

/// Handlers keyed by action name.
pub struct Registry<H: ?Sized> {
    handlers: HashMap<String, Arc<H>>,
}

/// Normal action handlers.
pub type ActionRegistry = Registry<dyn ActionHandler>;

/// Hijack handlers.
pub type HijackRegistry = Registry<dyn HijackHandler>;

impl<H: ?Sized> Registry<H> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` under `name`, returning the handler it replaced.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<H>) -> Option<Arc<H>> {
        self.handlers.insert(name.into(), handler)
    }

    /// Look up the handler for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<H>> {
        self.handlers.get(name).cloned()
    }

    /// Check if a handler is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Remove the handler for `name`.
    pub fn remove(&mut self, name: &str) -> Option<Arc<H>> {
        self.handlers.remove(name)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl<H: ?Sized> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> std::fmt::Debug for Registry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("names", &names).finish()
    }
}

/// Which handler a trigger should run.
pub enum Resolution {
    /// A hijack replaces the action.
    Hijack(Arc<dyn HijackHandler>),
    /// The registered action handler.
    Action(Arc<dyn ActionHandler>),
    /// Nothing is registered under the name.
    Unknown,
}

impl Resolution {
    /// Short label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hijack(_) => "hijack",
            Self::Action(_) => "action",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// The action and hijack registries of one manager.
#[derive(Debug, Default)]
pub struct Registries {
    /// Normal action handlers.
    pub actions: ActionRegistry,
    /// Hijack handlers.
    pub hijacks: HijackRegistry,
}

impl Registries {
    /// Resolve `name`, preferring a hijack.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Resolution {
        if let Some(hijack) = self.hijacks.get(name) {
            Resolution::Hijack(hijack)
        } else if let Some(action) = self.actions.get(name) {
            Resolution::Action(action)
        } else {
            Resolution::Unknown
        }
    }
}
