//! Index of subscribers by top-level key.

use crate::subscriber::{Slice, Subscriber};
use indexmap::{IndexMap, IndexSet};
use sman_core::State;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier assigned to a subscriber on first attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One batched update for one subscriber.
pub struct Notification {
    /// Who receives the update.
    pub id: SubscriberId,
    /// The subscriber itself.
    pub subscriber: Arc<dyn Subscriber>,
    /// New values of every touched key the subscriber cares about.
    pub values: Slice,
}

impl Notification {
    /// Overlay the new values onto the subscriber's cached slice.
    pub fn deliver(self) {
        let mut slice = self.subscriber.slice();
        slice.merge(self.values);
        self.subscriber.set_slice(slice);
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("id", &self.id)
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Maps top-level keys to the subscribers interested in them.
///
/// A subscriber is identified by the allocation behind its [`Arc`], and
/// appears at most once per key.
#[derive(Default)]
pub struct SubscriptionIndex {
    next_id: u64,
    subscribers: IndexMap<SubscriberId, Arc<dyn Subscriber>>,
    by_key: HashMap<String, IndexSet<SubscriberId>>,
}

impl SubscriptionIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of an already registered subscriber.
    #[must_use]
    pub fn id_of(&self, subscriber: &Arc<dyn Subscriber>) -> Option<SubscriberId> {
        self.subscribers
            .iter()
            .find(|(_, known)| Arc::ptr_eq(known, subscriber))
            .map(|(id, _)| *id)
    }

    /// Register a subscriber, returning its existing id if already known.
    pub fn register(&mut self, subscriber: &Arc<dyn Subscriber>) -> SubscriberId {
        if let Some(id) = self.id_of(subscriber) {
            return id;
        }
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, Arc::clone(subscriber));
        id
    }

    /// Subscribe `id` to `keys`. Returns how many keys were newly added.
    pub fn subscribe<I, K>(&mut self, id: SubscriberId, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        if !self.subscribers.contains_key(&id) {
            return 0;
        }
        let mut added = 0;
        for key in keys {
            if self.by_key.entry(key.into()).or_default().insert(id) {
                added += 1;
            }
        }
        added
    }

    /// Subscribers registered for `key`.
    pub fn lookup(&self, key: &str) -> impl Iterator<Item = SubscriberId> + '_ {
        self.by_key.get(key).into_iter().flatten().copied()
    }

    /// The subscriber behind `id`.
    #[must_use]
    pub fn subscriber(&self, id: SubscriberId) -> Option<&Arc<dyn Subscriber>> {
        self.subscribers.get(&id)
    }

    /// Keys `id` is subscribed to.
    #[must_use]
    pub fn keys_of(&self, id: SubscriberId) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .by_key
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Remove a subscriber from every key. Returns `false` if unknown.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        if self.subscribers.shift_remove(&id).is_none() {
            return false;
        }
        self.by_key.retain(|_, ids| {
            ids.shift_remove(&id);
            !ids.is_empty()
        });
        true
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Group the new values of `touched` keys by subscriber.
    ///
    /// Each subscriber gets one [`Notification`] holding every touched key it
    /// is registered for, in first-touch order. Values are the whole
    /// top-level entries of `state`.
    #[must_use]
    pub fn batch(&self, touched: &[String], state: &State) -> Vec<Notification> {
        let mut pending: IndexMap<SubscriberId, Slice> = IndexMap::new();
        for key in touched {
            let Some(ids) = self.by_key.get(key) else {
                continue;
            };
            let value = state.get(key).cloned().unwrap_or_default();
            for id in ids {
                pending
                    .entry(*id)
                    .or_default()
                    .insert(key.clone(), value.clone());
            }
        }

        pending
            .into_iter()
            .filter_map(|(id, values)| {
                self.subscribers.get(&id).map(|subscriber| Notification {
                    id,
                    subscriber: Arc::clone(subscriber),
                    values,
                })
            })
            .collect()
    }
}

impl fmt::Debug for SubscriptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionIndex")
            .field("subscribers", &self.subscribers.len())
            .field("keys", &self.by_key.len())
            .finish()
    }
}
