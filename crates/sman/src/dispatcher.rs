//! Trigger dispatch: resolve, run the handler, commit, notify.

use crate::error::ActionResult;
use crate::handler::{ActionHandler, Args, HijackHandler};
use crate::manager::StateManager;
use crate::registry::Resolution;
use sman_core::{State, UpdateMapping};
use std::sync::Arc;

impl StateManager {
    /// Dispatch the action registered under `name`.
    ///
    /// A hijack takes precedence over a normal action and never commits by
    /// itself. A normal action's update is merged into the state in one step
    /// and every affected subscriber then receives a single update. Unknown
    /// names are a no-op.
    ///
    /// # Errors
    ///
    /// Returns the handler's error unchanged, or [`ActionError::Merge`] if the
    /// update does not fit the current state. Nothing is committed in either
    /// case.
    ///
    /// [`ActionError::Merge`]: crate::error::ActionError::Merge
    pub async fn trigger(&self, name: &str, args: impl Into<Args>) -> ActionResult<()> {
        let args = args.into();
        let resolution = self.inner().registries.read().resolve(name);

        match resolution {
            Resolution::Hijack(handler) => self.hijacked(name, handler, args).await,
            Resolution::Action(handler) => self.apply(name, handler, args).await,
            Resolution::Unknown => {
                tracing::debug!(action = %name, "no handler registered, ignoring trigger");
                Ok(())
            }
        }
    }

    async fn hijacked(
        &self,
        name: &str,
        handler: Arc<dyn HijackHandler>,
        args: Args,
    ) -> ActionResult<()> {
        if self.is_debug() {
            tracing::info!(action = %name, ?args, "action hijacked");
        }
        handler.handle(self.context(), args).await
    }

    async fn apply(
        &self,
        name: &str,
        handler: Arc<dyn ActionHandler>,
        args: Args,
    ) -> ActionResult<()> {
        let _serial = match &self.inner().serial {
            Some(serial) => Some(serial.lock().await),
            None => None,
        };

        if self.is_debug() {
            let prev_state = self.get_state();
            tracing::info!(action = %name, ?args, %prev_state, "applying action");
        }

        let update = handler.handle(self.context(), args).await?;
        let new_state = self.commit(name, &update)?;

        if self.is_debug() {
            tracing::info!(action = %name, %new_state, "action applied");
        }
        Ok(())
    }

    /// Merge `update` and notify affected subscribers.
    ///
    /// The merge runs against the state current at commit time, not the
    /// state the handler saw. Returns the root this commit produced.
    fn commit(&self, name: &str, update: &UpdateMapping) -> ActionResult<State> {
        let inner = self.inner();
        let _commit = inner.commit.lock();

        if update.is_empty() {
            tracing::trace!(action = %name, "empty update, nothing to commit");
            return Ok(inner.state.read().clone());
        }

        let next = {
            let current = inner.state.read().clone();
            inner.merger.merge(&current, update)?
        };
        *inner.state.write() = next.clone();

        let touched = update.top_level_keys();
        let notifications = inner.subscriptions.read().batch(&touched, &next);
        tracing::debug!(
            action = %name,
            writes = update.len(),
            ?touched,
            subscribers = notifications.len(),
            "committed update"
        );

        for notification in notifications {
            tracing::trace!(subscriber = %notification.id, "delivering update");
            notification.deliver();
        }
        Ok(next)
    }
}
