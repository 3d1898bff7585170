//! The applier: routes each event to the code that folds it into the
//! projection store.
//!
//! Generic events dispatch through a handler table keyed by event type and
//! built once in [`Applier::new`]. Events carrying a `system_id` go to the
//! [`SystemAdapter`] registered for that id. Unknown event types and
//! unregistered systems are ignored, so old binaries can replay logs
//! written by newer ones.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use lorekeep_types::Event;

use crate::ApplyError;
use crate::handlers::{self, Handler};
use crate::store::ProjectionStore;
use crate::system::SystemAdapter;

/// Folds events into a projection store, one at a time, in `seq` order.
///
/// The applier does not serialize callers. Applying two events of the same
/// campaign concurrently is a caller bug; `lorekeep-core` holds a
/// per-campaign lock across append and apply.
pub struct Applier {
    store: Arc<dyn ProjectionStore>,
    handlers: HashMap<&'static str, Handler>,
    systems: HashMap<&'static str, Arc<dyn SystemAdapter>>,
}

impl core::fmt::Debug for Applier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut handlers: Vec<&&str> = self.handlers.keys().collect();
        handlers.sort_unstable();
        let mut systems: Vec<&&str> = self.systems.keys().collect();
        systems.sort_unstable();
        f.debug_struct("Applier")
            .field("handlers", &handlers)
            .field("systems", &systems)
            .finish_non_exhaustive()
    }
}

impl Applier {
    /// Create an applier over `store` with the generic handler table and
    /// no game systems.
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self {
            store,
            handlers: handlers::table(),
            systems: HashMap::new(),
        }
    }

    /// Register a game system adapter, replacing any adapter with the same
    /// `system_id`.
    #[must_use]
    pub fn with_system(mut self, adapter: Arc<dyn SystemAdapter>) -> Self {
        self.systems.insert(adapter.system_id(), adapter);
        self
    }

    /// The store this applier writes to.
    pub const fn store(&self) -> &Arc<dyn ProjectionStore> {
        &self.store
    }

    /// The adapter registered for `system_id`, if any.
    pub fn system(&self, system_id: &str) -> Option<&Arc<dyn SystemAdapter>> {
        self.systems.get(system_id.trim())
    }

    /// Whether a handler exists for a generic event type.
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// [`ApplyError::Corrupt`] if the payload cannot be decoded or refers
    /// to rows the log never created; [`ApplyError::Storage`] if the store
    /// failed. On error nothing from this event has been written.
    pub async fn apply(&self, event: &Event) -> Result<(), ApplyError> {
        if event.is_system_event() {
            let system_id = event.system_id.trim();
            let Some(adapter) = self.systems.get(system_id) else {
                debug!(
                    campaign_id = %event.campaign_id,
                    seq = event.seq,
                    system_id,
                    "no adapter registered for system; event ignored"
                );
                return Ok(());
            };
            return adapter.apply(self.store.as_ref(), event).await;
        }

        match self.handlers.get(event.event_type.as_str()) {
            Some(handler) => handler(self.store.as_ref(), event).await,
            None => {
                trace!(
                    campaign_id = %event.campaign_id,
                    seq = event.seq,
                    event_type = %event.event_type,
                    "no handler for event type; event ignored"
                );
                Ok(())
            }
        }
    }

    /// Apply a slice of events in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// The first [`ApplyError`]; events before it stay applied.
    pub async fn apply_all(&self, events: &[Event]) -> Result<(), ApplyError> {
        for event in events {
            self.apply(event).await?;
        }
        Ok(())
    }
}
