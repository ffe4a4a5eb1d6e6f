//! Subscriber capabilities and the back-reference bookkeeping shared with
//! [`EventBus`].
//!
//! A bus keeps strong `Arc` handles to its subscribers. A subscriber only
//! keeps [`BusRef`]s (id plus weak handle) to the buses it is registered
//! with, so the two sides never form an ownership cycle.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::bus::{BusId, BusRef, EventBus};
use crate::event::error::{EventSystemError, Result, SubscriberError};
use crate::event::{Caller, Event, Priority};

/// Outcome of a single subscriber callback
pub type SubscriberResult = std::result::Result<(), SubscriberError>;

/// Anything a bus can track.
///
/// The bus calls `register_reference` / `unregister_reference` so the
/// subscriber can remember which buses it lives on and detach itself on
/// teardown. [`SubscriptionSet`] implements this bookkeeping.
pub trait Subscriber: Send + Sync {
    /// Record that `bus` now holds this subscriber
    fn register_reference(&self, bus: BusRef);

    /// Forget the bus with the given id
    fn unregister_reference(&self, bus: BusId);

    /// Event subscriber capability. Implementors of [`EventSubscriber`]
    /// return `Some(self)`.
    fn as_event_subscriber(self: Arc<Self>) -> Option<Arc<dyn EventSubscriber>> {
        None
    }
}

/// A subscriber that receives dispatched events.
pub trait EventSubscriber: Subscriber {
    /// Delivery tier. Read once when the subscriber is added to a bus.
    fn priority(&self) -> Priority {
        Priority::Normal
    }

    /// Whether this subscriber still runs while the event is cancelled
    fn invoked_while_cancelled(&self) -> bool {
        false
    }

    /// Handle one event. `event` is always the unwrapped payload.
    fn on_event(&self, caller: Caller<'_>, event: &dyn Event) -> SubscriberResult;

    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Set of buses a subscriber is registered with.
///
/// Meant to be embedded in subscriber types and forwarded to from the
/// [`Subscriber`] methods.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    buses: Mutex<HashMap<BusId, BusRef>>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a bus. Returns false if it was already present.
    pub fn insert(&self, bus: BusRef) -> bool {
        let mut buses = self.buses.lock();
        if buses.contains_key(&bus.id()) {
            return false;
        }
        buses.insert(bus.id(), bus);
        true
    }

    /// Forget a bus. Returns false if it was not present.
    pub fn remove(&self, bus: BusId) -> bool {
        self.buses.lock().remove(&bus).is_some()
    }

    pub fn contains(&self, bus: BusId) -> bool {
        self.buses.lock().contains_key(&bus)
    }

    pub fn len(&self) -> usize {
        self.buses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.lock().is_empty()
    }

    /// Ids of all recorded buses
    pub fn bus_ids(&self) -> Vec<BusId> {
        self.buses.lock().keys().copied().collect()
    }

    /// Subscriber-initiated link: record `bus` and announce `owner` to it.
    ///
    /// Uses [`EventBus::register_reference`], which does not call back into
    /// the subscriber.
    pub fn attach(&self, owner: &Arc<dyn Subscriber>, bus: &EventBus) -> Result<bool> {
        let added = bus.register_reference(owner)?;
        self.insert(bus.handle());
        Ok(added)
    }

    /// Unregister `owner` from every bus still referenced and clear the set.
    ///
    /// Buses that were dropped or already disposed are skipped. Returns the
    /// number of buses the owner was actually removed from.
    pub fn detach_all(&self, owner: &Arc<dyn Subscriber>) -> usize {
        // Taken out first: unregister_reference may re-enter this set.
        let buses: Vec<BusRef> = self.buses.lock().drain().map(|(_, bus)| bus).collect();
        let mut removed = 0;
        for bus_ref in buses {
            let Some(bus) = bus_ref.upgrade() else {
                log::debug!("Bus {} dropped before subscriber detached", bus_ref.id());
                continue;
            };
            match bus.unregister_reference(owner) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(EventSystemError::BusDisposed { bus }) => {
                    log::debug!("Skipping disposed bus {} during detach", bus);
                }
                Err(e) => log::warn!("Failed to detach subscriber from bus {}: {}", bus_ref.id(), e),
            }
        }
        removed
    }
}
