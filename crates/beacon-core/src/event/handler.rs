use std::fmt;
use std::sync::Arc;

use crate::event::bus::{BusId, BusRef};
use crate::event::subscriber::{EventSubscriber, Subscriber, SubscriberResult, SubscriptionSet};
use crate::event::{Caller, Event, Priority};

type Callback = Box<dyn Fn(Caller<'_>, &dyn Event) -> SubscriberResult + Send + Sync>;

/// Event subscriber backed by a closure.
pub struct FnSubscriber {
    name: String,
    priority: Priority,
    invoked_while_cancelled: bool,
    callback: Callback,
    references: SubscriptionSet,
}

impl fmt::Debug for FnSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSubscriber")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("invoked_while_cancelled", &self.invoked_while_cancelled)
            .field("buses", &self.references.len())
            .finish_non_exhaustive()
    }
}

impl FnSubscriber {
    /// Builder for a subscriber that receives every payload.
    ///
    /// A callback that needs the bus it is registered with should capture
    /// [`EventBus::handle`](crate::event::EventBus::handle) and upgrade it
    /// per call. Capturing an `EventBus` clone keeps the bus alive until it
    /// is disposed.
    pub fn builder<F>(callback: F) -> FnSubscriberBuilder
    where
        F: Fn(Caller<'_>, &dyn Event) -> SubscriberResult + Send + Sync + 'static,
    {
        FnSubscriberBuilder {
            name: "fn-subscriber".to_string(),
            priority: Priority::Normal,
            invoked_while_cancelled: false,
            callback: Box::new(callback),
        }
    }

    /// Builder for a subscriber that only reacts to payloads of type `E`.
    /// Other payloads are ignored.
    pub fn typed<E, F>(callback: F) -> FnSubscriberBuilder
    where
        E: Event + 'static,
        F: Fn(Caller<'_>, &E) -> SubscriberResult + Send + Sync + 'static,
    {
        Self::builder(move |caller, event| match event.as_any().downcast_ref::<E>() {
            Some(typed) => callback(caller, typed),
            None => Ok(()),
        })
        .name(std::any::type_name::<E>())
    }

    /// Buses this subscriber is currently registered with
    pub fn references(&self) -> &SubscriptionSet {
        &self.references
    }
}

impl Subscriber for FnSubscriber {
    fn register_reference(&self, bus: BusRef) {
        self.references.insert(bus);
    }

    fn unregister_reference(&self, bus: BusId) {
        self.references.remove(bus);
    }

    fn as_event_subscriber(self: Arc<Self>) -> Option<Arc<dyn EventSubscriber>> {
        Some(self)
    }
}

impl EventSubscriber for FnSubscriber {
    fn priority(&self) -> Priority {
        self.priority
    }

    fn invoked_while_cancelled(&self) -> bool {
        self.invoked_while_cancelled
    }

    fn on_event(&self, caller: Caller<'_>, event: &dyn Event) -> SubscriberResult {
        (self.callback)(caller, event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Builder returned by [`FnSubscriber::builder`] and [`FnSubscriber::typed`]
pub struct FnSubscriberBuilder {
    name: String,
    priority: Priority,
    invoked_while_cancelled: bool,
    callback: Callback,
}

impl FnSubscriberBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn invoked_while_cancelled(mut self, invoked: bool) -> Self {
        self.invoked_while_cancelled = invoked;
        self
    }

    pub fn build(self) -> Arc<FnSubscriber> {
        Arc::new(FnSubscriber {
            name: self.name,
            priority: self.priority,
            invoked_while_cancelled: self.invoked_while_cancelled,
            callback: self.callback,
            references: SubscriptionSet::new(),
        })
    }
}
