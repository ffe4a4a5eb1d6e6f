//! # Beacon Event System
//!
//! In-process publish/subscribe bus used by every feature of the framework.
//!
//! Producers hand an [`Event`] (optionally wrapped in an [`Envelope`]) to
//! [`EventBus::dispatch`]. Registered [`EventSubscriber`]s receive it in
//! [`Priority`] order. Payloads that expose the [`Cancellable`] capability
//! can short-circuit delivery: lower-priority subscribers are deferred while
//! the event is cancelled and get their turn again if it is un-cancelled
//! later in the same pass.
//!
//! Callbacks run synchronously on the dispatching thread. There is no
//! timeout: a subscriber that never returns blocks the whole pass.
pub mod bus;
pub mod component;
pub mod config;
pub mod envelope;
pub mod error;
pub mod group;
pub mod handler;
pub mod subscriber;

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Delivery tier of an event subscriber.
///
/// Declaration order is dispatch order. `Watcher` is reserved for observers
/// that must see every event exactly once and are not allowed to touch its
/// cancellation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    /// Runs before everything else
    First,
    High,
    #[default]
    Normal,
    Low,
    /// Last tier that may still influence cancellation
    Last,
    /// Read-only observers, always dispatched last
    Watcher,
}

impl Priority {
    /// All priorities in dispatch order
    pub const ALL: [Priority; 6] = [
        Priority::First,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Last,
        Priority::Watcher,
    ];

    pub fn is_watcher(self) -> bool {
        self == Priority::Watcher
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::First => "first",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Last => "last",
            Priority::Watcher => "watcher",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown priority '{}'", s))
    }
}

/// Core event trait
pub trait Event: Any + fmt::Debug + Send + Sync {
    /// Get the name of this event, used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Cancellation capability, if this payload carries one
    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        None
    }

    /// Envelope capability. Envelopes are unwrapped before delivery.
    fn as_envelope(&self) -> Option<&dyn envelope::EventEnvelope> {
        None
    }

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Readable/settable cancellation flag exposed by a payload.
///
/// Takes `&self` so subscribers holding a shared reference to the payload
/// can flip it.
pub trait Cancellable: Send + Sync {
    fn is_cancelled(&self) -> bool;
    fn set_cancelled(&self, cancelled: bool);
}

/// Stock atomic [`Cancellable`] holder for payload types.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new(cancelled: bool) -> Self {
        Self(AtomicBool::new(cancelled))
    }
}

impl Cancellable for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set_cancelled(&self, cancelled: bool) {
        self.0.store(cancelled, Ordering::Release);
    }
}

/// Opaque originator of a dispatch; `None` means unattributed.
pub type Caller<'a> = Option<&'a dyn Any>;

/// Re-export important types
pub use bus::{BusId, BusRef, EventBus};
pub use component::EventBusComponent;
pub use config::{ConfigFormat, EventBusConfig, FailurePolicy};
pub use envelope::{Envelope, EventEnvelope};
pub use error::{EventSystemError, Result, SubscriberError};
pub use group::ListenerGroup;
pub use handler::{FnSubscriber, FnSubscriberBuilder};
pub use subscriber::{EventSubscriber, Subscriber, SubscriberResult, SubscriptionSet};

// Test module declaration
#[cfg(test)]
mod tests;
