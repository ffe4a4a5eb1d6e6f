pub mod event;
pub mod kernel;

// Re-export key public types/traits for easier use by plugins
pub use event::{
    Cancellable, CancelFlag, Envelope, Event, EventBus, EventBusConfig, EventSubscriber, EventSystemError, FnSubscriber,
    ListenerGroup, Priority, Subscriber, SubscriptionSet,
};
pub use kernel::error::Error as KernelError;
pub use kernel::Application;

#[cfg(test)]
mod tests;
