use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::event::{Cancellable, Event};

/// Wrapper that separates the payload delivered to subscribers from the
/// object holding the cancellation state.
///
/// An envelope is itself an [`Event`] (so it can be dispatched) and answers
/// [`Event::as_envelope`] with itself. If the envelope exposes
/// [`Event::as_cancellable`], it is the cancellation holder; otherwise the
/// payload's own capability is used.
pub trait EventEnvelope: Send + Sync {
    /// The raw payload handed to subscribers
    fn payload(&self) -> &dyn Event;
}

/// Stock envelope around a concrete event.
///
/// Built with [`Envelope::new`] it defers cancellation to the payload.
/// [`Envelope::with_holder`] installs a shared holder instead; keep a clone
/// of the `Arc` inside the payload if subscribers need to reach it.
pub struct Envelope<E: Event> {
    event: E,
    holder: Option<Arc<dyn Cancellable>>,
}

impl<E: Event> Envelope<E> {
    pub fn new(event: E) -> Self {
        Self { event, holder: None }
    }

    pub fn with_holder(event: E, holder: Arc<dyn Cancellable>) -> Self {
        Self {
            event,
            holder: Some(holder),
        }
    }

    pub fn event(&self) -> &E {
        &self.event
    }

    pub fn into_inner(self) -> E {
        self.event
    }

    /// Current cancellation state, as the bus would see it
    pub fn is_cancelled(&self) -> bool {
        self.as_cancellable().is_some_and(|c| c.is_cancelled())
    }
}

impl<E: Event> fmt::Debug for Envelope<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("event", &self.event)
            .field("has_holder", &self.holder.is_some())
            .finish()
    }
}

impl<E: Event> EventEnvelope for Envelope<E> {
    fn payload(&self) -> &dyn Event {
        &self.event
    }
}

impl<E: Event> Event for Envelope<E> {
    fn name(&self) -> &str {
        self.event.name()
    }

    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        match &self.holder {
            Some(holder) => Some(holder.as_ref()),
            None => self.event.as_cancellable(),
        }
    }

    fn as_envelope(&self) -> Option<&dyn EventEnvelope> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
