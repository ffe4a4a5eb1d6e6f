use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::ReentrantMutex;

use crate::event::config::{EventBusConfig, FailurePolicy};
use crate::event::error::{EventSystemError, Result};
use crate::event::subscriber::{EventSubscriber, Subscriber};
use crate::event::{Caller, Cancellable, Event, Priority};

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of an [`EventBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusId(u64);

impl BusId {
    fn next() -> Self {
        BusId(NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Non-owning handle to a bus, held by subscribers.
#[derive(Clone)]
pub struct BusRef {
    id: BusId,
    inner: Weak<BusInner>,
}

impl BusRef {
    pub fn id(&self) -> BusId {
        self.id
    }

    /// Get the bus back, if it is still alive
    pub fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }
}

impl fmt::Debug for BusRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusRef")
            .field("id", &self.id)
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// Identity of a subscriber inside a bus is its Arc allocation.
type SubscriberKey = usize;

fn key_of(subscriber: &Arc<dyn Subscriber>) -> SubscriberKey {
    Arc::as_ptr(subscriber) as *const () as usize
}

#[derive(Clone)]
struct DispatchEntry {
    key: SubscriberKey,
    priority: Priority,
    subscriber: Arc<dyn EventSubscriber>,
}

#[derive(Default)]
struct BusState {
    // Every tracked subscriber, in registration order
    members: Vec<(SubscriberKey, Arc<dyn Subscriber>)>,
    // Event subscribers only, sorted by priority (stable)
    ordered: Vec<DispatchEntry>,
    disposed: bool,
}

impl BusState {
    fn contains(&self, key: SubscriberKey) -> bool {
        self.members.iter().any(|(k, _)| *k == key)
    }

    fn insert(&mut self, key: SubscriberKey, subscriber: &Arc<dyn Subscriber>, entry: Option<DispatchEntry>) -> bool {
        if self.contains(key) {
            return false;
        }
        self.members.push((key, Arc::clone(subscriber)));
        if let Some(entry) = entry {
            self.ordered.push(entry);
            // Stable: equal priorities keep registration order.
            self.ordered.sort_by_key(|entry| entry.priority);
        }
        true
    }

    fn remove(&mut self, key: SubscriberKey) -> bool {
        let before = self.members.len();
        self.members.retain(|(k, _)| *k != key);
        self.ordered.retain(|entry| entry.key != key);
        self.members.len() < before
    }
}

struct BusInner {
    id: BusId,
    config: EventBusConfig,
    // Reentrant so callbacks may register, unregister or dispatch again on
    // the same thread. The RefCell is only borrowed between callbacks.
    state: ReentrantMutex<RefCell<BusState>>,
}

/// Priority-ordered, cancellation-aware event bus.
///
/// Cloning yields another handle to the same bus. Every operation takes the
/// same per-bus lock, so concurrent callers on other threads are serialized
/// for the duration of a dispatch pass.
///
/// The bus holds its subscribers strongly. Subscribers that need to reach
/// the bus back should keep a [`BusRef`] from [`EventBus::handle`], not a
/// clone, or the pair stays alive until [`EventBus::dispose`] runs.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.state.lock();
        // A callback may hold the borrow while formatting; don't panic on it.
        let counts = guard
            .try_borrow()
            .map(|state| (state.members.len(), state.ordered.len(), state.disposed))
            .ok();
        let mut s = f.debug_struct("EventBus");
        s.field("id", &self.inner.id).field("name", &self.inner.config.name);
        if let Some((members, ordered, disposed)) = counts {
            s.field("subscribers", &members)
                .field("event_subscribers", &ordered)
                .field("disposed", &disposed);
        }
        s.finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus with the default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let id = BusId::next();
        log::debug!("Created event bus '{}' ({})", config.name, id);
        Self {
            inner: Arc::new(BusInner {
                id,
                config,
                state: ReentrantMutex::new(RefCell::new(BusState::default())),
            }),
        }
    }

    pub fn id(&self) -> BusId {
        self.inner.id
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.inner.config
    }

    /// Weak handle handed to subscribers
    pub fn handle(&self) -> BusRef {
        BusRef {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn is_disposed(&self) -> bool {
        let guard = self.inner.state.lock();
        let disposed = guard.borrow().disposed;
        disposed
    }

    /// Number of tracked subscribers
    pub fn len(&self) -> usize {
        let guard = self.inner.state.lock();
        let len = guard.borrow().members.len();
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        let guard = self.inner.state.lock();
        let found = guard.borrow().contains(key_of(subscriber));
        found
    }

    /// Add a subscriber and tell it about this bus.
    ///
    /// Returns `Ok(false)` if it was already registered.
    pub fn add_subscriber(&self, subscriber: &Arc<dyn Subscriber>) -> Result<bool> {
        let _guard = self.inner.state.lock();
        if !self.track(subscriber)? {
            return Ok(false);
        }
        // Called with the lock held but the state released, so the
        // subscriber may call back into this bus.
        subscriber.register_reference(self.handle());
        Ok(true)
    }

    /// Remove a subscriber and tell it to forget this bus.
    ///
    /// Returns `Ok(false)` if it was not registered.
    pub fn remove_subscriber(&self, subscriber: &Arc<dyn Subscriber>) -> Result<bool> {
        let _guard = self.inner.state.lock();
        if !self.untrack(subscriber)? {
            return Ok(false);
        }
        subscriber.unregister_reference(self.inner.id);
        Ok(true)
    }

    /// Entry point for a subscriber announcing itself.
    ///
    /// Same as [`add_subscriber`](Self::add_subscriber) except that the
    /// subscriber is not called back.
    pub fn register_reference(&self, subscriber: &Arc<dyn Subscriber>) -> Result<bool> {
        let _guard = self.inner.state.lock();
        self.track(subscriber)
    }

    /// Entry point for a subscriber withdrawing itself. Does not call back.
    pub fn unregister_reference(&self, subscriber: &Arc<dyn Subscriber>) -> Result<bool> {
        let _guard = self.inner.state.lock();
        self.untrack(subscriber)
    }

    /// Snapshot of the registered subscribers, in registration order.
    ///
    /// Empty once the bus is disposed.
    pub fn subscribers(&self) -> Vec<Arc<dyn Subscriber>> {
        let guard = self.inner.state.lock();
        let snapshot = guard.borrow().members.iter().map(|(_, s)| Arc::clone(s)).collect();
        snapshot
    }

    /// Permanently shut the bus down.
    ///
    /// Every registered subscriber is told to forget the bus. Calling this
    /// again is a no-op.
    pub fn dispose(&self) {
        let guard = self.inner.state.lock();
        let members = {
            let mut state = guard.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.ordered.clear();
            std::mem::take(&mut state.members)
        };
        log::debug!(
            "Disposing event bus '{}' ({}) with {} subscriber(s)",
            self.inner.config.name,
            self.inner.id,
            members.len()
        );
        for (_, subscriber) in members {
            subscriber.unregister_reference(self.inner.id);
        }
    }

    /// Deliver `event` to every event subscriber in priority order.
    ///
    /// The pass works on a snapshot taken at call time: subscribers added or
    /// removed by callbacks take effect from the next dispatch. If `event` is
    /// an envelope, subscribers receive the wrapped payload.
    ///
    /// Subscribers skipped because the event was cancelled are queued and
    /// spliced back in right after the subscriber that un-cancels it.
    ///
    /// # Errors
    ///
    /// - [`EventSystemError::BusDisposed`] if the bus was disposed.
    /// - [`EventSystemError::WatcherMutatedCancellation`] if a watcher flips
    ///   the cancellation state; the pass stops there.
    /// - [`EventSystemError::SubscriberFailed`] if a callback fails under
    ///   [`FailurePolicy::Abort`]; the remaining subscribers are not invoked.
    pub fn dispatch(&self, caller: Caller<'_>, event: &dyn Event) -> Result<()> {
        let guard = self.inner.state.lock();
        let mut working: Vec<(Priority, Arc<dyn EventSubscriber>)> = {
            let state = guard.borrow();
            if state.disposed {
                return Err(EventSystemError::BusDisposed { bus: self.inner.id });
            }
            state
                .ordered
                .iter()
                .map(|entry| (entry.priority, Arc::clone(&entry.subscriber)))
                .collect()
        };

        let (payload, holder) = unwrap_event(event);
        let is_cancelled = || holder.is_some_and(|c| c.is_cancelled());
        let mut deferred: Vec<(Priority, Arc<dyn EventSubscriber>)> = Vec::new();

        let mut cursor = 0;
        while cursor < working.len() {
            let (priority, subscriber) = working[cursor].clone();
            let pre_cancelled = is_cancelled();

            if !priority.is_watcher() && pre_cancelled && !subscriber.invoked_while_cancelled() {
                log::trace!("Deferring '{}' on cancelled event '{}'", subscriber.name(), payload.name());
                deferred.push((priority, subscriber));
                cursor += 1;
                continue;
            }

            self.invoke(&*subscriber, caller, payload)?;

            let post_cancelled = is_cancelled();
            if priority.is_watcher() && post_cancelled != pre_cancelled {
                log::error!(
                    "Watcher '{}' changed cancellation of event '{}' on bus {}",
                    subscriber.name(),
                    payload.name(),
                    self.inner.id
                );
                return Err(EventSystemError::WatcherMutatedCancellation {
                    subscriber: subscriber.name().to_string(),
                    event: payload.name().to_string(),
                });
            }

            if pre_cancelled && !post_cancelled && !deferred.is_empty() {
                log::trace!(
                    "Event '{}' un-cancelled by '{}', resuming {} deferred subscriber(s)",
                    payload.name(),
                    subscriber.name(),
                    deferred.len()
                );
                let at = cursor + 1;
                working.splice(at..at, deferred.drain(..));
            }
            cursor += 1;
        }
        Ok(())
    }

    fn invoke(&self, subscriber: &dyn EventSubscriber, caller: Caller<'_>, payload: &dyn Event) -> Result<()> {
        let started = Instant::now();
        let outcome = subscriber.on_event(caller, payload);
        if let Some(threshold) = self.inner.config.slow_subscriber_warn_ms {
            let elapsed = started.elapsed();
            if elapsed > Duration::from_millis(threshold) {
                log::warn!(
                    "Subscriber '{}' took {:?} handling event '{}' on bus '{}'",
                    subscriber.name(),
                    elapsed,
                    payload.name(),
                    self.inner.config.name
                );
            }
        }
        let Err(source) = outcome else {
            return Ok(());
        };
        match self.inner.config.failure_policy {
            FailurePolicy::Abort => {
                log::error!(
                    "Subscriber '{}' failed on event '{}', aborting dispatch: {}",
                    subscriber.name(),
                    payload.name(),
                    source
                );
                Err(EventSystemError::SubscriberFailed {
                    subscriber: subscriber.name().to_string(),
                    event: payload.name().to_string(),
                    source,
                })
            }
            FailurePolicy::Isolate => {
                log::warn!(
                    "Subscriber '{}' failed on event '{}', continuing: {}",
                    subscriber.name(),
                    payload.name(),
                    source
                );
                Ok(())
            }
        }
    }

    fn track(&self, subscriber: &Arc<dyn Subscriber>) -> Result<bool> {
        let key = key_of(subscriber);
        // Query the capability before borrowing the state; it runs user code.
        let entry = Arc::clone(subscriber).as_event_subscriber().map(|event_subscriber| DispatchEntry {
            key,
            priority: event_subscriber.priority(),
            subscriber: event_subscriber,
        });
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();
        if state.disposed {
            return Err(EventSystemError::BusDisposed { bus: self.inner.id });
        }
        let added = state.insert(key, subscriber, entry);
        if added {
            log::debug!("Subscriber added to bus '{}' ({})", self.inner.config.name, self.inner.id);
        }
        Ok(added)
    }

    fn untrack(&self, subscriber: &Arc<dyn Subscriber>) -> Result<bool> {
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();
        if state.disposed {
            return Err(EventSystemError::BusDisposed { bus: self.inner.id });
        }
        let removed = state.remove(key_of(subscriber));
        if removed {
            log::debug!("Subscriber removed from bus '{}' ({})", self.inner.config.name, self.inner.id);
        }
        Ok(removed)
    }
}

/// Split an event into the payload handed to subscribers and the holder
/// whose flag decides cancellation.
fn unwrap_event(event: &dyn Event) -> (&dyn Event, Option<&dyn Cancellable>) {
    match event.as_envelope() {
        Some(envelope) => {
            let payload = envelope.payload();
            (payload, event.as_cancellable().or_else(|| payload.as_cancellable()))
        }
        None => (event, event.as_cancellable()),
    }
}
