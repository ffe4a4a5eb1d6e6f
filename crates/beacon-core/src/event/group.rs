use std::sync::Arc;

use crate::event::bus::EventBus;
use crate::event::error::Result;
use crate::event::subscriber::Subscriber;

/// Named batch of subscribers owned by one feature or plugin.
///
/// `enable` registers every member with a bus, `disable` removes them again,
/// matching how a plugin wires its listeners when it is turned on and off.
#[derive(Default)]
pub struct ListenerGroup {
    name: String,
    members: Vec<Arc<dyn Subscriber>>,
}

impl std::fmt::Debug for ListenerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGroup")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish()
    }
}

impl ListenerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a member. Members added after `enable` are only registered on the
    /// next `enable` call.
    pub fn push(&mut self, subscriber: Arc<dyn Subscriber>) -> &mut Self {
        self.members.push(subscriber);
        self
    }

    pub fn with(mut self, subscriber: Arc<dyn Subscriber>) -> Self {
        self.members.push(subscriber);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Register all members with `bus`. Returns how many were newly added.
    pub fn enable(&self, bus: &EventBus) -> Result<usize> {
        let mut added = 0;
        for member in &self.members {
            if bus.add_subscriber(member)? {
                added += 1;
            }
        }
        log::info!("Enabled listener group '{}' on bus '{}' ({} new)", self.name, bus.config().name, added);
        Ok(added)
    }

    /// Remove all members from `bus`. Returns how many were removed.
    pub fn disable(&self, bus: &EventBus) -> Result<usize> {
        let mut removed = 0;
        for member in &self.members {
            if bus.remove_subscriber(member)? {
                removed += 1;
            }
        }
        log::info!("Disabled listener group '{}' on bus '{}' ({} removed)", self.name, bus.config().name, removed);
        Ok(removed)
    }
}
