use async_trait::async_trait;

use crate::event::bus::EventBus;
use crate::event::config::EventBusConfig;
use crate::event::error::EventSystemError;
use crate::kernel::component::KernelComponent;
use crate::kernel::error::Result;

/// Kernel component owning the application's event bus.
///
/// Stopping the component is the bus's disposal hook.
#[derive(Clone, Debug)]
pub struct EventBusComponent {
    name: &'static str,
    bus: EventBus,
}

impl EventBusComponent {
    /// Create a component with a fresh, default-configured bus
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            name: "EventBusComponent",
            bus: EventBus::with_config(config),
        }
    }

    /// Get the owned bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl Default for EventBusComponent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KernelComponent for EventBusComponent {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> Result<()> {
        if self.bus.is_disposed() {
            return Err(EventSystemError::BusDisposed { bus: self.bus.id() }.into());
        }
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        log::info!("Event bus '{}' ready with {} subscriber(s)", self.bus.config().name, self.bus.len());
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.bus.dispose(); // Idempotent
        Ok(())
    }
}
