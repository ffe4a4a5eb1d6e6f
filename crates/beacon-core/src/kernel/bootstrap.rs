use std::any::TypeId;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::event::{EventBus, EventBusComponent, EventBusConfig};
use crate::kernel::component::{DependencyRegistry, KernelComponent};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};

/// Main application struct coordinating components via dependency injection
pub struct Application {
    initialized: bool,
    dependencies: Arc<Mutex<DependencyRegistry>>,
    // Keep track of component initialization order (using concrete TypeIds)
    component_init_order: Vec<TypeId>,
    // Handle to the bus owned by the registered EventBusComponent
    event_bus: EventBus,
}

impl Application {
    /// Creates a new application with the default event bus component.
    pub fn new() -> Result<Self> {
        Self::with_bus_config(EventBusConfig::named(constants::DEFAULT_BUS_NAME))
    }

    /// Creates a new application whose event bus uses `config`.
    pub fn with_bus_config(config: EventBusConfig) -> Result<Self> {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);

        let mut registry = DependencyRegistry::new();
        let event_component = Arc::new(EventBusComponent::with_config(config));
        let event_bus = event_component.bus().clone();
        registry.register_instance(event_component);

        Ok(Application {
            initialized: false,
            dependencies: Arc::new(Mutex::new(registry)),
            component_init_order: vec![TypeId::of::<EventBusComponent>()],
            event_bus,
        })
    }

    /// The application's event bus
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Register an additional component. It is initialized and started after
    /// the components registered before it, and stopped before them.
    pub async fn register_component<V>(&mut self, component: Arc<V>) -> Result<()>
    where
        V: KernelComponent + 'static,
    {
        if self.initialized {
            return Err(Error::ComponentRegistryError {
                operation: "RegisterComponent".to_string(),
                component_name: Some(component.name().to_string()),
                type_id_str: Some(format!("{:?}", TypeId::of::<V>())),
                message: "Cannot register components while the application is running".to_string(),
            });
        }
        let mut registry = self.dependencies.lock().await;
        let type_id = TypeId::of::<V>();
        if registry.get_component_by_id(&type_id).is_some() {
            return Err(Error::ComponentRegistryError {
                operation: "RegisterComponent".to_string(),
                component_name: Some(component.name().to_string()),
                type_id_str: Some(format!("{:?}", type_id)),
                message: "A component of this type is already registered".to_string(),
            });
        }
        log::debug!("Registering component: {}", component.name());
        registry.register_instance(component);
        self.component_init_order.push(type_id);
        Ok(())
    }

    /// Gets a specific component instance by its concrete type T.
    pub async fn get_component<T: KernelComponent + 'static>(&self) -> Option<Arc<T>> {
        let registry = self.dependencies.lock().await;
        registry.get_concrete::<T>()
    }

    /// Initialize and start all registered components.
    pub async fn run(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::RunPreCheck,
                component_name: None,
                type_id_str: None,
                message: "Application already initialized".to_string(),
                source: None,
            });
        }

        self.initialize().await?;
        self.start().await?;

        self.initialized = true;
        log::info!("Application initialized and started successfully.");
        Ok(())
    }

    /// Initialize all registered components in the predefined order.
    async fn initialize(&mut self) -> Result<()> {
        log::info!("Initializing components...");
        let registry = self.dependencies.lock().await;

        for type_id in &self.component_init_order {
            let component = Self::lookup(&registry, type_id, KernelLifecyclePhase::Initialize)?;
            log::info!("Initializing component: {}", component.name());
            component.initialize().await.map_err(|e| Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Initialize,
                component_name: Some(component.name().to_string()),
                type_id_str: Some(format!("{:?}", type_id)),
                message: "Component failed to initialize".to_string(),
                source: Some(Box::new(e)),
            })?;
        }
        log::info!("Component initialization complete.");
        Ok(())
    }

    /// Start all initialized components in the predefined order.
    async fn start(&mut self) -> Result<()> {
        log::info!("Starting components...");
        let registry = self.dependencies.lock().await;

        for type_id in &self.component_init_order {
            let component = Self::lookup(&registry, type_id, KernelLifecyclePhase::Start)?;
            log::info!("Starting component: {}", component.name());
            component.start().await?;
        }
        log::info!("Component start complete.");
        Ok(())
    }

    /// Stop all components in reverse order of initialization.
    ///
    /// Stopping the [`EventBusComponent`] disposes the event bus, so this is
    /// where subscribers are told to forget it.
    ///
    /// Every component is stopped even if an earlier one fails; the first
    /// failure is returned afterwards.
    pub async fn shutdown(&mut self) -> Result<()> {
        log::info!("Shutting down components...");
        let registry = self.dependencies.lock().await;
        let mut first_error: Option<Error> = None;

        for type_id in self.component_init_order.iter().rev() {
            if let Some(component) = registry.get_component_by_id(type_id) {
                log::info!("Stopping component: {}", component.name());
                if let Err(e) = component.stop().await {
                    log::error!("Error stopping component {}: {}", component.name(), e);
                    if first_error.is_none() {
                        first_error = Some(Error::KernelLifecycleError {
                            phase: KernelLifecyclePhase::Shutdown,
                            component_name: Some(component.name().to_string()),
                            type_id_str: Some(format!("{:?}", type_id)),
                            message: "Component failed to stop".to_string(),
                            source: Some(Box::new(e)),
                        });
                    }
                }
            } else {
                log::warn!("Component instance not found in registry for TypeId {:?} during stop.", type_id);
            }
        }
        self.initialized = false;

        match first_error {
            Some(e) => Err(e),
            None => {
                log::info!("Component shutdown complete.");
                Ok(())
            }
        }
    }

    /// Returns whether the application has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn lookup(
        registry: &DependencyRegistry,
        type_id: &TypeId,
        phase: KernelLifecyclePhase,
    ) -> Result<Arc<dyn KernelComponent>> {
        registry.get_component_by_id(type_id).ok_or_else(|| {
            // This indicates a logic error
            log::error!("Component instance not found in registry for TypeId {:?} during {}.", type_id, phase);
            Error::KernelLifecycleError {
                phase,
                component_name: None,
                type_id_str: Some(format!("{:?}", type_id)),
                message: "Instance missing from registry".to_string(),
                source: None,
            }
        })
    }
}
