use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use async_trait::async_trait;
use crate::kernel::error::Result;

/// Core component lifecycle trait for all kernel components
#[async_trait]
pub trait KernelComponent: Any + Send + Sync + Debug {
    fn name(&self) -> &'static str;
    async fn initialize(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}

/// Registry storing components as Arc<dyn KernelComponent>
#[derive(Default, Debug)]
pub struct DependencyRegistry {
    // Keyed by the *concrete* type's TypeId; the Any view is kept for downcasting
    instances: HashMap<TypeId, (Arc<dyn KernelComponent>, Arc<dyn Any + Send + Sync>)>,
}

impl DependencyRegistry {
    /// Create a new empty dependency registry
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }

    /// Register a component instance, keyed by the TypeId of its concrete type.
    /// Returns the previously registered instance of that type, if any.
    pub fn register_instance<V>(&mut self, instance: Arc<V>) -> Option<Arc<dyn KernelComponent>>
    where
        V: KernelComponent + 'static,
    {
        let component: Arc<dyn KernelComponent> = instance.clone();
        let as_any: Arc<dyn Any + Send + Sync> = instance;
        self.instances
            .insert(TypeId::of::<V>(), (component, as_any))
            .map(|(previous, _)| previous)
    }

    /// Get a component instance by the TypeId of its concrete type.
    pub fn get_component_by_id(&self, type_id: &TypeId) -> Option<Arc<dyn KernelComponent>> {
        self.instances.get(type_id).map(|(component, _)| component.clone())
    }

    /// Get a component instance by concrete type T.
    pub fn get_concrete<T: KernelComponent + 'static>(&self) -> Option<Arc<T>> {
        self.instances
            .get(&TypeId::of::<T>())
            .and_then(|(_, arc_any)| Arc::downcast::<T>(arc_any.clone()).ok())
    }

    /// Get all registered component trait objects.
    pub fn get_all_components(&self) -> Vec<Arc<dyn KernelComponent>> {
        self.instances.values().map(|(component, _)| component.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Clear all instances.
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}
