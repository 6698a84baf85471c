// Service container consulted by the services binding source

use crate::logging::{debug, trace};
use crate::Error;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// A type-erased service instance
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// Request-scoped service lookup, keyed by `TypeId`
#[derive(Clone)]
pub struct Container {
    services: Arc<RwLock<HashMap<TypeId, ServiceInstance>>>,
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating new service container");
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a service instance
    pub fn register<T: Send + Sync + 'static>(&self, instance: T) {
        self.register_arc(Arc::new(instance));
    }

    /// Register an already shared instance
    pub fn register_arc<T: Send + Sync + 'static>(&self, instance: Arc<T>) {
        let type_name = std::any::type_name::<T>();
        trace!(service = type_name, "Acquiring write lock for registration");
        self.services.write().insert(TypeId::of::<T>(), instance);
        debug!(service = type_name, "Service registered in container");
    }

    /// Resolve a service by type
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        let type_name = std::any::type_name::<T>();
        self.resolve_by_id(TypeId::of::<T>())
            .and_then(|any| any.downcast::<T>().ok())
            .ok_or_else(|| Error::ServiceNotFound(type_name.to_string()))
    }

    /// Resolve a type-erased service
    pub fn resolve_by_id(&self, type_id: TypeId) -> Option<ServiceInstance> {
        let result = self.services.read().get(&type_id).cloned();
        trace!(type_id = ?type_id, found = result.is_some(), "Service lookup");
        result
    }

    /// Check if a service is registered
    pub fn has<T: 'static>(&self) -> bool {
        self.services.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.len())
            .finish()
    }
}
