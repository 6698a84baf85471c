// Bound models and binder outcomes

use crate::container::ServiceInstance;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A bound model.
///
/// Request data binds to a JSON value that is later deserialized into the
/// target type; services bind to the shared instance itself.
#[derive(Clone)]
pub enum Model {
    Value(Value),
    Service(ServiceInstance),
}

impl Model {
    pub fn null() -> Self {
        Model::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Model::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Model::Value(v) => Some(v),
            Model::Service(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Model::Value(v) => Some(v),
            Model::Service(_) => None,
        }
    }

    /// The service instance, if this model is one of type `T`
    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        match self {
            Model::Service(instance) => instance.clone().downcast::<T>().ok(),
            Model::Value(_) => None,
        }
    }
}

impl From<Value> for Model {
    fn from(value: Value) -> Self {
        Model::Value(value)
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Model::Value(a), Model::Value(b)) => a == b,
            (Model::Service(a), Model::Service(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Value(v) => write!(f, "Value({})", v),
            Model::Service(_) => write!(f, "Service(..)"),
        }
    }
}

/// Outcome of one bind attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ModelBindingResult {
    /// The binder declined or found no data
    #[default]
    NoResult,
    /// The binder attempted and could not produce a value
    Failed,
    /// The model is set; it may be JSON null
    Success(Model),
}

impl ModelBindingResult {
    pub fn success(value: Value) -> Self {
        ModelBindingResult::Success(Model::Value(value))
    }

    pub fn is_model_set(&self) -> bool {
        matches!(self, ModelBindingResult::Success(_))
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            ModelBindingResult::Success(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            ModelBindingResult::Success(model) => Some(model),
            _ => None,
        }
    }

    /// The bound JSON value, if the model is set and is not a service
    pub fn value(&self) -> Option<&Value> {
        self.model().and_then(Model::as_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_states() {
        assert!(!ModelBindingResult::NoResult.is_model_set());
        assert!(!ModelBindingResult::Failed.is_model_set());
        let ok = ModelBindingResult::success(json!(null));
        assert!(ok.is_model_set());
        assert_eq!(ok.value(), Some(&json!(null)));
    }

    #[test]
    fn test_service_model() {
        let instance: ServiceInstance = Arc::new(5u32);
        let model = Model::Service(instance);
        assert_eq!(model.service::<u32>().as_deref(), Some(&5));
        assert!(model.service::<i64>().is_none());
        assert!(model.as_value().is_none());
    }
}
