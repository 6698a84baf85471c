// Top-level parameter binding

use super::{Model, ModelBinder, ModelBinderFactory, ModelBindingContext, ModelBindingResult};
use crate::action::{ActionContext, ActionDescriptor, ParameterDescriptor};
use crate::logging::{debug, info, trace};
use crate::metadata::ModelMetadata;
use crate::model_state::ModelStateDictionary;
use crate::validation::ValidationNode;
use crate::value_provider::{CompositeValueProvider, ValueProvider};
use crate::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Outcome of binding one parameter
#[derive(Debug, Clone)]
pub struct BoundParameter {
    pub name: String,
    /// Model state key the parameter bound under
    pub model_name: String,
    pub result: ModelBindingResult,
    pub validation_node: Option<ValidationNode>,
}

/// Everything bound for one action invocation
#[derive(Debug)]
pub struct BoundArguments {
    parameters: Vec<BoundParameter>,
    model_state: ModelStateDictionary,
}

impl BoundArguments {
    pub fn model_state(&self) -> &ModelStateDictionary {
        &self.model_state
    }

    pub fn model_state_mut(&mut self) -> &mut ModelStateDictionary {
        &mut self.model_state
    }

    pub fn into_model_state(self) -> ModelStateDictionary {
        self.model_state
    }

    pub fn is_valid(&self) -> bool {
        self.model_state.is_valid()
    }

    pub fn parameters(&self) -> &[BoundParameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&BoundParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn result(&self, name: &str) -> Option<&ModelBindingResult> {
        self.parameter(name).map(|p| &p.result)
    }

    /// The bound JSON model, if the parameter bound one
    pub fn value(&self, name: &str) -> Option<&serde_json::Value> {
        self.result(name).and_then(ModelBindingResult::value)
    }

    /// Deserialize a bound parameter into `T`.
    ///
    /// Returns `None` when the parameter did not bind. A model that does
    /// not fit `T` records the serde error at the parameter's key.
    pub fn get<T: DeserializeOwned>(&mut self, name: &str) -> Option<T> {
        let parameter = self.parameters.iter().find(|p| p.name == name)?;
        let value = parameter.result.value()?;
        match serde_json::from_value(value.clone()) {
            Ok(typed) => Some(typed),
            Err(err) => {
                debug!(parameter = name, error = %err, "Bound model does not fit target type");
                let key = parameter.model_name.clone();
                self.model_state.add_model_error(&key, err.to_string());
                None
            }
        }
    }

    /// A parameter bound from services
    pub fn service<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.result(name)
            .and_then(ModelBindingResult::model)
            .and_then(Model::service::<T>)
    }
}

/// Binds action parameters: builds the request's value providers once,
/// then runs each parameter's binder in declaration order against a shared
/// model state.
#[derive(Debug, Clone)]
pub struct ParameterBinder {
    factory: Arc<ModelBinderFactory>,
}

impl ParameterBinder {
    pub fn new(factory: Arc<ModelBinderFactory>) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &Arc<ModelBinderFactory> {
        &self.factory
    }

    /// Bind every parameter of `action`
    pub async fn bind_arguments(
        &self,
        context: &ActionContext,
        action: &ActionDescriptor,
    ) -> Result<BoundArguments> {
        let options = self.factory.options();
        let mut model_state =
            ModelStateDictionary::with_max_allowed_errors(options.max_model_validation_errors);
        let value_provider = Arc::new(
            CompositeValueProvider::create(context, &options.value_provider_factories).await?,
        );

        let mut parameters = Vec::with_capacity(action.parameters.len());
        for parameter in &action.parameters {
            let metadata = self.factory.metadata_provider().metadata_for_parameter(
                &parameter.model_type,
                &parameter.name,
                &parameter.attributes,
            );
            let binder = self
                .factory
                .create_binder(metadata.clone(), &parameter.binding_info)?;
            let bound = self
                .bind_model(
                    context,
                    &mut model_state,
                    &*binder,
                    value_provider.clone(),
                    parameter,
                    metadata,
                )
                .await?;
            parameters.push(bound);
        }

        info!(
            action = %action.name,
            parameters = parameters.len(),
            valid = model_state.is_valid(),
            "Bound action arguments"
        );
        Ok(BoundArguments {
            parameters,
            model_state,
        })
    }

    /// Bind one parameter with an already selected binder
    pub async fn bind_model(
        &self,
        context: &ActionContext,
        model_state: &mut ModelStateDictionary,
        binder: &dyn ModelBinder,
        value_provider: Arc<CompositeValueProvider>,
        parameter: &ParameterDescriptor,
        metadata: Arc<ModelMetadata>,
    ) -> Result<BoundParameter> {
        let mut ctx = ModelBindingContext::top_level(
            context,
            self.factory.metadata_provider(),
            model_state,
            value_provider,
            metadata.clone(),
            &parameter.binding_info,
            parameter.name.clone(),
        );

        // Without an alias, fall back to the empty prefix when nothing was
        // posted under the parameter name
        if ctx.binder_model_name.is_none() && !ctx.value_provider.contains_prefix(&parameter.name) {
            trace!(parameter = %parameter.name, "Binding parameter with empty prefix");
            ctx.model_name = String::new();
        }

        binder.bind_model(&mut ctx).await?;

        let model_name = ctx.model_name.clone();
        let result = std::mem::take(&mut ctx.result);
        let validation_node = ctx.validation_node.take();

        if !result.is_model_set() && metadata.is_binding_required() {
            let message = ctx
                .messages()
                .missing_bind_required_value(metadata.get_display_name());
            ctx.model_state.add_model_error(&model_name, message);
        }

        debug!(
            parameter = %parameter.name,
            model_name = %model_name,
            bound = result.is_model_set(),
            "Bound parameter"
        );
        Ok(BoundParameter {
            name: parameter.name.clone(),
            model_name,
            result,
            validation_node,
        })
    }
}
