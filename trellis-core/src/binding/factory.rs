// Binder selection and caching

use super::{ModelBinder, ModelBindingContext};
use crate::binding_source::BindingInfo;
use crate::logging::{debug, trace};
use crate::metadata::{MetadataKey, MetadataProvider, ModelMetadata};
use crate::options::MvcOptions;
use crate::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

type CacheKey = (MetadataKey, BindingInfo);

/// Offers a binder for the metadata in `context`, or declines with `None`
pub trait ModelBinderProvider: Send + Sync {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>>;
}

/// Binders created during one factory call, for cycle detection
#[derive(Default)]
struct Visited {
    /// `None` while the binder for the key is still being created
    entries: HashMap<CacheKey, Option<Arc<dyn ModelBinder>>>,
    placeholders: HashMap<CacheKey, Arc<PlaceholderBinder>>,
}

/// What a provider sees while choosing a binder
pub struct ModelBinderProviderContext<'a> {
    factory: &'a ModelBinderFactory,
    metadata: Arc<ModelMetadata>,
    binding_info: BindingInfo,
    visited: &'a RefCell<Visited>,
}

impl<'a> ModelBinderProviderContext<'a> {
    pub fn metadata(&self) -> &Arc<ModelMetadata> {
        &self.metadata
    }

    /// Binding overrides merged over the metadata's own
    pub fn binding_info(&self) -> &BindingInfo {
        &self.binding_info
    }

    pub fn metadata_provider(&self) -> &'a MetadataProvider {
        &self.factory.metadata_provider
    }

    pub fn options(&self) -> &'a MvcOptions {
        &self.factory.options
    }

    /// Binder for a property or element, honoring its own binding info
    pub fn create_binder(&self, metadata: Arc<ModelMetadata>) -> Result<Arc<dyn ModelBinder>> {
        let info = metadata.binding_info();
        self.factory.create_binder_core(self.visited, metadata, &info)
    }

    pub fn create_binder_with_info(
        &self,
        metadata: Arc<ModelMetadata>,
        binding_info: &BindingInfo,
    ) -> Result<Arc<dyn ModelBinder>> {
        self.factory
            .create_binder_core(self.visited, metadata, binding_info)
    }
}

/// Creates binders through the provider chain and caches them by
/// (metadata key, binding info).
///
/// Recursive type graphs are handled with a placeholder that forwards to
/// the real binder once its creation completes.
pub struct ModelBinderFactory {
    metadata_provider: Arc<MetadataProvider>,
    options: Arc<MvcOptions>,
    cache: DashMap<CacheKey, Arc<dyn ModelBinder>>,
}

impl ModelBinderFactory {
    pub fn new(metadata_provider: Arc<MetadataProvider>, options: Arc<MvcOptions>) -> Self {
        Self {
            metadata_provider,
            options,
            cache: DashMap::new(),
        }
    }

    pub fn metadata_provider(&self) -> &Arc<MetadataProvider> {
        &self.metadata_provider
    }

    pub fn options(&self) -> &Arc<MvcOptions> {
        &self.options
    }

    pub fn create_binder(
        &self,
        metadata: Arc<ModelMetadata>,
        binding_info: &BindingInfo,
    ) -> Result<Arc<dyn ModelBinder>> {
        let visited = RefCell::new(Visited::default());
        self.create_binder_core(&visited, metadata, binding_info)
    }

    /// Number of cached binders
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn create_binder_core(
        &self,
        visited: &RefCell<Visited>,
        metadata: Arc<ModelMetadata>,
        binding_info: &BindingInfo,
    ) -> Result<Arc<dyn ModelBinder>> {
        let info = merge_binding_info(binding_info, &metadata);
        let key: CacheKey = (metadata.key().clone(), info.clone());

        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.value().clone());
        }

        {
            let mut state = visited.borrow_mut();
            match state.entries.get(&key).cloned() {
                Some(Some(binder)) => return Ok(binder),
                Some(None) => {
                    trace!(model_type = metadata.model_type().name(), "Recursive binder, using placeholder");
                    let placeholder = state
                        .placeholders
                        .entry(key)
                        .or_insert_with(|| Arc::new(PlaceholderBinder::default()))
                        .clone();
                    return Ok(placeholder);
                }
                None => {
                    state.entries.insert(key.clone(), None);
                }
            }
        }

        let context = ModelBinderProviderContext {
            factory: self,
            metadata: metadata.clone(),
            binding_info: info,
            visited,
        };

        let mut selected = None;
        for provider in &self.options.model_binder_providers {
            if let Some(binder) = provider.get_binder(&context)? {
                selected = Some(binder);
                break;
            }
        }

        let binder = selected
            .ok_or_else(|| Error::NoModelBinder(metadata.model_type().name().to_string()))?;

        let placeholder = {
            let mut state = visited.borrow_mut();
            state.entries.insert(key.clone(), Some(binder.clone()));
            state.placeholders.remove(&key)
        };
        if let Some(placeholder) = placeholder {
            placeholder.resolve(binder.clone());
        }

        debug!(
            model_type = metadata.model_type().name(),
            binding_source = ?context.binding_info.binding_source,
            "Created model binder"
        );
        Ok(self.cache.entry(key).or_insert(binder).value().clone())
    }
}

impl std::fmt::Debug for ModelBinderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinderFactory")
            .field("cached", &self.cache.len())
            .finish()
    }
}

fn merge_binding_info(info: &BindingInfo, metadata: &ModelMetadata) -> BindingInfo {
    BindingInfo {
        binding_source: info.binding_source.or(metadata.binding_source()),
        binder_model_name: info
            .binder_model_name
            .clone()
            .or_else(|| metadata.binder_model_name().map(str::to_string)),
        binder_type: info
            .binder_type
            .clone()
            .or_else(|| metadata.binder_type().map(str::to_string)),
        empty_body_behavior: match info.empty_body_behavior {
            crate::binding_source::EmptyBodyBehavior::Default => metadata.empty_body_behavior(),
            behavior => behavior,
        },
    }
}

/// Stands in for a binder whose creation is still in progress
#[derive(Default)]
struct PlaceholderBinder {
    inner: OnceLock<Arc<dyn ModelBinder>>,
}

impl PlaceholderBinder {
    fn resolve(&self, binder: Arc<dyn ModelBinder>) {
        let _ = self.inner.set(binder);
    }
}

#[async_trait]
impl ModelBinder for PlaceholderBinder {
    async fn bind_model(&self, context: &mut ModelBindingContext<'_>) -> Result<()> {
        match self.inner.get() {
            Some(binder) => binder.bind_model(context).await,
            None => Err(Error::Internal(
                "Model binder used before its creation completed".to_string(),
            )),
        }
    }
}
