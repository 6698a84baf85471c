// Thread-safe, write-once metadata cache

use super::details::{
    BindingAttributeMetadataProvider, BindingSourceMetadataProvider, DetailsContext,
    DisplayMetadataProvider, MetadataDetailsProvider, ValidationMetadataProvider,
};
use super::{MetadataDetails, MetadataKey, MetadataKind, ModelMetadata};
use crate::logging::trace;
use crate::model_type::{Attribute, Bindable, ModelType};
use dashmap::DashMap;
use std::sync::Arc;

/// Creates and caches [`ModelMetadata`].
///
/// Shared across requests behind an `Arc`. Each key is computed at most a
/// few times under contention and only the first result is kept, so every
/// caller observes the same instance afterwards.
pub struct MetadataProvider {
    cache: DashMap<MetadataKey, Arc<ModelMetadata>>,
    details_providers: Vec<Arc<dyn MetadataDetailsProvider>>,
}

impl MetadataProvider {
    /// Provider with the default details providers
    pub fn new() -> Self {
        Self::empty()
            .with_details_provider(BindingSourceMetadataProvider)
            .with_details_provider(BindingAttributeMetadataProvider)
            .with_details_provider(DisplayMetadataProvider)
            .with_details_provider(ValidationMetadataProvider)
    }

    /// Provider with no details providers
    pub fn empty() -> Self {
        Self {
            cache: DashMap::new(),
            details_providers: Vec::new(),
        }
    }

    pub fn with_details_provider(mut self, provider: impl MetadataDetailsProvider + 'static) -> Self {
        self.details_providers.push(Arc::new(provider));
        self
    }

    pub fn metadata_for<T: Bindable>(&self) -> Arc<ModelMetadata> {
        self.metadata_for_type(&T::model_type())
    }

    pub fn metadata_for_type(&self, model_type: &ModelType) -> Arc<ModelMetadata> {
        let key = MetadataKey::Type(model_type.id());
        self.get_or_create(key, || {
            let attributes = type_attributes(model_type);
            (MetadataKind::Type, model_type.clone(), None, None, attributes)
        })
    }

    /// Metadata for a declared property, or `None` when the container has
    /// no such property
    pub fn metadata_for_property(
        &self,
        container: &ModelType,
        property: &str,
    ) -> Option<Arc<ModelMetadata>> {
        let descriptor = container.as_complex()?.property(property)?.clone();
        let key = MetadataKey::Property {
            container: container.id(),
            name: descriptor.name.clone(),
        };
        Some(self.get_or_create(key, || {
            let model_type = descriptor.model_type();
            let mut attributes = descriptor.attributes.clone();
            attributes.extend(type_attributes(&model_type));
            (
                MetadataKind::Property,
                model_type,
                Some(container.clone()),
                Some(descriptor.name.clone()),
                attributes,
            )
        }))
    }

    pub fn metadata_for_parameter(
        &self,
        model_type: &ModelType,
        name: &str,
        attributes: &[Attribute],
    ) -> Arc<ModelMetadata> {
        let key = MetadataKey::Parameter {
            model_type: model_type.id(),
            name: name.to_string(),
            attributes: attributes.to_vec(),
        };
        self.get_or_create(key, || {
            let mut all = attributes.to_vec();
            all.extend(type_attributes(model_type));
            (
                MetadataKind::Parameter,
                model_type.clone(),
                None,
                Some(name.to_string()),
                all,
            )
        })
    }

    /// Metadata of every declared property, in declaration order
    pub fn properties_of(&self, metadata: &ModelMetadata) -> Vec<Arc<ModelMetadata>> {
        let container = metadata.model_type().underlying();
        let Some(complex) = container.as_complex() else {
            return Vec::new();
        };
        complex
            .properties
            .iter()
            .filter_map(|p| self.metadata_for_property(&container, &p.name))
            .collect()
    }

    /// Metadata for the element type of an enumerable model
    pub fn element_metadata(&self, metadata: &ModelMetadata) -> Option<Arc<ModelMetadata>> {
        metadata
            .element_type()
            .map(|element| self.metadata_for_type(&element))
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn get_or_create<F>(&self, key: MetadataKey, build: F) -> Arc<ModelMetadata>
    where
        F: FnOnce() -> (MetadataKind, ModelType, Option<ModelType>, Option<String>, Vec<Attribute>),
    {
        if let Some(existing) = self.cache.get(&key) {
            return existing.value().clone();
        }

        let (kind, model_type, container_type, name, attributes) = build();
        let mut details = MetadataDetails::default();
        {
            let mut context = DetailsContext {
                key: &key,
                model_type: &model_type,
                attributes: &attributes,
                details: &mut details,
            };
            for provider in &self.details_providers {
                provider.create_details(&mut context);
            }
        }

        trace!(
            model_type = model_type.name(),
            kind = ?kind,
            name = name.as_deref().unwrap_or(""),
            "Created model metadata"
        );

        let metadata = Arc::new(ModelMetadata::new(
            key.clone(),
            kind,
            model_type,
            container_type,
            name,
            attributes,
            details,
        ));
        self.cache.entry(key).or_insert(metadata).value().clone()
    }
}

impl Default for MetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn type_attributes(model_type: &ModelType) -> Vec<Attribute> {
    model_type
        .underlying()
        .as_complex()
        .map(|c| c.attributes.clone())
        .unwrap_or_default()
}
