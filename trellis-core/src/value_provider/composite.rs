// Ordered composition of value providers

use super::factory::ValueProviderFactory;
use super::{EnumerableValueProvider, ValueProvider, ValueProviderResult};
use crate::action::ActionContext;
use crate::binding_source::BindingSource;
use crate::logging::{debug, trace};
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Queries providers in registration order.
///
/// Values are never merged: the first provider with a non-empty result
/// answers `get_value`, and the first non-empty key harvest answers
/// `get_keys_from_prefix`.
#[derive(Clone, Default)]
pub struct CompositeValueProvider {
    providers: Vec<Arc<dyn ValueProvider>>,
}

impl CompositeValueProvider {
    pub fn new(providers: Vec<Arc<dyn ValueProvider>>) -> Self {
        Self { providers }
    }

    /// Build the request's providers from the registered factories
    pub async fn create(
        context: &ActionContext,
        factories: &[Arc<dyn ValueProviderFactory>],
    ) -> Result<Self> {
        let mut providers = Vec::with_capacity(factories.len());
        for factory in factories {
            if let Some(provider) = factory.create_value_provider(context).await? {
                providers.push(provider);
            }
        }
        debug!(providers = providers.len(), "Created value providers");
        Ok(Self { providers })
    }

    pub fn push(&mut self, provider: Arc<dyn ValueProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn ValueProvider>] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Providers whose data `source` may use
    pub fn filter(&self, source: BindingSource) -> Self {
        let providers: Vec<_> = self
            .providers
            .iter()
            .filter(|p| source.can_accept_data_from(p.binding_source()))
            .cloned()
            .collect();
        trace!(source = %source, kept = providers.len(), "Filtered value providers");
        Self { providers }
    }
}

impl ValueProvider for CompositeValueProvider {
    fn binding_source(&self) -> BindingSource {
        BindingSource::ModelBinding
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        self.providers.iter().any(|p| p.contains_prefix(prefix))
    }

    fn get_value(&self, key: &str) -> ValueProviderResult {
        self.providers
            .iter()
            .map(|p| p.get_value(key))
            .find(|result| !result.is_empty())
            .unwrap_or_default()
    }

    fn as_enumerable(&self) -> Option<&dyn EnumerableValueProvider> {
        self.providers
            .iter()
            .any(|p| p.as_enumerable().is_some())
            .then_some(self as &dyn EnumerableValueProvider)
    }
}

impl EnumerableValueProvider for CompositeValueProvider {
    fn get_keys_from_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.providers
            .iter()
            .filter_map(|p| p.as_enumerable())
            .map(|p| p.get_keys_from_prefix(prefix))
            .find(|keys| !keys.is_empty())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for CompositeValueProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<_> = self.providers.iter().map(|p| p.binding_source()).collect();
        f.debug_struct("CompositeValueProvider")
            .field("sources", &sources)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culture::Culture;
    use crate::form::FormCollection;
    use crate::value_provider::{
        FormFileValueProvider, FormValueProvider, QueryStringValueProvider,
    };

    fn composite() -> CompositeValueProvider {
        let form = FormCollection::new()
            .with_field("name", "from-form")
            .with_field("dict[a]", "1");
        CompositeValueProvider::new(vec![
            Arc::new(FormValueProvider::new(&form, Culture::from_name("fr-FR"))),
            Arc::new(QueryStringValueProvider::new(vec![
                ("name".into(), "from-query".into()),
                ("page".into(), "2".into()),
                ("dict[b]".into(), "2".into()),
            ])),
            Arc::new(FormFileValueProvider::new(&FormCollection::new())),
        ])
    }

    #[test]
    fn test_first_non_empty_wins() {
        let c = composite();
        assert_eq!(c.get_value("name").values(), ["from-form"]);
        assert_eq!(c.get_value("page").first_value(), Some("2"));
        assert!(c.get_value("absent").is_empty());
    }

    #[test]
    fn test_first_non_empty_harvest_wins() {
        let c = composite();
        let keys = c.as_enumerable().unwrap().get_keys_from_prefix("dict");
        assert_eq!(keys.keys().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn test_filter_by_source() {
        let c = composite();
        let query_only = c.filter(BindingSource::Query);
        assert_eq!(query_only.len(), 1);
        assert_eq!(query_only.get_value("name").first_value(), Some("from-query"));

        let model_binding = c.filter(BindingSource::ModelBinding);
        assert_eq!(model_binding.len(), 2);

        assert!(c.filter(BindingSource::Header).is_empty());
    }

    #[test]
    fn test_contains_prefix_any() {
        let c = composite();
        assert!(c.contains_prefix("page"));
        assert!(c.contains_prefix("dict"));
        assert!(!c.contains_prefix("missing"));
    }
}
