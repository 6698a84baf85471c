//! Value providers: uniform, prefix-aware access to request data.
//!
//! Each provider exposes one source (route values, query string, form
//! fields, uploaded files). A [`CompositeValueProvider`] queries them in
//! registration order and is what binders see.

mod composite;
mod elemental;
mod factory;
mod form;
mod form_file;
mod jquery;
mod prefix;
mod query;
mod route;

pub use composite::CompositeValueProvider;
pub use elemental::ElementalValueProvider;
pub use factory::{
    FormFileValueProviderFactory, FormValueProviderFactory, JQueryFormValueProviderFactory,
    JQueryQueryStringValueProviderFactory, QueryStringValueProviderFactory,
    RouteValueProviderFactory, ValueProviderFactory,
};
pub use form::FormValueProvider;
pub use form_file::FormFileValueProvider;
pub use jquery::{normalize_jquery_key, JQueryFormValueProvider, JQueryQueryStringValueProvider};
pub use prefix::PrefixContainer;
pub use query::QueryStringValueProvider;
pub use route::RouteValueProvider;

use crate::binding_source::BindingSource;
use crate::culture::Culture;
use std::collections::BTreeMap;
use std::fmt;

/// Values found for a key, with the culture they are formatted in.
///
/// Empty when the key is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueProviderResult {
    values: Vec<String>,
    culture: Culture,
}

impl ValueProviderResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(values: Vec<String>, culture: Culture) -> Self {
        Self { values, culture }
    }

    pub fn single(value: impl Into<String>, culture: Culture) -> Self {
        Self::new(vec![value.into()], culture)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }
}

impl fmt::Display for ValueProviderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values.join(","))
    }
}

/// A source of string values addressed by model names
pub trait ValueProvider: Send + Sync {
    fn binding_source(&self) -> BindingSource;

    /// Whether any key equals `prefix` or continues it with `.` or `[`
    fn contains_prefix(&self, prefix: &str) -> bool;

    fn get_value(&self, key: &str) -> ValueProviderResult;

    /// Key enumeration, for providers that support it
    fn as_enumerable(&self) -> Option<&dyn EnumerableValueProvider> {
        None
    }
}

/// A provider able to list the child keys under a prefix
pub trait EnumerableValueProvider: ValueProvider {
    /// Short key -> full key, see [`PrefixContainer::get_keys_from_prefix`]
    fn get_keys_from_prefix(&self, prefix: &str) -> BTreeMap<String, String>;
}

/// Ordered, case-insensitive multi-map shared by the dictionary-backed
/// providers
#[derive(Debug, Clone, Default)]
pub(crate) struct ValueStore {
    entries: Vec<(String, Vec<String>)>,
    index: std::collections::HashMap<String, usize>,
    prefixes: PrefixContainer,
}

impl ValueStore {
    pub(crate) fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut store = Self::default();
        for (key, value) in pairs {
            store.push(key, vec![value]);
        }
        store.prefixes = PrefixContainer::new(store.entries.iter().map(|(k, _)| k));
        store
    }

    pub(crate) fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut store = Self::default();
        for (key, values) in groups {
            store.push(key, values);
        }
        store.prefixes = PrefixContainer::new(store.entries.iter().map(|(k, _)| k));
        store
    }

    fn push(&mut self, key: String, values: Vec<String>) {
        let lower = key.to_lowercase();
        match self.index.get(&lower) {
            Some(&i) => self.entries[i].1.extend(values),
            None => {
                self.index.insert(lower, self.entries.len());
                self.entries.push((key, values));
            }
        }
    }

    pub(crate) fn get(&self, key: &str) -> &[String] {
        self.index
            .get(&key.to_lowercase())
            .map(|&i| self.entries[i].1.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn prefixes(&self) -> &PrefixContainer {
        &self.prefixes
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Implements the value provider traits for a struct with `store`,
/// `culture` and a fixed binding source.
macro_rules! store_value_provider {
    ($provider:ty, $source:expr) => {
        impl $crate::value_provider::ValueProvider for $provider {
            fn binding_source(&self) -> $crate::binding_source::BindingSource {
                $source
            }

            fn contains_prefix(&self, prefix: &str) -> bool {
                self.store.prefixes().contains_prefix(prefix)
            }

            fn get_value(&self, key: &str) -> $crate::value_provider::ValueProviderResult {
                let values = self.store.get(key);
                if values.is_empty() {
                    $crate::value_provider::ValueProviderResult::none()
                } else {
                    $crate::value_provider::ValueProviderResult::new(
                        values.to_vec(),
                        self.culture.clone(),
                    )
                }
            }

            fn as_enumerable(&self) -> Option<&dyn $crate::value_provider::EnumerableValueProvider> {
                Some(self)
            }
        }

        impl $crate::value_provider::EnumerableValueProvider for $provider {
            fn get_keys_from_prefix(&self, prefix: &str) -> std::collections::BTreeMap<String, String> {
                self.store.prefixes().get_keys_from_prefix(prefix)
            }
        }
    };
}

pub(crate) use store_value_provider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_groups_case_insensitively() {
        let store = ValueStore::from_pairs([
            ("Tag".to_string(), "a".to_string()),
            ("tag".to_string(), "b".to_string()),
            ("other".to_string(), "c".to_string()),
        ]);
        assert_eq!(store.get("TAG"), ["a", "b"]);
        assert_eq!(store.len(), 2);
        assert!(store.get("missing").is_empty());
    }

    #[test]
    fn test_result_display_joins_values() {
        let result = ValueProviderResult::new(vec!["1".into(), "2".into()], Culture::invariant());
        assert_eq!(result.to_string(), "1,2");
        assert_eq!(result.first_value(), Some("1"));
        assert!(ValueProviderResult::none().is_empty());
    }
}
