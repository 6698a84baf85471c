// Query string values

use super::{store_value_provider, ValueStore};
use crate::binding_source::BindingSource;
use crate::culture::Culture;

/// Decoded query string pairs; always formatted with the invariant culture
#[derive(Debug, Clone)]
pub struct QueryStringValueProvider {
    store: ValueStore,
    culture: Culture,
}

impl QueryStringValueProvider {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self {
            store: ValueStore::from_pairs(pairs),
            culture: Culture::invariant(),
        }
    }
}

store_value_provider!(QueryStringValueProvider, BindingSource::Query);
