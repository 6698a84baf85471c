// Route values captured by the router

use super::{store_value_provider, ValueStore};
use crate::binding_source::BindingSource;
use crate::culture::Culture;
use std::collections::HashMap;

/// Route values; always formatted with the invariant culture
#[derive(Debug, Clone)]
pub struct RouteValueProvider {
    store: ValueStore,
    culture: Culture,
}

impl RouteValueProvider {
    pub fn new(values: &HashMap<String, String>) -> Self {
        let mut pairs: Vec<(String, String)> =
            values.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        pairs.sort();
        Self {
            store: ValueStore::from_pairs(pairs),
            culture: Culture::invariant(),
        }
    }
}

store_value_provider!(RouteValueProvider, BindingSource::Path);
