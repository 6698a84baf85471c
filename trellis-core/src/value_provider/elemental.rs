// Single-key provider used to bind the elements of simple collections

use super::{ValueProvider, ValueProviderResult};
use crate::binding_source::BindingSource;
use crate::culture::Culture;

/// Exposes `values` under exactly one key
#[derive(Debug, Clone)]
pub struct ElementalValueProvider {
    key: String,
    values: Vec<String>,
    culture: Culture,
}

impl ElementalValueProvider {
    pub fn new(key: impl Into<String>, value: impl Into<String>, culture: Culture) -> Self {
        Self::with_values(key, vec![value.into()], culture)
    }

    pub fn with_values(key: impl Into<String>, values: Vec<String>, culture: Culture) -> Self {
        Self {
            key: key.into(),
            values,
            culture,
        }
    }
}

impl ValueProvider for ElementalValueProvider {
    fn binding_source(&self) -> BindingSource {
        BindingSource::ModelBinding
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        if prefix.is_empty() || self.key.eq_ignore_ascii_case(prefix) {
            return true;
        }
        self.key.len() > prefix.len()
            && self.key.is_char_boundary(prefix.len())
            && self.key[..prefix.len()].eq_ignore_ascii_case(prefix)
            && matches!(self.key.as_bytes()[prefix.len()], b'.' | b'[')
    }

    fn get_value(&self, key: &str) -> ValueProviderResult {
        if key.eq_ignore_ascii_case(&self.key) {
            ValueProviderResult::new(self.values.clone(), self.culture.clone())
        } else {
            ValueProviderResult::none()
        }
    }
}
