// Form field values

use super::{store_value_provider, ValueStore};
use crate::binding_source::BindingSource;
use crate::culture::Culture;
use crate::form::FormCollection;

/// Form fields, formatted in the request culture
#[derive(Debug, Clone)]
pub struct FormValueProvider {
    store: ValueStore,
    culture: Culture,
}

impl FormValueProvider {
    pub fn new(form: &FormCollection, culture: Culture) -> Self {
        Self {
            store: ValueStore::from_groups(form.fields.iter().cloned()),
            culture,
        }
    }
}

store_value_provider!(FormValueProvider, BindingSource::Form);
