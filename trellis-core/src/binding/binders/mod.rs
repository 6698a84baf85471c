//! The built-in binders and the providers that select them.
//!
//! [`default_model_binder_providers`] returns the provider chain in
//! priority order: source-driven providers first, then the shape-driven
//! ones, which match disjoint type shapes.

mod binder_type;
mod body;
mod byte_array;
mod collection;
mod complex;
mod dictionary;
mod form_collection;
mod form_file;
mod header;
mod key_value_pair;
mod services;
mod simple;

pub use binder_type::BinderTypeModelBinderProvider;
pub use body::{BodyModelBinder, BodyModelBinderProvider};
pub use byte_array::{ByteArrayModelBinder, ByteArrayModelBinderProvider};
pub use collection::{ArrayModelBinderProvider, CollectionModelBinder, CollectionModelBinderProvider};
pub use complex::{ComplexObjectModelBinder, ComplexObjectModelBinderProvider};
pub use dictionary::{DictionaryModelBinder, DictionaryModelBinderProvider};
pub use form_collection::{FormCollectionModelBinder, FormCollectionModelBinderProvider};
pub use form_file::{FormFileModelBinder, FormFileModelBinderProvider};
pub use header::{HeaderModelBinder, HeaderModelBinderProvider};
pub use key_value_pair::{KeyValuePairModelBinder, KeyValuePairModelBinderProvider};
pub use services::{ServicesModelBinder, ServicesModelBinderProvider};
pub use simple::{SimpleTypeModelBinder, SimpleTypeModelBinderProvider};

use crate::binding::ModelBinderProvider;
use std::sync::Arc;

/// The built-in provider chain
pub fn default_model_binder_providers() -> Vec<Arc<dyn ModelBinderProvider>> {
    vec![
        Arc::new(BinderTypeModelBinderProvider),
        Arc::new(ServicesModelBinderProvider),
        Arc::new(BodyModelBinderProvider),
        Arc::new(HeaderModelBinderProvider),
        Arc::new(FormFileModelBinderProvider),
        Arc::new(ByteArrayModelBinderProvider),
        Arc::new(SimpleTypeModelBinderProvider),
        Arc::new(FormCollectionModelBinderProvider),
        Arc::new(ArrayModelBinderProvider),
        Arc::new(CollectionModelBinderProvider),
        Arc::new(DictionaryModelBinderProvider),
        Arc::new(KeyValuePairModelBinderProvider),
        Arc::new(ComplexObjectModelBinderProvider),
    ]
}
