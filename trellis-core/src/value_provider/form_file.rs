// Presence of uploaded files

use super::{PrefixContainer, ValueProvider, ValueProviderResult};
use crate::binding_source::BindingSource;
use crate::form::FormCollection;

/// Answers prefix queries over the field names of uploaded files.
///
/// Never returns values; file content is read by the form file binder.
#[derive(Debug, Clone)]
pub struct FormFileValueProvider {
    prefixes: PrefixContainer,
}

impl FormFileValueProvider {
    pub fn new(form: &FormCollection) -> Self {
        let names = form
            .files
            .iter()
            .filter(|f| !f.is_empty_input())
            .map(|f| f.name.as_str());
        Self {
            prefixes: PrefixContainer::new(names),
        }
    }
}

impl ValueProvider for FormFileValueProvider {
    fn binding_source(&self) -> BindingSource {
        BindingSource::FormFile
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains_prefix(prefix)
    }

    fn get_value(&self, _key: &str) -> ValueProviderResult {
        ValueProviderResult::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormFile;

    #[test]
    fn test_file_prefixes() {
        let form = FormCollection::new()
            .with_file(FormFile::new("docs[0]", "a.txt", "text/plain", b"a".to_vec()))
            .with_file(FormFile::new("empty", "", "application/octet-stream", vec![]));
        let provider = FormFileValueProvider::new(&form);

        assert!(provider.contains_prefix("docs"));
        assert!(!provider.contains_prefix("empty"));
        assert!(provider.get_value("docs[0]").is_empty());
    }
}
