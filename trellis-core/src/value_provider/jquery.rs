// Bracket-style keys as posted by jQuery's `$.param`

use super::{store_value_provider, ValueStore};
use crate::binding_source::BindingSource;
use crate::culture::Culture;
use crate::form::FormCollection;
use crate::Error;

/// Rewrite a bracket-style key into dotted form.
///
/// `a[b][c]` becomes `a.b.c`, `a[]` becomes `a`, and numeric indices stay
/// bracketed (`a[0][b]` becomes `a[0].b`). A bracket that is never closed
/// is an error.
pub fn normalize_jquery_key(key: &str) -> Result<String, Error> {
    let Some(mut open) = key.find('[') else {
        return Ok(key.to_string());
    };

    let mut out = String::with_capacity(key.len());
    let mut position = 0;
    loop {
        out.push_str(&key[position..open]);
        let close = key[open..].find(']').map(|i| i + open).ok_or_else(|| {
            Error::ValueProvider(format!("The key '{}' is invalid JQuery syntax because it is missing a closing bracket.", key))
        })?;

        let inner = &key[open + 1..close];
        if inner.is_empty() {
            // `[]` marks an array and is dropped
        } else if inner.starts_with(|c: char| c.is_ascii_digit()) {
            out.push_str(&key[open..=close]);
        } else {
            out.push('.');
            out.push_str(inner);
        }

        position = close + 1;
        match key[position..].find('[') {
            Some(i) => open = i + position,
            None => {
                out.push_str(&key[position..]);
                return Ok(out);
            }
        }
    }
}

fn normalize_pairs<I>(pairs: I) -> Result<Vec<(String, Vec<String>)>, Error>
where
    I: IntoIterator<Item = (String, Vec<String>)>,
{
    pairs
        .into_iter()
        .map(|(key, values)| Ok((normalize_jquery_key(&key)?, values)))
        .collect()
}

/// Query string with jQuery-style keys; invariant culture
#[derive(Debug, Clone)]
pub struct JQueryQueryStringValueProvider {
    store: ValueStore,
    culture: Culture,
}

impl JQueryQueryStringValueProvider {
    pub fn new(pairs: Vec<(String, String)>) -> Result<Self, Error> {
        let groups = normalize_pairs(pairs.into_iter().map(|(k, v)| (k, vec![v])))?;
        Ok(Self {
            store: ValueStore::from_groups(groups),
            culture: Culture::invariant(),
        })
    }
}

store_value_provider!(JQueryQueryStringValueProvider, BindingSource::Query);

/// Form fields with jQuery-style keys; request culture
#[derive(Debug, Clone)]
pub struct JQueryFormValueProvider {
    store: ValueStore,
    culture: Culture,
}

impl JQueryFormValueProvider {
    pub fn new(form: &FormCollection, culture: Culture) -> Result<Self, Error> {
        let groups = normalize_pairs(form.fields.iter().cloned())?;
        Ok(Self {
            store: ValueStore::from_groups(groups),
            culture,
        })
    }
}

store_value_provider!(JQueryFormValueProvider, BindingSource::Form);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_provider::ValueProvider;

    #[test]
    fn test_normalize_keys() {
        assert_eq!(normalize_jquery_key("plain").unwrap(), "plain");
        assert_eq!(normalize_jquery_key("a[b][c]").unwrap(), "a.b.c");
        assert_eq!(normalize_jquery_key("a[]").unwrap(), "a");
        assert_eq!(normalize_jquery_key("a[0][b]").unwrap(), "a[0].b");
        assert_eq!(normalize_jquery_key("a[b]c").unwrap(), "a.bc");
    }

    #[test]
    fn test_unclosed_bracket_is_error() {
        assert!(matches!(normalize_jquery_key("a[b"), Err(Error::ValueProvider(_))));
    }

    #[test]
    fn test_array_values_merge() {
        let provider = JQueryQueryStringValueProvider::new(vec![
            ("ids[]".into(), "1".into()),
            ("ids[]".into(), "2".into()),
            ("filter[name]".into(), "x".into()),
        ])
        .unwrap();

        assert_eq!(provider.get_value("ids").values(), ["1", "2"]);
        assert_eq!(provider.get_value("filter.name").first_value(), Some("x"));
        assert!(provider.contains_prefix("filter"));
    }
}
