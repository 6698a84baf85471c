// Case-insensitive prefix lookups over a fixed key set

use std::collections::{BTreeMap, HashSet};

/// Sorted key set answering "is there data under this prefix" with binary
/// searches.
///
/// A key is under `prefix` when it equals the prefix or continues it with
/// `.` or `[`: `customer` contains `customer.name` and `customer[0]` but
/// not `customers`.
#[derive(Debug, Clone, Default)]
pub struct PrefixContainer {
    /// (lowercased, original), sorted by the lowercased form
    keys: Vec<(String, String)>,
}

impl PrefixContainer {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys: Vec<(String, String)> = keys
            .into_iter()
            .map(|k| (k.as_ref().to_lowercase(), k.as_ref().to_string()))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        keys.dedup_by(|a, b| a.0 == b.0);
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return !self.keys.is_empty();
        }
        let prefix = prefix.to_lowercase();
        if self.keys.binary_search_by(|(k, _)| k.as_str().cmp(&prefix)).is_ok() {
            return true;
        }
        self.has_key_starting_with(&format!("{}.", prefix))
            || self.has_key_starting_with(&format!("{}[", prefix))
    }

    fn has_key_starting_with(&self, start: &str) -> bool {
        let index = self.keys.partition_point(|(k, _)| k.as_str() < start);
        self.keys
            .get(index)
            .is_some_and(|(k, _)| k.starts_with(start))
    }

    /// Child keys directly under `prefix`, as short key -> full key.
    ///
    /// `prefix.name...` yields `name -> prefix.name`, `prefix[key]...`
    /// yields `key -> prefix[key]`. With an empty prefix the first segment
    /// of every key is returned (`[index]` segments yield the index).
    pub fn get_keys_from_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        let mut results = BTreeMap::new();
        let mut seen = HashSet::new();
        let prefix_lower = prefix.to_lowercase();

        let start = self
            .keys
            .partition_point(|(k, _)| k.as_str() < prefix_lower.as_str());
        for (lower, entry) in &self.keys[start..] {
            if !lower.starts_with(&prefix_lower) {
                break;
            }
            if entry.len() == prefix.len() {
                continue;
            }
            let harvested = if prefix.is_empty() {
                key_from_empty_prefix(entry)
            } else {
                key_from_prefix(prefix.len(), entry)
            };
            if let Some((key, full)) = harvested {
                if seen.insert(key.to_lowercase()) {
                    results.insert(key, full);
                }
            }
        }
        results
    }
}

fn key_from_empty_prefix(entry: &str) -> Option<(String, String)> {
    if entry.starts_with('[') {
        return key_from_prefix(0, entry);
    }
    let end = entry.find(['.', '[']).unwrap_or(entry.len());
    let key = &entry[..end];
    Some((key.to_string(), key.to_string()))
}

fn key_from_prefix(prefix_len: usize, entry: &str) -> Option<(String, String)> {
    let key_start = prefix_len + 1;
    match entry.as_bytes().get(prefix_len)? {
        b'.' => {
            let end = entry[key_start..]
                .find(['.', '['])
                .map(|i| i + key_start)
                .unwrap_or(entry.len());
            Some((entry[key_start..end].to_string(), entry[..end].to_string()))
        }
        b'[' => {
            // Malformed entries without a closing bracket are ignored
            let close = entry[key_start..].find(']')? + key_start;
            Some((entry[key_start..close].to_string(), entry[..=close].to_string()))
        }
        _ => None,
    }
}
