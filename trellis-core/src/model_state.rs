//! Per-request record of attempted values and binding errors.

use crate::value_provider::ValueProviderResult;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Message recorded once the error limit is reached
pub const TOO_MANY_ERRORS_MESSAGE: &str =
    "The maximum number of allowed model errors has been reached.";

/// Default for `max_allowed_errors`
pub const DEFAULT_MAX_ALLOWED_ERRORS: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ModelValidationState {
    #[default]
    Unvalidated,
    Invalid,
    Valid,
    Skipped,
}

/// Category of a model error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelErrorKind {
    /// Conversion or binding failure
    Binding,
    /// No input formatter could read the request content type (415)
    UnsupportedContentType,
    /// A formatter or value could not be deserialized
    Format,
    /// The error limit was reached
    TooManyErrors,
}

/// One error recorded against a model state key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelError {
    pub message: String,
    pub kind: ModelErrorKind,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(message, ModelErrorKind::Binding)
    }

    pub fn with_kind(message: impl Into<String>, kind: ModelErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn is_unsupported_content_type(&self) -> bool {
        self.kind == ModelErrorKind::UnsupportedContentType
    }
}

/// State recorded for one key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelStateEntry {
    pub raw_value: Vec<String>,
    pub attempted_value: Option<String>,
    pub errors: Vec<ModelError>,
    pub validation_state: ModelValidationState,
}

/// Insertion-ordered, case-insensitive map from model name to entry.
///
/// Exactly one dictionary exists per request; binders reach it through the
/// binding context.
#[derive(Debug, Clone)]
pub struct ModelStateDictionary {
    entries: Vec<(String, ModelStateEntry)>,
    index: HashMap<String, usize>,
    max_allowed_errors: usize,
    error_count: usize,
    has_reached_max_errors: bool,
}

impl ModelStateDictionary {
    pub fn new() -> Self {
        Self::with_max_allowed_errors(DEFAULT_MAX_ALLOWED_ERRORS)
    }

    pub fn with_max_allowed_errors(max_allowed_errors: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            max_allowed_errors: max_allowed_errors.max(1),
            error_count: 0,
            has_reached_max_errors: false,
        }
    }

    pub fn max_allowed_errors(&self) -> usize {
        self.max_allowed_errors
    }

    /// Errors recorded, not counting the limit marker
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_reached_max_errors(&self) -> bool {
        self.has_reached_max_errors
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelStateEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn get(&self, key: &str) -> Option<&ModelStateEntry> {
        self.index
            .get(&key.to_lowercase())
            .map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(&key.to_lowercase())
    }

    /// Errors at exactly `key`
    pub fn errors(&self, key: &str) -> &[ModelError] {
        self.get(key).map(|e| e.errors.as_slice()).unwrap_or(&[])
    }

    fn entry_mut(&mut self, key: &str) -> &mut ModelStateEntry {
        let lower = key.to_lowercase();
        let i = match self.index.get(&lower) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.entries.push((key.to_string(), ModelStateEntry::default()));
                self.index.insert(lower, i);
                i
            }
        };
        &mut self.entries[i].1
    }

    /// Record an error; returns `false` when the error limit dropped it
    pub fn add_model_error(&mut self, key: &str, message: impl Into<String>) -> bool {
        self.try_add_error(key, ModelError::new(message))
    }

    /// Record an error of a specific kind; returns `false` when dropped
    pub fn try_add_error(&mut self, key: &str, error: ModelError) -> bool {
        if self.error_count + 1 >= self.max_allowed_errors {
            self.ensure_max_errors_recorded();
            return false;
        }
        self.error_count += 1;
        self.add_error_core(key, error);
        true
    }

    fn ensure_max_errors_recorded(&mut self) {
        if !self.has_reached_max_errors {
            self.add_error_core(
                "",
                ModelError::with_kind(TOO_MANY_ERRORS_MESSAGE, ModelErrorKind::TooManyErrors),
            );
            self.has_reached_max_errors = true;
        }
    }

    fn add_error_core(&mut self, key: &str, error: ModelError) {
        let entry = self.entry_mut(key);
        entry.errors.push(error);
        entry.validation_state = ModelValidationState::Invalid;
    }

    /// Record the raw values a binder attempted for `key`
    pub fn set_model_value(&mut self, key: &str, result: &ValueProviderResult) {
        let entry = self.entry_mut(key);
        entry.raw_value = result.values().to_vec();
        entry.attempted_value = Some(result.to_string());
    }

    pub fn set_raw_value(&mut self, key: &str, raw_value: Vec<String>, attempted: Option<String>) {
        let entry = self.entry_mut(key);
        entry.raw_value = raw_value;
        entry.attempted_value = attempted;
    }

    /// Mark a field valid unless it already has errors
    pub fn mark_field_valid(&mut self, key: &str) {
        let entry = self.entry_mut(key);
        if entry.validation_state != ModelValidationState::Invalid {
            entry.validation_state = ModelValidationState::Valid;
        }
    }

    /// Mark a field as deliberately not validated
    pub fn mark_field_skipped(&mut self, key: &str) {
        let entry = self.entry_mut(key);
        if entry.validation_state != ModelValidationState::Invalid {
            entry.validation_state = ModelValidationState::Skipped;
        }
    }

    /// Derived validity of `prefix` and everything below it.
    ///
    /// Invalid dominates, then Unvalidated, then Valid; a subtree of only
    /// skipped entries is Skipped and an empty subtree is Unvalidated.
    pub fn validation_state_of(&self, prefix: &str) -> ModelValidationState {
        let mut any = false;
        let mut any_unvalidated = false;
        let mut any_valid = false;
        for (key, entry) in &self.entries {
            if !is_under_prefix(key, prefix) {
                continue;
            }
            any = true;
            match entry.validation_state {
                ModelValidationState::Invalid => return ModelValidationState::Invalid,
                ModelValidationState::Unvalidated => any_unvalidated = true,
                ModelValidationState::Valid => any_valid = true,
                ModelValidationState::Skipped => {}
            }
        }
        if !any || any_unvalidated {
            ModelValidationState::Unvalidated
        } else if any_valid {
            ModelValidationState::Valid
        } else {
            ModelValidationState::Skipped
        }
    }

    /// Tri-state validity of the whole dictionary
    pub fn validation_state(&self) -> ModelValidationState {
        if self.entries.is_empty() {
            return ModelValidationState::Valid;
        }
        self.validation_state_of("")
    }

    /// True when no entry is invalid
    pub fn is_valid(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|(_, e)| e.validation_state == ModelValidationState::Invalid)
    }

    /// True when some error at any key reports an unsupported content type
    pub fn has_unsupported_content_type(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, e)| e.errors.iter().any(ModelError::is_unsupported_content_type))
    }

    /// Remove `key` and everything below it
    pub fn remove_prefix(&mut self, prefix: &str) {
        self.entries.retain(|(k, _)| !is_under_prefix(k, prefix));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.to_lowercase(), i))
            .collect();
    }

    /// RFC 7807 problem details listing every error by key
    pub fn to_problem_details(&self) -> Value {
        let mut errors = Map::new();
        for (key, entry) in &self.entries {
            if entry.errors.is_empty() {
                continue;
            }
            let messages: Vec<Value> = entry
                .errors
                .iter()
                .map(|e| Value::String(e.message.clone()))
                .collect();
            errors.insert(key.clone(), Value::Array(messages));
        }
        json!({
            "type": "https://tools.ietf.org/html/rfc9110#section-15.5.1",
            "title": "One or more validation errors occurred.",
            "status": 400,
            "errors": errors,
        })
    }
}

impl Default for ModelStateDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// `key` equals `prefix` or continues it with `.` or `[`
fn is_under_prefix(key: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    if key.len() < prefix.len() || !key.is_char_boundary(prefix.len()) {
        return false;
    }
    if !key[..prefix.len()].eq_ignore_ascii_case(prefix) {
        return false;
    }
    key.len() == prefix.len() || matches!(key.as_bytes()[prefix.len()], b'.' | b'[')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culture::Culture;

    #[test]
    fn test_case_insensitive_insertion_order() {
        let mut state = ModelStateDictionary::new();
        state.add_model_error("Order.Id", "bad id");
        state.set_model_value("order.Name", &ValueProviderResult::single("x", Culture::invariant()));
        state.add_model_error("ORDER.ID", "still bad");

        let keys: Vec<_> = state.keys().collect();
        assert_eq!(keys, ["Order.Id", "order.Name"]);
        assert_eq!(state.errors("order.id").len(), 2);
        assert_eq!(state.get("ORDER.NAME").unwrap().attempted_value.as_deref(), Some("x"));
    }

    #[test]
    fn test_validity_is_derived_from_subtree() {
        let mut state = ModelStateDictionary::new();
        state.mark_field_valid("order.Id");
        state.mark_field_valid("order.Lines[0].Qty");
        assert_eq!(state.validation_state_of("order"), ModelValidationState::Valid);

        state.add_model_error("order.Lines[1].Qty", "bad");
        assert_eq!(state.validation_state_of("order"), ModelValidationState::Invalid);
        assert_eq!(state.validation_state_of("order.Lines[0]"), ModelValidationState::Valid);
        assert_eq!(state.validation_state_of("orders"), ModelValidationState::Unvalidated);
        assert!(!state.is_valid());
    }

    #[test]
    fn test_unvalidated_entries_are_valid_for_is_valid() {
        let mut state = ModelStateDictionary::new();
        state.set_model_value("a", &ValueProviderResult::single("1", Culture::invariant()));
        assert!(state.is_valid());
        assert_eq!(state.validation_state(), ModelValidationState::Unvalidated);
        assert_eq!(ModelStateDictionary::new().validation_state(), ModelValidationState::Valid);
    }

    #[test]
    fn test_skipped_subtree() {
        let mut state = ModelStateDictionary::new();
        state.mark_field_skipped("file");
        assert_eq!(state.validation_state_of("file"), ModelValidationState::Skipped);
    }

    #[test]
    fn test_error_limit() {
        let mut state = ModelStateDictionary::with_max_allowed_errors(3);
        assert!(state.add_model_error("a", "1"));
        assert!(state.add_model_error("b", "2"));
        assert!(!state.add_model_error("c", "3"));
        assert!(!state.add_model_error("d", "4"));

        assert!(state.has_reached_max_errors());
        assert_eq!(state.error_count(), 2);
        assert_eq!(state.errors("")[0].kind, ModelErrorKind::TooManyErrors);
        assert_eq!(state.errors("").len(), 1);
        assert!(!state.contains_key("c"));
    }

    #[test]
    fn test_problem_details() {
        let mut state = ModelStateDictionary::new();
        state.add_model_error("age", "The value 'x' is not valid for age.");
        state.mark_field_valid("name");

        let details = state.to_problem_details();
        assert_eq!(details["status"], 400);
        assert_eq!(details["errors"]["age"][0], "The value 'x' is not valid for age.");
        assert!(details["errors"].get("name").is_none());
    }

    #[test]
    fn test_remove_prefix() {
        let mut state = ModelStateDictionary::new();
        state.add_model_error("items[0]", "bad");
        state.add_model_error("items[1].Name", "bad");
        state.add_model_error("other", "bad");
        state.remove_prefix("items");
        assert_eq!(state.keys().collect::<Vec<_>>(), ["other"]);
        assert!(state.contains_key("OTHER"));
    }
}
