// JSON request bodies

use super::input::{InputFormatter, InputFormatterContext, InputFormatterResult};
use crate::binding::{create_index_model_name, create_property_model_name};
use crate::conversion::{convert_scalar, convert_to};
use crate::culture::Culture;
use crate::logging::debug;
use crate::media_type::MediaType;
use crate::model_state::{ModelError, ModelErrorKind, ModelStateDictionary};
use crate::model_type::{ModelType, ScalarKind, TypeShape};
use crate::Result;
use async_trait::async_trait;
use base64::Engine;
use serde_json::{Map, Number, Value};

/// Reads `application/json`, `text/json` and `application/*+json`.
///
/// The parsed document is checked against the target [`ModelType`]: every
/// value that does not fit its declared type is recorded at its model path
/// and the read fails. Property names match case-insensitively and unknown
/// members are ignored.
#[derive(Debug, Clone)]
pub struct JsonInputFormatter {
    media_types: Vec<MediaType>,
}

impl JsonInputFormatter {
    pub fn new() -> Self {
        Self {
            media_types: vec![
                MediaType::json(),
                MediaType::text_json(),
                MediaType::new("application", "*+json"),
            ],
        }
    }
}

impl Default for JsonInputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputFormatter for JsonInputFormatter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    async fn read_request_body(
        &self,
        context: &mut InputFormatterContext<'_>,
    ) -> Result<InputFormatterResult> {
        let key = context.model_name.to_string();
        let document = match serde_json::from_slice::<Value>(&context.request.body) {
            Ok(document) => document,
            Err(err) => {
                debug!(model_name = %key, error = %err, "Invalid JSON body");
                context.model_state.try_add_error(
                    &key,
                    ModelError::with_kind(
                        format!("The JSON value could not be parsed: {}", err),
                        ModelErrorKind::Format,
                    ),
                );
                return Ok(InputFormatterResult::Failure);
            }
        };

        let model_type = context.metadata.model_type().clone();
        let mut check = TypeCheck {
            culture: Culture::invariant(),
            model_state: &mut *context.model_state,
            failed: false,
        };
        let value = check.coerce(document, &model_type, &key, 0);
        if check.failed {
            debug!(model_name = %key, model_type = model_type.name(), "JSON body does not fit model type");
            return Ok(InputFormatterResult::Failure);
        }
        Ok(InputFormatterResult::Success(value))
    }
}

const MAX_DEPTH: usize = 64;

/// Walks a JSON document alongside its target type
struct TypeCheck<'s> {
    culture: Culture,
    model_state: &'s mut ModelStateDictionary,
    failed: bool,
}

impl TypeCheck<'_> {
    fn error(&mut self, key: &str, message: String) {
        self.failed = true;
        self.model_state
            .try_add_error(key, ModelError::with_kind(message, ModelErrorKind::Format));
    }

    fn mismatch(&mut self, key: &str, model_type: &ModelType) -> Value {
        self.error(
            key,
            format!("The JSON value could not be converted to {}.", model_type.short_name()),
        );
        model_type.default_value()
    }

    fn coerce(&mut self, value: Value, model_type: &ModelType, key: &str, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            self.error(key, "The JSON document is nested too deeply.".to_string());
            return Value::Null;
        }
        if value.is_null() {
            return if model_type.accepts_null() {
                Value::Null
            } else {
                self.mismatch(key, model_type)
            };
        }

        match model_type.shape() {
            TypeShape::Nullable(inner) => self.coerce(value, &inner(), key, depth),
            TypeShape::Scalar(kind) => self.scalar(*kind, value, model_type, key),
            TypeShape::Array(item) | TypeShape::Collection(item) => {
                let Value::Array(items) = value else {
                    return self.mismatch(key, model_type);
                };
                let item_type = item();
                Value::Array(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let item_key = create_index_model_name(key, &i.to_string());
                            self.coerce(item, &item_type, &item_key, depth + 1)
                        })
                        .collect(),
                )
            }
            TypeShape::Dictionary { key: key_type, value: value_type, .. } => {
                let Value::Object(entries) = value else {
                    return self.mismatch(key, model_type);
                };
                let (key_type, value_type) = (key_type(), value_type());
                let mut map = Map::new();
                for (entry_key, entry_value) in entries {
                    let entry_path = create_index_model_name(key, &entry_key);
                    if let Err(err) = convert_to(&key_type, &entry_key, &self.culture) {
                        self.error(&entry_path, format!("The value '{}' is not valid.", err.value));
                        continue;
                    }
                    let entry_value = self.coerce(entry_value, &value_type, &entry_path, depth + 1);
                    map.insert(entry_key, entry_value);
                }
                Value::Object(map)
            }
            TypeShape::KeyValuePair { key: key_type, value: value_type } => {
                let Value::Object(mut members) = value else {
                    return self.mismatch(key, model_type);
                };
                let mut map = Map::new();
                for (name, part_type) in [("Key", key_type()), ("Value", value_type())] {
                    let part_key = create_property_model_name(key, name);
                    let part = match take_member(&mut members, name) {
                        Some(part) => self.coerce(part, &part_type, &part_key, depth + 1),
                        None => part_type.default_value(),
                    };
                    map.insert(name.to_string(), part);
                }
                Value::Object(map)
            }
            TypeShape::Complex(complex) => {
                let Value::Object(mut members) = value else {
                    return self.mismatch(key, model_type);
                };
                let mut map = Map::new();
                for property in &complex.properties {
                    let property_type = property.model_type();
                    let property_key = create_property_model_name(key, &property.name);
                    let value = match take_member(&mut members, &property.name) {
                        Some(member) => self.coerce(member, &property_type, &property_key, depth + 1),
                        None => property_type.default_value(),
                    };
                    map.insert(property.name.clone(), value);
                }
                Value::Object(map)
            }
            TypeShape::Bytes => match value {
                Value::String(text) => match base64::engine::general_purpose::STANDARD.decode(text.trim()) {
                    Ok(bytes) => Value::Array(bytes.into_iter().map(Value::from).collect()),
                    Err(_) => {
                        self.error(key, format!("The value '{}' is not valid.", text));
                        Value::Array(Vec::new())
                    }
                },
                Value::Array(items) if items.iter().all(|b| b.as_u64().is_some_and(|b| b <= 255)) => {
                    Value::Array(items)
                }
                _ => self.mismatch(key, model_type),
            },
            TypeShape::FormFile
            | TypeShape::FormFileCollection
            | TypeShape::FormCollection
            | TypeShape::Opaque => {
                self.error(
                    key,
                    format!("Type '{}' cannot be read from JSON.", model_type.short_name()),
                );
                Value::Null
            }
        }
    }

    /// Numbers stay numbers and strings stay strings; the text form is
    /// then validated against the scalar's range and format
    fn scalar(&mut self, kind: ScalarKind, value: Value, model_type: &ModelType, key: &str) -> Value {
        let converted = match (&value, kind) {
            (Value::Bool(_), ScalarKind::Bool) | (Value::String(_), ScalarKind::String) => {
                Some(value.clone())
            }
            (Value::Number(n), kind) if kind.is_floating_point() => float(n, kind),
            (Value::Number(n), kind) if kind.is_integer() => {
                if n.is_f64() {
                    None
                } else {
                    convert_scalar(kind, &n.to_string(), &self.culture).ok()
                }
            }
            (
                Value::String(text),
                ScalarKind::Char
                | ScalarKind::Uuid
                | ScalarKind::DateTime
                | ScalarKind::Date
                | ScalarKind::Enum(_),
            ) => convert_scalar(kind, text, &self.culture).ok(),
            _ => None,
        };
        match converted {
            Some(converted) => converted,
            None => self.mismatch(key, model_type),
        }
    }
}

fn float(n: &Number, kind: ScalarKind) -> Option<Value> {
    let value = n.as_f64()?;
    if kind == ScalarKind::F32 && !(value as f32).is_finite() {
        return None;
    }
    Some(Value::from(value))
}

/// Remove a member by name, preferring an exact match
fn take_member(members: &mut Map<String, Value>, name: &str) -> Option<Value> {
    if let Some(value) = members.remove(name) {
        return Some(value);
    }
    let found = members.keys().find(|k| k.eq_ignore_ascii_case(name))?.clone();
    members.remove(&found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpRequest;
    use crate::metadata::MetadataProvider;
    use crate::model_type::Bindable;
    use serde_json::json;
    use std::collections::HashMap;

    struct Shipment;

    impl Bindable for Shipment {
        fn model_type() -> ModelType {
            ModelType::complex::<Self>()
                .property::<String>("Name")
                .property::<u32>("Zip")
                .property::<Option<f64>>("Weight")
                .property::<Vec<i32>>("Lines")
                .property::<HashMap<String, u8>>("Flags")
                .build()
        }
    }

    async fn read<T: Bindable>(body: &str, model_name: &str) -> (InputFormatterResult, ModelStateDictionary) {
        let request = HttpRequest::post("/").with_json_body(body.to_string());
        let metadata = MetadataProvider::new().metadata_for::<T>();
        let mut state = ModelStateDictionary::new();
        let mut ctx = InputFormatterContext {
            request: &request,
            model_name,
            metadata: &metadata,
            model_state: &mut state,
            treat_empty_input_as_default_value: false,
        };
        let formatter = JsonInputFormatter::new();
        assert!(formatter.can_read(&ctx));
        let result = formatter.read(&mut ctx).await.unwrap();
        (result, state)
    }

    #[tokio::test]
    async fn test_reads_json() {
        let (result, state) = read::<Shipment>(
            r#"{"name":"x","Zip":12345,"Lines":[1,2],"Flags":{"a":1},"Extra":true}"#,
            "",
        )
        .await;
        assert!(state.is_valid());
        assert_eq!(
            result,
            InputFormatterResult::Success(json!({
                "Name": "x",
                "Zip": 12345,
                "Weight": null,
                "Lines": [1, 2],
                "Flags": {"a": 1}
            }))
        );
    }

    #[tokio::test]
    async fn test_mismatched_members_recorded_at_paths() {
        let (result, state) = read::<Shipment>(
            r#"{"Name":"x","Zip":"notanumber","Lines":[1,"two",3],"Flags":{"a":300}}"#,
            "",
        )
        .await;
        assert_eq!(result, InputFormatterResult::Failure);
        assert_eq!(state.errors("Zip").len(), 1);
        assert_eq!(state.errors("Lines[1]").len(), 1);
        assert_eq!(state.errors("Flags[a]").len(), 1);
        assert!(state.errors("Lines[0]").is_empty());
        assert_eq!(
            state.errors("Zip")[0].message,
            "The JSON value could not be converted to u32."
        );
    }

    #[tokio::test]
    async fn test_top_level_scalar_mismatch() {
        let (result, state) = read::<i32>(r#""hello""#, "").await;
        assert_eq!(result, InputFormatterResult::Failure);
        assert_eq!(state.errors("").len(), 1);

        let (result, state) = read::<i32>(r#"{"value":1}"#, "count").await;
        assert_eq!(result, InputFormatterResult::Failure);
        assert_eq!(state.errors("count").len(), 1);

        let (result, _) = read::<i32>("1.5", "").await;
        assert_eq!(result, InputFormatterResult::Failure);

        let (result, state) = read::<i32>("42", "").await;
        assert!(state.is_valid());
        assert_eq!(result, InputFormatterResult::Success(json!(42)));
    }

    #[tokio::test]
    async fn test_null_only_for_optional_targets() {
        let (result, _) = read::<Option<i32>>("null", "").await;
        assert_eq!(result, InputFormatterResult::Success(Value::Null));

        let (result, state) = read::<Shipment>(r#"{"Name":null}"#, "shipment").await;
        assert_eq!(result, InputFormatterResult::Failure);
        assert_eq!(state.errors("shipment.Name").len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_records_error() {
        let request = HttpRequest::post("/").with_json_body("{oops");
        let metadata = MetadataProvider::new().metadata_for::<String>();
        let mut state = ModelStateDictionary::new();
        let mut ctx = InputFormatterContext {
            request: &request,
            model_name: "order",
            metadata: &metadata,
            model_state: &mut state,
            treat_empty_input_as_default_value: false,
        };
        let result = JsonInputFormatter::new().read(&mut ctx).await.unwrap();
        assert_eq!(result, InputFormatterResult::Failure);
        assert_eq!(state.errors("order").len(), 1);
    }

    #[tokio::test]
    async fn test_empty_body() {
        let request = HttpRequest::post("/").with_json_body("");
        let metadata = MetadataProvider::new().metadata_for::<Option<i32>>();
        let mut state = ModelStateDictionary::new();
        let mut ctx = InputFormatterContext {
            request: &request,
            model_name: "",
            metadata: &metadata,
            model_state: &mut state,
            treat_empty_input_as_default_value: true,
        };
        let formatter = JsonInputFormatter::new();
        assert_eq!(
            formatter.read(&mut ctx).await.unwrap(),
            InputFormatterResult::Success(Value::Null)
        );
        ctx.treat_empty_input_as_default_value = false;
        assert_eq!(formatter.read(&mut ctx).await.unwrap(), InputFormatterResult::NoValue);
    }

    #[test]
    fn test_can_read_suffix_types() {
        let request = HttpRequest::post("/").with_header("content-type", "application/merge-patch+json");
        let metadata = MetadataProvider::new().metadata_for::<String>();
        let mut state = ModelStateDictionary::new();
        let ctx = InputFormatterContext {
            request: &request,
            model_name: "",
            metadata: &metadata,
            model_state: &mut state,
            treat_empty_input_as_default_value: false,
        };
        assert!(JsonInputFormatter::new().can_read(&ctx));
    }
}
