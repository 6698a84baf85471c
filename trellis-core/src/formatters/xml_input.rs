// XML request bodies

use super::input::{InputFormatter, InputFormatterContext, InputFormatterResult};
use super::xml::{parse_document, XmlElement};
use crate::binding::{create_index_model_name, create_property_model_name};
use crate::conversion::convert_to;
use crate::culture::Culture;
use crate::logging::debug;
use crate::media_type::MediaType;
use crate::model_state::{ModelError, ModelErrorKind, ModelStateDictionary};
use crate::model_type::{ModelType, TypeShape};
use crate::Result;
use async_trait::async_trait;
use base64::Engine;
use serde_json::{Map, Value};

/// Reads `application/xml`, `text/xml` and `application/*+xml`.
///
/// XML carries no types, so every leaf arrives as text and is converted
/// with the invariant culture according to the target's [`ModelType`].
/// Conversion failures are recorded per path and the default is used.
#[derive(Debug, Clone)]
pub struct XmlInputFormatter {
    media_types: Vec<MediaType>,
}

impl XmlInputFormatter {
    pub fn new() -> Self {
        Self {
            media_types: vec![
                MediaType::xml(),
                MediaType::text_xml(),
                MediaType::new("application", "*+xml"),
            ],
        }
    }
}

impl Default for XmlInputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputFormatter for XmlInputFormatter {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    async fn read_request_body(
        &self,
        context: &mut InputFormatterContext<'_>,
    ) -> Result<InputFormatterResult> {
        let key = context.model_name.to_string();
        let root = match parse_document(&context.request.body) {
            Ok(root) => root,
            Err(err) => {
                debug!(model_name = %key, error = %err, "Invalid XML body");
                context.model_state.try_add_error(
                    &key,
                    ModelError::with_kind(
                        format!("The XML document could not be parsed: {}", err),
                        ModelErrorKind::Format,
                    ),
                );
                return Ok(InputFormatterResult::Failure);
            }
        };

        let model_type = context.metadata.model_type().clone();
        let mut coercion = Coercion {
            culture: Culture::invariant(),
            model_state: &mut *context.model_state,
            failed: false,
        };
        let value = coercion.coerce(&root, &model_type, &key, 0);
        if coercion.failed {
            return Ok(InputFormatterResult::Failure);
        }
        Ok(InputFormatterResult::Success(value))
    }
}

const MAX_DEPTH: usize = 64;

struct Coercion<'s> {
    culture: Culture,
    model_state: &'s mut ModelStateDictionary,
    failed: bool,
}

impl Coercion<'_> {
    fn error(&mut self, key: &str, message: String) {
        self.failed = true;
        self.model_state
            .try_add_error(key, ModelError::with_kind(message, ModelErrorKind::Format));
    }

    fn coerce(&mut self, element: &XmlElement, model_type: &ModelType, key: &str, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            self.error(key, "The XML document is nested too deeply.".to_string());
            return Value::Null;
        }

        match model_type.shape() {
            TypeShape::Nullable(inner) => {
                if element.is_empty() {
                    Value::Null
                } else {
                    self.coerce(element, &inner(), key, depth)
                }
            }
            TypeShape::Scalar(_) => match convert_to(model_type, &element.text, &self.culture) {
                Ok(value) => value,
                Err(err) => {
                    self.error(
                        key,
                        format!("The value '{}' is not valid for {}.", err.value, model_type.short_name()),
                    );
                    model_type.default_value()
                }
            },
            TypeShape::Array(item) | TypeShape::Collection(item) => {
                let item_type = item();
                Value::Array(
                    element
                        .children
                        .iter()
                        .enumerate()
                        .map(|(i, child)| {
                            let child_key = create_index_model_name(key, &i.to_string());
                            self.coerce(child, &item_type, &child_key, depth + 1)
                        })
                        .collect(),
                )
            }
            TypeShape::Dictionary { key: key_type, value, .. } => {
                let (key_type, value_type) = (key_type(), value());
                let mut map = Map::new();
                for child in &element.children {
                    let (entry_key, entry_value) = match (child.child("Key"), child.child("Value")) {
                        (Some(k), Some(v)) => (k.text.trim().to_string(), v),
                        _ => (child.name.clone(), child),
                    };
                    let child_key = create_index_model_name(key, &entry_key);
                    if let Err(err) = convert_to(&key_type, &entry_key, &self.culture) {
                        self.error(&child_key, format!("The value '{}' is not valid.", err.value));
                        continue;
                    }
                    let value = self.coerce(entry_value, &value_type, &child_key, depth + 1);
                    map.insert(entry_key, value);
                }
                Value::Object(map)
            }
            TypeShape::KeyValuePair { key: key_type, value } => {
                let mut map = Map::new();
                for (name, part_type) in [("Key", key_type()), ("Value", value())] {
                    let part_key = create_property_model_name(key, name);
                    let part = match element.child(name) {
                        Some(part) => self.coerce(part, &part_type, &part_key, depth + 1),
                        None => part_type.default_value(),
                    };
                    map.insert(name.to_string(), part);
                }
                Value::Object(map)
            }
            TypeShape::Complex(complex) => {
                let mut map = Map::new();
                for property in &complex.properties {
                    let property_type = property.model_type();
                    let property_key = create_property_model_name(key, &property.name);
                    let value = match element.child(&property.name) {
                        Some(child) => self.coerce(child, &property_type, &property_key, depth + 1),
                        None => property_type.default_value(),
                    };
                    map.insert(property.name.clone(), value);
                }
                Value::Object(map)
            }
            TypeShape::Bytes => {
                let text = element.text.trim();
                match base64::engine::general_purpose::STANDARD.decode(text) {
                    Ok(bytes) => Value::Array(bytes.into_iter().map(Value::from).collect()),
                    Err(_) => {
                        self.error(key, format!("The value '{}' is not valid.", text));
                        Value::Array(Vec::new())
                    }
                }
            }
            TypeShape::FormFile
            | TypeShape::FormFileCollection
            | TypeShape::FormCollection
            | TypeShape::Opaque => {
                self.error(
                    key,
                    format!("Type '{}' cannot be read from XML.", model_type.short_name()),
                );
                Value::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpRequest;
    use crate::metadata::MetadataProvider;
    use crate::model_type::Bindable;
    use serde_json::json;
    use std::collections::HashMap;

    struct Order;

    impl Bindable for Order {
        fn model_type() -> ModelType {
            ModelType::complex::<Self>()
                .property::<u32>("Id")
                .property::<Option<String>>("Note")
                .property::<Vec<i32>>("Quantities")
                .property::<HashMap<String, f64>>("Prices")
                .build()
        }
    }

    async fn read<T: Bindable>(body: &str) -> (InputFormatterResult, ModelStateDictionary) {
        let request = HttpRequest::post("/")
            .with_header("content-type", "application/xml")
            .with_body(body.to_string());
        let metadata = MetadataProvider::new().metadata_for::<T>();
        let mut state = ModelStateDictionary::new();
        let mut ctx = InputFormatterContext {
            request: &request,
            model_name: "order",
            metadata: &metadata,
            model_state: &mut state,
            treat_empty_input_as_default_value: false,
        };
        let formatter = XmlInputFormatter::new();
        assert!(formatter.can_read(&ctx));
        let result = formatter.read(&mut ctx).await.unwrap();
        (result, state)
    }

    #[tokio::test]
    async fn test_coerces_leaves_by_type() {
        let (result, state) = read::<Order>(
            "<Order><Id>42</Id><Quantities><int>1</int><int>2</int></Quantities>\
             <Prices><apple>1.5</apple></Prices></Order>",
        )
        .await;
        assert!(state.is_valid());
        assert_eq!(
            result,
            InputFormatterResult::Success(json!({
                "Id": 42,
                "Note": null,
                "Quantities": [1, 2],
                "Prices": {"apple": 1.5}
            }))
        );
    }

    #[tokio::test]
    async fn test_invalid_leaf_records_error_at_path() {
        let (result, state) = read::<Order>("<Order><Id>abc</Id></Order>").await;
        assert_eq!(result, InputFormatterResult::Failure);
        assert_eq!(state.errors("order.Id").len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_document() {
        let (result, state) = read::<Order>("<Order><Id>1</Order>").await;
        assert_eq!(result, InputFormatterResult::Failure);
        assert!(!state.is_valid());
    }
}
