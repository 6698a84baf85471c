//! Loading binding settings from files and the environment.
//!
//! Only the scalar knobs of [`MvcOptions`](crate::options::MvcOptions) are
//! configurable this way; provider and formatter lists stay in code.

use crate::logging::debug;
use crate::options::MessageKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Default prefix for environment variables
pub const ENV_PREFIX: &str = "TRELLIS";

/// Supported settings file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Serializable subset of the binding options. Unset fields keep the
/// option defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingSettings {
    pub respect_browser_accept_header: Option<bool>,
    pub return_http_not_acceptable: Option<bool>,
    pub allow_empty_input_in_body_model_binding: Option<bool>,
    pub max_model_binding_collection_size: Option<usize>,
    pub max_model_binding_recursion_depth: Option<usize>,
    pub max_model_validation_errors: Option<usize>,
    pub request_culture: Option<String>,
    pub treat_null_value_as_no_content: Option<bool>,
    /// Also register the XML formatters
    pub xml_formatters: Option<bool>,
    /// Message template overrides
    pub messages: HashMap<MessageKind, String>,
}

impl BindingSettings {
    /// Load from a `.json` or `.toml` file, by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Config("No file extension found".to_string()))?;
        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| Error::Config(format!("Unsupported format: {}", ext)))?;
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read file: {}", e)))?;
        let settings = Self::parse(&content, format)?;
        debug!(path = %path.display(), "Loaded binding settings");
        Ok(settings)
    }

    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        match format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| Error::Config(format!("JSON parse error: {}", e))),
            FileFormat::Toml => toml::from_str(content)
                .map_err(|e| Error::Config(format!("TOML parse error: {}", e))),
        }
    }

    /// Load from `TRELLIS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Load from `{prefix}_*` environment variables, e.g.
    /// `TRELLIS_MAX_MODEL_BINDING_COLLECTION_SIZE=64`
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let vars: HashMap<String, String> = env::vars()
            .filter_map(|(key, value)| {
                let rest = key.strip_prefix(prefix)?.strip_prefix('_')?;
                Some((rest.to_lowercase(), value))
            })
            .collect();
        Self::from_vars(&vars)
    }

    /// Build from already collected `name -> value` pairs (lowercase names
    /// without the prefix)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let mut map = Map::new();
        for (key, raw) in vars {
            let value = match key.as_str() {
                "request_culture" => Value::String(raw.clone()),
                "respect_browser_accept_header"
                | "return_http_not_acceptable"
                | "allow_empty_input_in_body_model_binding"
                | "treat_null_value_as_no_content"
                | "xml_formatters" => Value::Bool(parse_bool(key, raw)?),
                "max_model_binding_collection_size"
                | "max_model_binding_recursion_depth"
                | "max_model_validation_errors" => {
                    let n: u64 = raw.trim().parse().map_err(|_| {
                        Error::Config(format!("Invalid number for {}: '{}'", key, raw))
                    })?;
                    Value::from(n)
                }
                // Unrelated variables sharing the prefix are ignored
                _ => continue,
            };
            map.insert(key.clone(), value);
        }
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Config(format!("Invalid environment settings: {}", e)))
    }

    /// Settings from `other` take precedence where set
    pub fn merge(mut self, other: BindingSettings) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            respect_browser_accept_header,
            return_http_not_acceptable,
            allow_empty_input_in_body_model_binding,
            max_model_binding_collection_size,
            max_model_binding_recursion_depth,
            max_model_validation_errors,
            request_culture,
            treat_null_value_as_no_content,
            xml_formatters
        );
        self.messages.extend(other.messages);
        self
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("Invalid boolean for {}: '{}'", key, raw))),
    }
}
