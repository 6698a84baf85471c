//! Metadata resolution and query round-trips.

mod common;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trellis_core::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Settings {
    name: String,
    retries: i32,
    ratio: f64,
    enabled: bool,
    limit: Option<u64>,
}

impl Bindable for Settings {
    fn model_type() -> ModelType {
        ModelType::complex::<Self>()
            .property_with::<String>("Name", [Attribute::DisplayName("Display name".into())])
            .property_with::<i32>("Retries", [Attribute::Required])
            .property::<f64>("Ratio")
            .property::<bool>("Enabled")
            .property::<Option<u64>>("Limit")
            .build()
    }
}

#[test]
fn test_property_metadata_is_stable() {
    let provider = MetadataProvider::new();
    let first = provider
        .metadata_for_property(&Settings::model_type(), "Name")
        .unwrap();
    let second = provider
        .metadata_for_property(&Settings::model_type(), "Name")
        .unwrap();
    assert_eq!(first.attributes(), second.attributes());
    assert_eq!(first.details(), second.details());
    assert_eq!(first.get_display_name(), "Display name");

    let other = MetadataProvider::new()
        .metadata_for_property(&Settings::model_type(), "Name")
        .unwrap();
    assert_eq!(first.details(), other.details());
}

#[test]
fn test_properties_in_declaration_order() {
    let provider = MetadataProvider::new();
    let metadata = provider.metadata_for::<Settings>();
    let names: Vec<String> = provider
        .properties_of(&metadata)
        .iter()
        .filter_map(|p| p.name().map(str::to_string))
        .collect();
    assert_eq!(names, ["Name", "Retries", "Ratio", "Enabled", "Limit"]);
    assert!(provider
        .metadata_for_property(&Settings::model_type(), "Retries")
        .unwrap()
        .is_required());
}

#[test]
fn test_parameter_metadata_carries_attributes() {
    let provider = MetadataProvider::new();
    let attrs = [Attribute::from_query(Some("s"))];
    let metadata = provider.metadata_for_parameter(&Settings::model_type(), "settings", &attrs);
    assert_eq!(metadata.binding_source(), Some(BindingSource::Query));
    assert_eq!(metadata.binder_model_name(), Some("s"));
    let again = provider.metadata_for_parameter(&Settings::model_type(), "settings", &attrs);
    assert!(Arc::ptr_eq(&metadata, &again) || metadata.details() == again.details());
}

fn query(settings: &Settings) -> String {
    let mut pairs = vec![
        ("settings.Name".to_string(), settings.name.clone()),
        ("settings.Retries".to_string(), settings.retries.to_string()),
        ("settings.Ratio".to_string(), settings.ratio.to_string()),
        ("settings.Enabled".to_string(), settings.enabled.to_string()),
    ];
    if let Some(limit) = settings.limit {
        pairs.push(("settings.Limit".to_string(), limit.to_string()));
    }
    serde_urlencoded::to_string(pairs).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scalar_properties_round_trip(
        name in "[a-zA-Z0-9 ]{1,16}",
        retries in any::<i32>(),
        ratio in -1.0e6f64..1.0e6,
        enabled in any::<bool>(),
        limit in proptest::option::of(any::<u64>().prop_filter("fits i64", |v| *v <= i64::MAX as u64)),
    ) {
        let settings = Settings { name: name.trim().to_string(), retries, ratio, enabled, limit };
        prop_assume!(!settings.name.is_empty());

        let request = HttpRequest::get("/").with_query(query(&settings));
        let mut args = tokio_test::block_on(common::bind(
            request,
            vec![ParameterDescriptor::new::<Settings>("settings")],
        ));

        prop_assert!(args.is_valid());
        let bound: Settings = args.get("settings").unwrap();
        prop_assert_eq!(bound, settings);
    }
}
