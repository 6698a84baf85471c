//! End-to-end binding through `ParameterBinder`.

mod common;

use common::{bind, bind_with, factory};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_core::binding::ModelBindingContext;
use trellis_core::value_provider::CompositeValueProvider;
use trellis_core::*;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct MyModel {
    prop0: String,
    prop1: String,
    prop2: Option<i32>,
}

impl Bindable for MyModel {
    fn model_type() -> ModelType {
        ModelType::complex::<Self>()
            .property::<String>("Prop0")
            .property::<String>("Prop1")
            .property::<Option<i32>>("Prop2")
            .build()
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Address {
    street: String,
    zip: u32,
}

impl Bindable for Address {
    fn model_type() -> ModelType {
        ModelType::complex::<Self>()
            .property::<String>("Street")
            .property_with::<u32>("Zip", [Attribute::BindRequired])
            .build()
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Customer {
    name: String,
    address: Address,
    tags: Vec<String>,
}

impl Bindable for Customer {
    fn model_type() -> ModelType {
        ModelType::complex::<Self>()
            .property::<String>("Name")
            .property::<Address>("Address")
            .property::<Vec<String>>("Tags")
            .build()
    }
}

#[tokio::test]
async fn test_array_of_models_with_prefix() {
    let request = HttpRequest::get("/").with_query("models[0].Prop0=X&models[0].Prop1=Y");
    let mut args = bind(
        request,
        vec![ParameterDescriptor::new::<Box<[MyModel]>>("param").with_model_name("models")],
    )
    .await;

    assert!(args.is_valid());
    let models: Vec<MyModel> = args.get("param").unwrap();
    assert_eq!(
        models,
        vec![MyModel {
            prop0: "X".into(),
            prop1: "Y".into(),
            prop2: None,
        }]
    );
}

#[tokio::test]
async fn test_sparse_indices_bind_present_elements_only() {
    let request = HttpRequest::get("/").with_query("items[0]=10&items[2]=30");
    let mut args = bind(request, vec![ParameterDescriptor::new::<Vec<i32>>("items")]).await;
    let items: Vec<i32> = args.get("items").unwrap();
    assert_eq!(items, vec![10, 30]);
}

#[tokio::test]
async fn test_explicit_index_values() {
    let request = HttpRequest::get("/")
        .with_query("items.index=a&items.index=b&items[a]=1&items[b]=2&items[c]=3");
    let mut args = bind(request, vec![ParameterDescriptor::new::<Vec<i32>>("items")]).await;
    let items: Vec<i32> = args.get("items").unwrap();
    assert_eq!(items, vec![1, 2]);
}

#[tokio::test]
async fn test_repeated_values_bind_as_collection() {
    let request = HttpRequest::get("/").with_query("ids=1&ids=2&ids=3");
    let mut args = bind(request, vec![ParameterDescriptor::new::<Vec<u64>>("ids")]).await;
    let ids: Vec<u64> = args.get("ids").unwrap();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_dictionary_keeps_keys_that_fail_to_bind() {
    let request = HttpRequest::get("/").with_query("dict[a]=1&dict[b]=notanint");
    let mut args = bind(
        request,
        vec![ParameterDescriptor::new::<HashMap<String, i32>>("dict")],
    )
    .await;

    assert_eq!(args.model_state().errors("dict[b]").len(), 1);
    assert!(!args.is_valid());
    let dict: HashMap<String, i32> = args.get("dict").unwrap();
    assert_eq!(dict.get("a"), Some(&1));
    assert_eq!(dict.get("b"), Some(&0));
}

#[tokio::test]
async fn test_top_level_empty_collection_is_not_null() {
    let args = bind(HttpRequest::get("/"), vec![ParameterDescriptor::new::<Vec<i32>>("items")]).await;
    assert_eq!(args.value("items"), Some(&json!([])));
}

#[tokio::test]
async fn test_nested_empty_collection_is_no_result() {
    let options = MvcOptions::new();
    let factory = factory(options);
    let context = ActionContext::new(HttpRequest::get("/").with_query("other=1"), factory.options().clone());
    let provider = Arc::new(
        CompositeValueProvider::create(&context, &factory.options().value_provider_factories)
            .await
            .unwrap(),
    );
    let metadata = factory.metadata_provider().metadata_for::<Vec<i32>>();
    let binder = factory
        .create_binder(metadata.clone(), &BindingInfo::default())
        .unwrap();

    let mut state = ModelStateDictionary::new();
    let mut top = ModelBindingContext::top_level(
        &context,
        factory.metadata_provider(),
        &mut state,
        provider,
        metadata.clone(),
        &BindingInfo::default(),
        "order",
    );
    let mut nested = top.nested(metadata, "Items", "order.Items", None);
    binder.bind_model(&mut nested).await.unwrap();
    assert_eq!(nested.result, ModelBindingResult::NoResult);
}

#[tokio::test]
async fn test_nested_complex_model() {
    let request = HttpRequest::get("/").with_query(
        "customer.Name=Ada&customer.Address.Street=Main&customer.Address.Zip=12345&customer.Tags=a&customer.Tags=b",
    );
    let mut args = bind(request, vec![ParameterDescriptor::new::<Customer>("customer")]).await;
    assert!(args.is_valid());
    let customer: Customer = args.get("customer").unwrap();
    assert_eq!(customer.address.zip, 12345);
    assert_eq!(customer.tags, vec!["a", "b"]);
}

#[tokio::test]
async fn test_empty_prefix_fallback() {
    let request = HttpRequest::get("/").with_query("Street=Elm&Zip=9");
    let mut args = bind(request, vec![ParameterDescriptor::new::<Address>("address")]).await;
    let address: Address = args.get("address").unwrap();
    assert_eq!(address.street, "Elm");
    assert_eq!(args.parameter("address").unwrap().model_name, "");
}

#[tokio::test]
async fn test_bind_required_property() {
    let request = HttpRequest::get("/").with_query("address.Street=Elm");
    let args = bind(request, vec![ParameterDescriptor::new::<Address>("address")]).await;
    let errors = args.model_state().errors("address.Zip");
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "A value for the 'Zip' parameter or property was not provided."
    );
}

#[tokio::test]
async fn test_invalid_scalar_records_error() {
    let request = HttpRequest::get("/").with_query("page=abc");
    let args = bind(request, vec![ParameterDescriptor::new::<i32>("page")]).await;
    assert_eq!(args.result("page"), Some(&ModelBindingResult::Failed));
    assert_eq!(
        args.model_state().errors("page")[0].message,
        "The value 'abc' is not valid."
    );
}

#[tokio::test]
async fn test_bind_required_parameter() {
    let parameter = ParameterDescriptor::new::<i32>("page").with_attribute(Attribute::BindRequired);
    let args = bind(HttpRequest::get("/"), vec![parameter]).await;
    assert!(!args.is_valid());
}

#[tokio::test]
async fn test_route_value_wins_over_query() {
    let request = HttpRequest::get("/")
        .with_route_value("id", "5")
        .with_query("id=6");
    let mut args = bind(request, vec![ParameterDescriptor::new::<i32>("id")]).await;
    assert_eq!(args.get::<i32>("id"), Some(5));

    let request = HttpRequest::get("/")
        .with_route_value("id", "5")
        .with_query("id=6");
    let mut args = bind(
        request,
        vec![ParameterDescriptor::new::<i32>("id").from_source(BindingSource::Query)],
    )
    .await;
    assert_eq!(args.get::<i32>("id"), Some(6));
}

#[tokio::test]
async fn test_header_binding_splits_collections() {
    let request = HttpRequest::get("/")
        .with_header("X-Tags", "a, b,c")
        .with_header("X-Count", "3");
    let mut args = bind(
        request,
        vec![
            ParameterDescriptor::new::<Vec<String>>("tags")
                .with_attribute(Attribute::from_header(Some("X-Tags"))),
            ParameterDescriptor::new::<i32>("count")
                .with_attribute(Attribute::from_header(Some("X-Count"))),
        ],
    )
    .await;
    assert_eq!(args.get::<Vec<String>>("tags"), Some(vec!["a".into(), "b".into(), "c".into()]));
    assert_eq!(args.get::<i32>("count"), Some(3));
}

#[tokio::test]
async fn test_json_body() {
    let request = HttpRequest::post("/").with_json_body(r#"{"Street":"Oak","Zip":1}"#);
    let mut args = bind(
        request,
        vec![ParameterDescriptor::new::<Address>("address").from_source(BindingSource::Body)],
    )
    .await;
    assert!(args.is_valid());
    assert_eq!(args.get::<Address>("address").unwrap().street, "Oak");
}

#[tokio::test]
async fn test_json_body_member_of_wrong_type_is_invalid() {
    let request = HttpRequest::post("/").with_json_body(r#"{"Street":"Oak","Zip":"notanumber"}"#);
    let mut args = bind(
        request,
        vec![ParameterDescriptor::new::<Address>("address").from_source(BindingSource::Body)],
    )
    .await;

    assert!(!args.is_valid());
    assert_eq!(args.model_state().errors("Zip").len(), 1);
    assert_eq!(args.result("address"), Some(&ModelBindingResult::NoResult));
    assert_eq!(args.get::<Address>("address"), None);
}

#[tokio::test]
async fn test_json_body_scalar_of_wrong_shape_is_invalid() {
    let parameter = || ParameterDescriptor::new::<i32>("count").from_source(BindingSource::Body);

    let args = bind(HttpRequest::post("/").with_json_body(r#""hello""#), vec![parameter()]).await;
    assert!(!args.is_valid());
    assert_eq!(args.model_state().errors("").len(), 1);

    let args = bind(HttpRequest::post("/").with_json_body(r#"{"Count":1}"#), vec![parameter()]).await;
    assert!(!args.is_valid());
    assert_eq!(args.model_state().errors("").len(), 1);

    let mut args = bind(HttpRequest::post("/").with_json_body("7"), vec![parameter()]).await;
    assert!(args.is_valid());
    assert_eq!(args.get::<i32>("count"), Some(7));
}

#[tokio::test]
async fn test_failed_collection_element_leaves_gap() {
    let request = HttpRequest::get("/").with_query("items[0]=1&items[1]=x&items[2]=3");
    let mut args = bind(request, vec![ParameterDescriptor::new::<Vec<i32>>("items")]).await;

    assert!(!args.is_valid());
    assert_eq!(args.model_state().errors("items[1]").len(), 1);
    assert!(args.model_state().errors("items[0]").is_empty());
    let items: Vec<i32> = args.get("items").unwrap();
    assert_eq!(items, vec![1, 3]);
}

#[tokio::test]
async fn test_unsupported_body_content_type() {
    let request = HttpRequest::post("/")
        .with_header("content-type", "text/csv")
        .with_body("a,b");
    let args = bind(
        request,
        vec![ParameterDescriptor::new::<Address>("address").from_source(BindingSource::Body)],
    )
    .await;
    assert!(args.model_state().has_unsupported_content_type());
    assert_eq!(
        args.model_state().errors("")[0].message,
        "Unsupported content type 'text/csv'."
    );
}

#[tokio::test]
async fn test_empty_body() {
    let parameter = || ParameterDescriptor::new::<Address>("address").from_source(BindingSource::Body);

    let args = bind(HttpRequest::post("/").with_json_body(""), vec![parameter()]).await;
    assert_eq!(
        args.model_state().errors("")[0].message,
        "A non-empty request body is required."
    );

    let args = bind(
        HttpRequest::post("/").with_json_body(""),
        vec![parameter().with_binding_info(
            BindingInfo::from_source(BindingSource::Body)
                .with_empty_body_behavior(EmptyBodyBehavior::Allow),
        )],
    )
    .await;
    assert!(args.is_valid());
}

#[tokio::test]
async fn test_cancelled_body_read() {
    let factory = factory(MvcOptions::new());
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();
    let context = ActionContext::new(
        HttpRequest::post("/").with_json_body(r#"{"Street":"Oak","Zip":1}"#),
        factory.options().clone(),
    )
    .with_cancellation(token);
    let args = common::bind_in(
        &factory,
        &context,
        vec![ParameterDescriptor::new::<Address>("address").from_source(BindingSource::Body)],
    )
    .await
    .unwrap();
    assert_eq!(args.result("address"), Some(&ModelBindingResult::Failed));
    assert_eq!(args.model_state().errors("")[0].message, "The request was aborted.");
}

#[tokio::test]
async fn test_xml_body() {
    let request = HttpRequest::post("/")
        .with_header("content-type", "application/xml")
        .with_body("<Address><Street>Pine</Street><Zip>77</Zip></Address>");
    let mut args = bind_with(
        MvcOptions::new().with_xml_formatters(),
        request,
        vec![ParameterDescriptor::new::<Address>("address").from_source(BindingSource::Body)],
    )
    .await
    .unwrap();
    assert_eq!(
        args.get::<Address>("address"),
        Some(Address {
            street: "Pine".into(),
            zip: 77
        })
    );
}

struct Clock {
    now: u64,
}

impl Bindable for Clock {
    fn model_type() -> ModelType {
        ModelType::opaque::<Self>()
    }
}

#[tokio::test]
async fn test_services_binding() {
    let factory = factory(MvcOptions::new());
    let services = Container::new();
    services.register(Clock { now: 42 });
    let context =
        ActionContext::new(HttpRequest::get("/"), factory.options().clone()).with_services(services);
    let args = common::bind_in(&factory, &context, vec![ParameterDescriptor::new::<Clock>("clock")])
        .await
        .unwrap();
    assert_eq!(args.service::<Clock>("clock").unwrap().now, 42);
    let node = args.parameter("clock").unwrap().validation_node.as_ref().unwrap();
    assert!(node.suppress_validation);
}

#[tokio::test]
async fn test_missing_service_is_an_error() {
    let result = bind_with(
        MvcOptions::new(),
        HttpRequest::get("/"),
        vec![ParameterDescriptor::new::<Clock>("clock")],
    )
    .await;
    assert!(matches!(result, Err(Error::ServiceNotFound(_))));

    let args = bind(HttpRequest::get("/"), vec![ParameterDescriptor::new::<Option<Clock>>("clock")]).await;
    assert_eq!(args.value("clock"), Some(&serde_json::Value::Null));
}

#[tokio::test]
async fn test_form_files() {
    let form = FormCollection::new()
        .with_field("title", "report")
        .with_file(FormFile::new("Upload", "a.txt", "text/plain", b"abc".to_vec()))
        .with_file(FormFile::new("upload", "", "application/octet-stream", Vec::new()));
    let request = HttpRequest::post("/").with_form(form);
    let mut args = bind(
        request,
        vec![
            ParameterDescriptor::new::<FormFile>("upload"),
            ParameterDescriptor::new::<Vec<FormFile>>("all").with_model_name("upload"),
            ParameterDescriptor::new::<String>("title"),
        ],
    )
    .await;

    let file: FormFile = args.get("upload").unwrap();
    assert_eq!(file.data, b"abc");
    let all: Vec<FormFile> = args.get("all").unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(args.get::<String>("title").as_deref(), Some("report"));
}

#[tokio::test]
async fn test_byte_array() {
    let request = HttpRequest::get("/").with_query("data=AQID&bad=%21%21");
    let mut args = bind(
        request,
        vec![
            ParameterDescriptor::new::<ByteArray>("data"),
            ParameterDescriptor::new::<ByteArray>("bad"),
        ],
    )
    .await;
    assert_eq!(args.get::<ByteArray>("data"), Some(ByteArray(vec![1, 2, 3])));
    assert_eq!(args.result("bad"), Some(&ModelBindingResult::Failed));
}

#[tokio::test]
async fn test_custom_binder_by_name() {
    struct Upper;

    #[async_trait::async_trait]
    impl ModelBinder for Upper {
        async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
            let raw = ctx.action_context().request.header("x-name").unwrap_or_default();
            ctx.set_success(json!(raw.to_uppercase()));
            Ok(())
        }
    }

    let options = MvcOptions::new().with_custom_binder("upper", Upper);
    let request = HttpRequest::get("/").with_header("x-name", "ada");
    let mut args = bind_with(
        options,
        request,
        vec![ParameterDescriptor::new::<String>("name").with_binding_info(BindingInfo::new().with_binder("upper"))],
    )
    .await
    .unwrap();
    assert_eq!(args.get::<String>("name").as_deref(), Some("ADA"));
}

#[tokio::test]
async fn test_collection_size_limit() {
    let options = MvcOptions {
        max_model_binding_collection_size: 2,
        ..MvcOptions::new()
    };
    let request = HttpRequest::get("/").with_query("items[0]=1&items[1]=2&items[2]=3");
    let result = bind_with(options, request, vec![ParameterDescriptor::new::<Vec<i32>>("items")]).await;
    assert!(matches!(result, Err(Error::CollectionTooLarge { limit: 2, .. })));
}

#[tokio::test]
async fn test_typed_extraction_mismatch_is_recorded() {
    let request = HttpRequest::get("/").with_query("page=3");
    let mut args = bind(request, vec![ParameterDescriptor::new::<i32>("page")]).await;
    assert_eq!(args.get::<String>("page"), None);
    assert_eq!(args.model_state().errors("page").len(), 1);
}
