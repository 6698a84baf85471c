// Per-request value provider construction

use super::{
    FormFileValueProvider, FormValueProvider, JQueryFormValueProvider,
    JQueryQueryStringValueProvider, QueryStringValueProvider, RouteValueProvider, ValueProvider,
};
use crate::action::ActionContext;
use crate::form::FormCollection;
use crate::logging::{debug, warn};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Creates a request's value provider, or `None` when the request has no
/// data for it.
///
/// Form parsing failures surface here as [`Error::ValueProvider`], never
/// from later lookups.
#[async_trait]
pub trait ValueProviderFactory: Send + Sync {
    async fn create_value_provider(
        &self,
        context: &ActionContext,
    ) -> Result<Option<Arc<dyn ValueProvider>>>;
}

async fn read_form(context: &ActionContext) -> Result<Option<&FormCollection>> {
    if !context.request.has_form_content_type() {
        return Ok(None);
    }
    match context.request.read_form(&context.cancellation).await {
        Ok(form) => Ok(Some(form)),
        Err(e) => {
            warn!(error = %e, "Failed to read request form");
            Err(Error::ValueProvider(e.to_string()))
        }
    }
}

fn query_pairs(context: &ActionContext) -> Result<Vec<(String, String)>> {
    context
        .request
        .query_pairs()
        .map_err(|e| Error::ValueProvider(e.to_string()))
}

pub struct FormValueProviderFactory;

#[async_trait]
impl ValueProviderFactory for FormValueProviderFactory {
    async fn create_value_provider(
        &self,
        context: &ActionContext,
    ) -> Result<Option<Arc<dyn ValueProvider>>> {
        let Some(form) = read_form(context).await? else {
            return Ok(None);
        };
        debug!(fields = form.fields.len(), "Adding form value provider");
        Ok(Some(Arc::new(FormValueProvider::new(form, context.options.culture()))))
    }
}

pub struct RouteValueProviderFactory;

#[async_trait]
impl ValueProviderFactory for RouteValueProviderFactory {
    async fn create_value_provider(
        &self,
        context: &ActionContext,
    ) -> Result<Option<Arc<dyn ValueProvider>>> {
        Ok(Some(Arc::new(RouteValueProvider::new(&context.request.route_values))))
    }
}

pub struct QueryStringValueProviderFactory;

#[async_trait]
impl ValueProviderFactory for QueryStringValueProviderFactory {
    async fn create_value_provider(
        &self,
        context: &ActionContext,
    ) -> Result<Option<Arc<dyn ValueProvider>>> {
        let pairs = query_pairs(context)?;
        if pairs.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(QueryStringValueProvider::new(pairs))))
    }
}

/// Adds a provider only when some form key uses bracket syntax
pub struct JQueryFormValueProviderFactory;

#[async_trait]
impl ValueProviderFactory for JQueryFormValueProviderFactory {
    async fn create_value_provider(
        &self,
        context: &ActionContext,
    ) -> Result<Option<Arc<dyn ValueProvider>>> {
        let Some(form) = read_form(context).await? else {
            return Ok(None);
        };
        if !form.keys().any(has_brackets) {
            return Ok(None);
        }
        let provider = JQueryFormValueProvider::new(form, context.options.culture())?;
        Ok(Some(Arc::new(provider)))
    }
}

/// Adds a provider only when some query key uses bracket syntax
pub struct JQueryQueryStringValueProviderFactory;

#[async_trait]
impl ValueProviderFactory for JQueryQueryStringValueProviderFactory {
    async fn create_value_provider(
        &self,
        context: &ActionContext,
    ) -> Result<Option<Arc<dyn ValueProvider>>> {
        let pairs = query_pairs(context)?;
        if !pairs.iter().any(|(k, _)| has_brackets(k)) {
            return Ok(None);
        }
        Ok(Some(Arc::new(JQueryQueryStringValueProvider::new(pairs)?)))
    }
}

pub struct FormFileValueProviderFactory;

#[async_trait]
impl ValueProviderFactory for FormFileValueProviderFactory {
    async fn create_value_provider(
        &self,
        context: &ActionContext,
    ) -> Result<Option<Arc<dyn ValueProvider>>> {
        let Some(form) = read_form(context).await? else {
            return Ok(None);
        };
        if form.files.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(FormFileValueProvider::new(form))))
    }
}

fn has_brackets(key: &str) -> bool {
    key.contains('[')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding_source::BindingSource;
    use crate::http::HttpRequest;
    use crate::options::MvcOptions;
    use crate::value_provider::CompositeValueProvider;

    #[tokio::test]
    async fn test_default_factories() {
        let request = HttpRequest::post("/orders/7")
            .with_route_value("id", "7")
            .with_query("page=2&filter[name]=x")
            .with_form_body("note=hello");
        let options = MvcOptions::new();
        let context = ActionContext::new(request, Arc::new(options));

        let composite =
            CompositeValueProvider::create(&context, &context.options.value_provider_factories)
                .await
                .unwrap();

        let sources: Vec<_> = composite.providers().iter().map(|p| p.binding_source()).collect();
        assert_eq!(
            sources,
            [
                BindingSource::Form,
                BindingSource::Path,
                BindingSource::Query,
                BindingSource::Query,
            ]
        );
        assert_eq!(composite.get_value("filter.name").first_value(), Some("x"));
        assert_eq!(composite.get_value("note").first_value(), Some("hello"));
    }

    #[tokio::test]
    async fn test_malformed_form_fails_at_construction() {
        let request = HttpRequest::post("/")
            .with_header("content-type", "multipart/form-data")
            .with_body("irrelevant");
        let context = ActionContext::new(request, Arc::new(MvcOptions::new()));

        let result = FormValueProviderFactory.create_value_provider(&context).await;
        assert!(matches!(result, Err(Error::ValueProvider(_))));
    }

    #[tokio::test]
    async fn test_unclosed_jquery_key_fails_at_construction() {
        let request = HttpRequest::get("/").with_query("a[b=1");
        let context = ActionContext::new(request, Arc::new(MvcOptions::new()));

        let result = JQueryQueryStringValueProviderFactory
            .create_value_provider(&context)
            .await;
        assert!(matches!(result, Err(Error::ValueProvider(_))));
    }
}
