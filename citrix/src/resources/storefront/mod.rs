//! StoreFront resources, managed through the StoreFront PowerShell SDK

pub mod deployment;
pub mod store;
pub mod store_farm;
pub mod xenapp_default_store;

pub use deployment::StfDeploymentResource;
pub use store::StfStoreServiceResource;
pub use store_farm::StfStoreFarmResource;
pub use xenapp_default_store::StfXenappDefaultStoreResource;

use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostics};
use tfplug::validator::Validator;
use tfplug::{apply_default, StaticDefault};

use crate::storefront::StoreFrontError;

pub const DEFAULT_SITE_ID: &str = "1";

/// Fills an unset site ID with the IIS default site
fn default_site_id(value: &mut Value<String>) {
    apply_default(value, &StaticDefault::new(DEFAULT_SITE_ID.to_string()));
}

fn storefront_error(diags: &mut Diagnostics, summary: &'static str, err: StoreFrontError) {
    diags.root_error(summary, format!("StoreFront error: {}", err));
}

fn missing_state(diags: &mut Diagnostics, attribute: &'static str) {
    diags.error(
        "Missing value in state",
        format!("{} is not known", attribute),
        AttributePath::new(attribute),
    );
}

/// Known, non-empty string value, or a diagnostic naming the attribute
fn required<'v>(diags: &mut Diagnostics, value: &'v Value<String>, attribute: &'static str) -> Option<&'v str> {
    match value.as_deref_option() {
        Some(s) if !s.is_empty() => Some(s),
        _ => {
            missing_state(diags, attribute);
            None
        }
    }
}

/// Keeps the configured spelling of a value the SDK reports in another case
fn keep_spelling(prior: &Value<String>, fresh: String) -> Value<String> {
    match prior.as_deref_option() {
        Some(p) if p.eq_ignore_ascii_case(&fresh) => prior.clone(),
        _ => Value::Value(fresh),
    }
}

/// Accepts absolute `http`/`https` URLs
pub struct HttpUrlValidator;

impl Validator<str> for HttpUrlValidator {
    fn description(&self) -> String {
        "value must be an absolute http or https URL".to_string()
    }

    fn validate(&self, value: &str, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let valid = url::Url::parse(value)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid {
            diagnostics.error(
                format!("{} must be an http or https URL", path),
                format!("Value '{}' is not an absolute http or https URL", value),
                path.clone(),
            );
        }
    }
}

/// Accepts IIS virtual paths such as `/Citrix/Store`
pub struct VirtualPathValidator;

impl Validator<str> for VirtualPathValidator {
    fn description(&self) -> String {
        "value must be an IIS virtual path starting with /".to_string()
    }

    fn validate(&self, value: &str, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if !value.starts_with('/') || value.len() < 2 || value.contains(char::is_whitespace) {
            diagnostics.error(
                format!("{} must be a virtual path", path),
                format!("Value '{}' must start with / and contain no whitespace", value),
                path.clone(),
            );
        }
    }
}

/// Provider data whose StoreFront client answers from `mock`
#[cfg(test)]
pub(crate) async fn mock_provider_data(
    mock: std::sync::Arc<crate::storefront::executor::MockExecutor>,
) -> crate::provider_data::SharedProviderData {
    use crate::api::test_helpers::create_test_client;
    use crate::provider_data::{CitrixProviderData, SharedProviderData};
    use crate::storefront::StoreFrontClient;

    let data = SharedProviderData::new();
    data.set(CitrixProviderData::new(
        create_test_client("http://127.0.0.1:1"),
        StoreFrontClient::new(mock),
        true,
    ))
    .await;
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors<V: Validator<str>>(validator: &V, value: &str) -> usize {
        let mut diags = Diagnostics::default();
        validator.validate(value, &AttributePath::new("attr"), &mut diags);
        diags.errors.len()
    }

    #[test]
    fn test_http_url_validator() {
        assert_eq!(errors(&HttpUrlValidator, "https://stf.corp.local"), 0);
        assert_eq!(errors(&HttpUrlValidator, "http://stf.corp.local:8080/"), 0);
        assert_eq!(errors(&HttpUrlValidator, "ftp://stf.corp.local"), 1);
        assert_eq!(errors(&HttpUrlValidator, "stf.corp.local"), 1);
    }

    #[test]
    fn test_virtual_path_validator() {
        assert_eq!(errors(&VirtualPathValidator, "/Citrix/Store"), 0);
        assert_eq!(errors(&VirtualPathValidator, "Citrix/Store"), 1);
        assert_eq!(errors(&VirtualPathValidator, "/"), 1);
        assert_eq!(errors(&VirtualPathValidator, "/Citrix/My Store"), 1);
    }

    #[test]
    fn test_default_site_id_only_fills_null() {
        let mut unset = Value::Null;
        default_site_id(&mut unset);
        assert_eq!(unset, Value::Value("1".to_string()));

        let mut set = Value::Value("2".to_string());
        default_site_id(&mut set);
        assert_eq!(set, Value::Value("2".to_string()));
    }

    #[test]
    fn test_keep_spelling() {
        let prior = Value::Value("https://STF.corp.local".to_string());
        assert_eq!(keep_spelling(&prior, "https://stf.corp.local".to_string()), prior);
        assert_eq!(
            keep_spelling(&prior, "https://other".to_string()),
            Value::Value("https://other".to_string())
        );
    }
}
