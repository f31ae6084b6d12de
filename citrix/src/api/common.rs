//! Common types and utilities for the Citrix Orchestration API

use serde::{Deserialize, Serialize};

/// Collection envelope used by list endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// Error body returned by the Orchestration API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorResponse {
    pub error_message: Option<String>,
    pub detail: Option<String>,
    #[serde(default)]
    pub parameters: Option<Vec<NameValueStringPair>>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: message={message:?}, detail={detail:?}, parameters={parameters:?}")]
pub struct ApiErrorDetails {
    pub message: Option<String>,
    pub detail: Option<String>,
    pub parameters: Option<Vec<NameValueStringPair>>,
}

/// Reference to another object, `{ "Id": .., "Name": .. }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RefResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameValueStringPair {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl NameValueStringPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

pub trait CitrixApiResource: Sized {
    fn api_path() -> &'static str;

    fn resource_path(name_or_id: &str) -> String {
        format!("{}/{}", Self::api_path(), urlencoding::encode(name_or_id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    /// Marks the request as asynchronous; the API answers 202 with a job location
    pub fn asynchronous(self) -> Self {
        self.add("async", true)
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Finds a custom property value by name
pub fn find_property<'a>(props: &'a [NameValueStringPair], name: &str) -> Option<&'a str> {
    props
        .iter()
        .find(|p| p.name == name)
        .and_then(|p| p.value.as_deref())
}

/// Inserts or replaces a custom property
pub fn set_property(props: &mut Vec<NameValueStringPair>, name: &str, value: impl Into<String>) {
    let value = value.into();
    match props.iter_mut().find(|p| p.name == name) {
        Some(existing) => existing.value = Some(value),
        None => props.push(NameValueStringPair::new(name, value)),
    }
}
