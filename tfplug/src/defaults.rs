//! Default value providers for attributes
//!
//! Defaults are evaluated while planning or configuring, only when the
//! attribute is null. Unknown and explicit values are left alone.
//!
//! ```no_run
//! use tfplug::defaults::{apply_default, EnvDefault, StaticDefault};
//! use tf_provider::value::Value;
//!
//! let mut site_id: Value<String> = Value::Null;
//! apply_default(&mut site_id, &StaticDefault::new("1".to_string()));
//!
//! let mut hostname: Value<String> = Value::Null;
//! apply_default(&mut hostname, &EnvDefault::<String>::new("CITRIX_HOSTNAME"));
//! ```

use std::env;
use std::marker::PhantomData;
use std::str::FromStr;

use tf_provider::value::Value;

/// Provides a default for an attribute left unset in configuration
pub trait DefaultValue<T>: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// The default, or None when no default applies
    fn default_value(&self) -> Option<T>;
}

/// StaticDefault provides a static default value
pub struct StaticDefault<T> {
    value: T,
}

impl<T> StaticDefault<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Send + Sync + std::fmt::Debug> DefaultValue<T> for StaticDefault<T> {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self) -> Option<T> {
        Some(self.value.clone())
    }
}

/// Reads the default from an environment variable, parsed with `FromStr`.
/// Empty or unparsable values count as unset.
pub struct EnvDefault<T> {
    var: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> EnvDefault<T> {
    pub fn new(var: &'static str) -> Self {
        Self {
            var,
            _marker: PhantomData,
        }
    }

    pub fn var(&self) -> &'static str {
        self.var
    }
}

impl<T: FromStr> DefaultValue<T> for EnvDefault<T> {
    fn description(&self) -> String {
        format!("value of environment variable {}", self.var)
    }

    fn default_value(&self) -> Option<T> {
        let raw = env::var(self.var).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring unparsable value of {}", self.var);
                None
            }
        }
    }
}

/// Fills a null value from `default`. Returns true when a default was applied.
pub fn apply_default<T>(value: &mut Value<T>, default: &dyn DefaultValue<T>) -> bool {
    if value.is_null() {
        if let Some(v) = default.default_value() {
            *value = Value::Value(v);
            return true;
        }
    }
    false
}

/// Resolves an optional setting: configured value, then each default in turn.
pub fn resolve<T: Clone>(value: &Value<T>, defaults: &[&dyn DefaultValue<T>]) -> Option<T> {
    if let Value::Value(v) = value {
        return Some(v.clone());
    }
    defaults.iter().find_map(|d| d.default_value())
}
