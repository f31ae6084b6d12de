//! tfplug - helpers for writing Terraform providers in Rust
//!
//! Schema builders, attribute validators, plan modifiers, defaults and import
//! helpers shared by the resources of a provider. The gRPC plugin protocol
//! itself is served by `tf-provider`.

pub mod error;
pub mod schema;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Re-exports for convenience
pub use defaults::{apply_default, DefaultValue, EnvDefault, StaticDefault};
pub use error::{Result, TfplugError};
pub use import::{import_error, parse_import_id};
pub use plan_modifier::{
    modify_attribute, requires_replace, PlanModifier, RequiresReplaceIf, RequiresReplaceIfChanged,
    UseStateForUnknown,
};
pub use schema::{AttributeBuilder, AttributeType, NestedAttributeBuilder, Schema, SchemaBuilder};
pub use validator::Validator;
