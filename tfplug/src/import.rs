//! Import helpers for simplifying resource import implementations

use crate::error::{Result, TfplugError};
use tf_provider::Diagnostics;

/// Splits a composite import ID of the form `a,b,c` into its parts.
///
/// `fields` names each part, in order; it is used to describe the expected
/// format when the ID does not match.
///
/// Example: `parse_import_id("1,/Citrix/Store", &["site_id", "virtual_path"])`
/// returns `["1", "/Citrix/Store"]`.
pub fn parse_import_id(id: &str, fields: &[&str]) -> Result<Vec<String>> {
    let parts: Vec<String> = id.split(',').map(|p| p.trim().to_string()).collect();

    if parts.len() != fields.len() || parts.iter().any(|p| p.is_empty()) {
        return Err(TfplugError::InvalidImportId {
            id: id.to_string(),
            expected: fields.join(","),
        });
    }

    Ok(parts)
}

/// Records an import failure as a root diagnostic
pub fn import_error(diags: &mut Diagnostics, resource: &str, err: TfplugError) {
    diags.root_error(format!("Failed to import {}", resource), err.to_string());
}
