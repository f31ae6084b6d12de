//! Error types for tfplug

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    /// A composite import ID did not split into the expected parts
    #[error("Invalid import ID '{id}': expected format {expected}")]
    InvalidImportId { id: String, expected: String },
}

pub type Result<T> = std::result::Result<T, TfplugError>;
