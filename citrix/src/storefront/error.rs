use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreFrontError {
    #[error("Failed to start PowerShell: {0}")]
    Io(#[from] std::io::Error),

    #[error("PowerShell command failed: {stderr}")]
    CommandFailed { stderr: String },

    #[error("Failed to parse PowerShell output: {0}")]
    Parse(String),

    #[error("{0} not found")]
    NotFound(String),
}
