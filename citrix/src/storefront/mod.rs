//! StoreFront PowerShell SDK client

pub mod client;
pub mod command;
pub mod error;
pub mod executor;

pub use client::{StoreFrontClient, StoreFarmSpec, StoreServiceSpec};
pub use error::StoreFrontError;
pub use executor::{PowerShellExecutor, ProcessExecutor, RemoteHost};
