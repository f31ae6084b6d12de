//! Resource implementations

pub mod machine_catalog;
pub mod storefront;

pub use machine_catalog::MachineCatalogResource;
pub use storefront::{
    StfDeploymentResource, StfStoreFarmResource, StfStoreServiceResource,
    StfXenappDefaultStoreResource,
};
