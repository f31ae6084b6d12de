//! Provider data shared by resources and data sources

use crate::api::Client;
use crate::storefront::StoreFrontClient;
use std::sync::Arc;
use tf_provider::Diagnostics;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct CitrixProviderData {
    pub client: Arc<Client>,
    pub storefront: StoreFrontClient,
    pub on_premises: bool,
}

impl CitrixProviderData {
    pub fn new(client: Client, storefront: StoreFrontClient, on_premises: bool) -> Self {
        Self {
            client: Arc::new(client),
            storefront,
            on_premises,
        }
    }
}

/// Resources are handed out before `configure` runs, so they hold this slot
/// and look the data up on every call.
#[derive(Clone, Default)]
pub struct SharedProviderData(Arc<RwLock<Option<CitrixProviderData>>>);

impl SharedProviderData {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, data: CitrixProviderData) {
        *self.0.write().await = Some(data);
    }

    pub async fn is_configured(&self) -> bool {
        self.0.read().await.is_some()
    }

    /// Returns the configured data, or records a diagnostic
    pub async fn get(&self, diags: &mut Diagnostics) -> Option<CitrixProviderData> {
        let data = self.0.read().await.clone();
        if data.is_none() {
            diags.root_error(
                "Provider not configured",
                "The citrix provider must be configured before resources or data sources are used",
            );
        }
        data
    }
}
