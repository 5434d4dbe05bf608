//! Client registry trait.
//!
//! Clients are loaded from configuration at startup and never change while
//! the server runs.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::AuthResult;
use crate::config::ClientConfig;
use crate::types::Client;

// =============================================================================
// Client Registry Trait
// =============================================================================

/// Lookup of registered OAuth 2.0 clients.
///
/// # Example
///
/// ```ignore
/// use warden_auth::storage::ClientRegistry;
///
/// async fn example(registry: &impl ClientRegistry) {
///     if let Some(client) = registry.find_by_client_id("web").await? {
///         println!("redirects: {:?}", client.redirect_uris);
///     }
/// }
/// ```
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Find a client by its OAuth client_id.
    ///
    /// Returns `None` if no such client is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;
}

// =============================================================================
// Static Registry
// =============================================================================

/// Registry over a fixed set of clients.
#[derive(Debug, Default)]
pub struct StaticClientRegistry {
    clients: HashMap<String, Client>,
}

impl StaticClientRegistry {
    /// Creates a registry holding `clients`.
    #[must_use]
    pub fn new(clients: impl IntoIterator<Item = Client>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|c| (c.client_id.clone(), c))
                .collect(),
        }
    }

    /// Creates a registry from configured clients.
    #[must_use]
    pub fn from_config(clients: &[ClientConfig]) -> Self {
        Self::new(clients.iter().map(ClientConfig::to_client))
    }
}

#[async_trait]
impl ClientRegistry for StaticClientRegistry {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).cloned())
    }
}
