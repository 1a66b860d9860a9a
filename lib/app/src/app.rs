//! The assembled client.

use crate::config::AppConfig;
use crate::error::AppError;
use pawtag_authz::AuthManager;
use pawtag_backend::{BackendClient, Environment};
use pawtag_commerce::{Address, CartStore, CommerceClient, Order};
use pawtag_core::{Clock, SystemClock};
use pawtag_platform_access::{AuthProvider, Directory};
use pawtag_storage::ClientStorage;
use rootcause::prelude::Report;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// Owns every component of the client.
pub struct App {
    storage: Arc<dyn ClientStorage>,
    backend: Arc<BackendClient>,
    auth: Arc<AuthManager>,
    commerce: Option<CommerceClient>,
    cart: CartStore,
}

impl App {
    /// Builds the application from `config`, opening the configured store.
    pub fn build(config: &AppConfig) -> Result<Self, Report<AppError>> {
        let storage = config.storage.open().map_err(|e| AppError::Storage {
            details: e.to_string(),
        })?;
        Self::with_storage(config, storage, Arc::new(SystemClock))
    }

    /// Builds the application over an already opened store.
    pub fn with_storage(
        config: &AppConfig,
        storage: Arc<dyn ClientStorage>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, Report<AppError>> {
        let backend = BackendClient::from_storage(&config.backend, storage.clone())
            .map_err(|report| AppError::Backend {
                details: report.to_string(),
            })?;
        let backend = Arc::new(backend);

        let provider: Arc<dyn AuthProvider> = backend.clone();
        let directory: Arc<dyn Directory> = backend.clone();
        let auth = Arc::new(AuthManager::new(
            provider,
            directory,
            &config.auth,
            clock.clone(),
        ));

        let commerce = match &config.commerce {
            Some(commerce) => Some(CommerceClient::new(commerce, clock).map_err(|report| {
                AppError::Commerce {
                    details: report.to_string(),
                }
            })?),
            None => {
                info!("storefront not configured, catalog disabled");
                None
            }
        };

        let cart = CartStore::load(storage.clone());

        info!(environment = %backend.environment(), "application assembled");
        Ok(Self {
            storage,
            backend,
            auth,
            commerce,
            cart,
        })
    }

    /// Restores the session, loads its profile and roles, and starts
    /// following session notifications.
    pub async fn start(&self) -> JoinHandle<()> {
        let listener = self.auth.clone().run();
        self.auth.initialize().await;
        listener
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<BackendClient> {
        &self.backend
    }

    /// The storefront client, if configured.
    #[must_use]
    pub fn commerce(&self) -> Option<&CommerceClient> {
        self.commerce.as_ref()
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Remembers `environment` for the next start.
    ///
    /// Returns true if it differs from the environment in use, in which
    /// case the application must be rebuilt for it to take effect.
    pub fn switch_environment(&self, environment: Environment) -> Result<bool, Report<AppError>> {
        environment
            .save(self.storage.as_ref())
            .map_err(|e| AppError::Storage {
                details: e.to_string(),
            })?;
        let changed = environment != self.backend.environment();
        info!(%environment, changed, "backend environment selected");
        Ok(changed)
    }

    /// Places an order for the cart and empties it on success.
    #[instrument(skip(self, billing, shipping))]
    pub async fn checkout(
        &self,
        payment_method: &str,
        payment_method_title: &str,
        billing: Address,
        shipping: Address,
    ) -> Result<Order, Report<AppError>> {
        let commerce = self.commerce.as_ref().ok_or(AppError::CommerceDisabled)?;
        let cart = self.cart.cart();
        if cart.is_empty() {
            return Err(AppError::EmptyCart.into());
        }

        let order = cart.to_order(payment_method, payment_method_title, billing, shipping);
        let placed = commerce
            .create_order(&order)
            .await
            .map_err(|report| AppError::Commerce {
                details: report.to_string(),
            })?;

        self.cart.clear();
        info!(order_id = placed.id, "checkout complete");
        Ok(placed)
    }
}
