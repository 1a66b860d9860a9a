//! REST client for the storefront API.

use crate::config::CommerceConfig;
use crate::error::CommerceError;
use crate::models::{Category, NewOrder, Order, Product, Variation};
use crate::query::ProductQuery;
use pawtag_core::{Clock, TtlCache};
use reqwest::{Response, StatusCode};
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Returns the cached value under `key` or runs `fetch` and caches its
/// success.
pub(crate) async fn cached<V, F>(
    cache: &TtlCache<V>,
    key: &str,
    ttl: chrono::Duration,
    fetch: F,
) -> Result<V, Report<CommerceError>>
where
    V: Clone,
    F: Future<Output = Result<V, Report<CommerceError>>>,
{
    if let Some(value) = cache.get(key, ttl) {
        debug!(key, "catalog cache hit");
        return Ok(value);
    }
    let value = fetch.await?;
    cache.set(key, value.clone());
    Ok(value)
}

struct Catalog {
    listings: TtlCache<Vec<Product>>,
    products: TtlCache<Option<Product>>,
    categories: TtlCache<Vec<Category>>,
    variations: TtlCache<Vec<Variation>>,
}

impl Catalog {
    fn new(clock: &Arc<dyn Clock>) -> Self {
        Self {
            listings: TtlCache::new(clock.clone()),
            products: TtlCache::new(clock.clone()),
            categories: TtlCache::new(clock.clone()),
            variations: TtlCache::new(clock.clone()),
        }
    }
}

/// Client for catalog and order endpoints.
///
/// Catalog reads are cached per query for the configured TTL. Orders are
/// never cached.
pub struct CommerceClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
    catalog: Catalog,
    ttl: chrono::Duration,
}

impl CommerceClient {
    /// Creates a client from `config`.
    pub fn new(config: &CommerceConfig, clock: Arc<dyn Clock>) -> Result<Self, Report<CommerceError>> {
        if !config.is_complete() {
            return Err(CommerceError::InvalidConfig {
                details: "base URL, consumer key and consumer secret are required".to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CommerceError::ClientBuild {
                details: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization: config.authorization(),
            catalog: Catalog::new(&clock),
            ttl: config.catalog_ttl(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.url(path))
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
    }

    async fn send(
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, Report<CommerceError>> {
        let response = request.send().await.map_err(|e| CommerceError::Request {
            operation: operation.to_string(),
            details: e.to_string(),
        })?;
        Ok(response)
    }

    async fn parse<R: DeserializeOwned>(
        operation: &str,
        response: Response,
    ) -> Result<R, Report<CommerceError>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(operation, status = status.as_u16(), "storefront request failed");
            return Err(CommerceError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }
        let value = response
            .json::<R>()
            .await
            .map_err(|e| CommerceError::Decode {
                operation: operation.to_string(),
                details: e.to_string(),
            })?;
        Ok(value)
    }

    /// Like [`Self::parse`], but a 404 is `None`.
    async fn parse_optional<R: DeserializeOwned>(
        operation: &str,
        response: Response,
    ) -> Result<Option<R>, Report<CommerceError>> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::parse(operation, response).await.map(Some)
    }

    /// Lists published products matching `query`.
    ///
    /// A category slug that names no category is ignored.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, Report<CommerceError>> {
        let key = query.cache_key();
        cached(&self.catalog.listings, &key, self.ttl, async {
            let category_id = match &query.category {
                Some(slug) => self.category_id(slug).await?,
                None => None,
            };
            let request = self.get("products").query(&query.params(category_id));
            let response = Self::send("list_products", request).await?;
            let products: Vec<Product> = Self::parse("list_products", response).await?;
            info!(count = products.len(), "products listed");
            Ok::<_, Report<CommerceError>>(products)
        })
        .await
    }

    async fn category_id(&self, slug: &str) -> Result<Option<u64>, Report<CommerceError>> {
        let id = self
            .categories()
            .await?
            .into_iter()
            .find(|category| category.slug == slug)
            .map(|category| category.id);
        if id.is_none() {
            warn!(slug, "unknown category slug, listing without category filter");
        }
        Ok(id)
    }

    /// Fetches one product by id.
    #[instrument(skip(self))]
    pub async fn product(&self, id: u64) -> Result<Option<Product>, Report<CommerceError>> {
        cached(&self.catalog.products, &format!("id:{id}"), self.ttl, async {
            let response = Self::send("product", self.get(&format!("products/{id}"))).await?;
            Self::parse_optional::<Product>("product", response).await
        })
        .await
    }

    /// Fetches the published product with `slug`.
    #[instrument(skip(self))]
    pub async fn product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Product>, Report<CommerceError>> {
        cached(&self.catalog.products, &format!("slug:{slug}"), self.ttl, async {
            let request = self.get("products").query(&[
                ("slug", slug),
                ("per_page", "1"),
                ("status", "publish"),
            ]);
            let response = Self::send("product_by_slug", request).await?;
            let products: Vec<Product> = Self::parse("product_by_slug", response).await?;
            Ok::<_, Report<CommerceError>>(products.into_iter().next())
        })
        .await
    }

    /// Lists non-empty categories.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, Report<CommerceError>> {
        cached(&self.catalog.categories, "all", self.ttl, async {
            let request = self
                .get("products/categories")
                .query(&[("per_page", "100"), ("hide_empty", "true")]);
            let response = Self::send("categories", request).await?;
            Self::parse::<Vec<Category>>("categories", response).await
        })
        .await
    }

    /// Lists the variations of product `id`.
    #[instrument(skip(self))]
    pub async fn product_variations(
        &self,
        id: u64,
    ) -> Result<Vec<Variation>, Report<CommerceError>> {
        cached(&self.catalog.variations, &id.to_string(), self.ttl, async {
            let request = self.get(&format!("products/{id}/variations"));
            let response = Self::send("product_variations", request).await?;
            Self::parse::<Vec<Variation>>("product_variations", response).await
        })
        .await
    }

    /// Places an order.
    #[instrument(skip(self, order), fields(lines = order.line_items.len()))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, Report<CommerceError>> {
        let request = self
            .http
            .post(self.url("orders"))
            .header("Authorization", &self.authorization)
            .json(order);
        let response = Self::send("create_order", request).await?;
        let created: Order = Self::parse("create_order", response).await?;
        info!(order_id = created.id, "order created");
        Ok(created)
    }

    /// Fetches one order by id.
    #[instrument(skip(self))]
    pub async fn order(&self, id: u64) -> Result<Option<Order>, Report<CommerceError>> {
        let response = Self::send("order", self.get(&format!("orders/{id}"))).await?;
        Self::parse_optional("order", response).await
    }

    /// Returns true if the API answers a minimal product listing.
    pub async fn test_connection(&self) -> bool {
        let request = self.get("products").query(&[("per_page", "1")]);
        let outcome = match Self::send("test_connection", request).await {
            Ok(response) => Self::parse::<Vec<Product>>("test_connection", response).await,
            Err(report) => Err(report),
        };
        match outcome {
            Ok(_) => {
                info!("storefront reachable");
                true
            }
            Err(report) => {
                warn!(error = %report, "storefront unreachable");
                false
            }
        }
    }
}
