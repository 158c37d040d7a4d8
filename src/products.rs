//! Products
//!
//! The catalog is owned by the backend; the register fetches it once at
//! startup and works against a local [`StockCache`] from then on. Sales
//! decrement the cache only, so quantities drift from the backend until the
//! next restart.

use async_trait::async_trait;
use mockall::automock;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartLine;
use crate::context::{BackendConfig, rejection_message};
use crate::ids::TypedId;

/// Identifier of a [`Product`] on the backend.
pub type ProductId = TypedId<Product>;

/// A catalog entry as the backend serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend identifier.
    pub id: ProductId,

    /// Display name.
    pub name: String,

    /// Price of one unit.
    pub price: Decimal,

    /// Units left in stock.
    pub quantity: i64,

    /// Catalog category, used for filtering.
    pub category: String,

    /// Optional picture for catalog display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Whether the register may sell this product right now.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Errors from the products endpoint.
#[derive(Debug, Error)]
pub enum ProductsServiceError {
    /// The request itself failed: connection, timeout, or a malformed body.
    #[error("products request failed")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("products request rejected ({status}): {message}")]
    Rejected {
        /// Status code of the rejection.
        status: StatusCode,
        /// Message extracted from the response body.
        message: String,
    },
}

/// Read access to the backend catalog.
#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Fetch every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductsServiceError`] if the request fails or the
    /// backend rejects it.
    async fn list_products(&self) -> Result<Vec<Product>, ProductsServiceError>;
}

/// [`ProductsService`] backed by the real HTTP API.
#[derive(Debug, Clone)]
pub struct HttpProductsService {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpProductsService {
    /// Build a client for the backend described by `config`.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint("products"),
        }
    }
}

#[async_trait]
impl ProductsService for HttpProductsService {
    async fn list_products(&self) -> Result<Vec<Product>, ProductsServiceError> {
        let response = self.http.get(&self.endpoint).send().await?;

        if !response.status().is_success() {
            return Err(ProductsServiceError::Rejected {
                status: response.status(),
                message: rejection_message(response).await,
            });
        }

        Ok(response.json().await?)
    }
}

/// The register's local copy of the catalog.
///
/// Lookups and searches run against this cache, never the backend. After a
/// sale the sold quantities are subtracted so the register stops offering
/// what it no longer has, even though the backend still reports the old
/// numbers.
#[derive(Debug, Clone, Default)]
pub struct StockCache {
    products: Vec<Product>,
}

impl StockCache {
    /// Wrap a fetched catalog.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Every cached product, in backend order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look a product up by id.
    pub fn find(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    /// Products the register may sell: everything with stock left.
    pub fn sellable(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|product| product.in_stock())
    }

    /// Distinct categories present in the catalog, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .products
            .iter()
            .map(|product| product.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Filter the catalog the way the register's search box does.
    ///
    /// The query matches case-insensitively against the product name, or as
    /// a substring of the numeric id. An empty query matches everything.
    /// `category` restricts further; `None` means all categories.
    pub fn search(&self, query: &str, category: Option<&str>) -> Vec<&Product> {
        let query = query.to_lowercase();

        self.products
            .iter()
            .filter(|product| {
                product.id.into_raw().to_string().contains(&query)
                    || product.name.to_lowercase().contains(&query)
            })
            .filter(|product| category.is_none_or(|wanted| product.category == wanted))
            .collect()
    }

    /// Subtract the sold quantities of a completed sale.
    ///
    /// Quantities stop at zero rather than going negative, and lines for
    /// products the cache does not know are skipped.
    pub fn record_sale(&mut self, lines: &[CartLine]) {
        for line in lines {
            if let Some(product) = self
                .products
                .iter_mut()
                .find(|product| product.id == line.product_id())
            {
                product.quantity = (product.quantity - i64::from(line.quantity())).max(0);
            }
        }
    }
}
