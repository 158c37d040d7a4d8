//! Register wiring
//!
//! One [`PosContext`] bundles every backend collaborator behind trait
//! objects, so the checkout flow runs the same against the real HTTP API
//! and against mocks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::customers::{CustomersService, HttpCustomersService};
use crate::email::{EmailService, HttpEmailService};
use crate::orders::{HttpOrdersService, OrdersService};
use crate::products::{HttpProductsService, ProductsService};

/// Where the backend API lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: String,
}

impl BackendConfig {
    /// Wrap a base URL such as `http://localhost:5000/api`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self { base_url }
    }

    /// The configured base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The full URL of one endpoint under the base.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

/// Pull a readable message out of a rejected backend response.
///
/// The backend reports failures as `{"message": "..."}`. Anything else
/// falls back to the raw body, and an empty body to the status line.
pub(crate) async fn rejection_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&body).ok().and_then(|value| {
        value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match message {
        Some(message) => message,
        None if body.trim().is_empty() => status.to_string(),
        None => body,
    }
}

/// Shared access to every backend service the register talks to.
#[derive(Clone)]
pub struct PosContext {
    /// Product catalog access.
    pub products: Arc<dyn ProductsService>,

    /// Customer registry access.
    pub customers: Arc<dyn CustomersService>,

    /// Order submission and history.
    pub orders: Arc<dyn OrdersService>,

    /// Invoice mailing.
    pub email: Arc<dyn EmailService>,
}

impl PosContext {
    /// Wire every collaborator against `config`, sharing one HTTP client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let http = reqwest::Client::new();

        Self {
            products: Arc::new(HttpProductsService::new(http.clone(), config)),
            customers: Arc::new(HttpCustomersService::new(http.clone(), config)),
            orders: Arc::new(HttpOrdersService::new(http.clone(), config)),
            email: Arc::new(HttpEmailService::new(http, config)),
        }
    }

    /// Assemble a context from already-built collaborators.
    #[must_use]
    pub fn from_parts(
        products: Arc<dyn ProductsService>,
        customers: Arc<dyn CustomersService>,
        orders: Arc<dyn OrdersService>,
        email: Arc<dyn EmailService>,
    ) -> Self {
        Self {
            products,
            customers,
            orders,
            email,
        }
    }
}

impl fmt::Debug for PosContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosContext").finish_non_exhaustive()
    }
}

/// The signed-in employee operating the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    /// Backend identifier.
    pub id: i64,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,
}

impl Operator {
    /// First and family name joined for display.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
