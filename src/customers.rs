//! Customers
//!
//! Registered customers live on the backend. The register fetches the whole
//! list and matches phone numbers locally; the only write it ever performs
//! is the loyalty-point balance after a sale, sent as a full `PUT` of the
//! record it was given.

use async_trait::async_trait;
use jiff::civil::Date;
use mockall::automock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{BackendConfig, rejection_message};
use crate::ids::TypedId;

/// Identifier of a [`Customer`] on the backend.
pub type CustomerId = TypedId<Customer>;

/// A registered customer as the backend serves it.
///
/// Fields the register does not model are kept in `extra` so an update
/// writes the record back whole instead of silently dropping them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Backend identifier.
    pub id: CustomerId,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Receipt destination, when the customer registered one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// The phone number the register looks customers up by.
    pub phone_number: String,

    /// Date of birth, used for the birthday discount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Date>,

    /// Current loyalty-point balance.
    #[serde(default)]
    pub loyalty_points: u64,

    /// Every backend field the register has no use for.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Customer {
    /// First and family name joined for display.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The address a receipt can be mailed to.
    ///
    /// A registered but empty email counts as no email at all.
    #[must_use]
    pub fn email_address(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.is_empty())
    }
}

/// A customer about to be registered, before the backend assigns an id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Optional receipt destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Phone number, the register's lookup key.
    pub phone_number: String,

    /// Optional date of birth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Date>,

    /// Starting balance, zero for a fresh registration.
    pub loyalty_points: u64,
}

impl NewCustomer {
    /// A registration with the minimum the backend requires.
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone_number: phone_number.into(),
            birth_date: None,
            loyalty_points: 0,
        }
    }
}

/// Errors from the customers endpoint.
#[derive(Debug, Error)]
pub enum CustomersServiceError {
    /// The request itself failed: connection, timeout, or a malformed body.
    #[error("customers request failed")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("customers request rejected ({status}): {message}")]
    Rejected {
        /// Status code of the rejection.
        status: StatusCode,
        /// Message extracted from the response body.
        message: String,
    },
}

/// Access to the backend customer registry.
#[automock]
#[async_trait]
pub trait CustomersService: Send + Sync {
    /// Fetch every registered customer.
    ///
    /// # Errors
    ///
    /// Returns a [`CustomersServiceError`] if the request fails or the
    /// backend rejects it.
    async fn list_customers(&self) -> Result<Vec<Customer>, CustomersServiceError>;

    /// Register a new customer and return the record the backend created.
    ///
    /// # Errors
    ///
    /// Returns a [`CustomersServiceError`] if the request fails or the
    /// backend rejects it.
    async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<Customer, CustomersServiceError>;

    /// Replace a customer record and return the updated version.
    ///
    /// # Errors
    ///
    /// Returns a [`CustomersServiceError`] if the request fails or the
    /// backend rejects it.
    async fn update_customer(
        &self,
        customer: &Customer,
    ) -> Result<Customer, CustomersServiceError>;
}

/// [`CustomersService`] backed by the real HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCustomersService {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpCustomersService {
    /// Build a client for the backend described by `config`.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint("customers"),
        }
    }
}

#[async_trait]
impl CustomersService for HttpCustomersService {
    async fn list_customers(&self) -> Result<Vec<Customer>, CustomersServiceError> {
        let response = self.http.get(&self.endpoint).send().await?;

        if !response.status().is_success() {
            return Err(CustomersServiceError::Rejected {
                status: response.status(),
                message: rejection_message(response).await,
            });
        }

        Ok(response.json().await?)
    }

    async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<Customer, CustomersServiceError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(customer)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CustomersServiceError::Rejected {
                status: response.status(),
                message: rejection_message(response).await,
            });
        }

        Ok(response.json().await?)
    }

    async fn update_customer(
        &self,
        customer: &Customer,
    ) -> Result<Customer, CustomersServiceError> {
        let url = format!("{}/{}", self.endpoint, customer.id);
        let response = self.http.put(url).json(customer).send().await?;

        if !response.status().is_success() {
            return Err(CustomersServiceError::Rejected {
                status: response.status(),
                message: rejection_message(response).await,
            });
        }

        Ok(response.json().await?)
    }
}

/// Find the customer whose phone number matches `phone` exactly.
///
/// Partial matches are not matches; a register lookup either identifies one
/// customer or nobody.
#[must_use]
pub fn find_by_phone<'a>(customers: &'a [Customer], phone: &str) -> Option<&'a Customer> {
    customers
        .iter()
        .find(|customer| customer.phone_number == phone)
}
