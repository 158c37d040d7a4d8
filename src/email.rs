//! Email receipts
//!
//! The backend mails the invoice itself; the register only asks it to, and
//! a failed send never fails the sale.

use async_trait::async_trait;
use mockall::automock;
use reqwest::StatusCode;
use thiserror::Error;

use crate::context::{BackendConfig, rejection_message};
use crate::orders::TransactionId;

/// Errors from the email endpoint.
#[derive(Debug, Error)]
pub enum EmailServiceError {
    /// The request itself failed: connection, timeout, or a malformed body.
    #[error("email request failed")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("email request rejected ({status}): {message}")]
    Rejected {
        /// Status code of the rejection.
        status: StatusCode,
        /// Message extracted from the response body.
        message: String,
    },
}

/// Asks the backend to mail an invoice.
#[automock]
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Request the invoice for `transaction` be sent to `to`.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailServiceError`] if the request fails or the backend
    /// rejects it.
    async fn send_receipt(
        &self,
        to: &str,
        transaction: &TransactionId,
    ) -> Result<(), EmailServiceError>;
}

/// [`EmailService`] backed by the real HTTP API.
#[derive(Debug, Clone)]
pub struct HttpEmailService {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpEmailService {
    /// Build a client for the backend described by `config`.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint("email/send"),
        }
    }
}

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send_receipt(
        &self,
        to: &str,
        transaction: &TransactionId,
    ) -> Result<(), EmailServiceError> {
        // The endpoint takes its arguments in the query string and no body.
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("to", to), ("transactionId", transaction.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmailServiceError::Rejected {
                status: response.status(),
                message: rejection_message(response).await,
            });
        }

        Ok(())
    }
}
