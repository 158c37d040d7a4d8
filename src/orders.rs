//! Orders
//!
//! Submitting an order sends the cart and the points being redeemed; the
//! backend prices it, issues the transaction id, and answers with the
//! authoritative total. Everything shown on a receipt or in the history
//! screen comes from the backend's answer, not the register's own sums.

use std::fmt;
use std::io;

use async_trait::async_trait;
use mockall::automock;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::cart::Cart;
use crate::context::{BackendConfig, rejection_message};
use crate::customers::CustomerId;
use crate::ids::TypedId;
use crate::products::ProductId;
use crate::receipt::format_amount;

/// Identifier of an [`OrderRecord`] on the backend.
pub type OrderId = TypedId<OrderRecord>;

/// Backend-issued identifier printed on receipts and searched in history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap a raw transaction id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as the backend issued it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One sold line as the orders endpoint expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product being sold.
    pub product_id: ProductId,

    /// Price of one unit at the time of sale.
    pub unit_price: Decimal,

    /// Units sold.
    pub quantity: u32,
}

/// An order ready to be submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// The customer being charged.
    pub customer_id: CustomerId,

    /// The sold lines.
    pub items: Vec<OrderItem>,

    /// Points the customer is spending on this sale, zero when none.
    pub loyalty_points_to_redeem: u64,
}

impl OrderDraft {
    /// Turn a cart into the wire shape the orders endpoint takes.
    #[must_use]
    pub fn from_cart(customer_id: CustomerId, cart: &Cart, loyalty_points_to_redeem: u64) -> Self {
        Self {
            customer_id,
            items: cart
                .lines()
                .iter()
                .map(|line| OrderItem {
                    product_id: line.product_id(),
                    unit_price: line.unit_price(),
                    quantity: line.quantity(),
                })
                .collect(),
            loyalty_points_to_redeem,
        }
    }
}

/// What the backend answers when it accepts an order.
///
/// The total here is the one the backend charged. It supersedes whatever
/// the register computed locally.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    /// Identifier the backend issued for this sale.
    pub transaction_id: TransactionId,

    /// The charged amount.
    pub total: Decimal,
}

/// A past order as the history endpoint lists it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Backend row id.
    pub id: OrderId,

    /// Identifier issued when the order was charged.
    pub transaction_id: TransactionId,

    /// Phone number of the charged customer.
    #[serde(default)]
    pub customer_phone: String,

    /// The charged amount.
    pub total: Decimal,

    /// Discount applied, as a percentage of the subtotal.
    #[serde(default)]
    pub discount_percent: Decimal,
}

/// Errors from the orders endpoint.
#[derive(Debug, Error)]
pub enum OrdersServiceError {
    /// The request itself failed: connection, timeout, or a malformed body.
    #[error("orders request failed")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("orders request rejected ({status}): {message}")]
    Rejected {
        /// Status code of the rejection.
        status: StatusCode,
        /// Message extracted from the response body.
        message: String,
    },
}

/// Access to the backend order book.
#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Submit a draft and return the backend's confirmation.
    ///
    /// # Errors
    ///
    /// Returns an [`OrdersServiceError`] if the request fails or the
    /// backend rejects the order.
    async fn submit_order(
        &self,
        draft: &OrderDraft,
    ) -> Result<OrderConfirmation, OrdersServiceError>;

    /// Fetch the full order history, newest last.
    ///
    /// # Errors
    ///
    /// Returns an [`OrdersServiceError`] if the request fails or the
    /// backend rejects it.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>, OrdersServiceError>;
}

/// [`OrdersService`] backed by the real HTTP API.
#[derive(Debug, Clone)]
pub struct HttpOrdersService {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpOrdersService {
    /// Build a client for the backend described by `config`.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint("orders"),
        }
    }
}

#[async_trait]
impl OrdersService for HttpOrdersService {
    async fn submit_order(
        &self,
        draft: &OrderDraft,
    ) -> Result<OrderConfirmation, OrdersServiceError> {
        let response = self.http.post(&self.endpoint).json(draft).send().await?;

        if !response.status().is_success() {
            return Err(OrdersServiceError::Rejected {
                status: response.status(),
                message: rejection_message(response).await,
            });
        }

        Ok(response.json().await?)
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, OrdersServiceError> {
        let response = self.http.get(&self.endpoint).send().await?;

        if !response.status().is_success() {
            return Err(OrdersServiceError::Rejected {
                status: response.status(),
                message: rejection_message(response).await,
            });
        }

        Ok(response.json().await?)
    }
}

/// Filter history the way the search box does.
///
/// The term matches case-insensitively as a substring of the transaction id
/// or the customer phone. An empty term matches everything.
#[must_use]
pub fn search<'a>(orders: &'a [OrderRecord], term: &str) -> Vec<&'a OrderRecord> {
    let term = term.to_lowercase();

    orders
        .iter()
        .filter(|order| {
            order.transaction_id.as_str().to_lowercase().contains(&term)
                || order.customer_phone.to_lowercase().contains(&term)
        })
        .collect()
}

/// Write the history table the register shows.
///
/// Columns follow the history screen: order id, transaction id, customer
/// phone, total, and the discount as a percentage or `No`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_history(out: &mut impl io::Write, orders: &[&OrderRecord]) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record([
        "Order ID",
        "Transaction ID",
        "Customer Phone",
        "Total",
        "Discount",
    ]);

    for order in orders {
        let discount = if order.discount_percent.is_zero() {
            "No".to_string()
        } else {
            format!("{}%", order.discount_percent)
        };

        builder.push_record([
            order.id.to_string(),
            order.transaction_id.to_string(),
            order.customer_phone.clone(),
            format_amount(order.total),
            discount,
        ]);
    }

    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.modify(Columns::new(3..5), Alignment::right());

    writeln!(out, "{table}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;
    use crate::products::Product;

    fn record(id: i64, transaction: &str, phone: &str) -> OrderRecord {
        OrderRecord {
            id: OrderId::from_raw(id),
            transaction_id: TransactionId::new(transaction),
            customer_phone: phone.to_string(),
            total: Decimal::from(500),
            discount_percent: Decimal::ZERO,
        }
    }

    #[test]
    fn draft_serializes_to_the_wire_shape() -> TestResult {
        let product = Product {
            id: ProductId::from_raw(9),
            name: "Desk Lamp".to_string(),
            price: Decimal::new(1250_50, 2),
            quantity: 3,
            category: "Home".to_string(),
            image_url: None,
        };

        let mut cart = Cart::new();
        cart.add(&product);
        cart.add(&product);

        let draft = OrderDraft::from_cart(CustomerId::from_raw(3), &cart, 50);

        assert_eq!(
            serde_json::to_value(&draft)?,
            json!({
                "customerId": 3,
                "items": [
                    { "productId": 9, "unitPrice": 1250.5, "quantity": 2 }
                ],
                "loyaltyPointsToRedeem": 50
            })
        );

        Ok(())
    }

    #[test]
    fn confirmation_ignores_fields_it_does_not_need() -> TestResult {
        let confirmation: OrderConfirmation = serde_json::from_value(json!({
            "id": 41,
            "transactionId": "TXN-20260825-0041",
            "customerId": 3,
            "customerPhone": "0771234567",
            "total": 350.0,
            "discountPercent": 12.5
        }))?;

        assert_eq!(
            confirmation.transaction_id,
            TransactionId::new("TXN-20260825-0041")
        );
        assert_eq!(confirmation.total, Decimal::from(350));

        Ok(())
    }

    #[test]
    fn record_defaults_missing_phone_and_discount() -> TestResult {
        let record: OrderRecord = serde_json::from_value(json!({
            "id": 41,
            "transactionId": "TXN-20260825-0041",
            "total": 350.0
        }))?;

        assert_eq!(record.customer_phone, "");
        assert_eq!(record.discount_percent, Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn search_matches_transaction_ids_case_insensitively() {
        let orders = [
            record(1, "TXN-20260825-0001", "0771234567"),
            record(2, "TXN-20260825-0002", "0719876543"),
        ];

        let hits = search(&orders, "txn-20260825-0002");

        assert_eq!(hits.len(), 1);
        assert!(hits.iter().all(|order| order.id == OrderId::from_raw(2)));
    }

    #[test]
    fn search_matches_phone_substrings() {
        let orders = [
            record(1, "TXN-20260825-0001", "0771234567"),
            record(2, "TXN-20260825-0002", "0719876543"),
        ];

        let hits = search(&orders, "0771");

        assert_eq!(hits.len(), 1);
        assert!(hits.iter().all(|order| order.id == OrderId::from_raw(1)));
    }

    #[test]
    fn empty_search_term_matches_every_order() {
        let orders = [
            record(1, "TXN-20260825-0001", "0771234567"),
            record(2, "TXN-20260825-0002", "0719876543"),
        ];

        assert_eq!(search(&orders, "").len(), 2);
    }

    #[test]
    fn history_table_shows_no_for_undiscounted_orders() -> TestResult {
        let undiscounted = record(1, "TXN-20260825-0001", "0771234567");
        let mut discounted = record(2, "TXN-20260825-0002", "0719876543");
        discounted.discount_percent = Decimal::new(125, 1);

        let mut out = Vec::new();
        write_history(&mut out, &[&undiscounted, &discounted])?;

        let text = String::from_utf8(out)?;
        assert!(text.contains("Transaction ID"), "got {text}");
        assert!(text.contains("No"), "got {text}");
        assert!(text.contains("12.5%"), "got {text}");

        Ok(())
    }
}
