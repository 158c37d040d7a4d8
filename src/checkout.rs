//! Checkout
//!
//! A [`CheckoutSession`] is one register serving one customer at a time:
//! build a cart, select the customer by phone, price the discount, then
//! [`charge`](CheckoutSession::charge). The charge choreography talks to
//! the backend in a fixed order: submit the order, write the new loyalty
//! balance back, optionally mail the invoice, then take the sold units out
//! of the local stock. Only the order submission can fail the sale; the
//! later steps record their failures on the receipt instead.

use std::time::Duration;

use jiff::civil::Date;
use thiserror::Error;
use tokio::time;
use tracing::{error, info, warn};

use crate::cart::Cart;
use crate::context::{Operator, PosContext};
use crate::customers::{self, Customer, CustomerId, CustomersServiceError};
use crate::discounts::{self, DiscountBreakdown};
use crate::loyalty;
use crate::orders::{OrderDraft, OrdersServiceError};
use crate::products::{ProductId, StockCache};
use crate::receipt::{ChargeReceipt, EmailStatus, LoyaltyStatus};

/// How long the success confirmation stays on screen before the register
/// resets for the next customer.
pub const CONFIRMATION_DELAY: Duration = Duration::from_secs(3);

/// The session was not ready to charge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No customer has been selected.
    #[error("select a customer first")]
    NoCustomer,

    /// There is nothing in the cart to charge.
    #[error("the cart is empty")]
    EmptyCart,
}

/// Why a charge did not complete.
#[derive(Debug, Error)]
pub enum ChargeError {
    /// The session failed a pre-flight check; nothing was sent anywhere.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A charge is already running, or its confirmation is still showing.
    #[error("a transaction is already in progress")]
    TransactionInProgress,

    /// The backend refused or never received the order. No sale happened.
    #[error("order submission failed")]
    Submission(#[from] OrdersServiceError),
}

/// Why a product could not be added to the cart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddToCartError {
    /// The product is not in the catalog.
    #[error("product {id} is not in the catalog")]
    UnknownProduct {
        /// The id that was asked for.
        id: ProductId,
    },

    /// The product has no stock left.
    #[error("{name} is out of stock")]
    OutOfStock {
        /// Name of the product that cannot be sold.
        name: String,
    },
}

/// Why a phone lookup selected nobody.
#[derive(Debug, Error)]
pub enum CustomerLookupError {
    /// No registered customer holds this phone number.
    #[error("no customer registered with phone {phone}")]
    NoMatch {
        /// The number that was searched.
        phone: String,
    },

    /// A newer lookup was issued before this one finished, so its result
    /// was discarded.
    #[error("lookup superseded by a newer one")]
    Superseded,

    /// The registry could not be fetched.
    #[error("customer lookup failed")]
    Service(#[from] CustomersServiceError),
}

/// Proof that a lookup was issued, used to discard stale responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket(u64);

/// Where the register stands in one sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No customer selected yet.
    Idle,

    /// A customer is selected and the cart can be charged.
    CustomerSelected,

    /// The charge choreography is running.
    Charging,

    /// A sale finished and its confirmation is still showing.
    Success,
}

/// One register serving one customer.
#[derive(Debug)]
pub struct CheckoutSession {
    operator: Operator,
    stock: StockCache,
    cart: Cart,
    customer: Option<Customer>,
    available_points: u64,
    redeem_points: bool,
    send_email: bool,
    charging: bool,
    completed: Option<ChargeReceipt>,
    lookup_seq: u64,
    confirmation_delay: Duration,
}

impl CheckoutSession {
    /// Open a session for `operator` over a fetched catalog.
    #[must_use]
    pub fn new(operator: Operator, stock: StockCache) -> Self {
        Self {
            operator,
            stock,
            cart: Cart::new(),
            customer: None,
            available_points: 0,
            redeem_points: false,
            send_email: false,
            charging: false,
            completed: None,
            lookup_seq: 0,
            confirmation_delay: CONFIRMATION_DELAY,
        }
    }

    /// Use a different confirmation delay. Tests pass zero.
    #[must_use]
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// The signed-in employee.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// The local catalog this session sells from.
    pub fn stock(&self) -> &StockCache {
        &self.stock
    }

    /// The cart being built.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The selected customer, if any.
    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    /// Points the selected customer held when they were selected.
    pub fn available_points(&self) -> u64 {
        self.available_points
    }

    /// Whether point redemption is switched on.
    pub fn redeem_points(&self) -> bool {
        self.redeem_points
    }

    /// Whether the invoice should be mailed after the charge.
    pub fn send_email(&self) -> bool {
        self.send_email
    }

    /// The receipt of the sale whose confirmation is still showing.
    pub fn completed(&self) -> Option<&ChargeReceipt> {
        self.completed.as_ref()
    }

    /// Where the session currently stands.
    pub fn phase(&self) -> SessionPhase {
        if self.completed.is_some() {
            SessionPhase::Success
        } else if self.charging {
            SessionPhase::Charging
        } else if self.customer.is_some() {
            SessionPhase::CustomerSelected
        } else {
            SessionPhase::Idle
        }
    }

    /// Add one unit of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an [`AddToCartError`] when the product is not in the catalog
    /// or has no stock left.
    pub fn add_to_cart(&mut self, product_id: ProductId) -> Result<(), AddToCartError> {
        let product = self
            .stock
            .find(product_id)
            .ok_or(AddToCartError::UnknownProduct { id: product_id })?;

        if !product.in_stock() {
            return Err(AddToCartError::OutOfStock {
                name: product.name.clone(),
            });
        }

        self.cart.add(product);
        Ok(())
    }

    /// Take one unit of a product back out of the cart.
    pub fn remove_one_from_cart(&mut self, product_id: ProductId) {
        self.cart.remove_one(product_id);
    }

    /// Select `customer` and seed the loyalty state from their record.
    ///
    /// The balance captured here is what redemption works against for the
    /// rest of the sale, even if the backend record changes meanwhile.
    pub fn select_customer(&mut self, customer: Customer) {
        self.available_points = customer.loyalty_points;
        self.customer = Some(customer);
    }

    /// Drop the selected customer and the loyalty state seeded from them.
    pub fn clear_customer(&mut self) {
        self.customer = None;
        self.available_points = 0;
    }

    /// Turn point redemption on or off.
    ///
    /// Turning it on is refused while the birthday discount is active;
    /// the two never combine. Returns whether the request took effect.
    pub fn set_redeem_points(&mut self, redeem: bool, today: Date) -> bool {
        if redeem && !discounts::birthday_percent(self.birth_date(), today).is_zero() {
            return false;
        }

        self.redeem_points = redeem;
        true
    }

    /// Choose whether to mail the invoice after the charge.
    pub fn set_send_email(&mut self, send: bool) {
        self.send_email = send;
    }

    /// Price the current cart for the selected customer.
    #[must_use]
    pub fn discount(&self, today: Date) -> DiscountBreakdown {
        DiscountBreakdown::compute(
            self.cart.subtotal(),
            self.birth_date(),
            self.redeem_points,
            self.available_points,
            today,
        )
    }

    fn birth_date(&self) -> Option<Date> {
        self.customer.as_ref().and_then(|customer| customer.birth_date)
    }

    /// Issue a ticket for a lookup that is about to start.
    ///
    /// Only the most recently issued ticket may apply its result; every
    /// earlier ticket goes stale the moment a newer one is issued.
    pub fn begin_lookup(&mut self) -> LookupTicket {
        self.lookup_seq += 1;
        LookupTicket(self.lookup_seq)
    }

    /// Apply a lookup result if its ticket is still the newest.
    ///
    /// `Some` selects the customer, `None` clears the selection. A stale
    /// ticket changes nothing. Returns whether the result was applied.
    pub fn apply_lookup(&mut self, ticket: LookupTicket, customer: Option<Customer>) -> bool {
        if ticket.0 != self.lookup_seq {
            return false;
        }

        match customer {
            Some(customer) => self.select_customer(customer),
            None => self.clear_customer(),
        }

        true
    }

    /// Invalidate every outstanding lookup ticket.
    pub fn cancel_lookups(&mut self) {
        self.lookup_seq += 1;
    }

    /// Fetch the registry and select whoever holds `phone` exactly.
    ///
    /// A phone that matches nobody clears the selection and reports
    /// [`CustomerLookupError::NoMatch`]; an interactive caller typing digit
    /// by digit can ignore that and keep going.
    ///
    /// # Errors
    ///
    /// Returns a [`CustomerLookupError`] when the registry cannot be
    /// fetched, nobody matches, or a newer lookup superseded this one.
    pub async fn lookup_customer(
        &mut self,
        ctx: &PosContext,
        phone: &str,
    ) -> Result<CustomerId, CustomerLookupError> {
        let ticket = self.begin_lookup();
        let registry = ctx.customers.list_customers().await?;

        let found = customers::find_by_phone(&registry, phone).cloned();
        let id = found.as_ref().map(|customer| customer.id);

        if !self.apply_lookup(ticket, found) {
            return Err(CustomerLookupError::Superseded);
        }

        id.ok_or_else(|| CustomerLookupError::NoMatch {
            phone: phone.to_string(),
        })
    }

    /// Charge the selected customer for the cart.
    ///
    /// On success the session holds the receipt until
    /// [`conclude`](Self::conclude) runs; further charges are refused in
    /// the meantime. A failed order submission leaves the session exactly
    /// as it was, ready to retry.
    ///
    /// # Errors
    ///
    /// Returns a [`ChargeError`] when the session is not ready, a
    /// transaction is already in progress, or the backend refuses the
    /// order.
    pub async fn charge(
        &mut self,
        ctx: &PosContext,
        today: Date,
    ) -> Result<ChargeReceipt, ChargeError> {
        if self.charging || self.completed.is_some() {
            return Err(ChargeError::TransactionInProgress);
        }

        let Some(customer) = self.customer.clone() else {
            return Err(ValidationError::NoCustomer.into());
        };

        if self.cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }

        self.charging = true;
        let result = self.run_charge(ctx, customer, today).await;
        self.charging = false;

        let receipt = result?;
        self.completed = Some(receipt.clone());

        Ok(receipt)
    }

    async fn run_charge(
        &mut self,
        ctx: &PosContext,
        customer: Customer,
        today: Date,
    ) -> Result<ChargeReceipt, ChargeError> {
        let pricing = self.discount(today);
        let draft = OrderDraft::from_cart(customer.id, &self.cart, pricing.points_redeemed());

        let confirmation = ctx.orders.submit_order(&draft).await?;

        info!(
            transaction = %confirmation.transaction_id,
            total = %confirmation.total,
            "order accepted"
        );

        // Points are earned on what the backend actually charged, not on
        // the register's own arithmetic.
        let points_earned = loyalty::points_earned(confirmation.total);
        let final_points = customer
            .loyalty_points
            .saturating_add(points_earned)
            .saturating_sub(pricing.points_redeemed());

        let mut updated = customer.clone();
        updated.loyalty_points = final_points;

        let loyalty_status = match ctx.customers.update_customer(&updated).await {
            Ok(_) => LoyaltyStatus::Applied {
                balance: final_points,
            },
            Err(update_error) => {
                // The order already exists, so the sale stands. The stale
                // balance is recorded here and on the receipt for manual
                // reconciliation.
                error!(
                    customer = %customer.id,
                    intended = final_points,
                    error = %update_error,
                    "loyalty write-back failed; backend balance is stale"
                );

                LoyaltyStatus::Stale {
                    intended: final_points,
                    error: update_error.to_string(),
                }
            }
        };

        let email_status = match customer.email_address() {
            Some(address) if self.send_email => {
                match ctx
                    .email
                    .send_receipt(address, &confirmation.transaction_id)
                    .await
                {
                    Ok(()) => EmailStatus::Sent,
                    Err(send_error) => {
                        warn!(error = %send_error, "invoice email failed");
                        EmailStatus::Failed(send_error.to_string())
                    }
                }
            }
            _ => EmailStatus::NotRequested,
        };

        self.stock.record_sale(self.cart.lines());

        Ok(ChargeReceipt {
            transaction_id: confirmation.transaction_id,
            customer_id: customer.id,
            subtotal: pricing.subtotal(),
            discount_percent: pricing.effective_percent(),
            points_redeemed: pricing.points_redeemed(),
            total: confirmation.total,
            points_earned,
            loyalty: loyalty_status,
            email: email_status,
        })
    }

    /// Hold the confirmation on screen, then reset for the next customer.
    ///
    /// Does nothing when no sale just completed. Returns the receipt that
    /// was showing.
    pub async fn conclude(&mut self) -> Option<ChargeReceipt> {
        if self.completed.is_none() {
            return None;
        }

        time::sleep(self.confirmation_delay).await;

        // The receipt is only taken after the delay, so cancelling this
        // future mid-wait leaves the confirmation showing and the charge
        // guard in place.
        let receipt = self.completed.take();
        self.clear();
        receipt
    }

    /// Return the register to an empty session for the next customer.
    ///
    /// The cart, selection, toggles, and any showing confirmation are all
    /// dropped; outstanding lookups are cancelled. The stock cache keeps
    /// its decremented quantities.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.customer = None;
        self.available_points = 0;
        self.redeem_points = false;
        self.send_email = false;
        self.completed = None;
        self.cancel_lookups();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jiff::civil::date;
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;
    use crate::customers::MockCustomersService;
    use crate::email::MockEmailService;
    use crate::orders::{MockOrdersService, TransactionId};
    use crate::products::{MockProductsService, Product};

    fn operator() -> Operator {
        Operator {
            id: 1,
            first_name: "Suneth".to_string(),
            last_name: "Jayawardena".to_string(),
        }
    }

    fn product(id: i64, name: &str, quantity: i64) -> Product {
        Product {
            id: ProductId::from_raw(id),
            name: name.to_string(),
            price: Decimal::from(200),
            quantity,
            category: "Accessories".to_string(),
            image_url: None,
        }
    }

    fn customer(id: i64, points: u64) -> Customer {
        Customer {
            id: CustomerId::from_raw(id),
            first_name: "Nimal".to_string(),
            last_name: "Perera".to_string(),
            email: Some("nimal@example.com".to_string()),
            phone_number: "0771234567".to_string(),
            birth_date: Some(date(1990, 3, 14)),
            loyalty_points: points,
            extra: serde_json::Map::new(),
        }
    }

    fn session() -> CheckoutSession {
        let stock = StockCache::new(vec![
            product(1, "Leather Belt", 5),
            product(2, "Wool Scarf", 0),
        ]);

        CheckoutSession::new(operator(), stock).with_confirmation_delay(Duration::ZERO)
    }

    fn idle_ctx() -> PosContext {
        PosContext::from_parts(
            Arc::new(MockProductsService::new()),
            Arc::new(MockCustomersService::new()),
            Arc::new(MockOrdersService::new()),
            Arc::new(MockEmailService::new()),
        )
    }

    fn receipt() -> ChargeReceipt {
        ChargeReceipt {
            transaction_id: TransactionId::new("TXN-20260825-0001"),
            customer_id: CustomerId::from_raw(3),
            subtotal: Decimal::from(400),
            discount_percent: Decimal::ZERO,
            points_redeemed: 0,
            total: Decimal::from(400),
            points_earned: 0,
            loyalty: LoyaltyStatus::Applied { balance: 120 },
            email: EmailStatus::NotRequested,
        }
    }

    #[test]
    fn a_fresh_session_is_idle() {
        let session = session();

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.cart().is_empty());
        assert_eq!(session.available_points(), 0);
    }

    #[test]
    fn selecting_a_customer_seeds_their_points() {
        let mut session = session();

        session.select_customer(customer(3, 120));

        assert_eq!(session.phase(), SessionPhase::CustomerSelected);
        assert_eq!(session.available_points(), 120);
    }

    #[test]
    fn adding_an_unknown_product_is_refused() {
        let mut session = session();

        let result = session.add_to_cart(ProductId::from_raw(99));

        assert!(
            matches!(result, Err(AddToCartError::UnknownProduct { .. })),
            "expected unknown product, got {result:?}"
        );
        assert!(session.cart().is_empty());
    }

    #[test]
    fn adding_an_out_of_stock_product_is_refused() {
        let mut session = session();

        let result = session.add_to_cart(ProductId::from_raw(2));

        assert!(
            matches!(result, Err(AddToCartError::OutOfStock { .. })),
            "expected out of stock, got {result:?}"
        );
        assert!(session.cart().is_empty());
    }

    #[test]
    fn adding_a_stocked_product_fills_the_cart() -> TestResult {
        let mut session = session();

        session.add_to_cart(ProductId::from_raw(1))?;
        session.add_to_cart(ProductId::from_raw(1))?;

        assert_eq!(session.cart().len(), 1);
        assert_eq!(session.cart().subtotal(), Decimal::from(400));

        Ok(())
    }

    #[test]
    fn redemption_toggle_is_refused_in_the_birth_month() {
        let mut session = session();
        session.select_customer(customer(3, 120));

        // March birthday, March register date.
        assert!(!session.set_redeem_points(true, date(2026, 3, 2)));
        assert!(!session.redeem_points());

        assert!(session.set_redeem_points(true, date(2026, 8, 25)));
        assert!(session.redeem_points());
    }

    #[test]
    fn redemption_can_always_be_turned_off() {
        let mut session = session();
        session.select_customer(customer(3, 120));

        assert!(session.set_redeem_points(true, date(2026, 8, 25)));
        assert!(session.set_redeem_points(false, date(2026, 3, 2)));
        assert!(!session.redeem_points());
    }

    #[test]
    fn only_the_newest_lookup_ticket_applies() {
        let mut session = session();

        let first = session.begin_lookup();
        let second = session.begin_lookup();

        assert!(
            !session.apply_lookup(first, Some(customer(3, 120))),
            "stale ticket must not apply"
        );
        assert_eq!(session.customer(), None);

        assert!(session.apply_lookup(second, Some(customer(4, 60))));
        assert_eq!(session.available_points(), 60);
    }

    #[test]
    fn applying_no_match_clears_the_selection() {
        let mut session = session();
        session.select_customer(customer(3, 120));

        let ticket = session.begin_lookup();
        assert!(session.apply_lookup(ticket, None));

        assert_eq!(session.customer(), None);
        assert_eq!(session.available_points(), 0);
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn cancel_invalidates_outstanding_tickets() {
        let mut session = session();

        let ticket = session.begin_lookup();
        session.cancel_lookups();

        assert!(!session.apply_lookup(ticket, Some(customer(3, 120))));
        assert_eq!(session.customer(), None);
    }

    #[tokio::test]
    async fn charging_without_a_customer_is_refused() {
        let mut session = session();

        let result = session.charge(&idle_ctx(), date(2026, 8, 25)).await;

        assert!(
            matches!(
                result,
                Err(ChargeError::Validation(ValidationError::NoCustomer))
            ),
            "expected NoCustomer, got {result:?}"
        );
    }

    #[tokio::test]
    async fn charging_an_empty_cart_is_refused() {
        let mut session = session();
        session.select_customer(customer(3, 120));

        let result = session.charge(&idle_ctx(), date(2026, 8, 25)).await;

        assert!(
            matches!(
                result,
                Err(ChargeError::Validation(ValidationError::EmptyCart))
            ),
            "expected EmptyCart, got {result:?}"
        );
    }

    #[tokio::test]
    async fn charging_is_refused_while_a_confirmation_is_showing() {
        let mut session = session();
        session.select_customer(customer(3, 120));
        session.completed = Some(receipt());

        let result = session.charge(&idle_ctx(), date(2026, 8, 25)).await;

        assert!(
            matches!(result, Err(ChargeError::TransactionInProgress)),
            "expected TransactionInProgress, got {result:?}"
        );
    }

    #[tokio::test]
    async fn conclude_returns_the_receipt_and_resets() -> TestResult {
        let mut session = session();
        session.select_customer(customer(3, 120));
        session.add_to_cart(ProductId::from_raw(1))?;
        session.set_send_email(true);
        session.completed = Some(receipt());

        let receipt = session.conclude().await.ok_or("no receipt returned")?;

        assert_eq!(receipt.transaction_id, TransactionId::new("TXN-20260825-0001"));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.cart().is_empty());
        assert_eq!(session.customer(), None);
        assert!(!session.send_email());
        assert!(!session.redeem_points());

        Ok(())
    }

    #[tokio::test]
    async fn conclude_without_a_completed_sale_does_nothing() {
        let mut session = session();
        session.select_customer(customer(3, 120));

        assert_eq!(session.conclude().await, None);
        assert_eq!(session.phase(), SessionPhase::CustomerSelected);
    }
}
