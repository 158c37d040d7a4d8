//! Tillpoint
//!
//! Tillpoint is the checkout engine of a small retail point of sale: cart
//! building, birthday and loyalty-point discounts, and the charge
//! choreography against the store's HTTP backend.

pub mod cart;
pub mod checkout;
pub mod context;
pub mod customers;
pub mod discounts;
pub mod email;
pub mod ids;
pub mod loyalty;
pub mod orders;
pub mod products;
pub mod receipt;
