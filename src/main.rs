//! Tillpoint register CLI

use std::io;
use std::process;

use jiff::Zoned;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tillpoint::checkout::{AddToCartError, ChargeError, CheckoutSession, CustomerLookupError};
use tillpoint::context::PosContext;
use tillpoint::orders::{self, OrdersServiceError};
use tillpoint::products::{ProductId, ProductsServiceError, StockCache};
use tillpoint::receipt::write_receipt;

use crate::config::RegisterConfig;

mod config;

/// Everything that can abort a register run.
#[derive(Debug, Error)]
enum RegisterError {
    /// A sale run was missing its arguments.
    #[error("a sale needs --phone and at least one --item")]
    MissingSaleArguments,

    /// The catalog could not be fetched.
    #[error(transparent)]
    Products(#[from] ProductsServiceError),

    /// The history could not be fetched.
    #[error(transparent)]
    Orders(#[from] OrdersServiceError),

    /// The customer lookup failed or matched nobody.
    #[error(transparent)]
    Lookup(#[from] CustomerLookupError),

    /// A product could not be added to the cart.
    #[error(transparent)]
    Cart(#[from] AddToCartError),

    /// The charge itself failed.
    #[error(transparent)]
    Charge(#[from] ChargeError),

    /// Terminal output failed.
    #[error("could not write to the terminal")]
    Io(#[from] io::Error),
}

/// Tillpoint register entry point
#[tokio::main]
pub async fn main() {
    // Load configuration from .env and CLI arguments
    let config = RegisterConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(1);
    });

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let ctx = PosContext::new(&config.backend());

    let outcome = if config.history {
        show_history(&ctx, config.search.as_deref().unwrap_or_default()).await
    } else {
        run_sale(&ctx, &config).await
    };

    if let Err(run_error) = outcome {
        error!(error = %run_error, "register run failed");

        process::exit(1);
    }
}

/// Run one scripted sale from the command line flags.
async fn run_sale(ctx: &PosContext, config: &RegisterConfig) -> Result<(), RegisterError> {
    let Some(phone) = config.phone.as_deref() else {
        return Err(RegisterError::MissingSaleArguments);
    };

    if config.items.is_empty() {
        return Err(RegisterError::MissingSaleArguments);
    }

    let catalog = ctx.products.list_products().await?;
    info!(products = catalog.len(), "catalog loaded");

    let mut session = CheckoutSession::new(config.operator(), StockCache::new(catalog));

    let customer_id = session.lookup_customer(ctx, phone).await?;
    info!(
        customer = %customer_id,
        points = session.available_points(),
        "customer selected"
    );

    for id in &config.items {
        session.add_to_cart(ProductId::from_raw(*id))?;
    }

    let today = Zoned::now().date();

    if config.redeem_points && !session.set_redeem_points(true, today) {
        info!("birthday discount active; --redeem-points ignored");
    }

    session.set_send_email(config.send_email);

    let pricing = session.discount(today);
    info!(
        subtotal = %pricing.subtotal(),
        discount_percent = %pricing.effective_percent(),
        total = %pricing.total(),
        "sale priced"
    );

    let receipt = session.charge(ctx, today).await?;
    write_receipt(&mut io::stdout(), &receipt)?;

    // Keep the confirmation up, then reset for the next customer.
    session.conclude().await;

    Ok(())
}

/// Print the order history, filtered like the history screen's search box.
async fn show_history(ctx: &PosContext, term: &str) -> Result<(), RegisterError> {
    let history = ctx.orders.list_orders().await?;
    let matching = orders::search(&history, term);

    info!(
        orders = history.len(),
        matching = matching.len(),
        "history loaded"
    );

    orders::write_history(&mut io::stdout(), &matching)?;

    Ok(())
}
