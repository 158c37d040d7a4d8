//! Register configuration

use clap::Parser;

use tillpoint::context::{BackendConfig, Operator};

/// Tillpoint register configuration
#[derive(Debug, Parser)]
#[command(name = "tillpoint", about = "Tillpoint retail register", long_about = None)]
pub struct RegisterConfig {
    /// Base URL of the store backend API
    #[arg(
        long,
        env = "POS_BACKEND_URL",
        default_value = "http://localhost:5000/api"
    )]
    pub backend_url: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "POS_LOG", default_value = "info")]
    pub log_level: String,

    /// Employee id shown on the register
    #[arg(long, env = "POS_OPERATOR_ID", default_value = "1")]
    pub operator_id: i64,

    /// Employee first name
    #[arg(long, env = "POS_OPERATOR_FIRST_NAME", default_value = "Store")]
    pub operator_first_name: String,

    /// Employee last name
    #[arg(long, env = "POS_OPERATOR_LAST_NAME", default_value = "Operator")]
    pub operator_last_name: String,

    /// Phone number of the customer being charged
    #[arg(long)]
    pub phone: Option<String>,

    /// Product id to sell; repeat the flag to sell several units
    #[arg(long = "item", value_name = "PRODUCT_ID")]
    pub items: Vec<i64>,

    /// Spend the customer's loyalty points on this sale
    #[arg(long)]
    pub redeem_points: bool,

    /// Mail the invoice once the charge succeeds
    #[arg(long)]
    pub send_email: bool,

    /// Show the order history instead of running a sale
    #[arg(long)]
    pub history: bool,

    /// Filter the history by transaction id or phone
    #[arg(long, requires = "history")]
    pub search: Option<String>,
}

impl RegisterConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// The backend every collaborator talks to.
    #[must_use]
    pub fn backend(&self) -> BackendConfig {
        BackendConfig::new(self.backend_url.as_str())
    }

    /// The employee running this register.
    #[must_use]
    pub fn operator(&self) -> Operator {
        Operator {
            id: self.operator_id,
            first_name: self.operator_first_name.clone(),
            last_name: self.operator_last_name.clone(),
        }
    }
}
