use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::checkout::{DeviceInfo, DiscountType, PaymentMethod};

pub mod commands;

#[derive(Parser)]
#[command(name = "pos-checkout", version)]
#[command(about = "Point-of-sale checkout client")]
#[command(long_about = "pos-checkout runs the checkout workflow of a point-of-sale terminal against \
                       the POS API: customer lookup, optional device intake, discount and payment \
                       settlement, and sale submission.")]
pub struct Cli {
    /// Configuration file to use instead of ./pos-checkout.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show cart total, discount and change without contacting the API
    Quote {
        /// Cart total to quote against
        #[arg(long, conflicts_with = "cart", required_unless_present = "cart")]
        total: Option<f64>,
        /// JSON file holding the cart lines
        #[arg(long, value_name = "FILE")]
        cart: Option<PathBuf>,
        /// Discount value (amount or percent)
        #[arg(long, default_value = "0")]
        discount: f64,
        /// How the discount value is applied
        #[arg(long, default_value = "fixed", help = "Discount type: fixed or percentage")]
        discount_type: DiscountType,
        /// Cash handed over by the customer
        #[arg(long)]
        cash: Option<String>,
    },
    /// Print the normalised form of a phone number
    NormalizePhone {
        phone: String,
    },
    /// Look up or register customers
    Customers {
        #[command(subcommand)]
        action: CustomerAction,
    },
    /// List devices registered for a customer
    Devices {
        #[arg(long, value_name = "ID")]
        customer: String,
    },
    /// Run a complete checkout against the POS API
    Checkout(CheckoutArgs),
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum CustomerAction {
    /// Search customers by phone number
    Search {
        #[arg(long)]
        phone: String,
        /// Maximum number of matches (defaults to checkout.customer_search_limit)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Register a new customer
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (token masked)
    Show,
    /// Write a configuration file with default values
    Init {
        #[arg(long, default_value = crate::config::DEFAULT_CONFIG_FILE)]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CheckoutArgs {
    /// JSON file holding the cart lines
    #[arg(long, value_name = "FILE")]
    pub cart: PathBuf,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long)]
    pub email: Option<String>,
    /// Use an existing customer record
    #[arg(long, value_name = "ID")]
    pub customer_id: Option<String>,
    #[arg(long, help = "Payment method: cash or card")]
    pub method: PaymentMethod,
    /// Cash handed over (cash payments)
    #[arg(long)]
    pub cash: Option<String>,
    /// Card number (card payments); only the last four digits are sent
    #[arg(long)]
    pub card: Option<String>,
    #[arg(long, default_value = "0")]
    pub discount: f64,
    #[arg(long, default_value = "fixed")]
    pub discount_type: DiscountType,
    #[arg(long)]
    pub discount_reason: Option<String>,
    /// Device booked in with the sale, as TYPE:BRAND:MODEL[:SERIAL[:IMEI]] (repeatable)
    #[arg(long = "device", value_name = "SPEC", value_parser = commands::checkout::parse_device_spec)]
    pub devices: Vec<DeviceInfo>,
    /// Save the invoice of the completed sale to this path
    #[arg(long, value_name = "PATH")]
    pub invoice: Option<PathBuf>,
}
