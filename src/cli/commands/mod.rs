use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::backend::{BackendError, HttpPosBackend};
use crate::checkout::{CartLine, CheckoutError, Customer};
use crate::config::ApiConfig;

pub mod checkout;
pub mod config;
pub mod customers;
pub mod devices;
pub mod phone;
pub mod quote;

/// Read a JSON array of cart lines
pub async fn load_cart(path: &Path) -> Result<Vec<CartLine>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read cart file {}", path.display()))?;
    let lines: Vec<CartLine> = serde_json::from_str(&raw)
        .with_context(|| format!("Cart file {} is not a JSON array of cart lines", path.display()))?;
    Ok(lines)
}

pub fn connect(settings: &ApiConfig) -> Result<Arc<HttpPosBackend>> {
    let backend = HttpPosBackend::new(settings).map_err(|e| report_backend_error(e, "connect"))?;
    Ok(Arc::new(backend))
}

/// Print the operator hint for a backend failure and hand the error back
pub fn report_backend_error(error: BackendError, action: &str) -> anyhow::Error {
    eprintln!("❌ Failed to {action}: {error}");
    eprintln!("   💡 {}", error.hint());
    anyhow::Error::new(error)
}

pub fn report_checkout_error(error: CheckoutError, action: &str) -> anyhow::Error {
    match error {
        CheckoutError::Backend(e) => report_backend_error(e, action),
        other => {
            eprintln!("❌ Failed to {action}: {other}");
            anyhow::Error::new(other)
        }
    }
}

pub fn print_customer(customer: &Customer) {
    let email = customer.email.as_deref().unwrap_or("-");
    println!("   👤 {} | {} | {} | {}", customer.id, customer.name, customer.phone, email);
}

pub fn show_getting_started() -> Result<()> {
    println!("🛒 pos-checkout - point-of-sale checkout client");
    println!();
    println!("Offline:");
    println!("  🧮 pos-checkout quote --total 250 --discount 50 --cash 300");
    println!("  📞 pos-checkout normalize-phone 0771234567");
    println!();
    println!("Against the POS API:");
    println!("  🔍 pos-checkout customers search --phone 0771234567");
    println!("  📱 pos-checkout devices --customer <ID>");
    println!("  💳 pos-checkout checkout --cart cart.json --name 'Nimal' --method cash --cash 300");
    println!();
    println!("💡 Run 'pos-checkout config init' to write a configuration file");
    Ok(())
}
