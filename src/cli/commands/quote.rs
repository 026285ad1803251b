use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::checkout::pricing::{
    cart_total, change_due, discount_amount, discounted_total, parse_amount, round_currency,
};
use crate::checkout::DiscountType;
use crate::cli::commands::load_cart;

pub struct QuoteCommand {
    pub total: Option<f64>,
    pub cart: Option<PathBuf>,
    pub discount: f64,
    pub discount_type: DiscountType,
    pub cash: Option<String>,
}

impl QuoteCommand {
    pub async fn execute(&self) -> Result<()> {
        if !self.discount.is_finite() || self.discount < 0.0 {
            bail!("Discount must be a non-negative amount, got {}", self.discount);
        }

        let total = match (&self.cart, self.total) {
            (Some(path), _) => cart_total(&load_cart(path).await?),
            (None, Some(total)) => total,
            (None, None) => bail!("Provide either --total or --cart"),
        };

        let discount = discount_amount(total, self.discount_type, self.discount);
        let due = round_currency(discounted_total(total, self.discount_type, self.discount));

        println!("🧮 Cart total:       {:.2}", round_currency(total));
        println!("   Discount:         {:.2}", round_currency(discount));
        println!("   Amount due:       {:.2}", due);

        if let Some(raw) = &self.cash {
            let Some(cash) = parse_amount(raw) else {
                bail!("Please enter a valid cash amount, got '{raw}'");
            };
            println!("   Cash received:    {:.2}", cash);
            println!("   Change:           {:.2}", round_currency(change_due(cash, due)));
            if cash < due {
                println!("⚠️  Cash received does not cover the amount due");
            }
        }
        Ok(())
    }
}
