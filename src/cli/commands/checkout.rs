use anyhow::{Context, Result};

use crate::checkout::{
    normalize_phone, CheckoutController, CheckoutError, CheckoutReceipt, CheckoutStep, Customer,
    DeviceInfo, DeviceType,
};
use crate::cli::commands::{connect, load_cart, report_backend_error, report_checkout_error};
use crate::cli::CheckoutArgs;
use crate::config::PosCheckoutConfig;

/// Parse `TYPE:BRAND:MODEL[:SERIAL[:IMEI]]`
pub fn parse_device_spec(spec: &str) -> Result<DeviceInfo, String> {
    let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
    if !(3..=5).contains(&parts.len()) {
        return Err(format!(
            "expected TYPE:BRAND:MODEL[:SERIAL[:IMEI]], got '{spec}'"
        ));
    }

    let device_type: DeviceType = parts[0].parse()?;
    if parts[1].is_empty() || parts[2].is_empty() {
        return Err(format!("brand and model are required in '{spec}'"));
    }

    let optional = |index: usize| {
        parts
            .get(index)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
    };
    let mut device = DeviceInfo::new(device_type, parts[1], parts[2]);
    device.serial_number = optional(3);
    device.imei = optional(4);
    Ok(device)
}

pub struct CheckoutCommand {
    pub args: CheckoutArgs,
}

impl CheckoutCommand {
    pub fn new(args: CheckoutArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, settings: &PosCheckoutConfig) -> Result<()> {
        let cart = load_cart(&self.args.cart).await?;
        let backend = connect(&settings.api)?;

        let mut checkout_settings = settings.checkout.clone();
        checkout_settings.capture_devices |= !self.args.devices.is_empty();
        // steps are driven back to back, nothing is displayed between them
        checkout_settings.settle_delay_ms = 0;

        let mut checkout = CheckoutController::new(backend.clone(), checkout_settings);
        println!("🛒 Checking out {} cart line(s)...", cart.len());

        let receipt = self
            .run(&mut checkout, &cart)
            .await
            .map_err(|e| report_checkout_error(e, "complete the checkout"))?;

        println!("✅ Sale completed");
        println!("   🧾 Reference:   {}", receipt.order.reference);
        if let Some(number) = &receipt.ack.sale_number {
            println!("   🔢 Sale number: {number}");
        }
        println!("   💰 Total:       {:.2}", receipt.order.payment.total_amount);
        if let Some(change) = receipt.order.payment.change {
            println!("   💵 Change:      {change:.2}");
        }

        if let Some(path) = &self.args.invoice {
            match &receipt.ack.sale_id {
                Some(sale_id) => {
                    let invoice = backend
                        .download_invoice(sale_id)
                        .await
                        .map_err(|e| report_backend_error(e, "download the invoice"))?;
                    tokio::fs::write(path, invoice)
                        .await
                        .with_context(|| format!("Failed to write invoice to {}", path.display()))?;
                    println!("   📄 Invoice saved to {}", path.display());
                }
                None => println!("⚠️  The API did not return a sale id; no invoice downloaded"),
            }
        }
        Ok(())
    }

    async fn run(
        &self,
        checkout: &mut CheckoutController,
        cart: &[crate::checkout::CartLine],
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let args = &self.args;
        checkout.open(cart)?;

        match &args.customer_id {
            Some(id) => checkout.select_customer(Customer {
                id: id.clone(),
                name: args.name.clone(),
                phone: normalize_phone(args.phone.trim()),
                email: args.email.clone(),
            })?,
            None => {
                checkout.enter_name(&args.name)?;
                checkout.enter_phone(&args.phone)?;
                if let Some(email) = &args.email {
                    checkout.enter_email(email)?;
                }
            }
        }
        checkout.continue_to_next()?;

        if checkout.step() == CheckoutStep::DeviceCount {
            let count = u32::try_from(args.devices.len()).unwrap_or(u32::MAX);
            checkout.set_device_count(count)?;
            for device in &args.devices {
                checkout.save_device(device.clone())?;
            }
        }

        checkout.select_payment_method(args.method)?;
        if let Some(cash) = &args.cash {
            checkout.enter_cash_received(cash)?;
        }
        if let Some(card) = &args.card {
            checkout.enter_card_number(card)?;
        }
        checkout.apply_discount(args.discount_type, args.discount, args.discount_reason.as_deref())?;

        let quote = checkout.quote();
        println!(
            "   Amount due {:.2} (cart {:.2}, discount {:.2})",
            quote.discounted_total, quote.cart_total, quote.discount_amount
        );
        checkout.submit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_spec_full() {
        let device = parse_device_spec("mobile:Samsung:Galaxy A54:SN123:356789012345678").unwrap();
        assert_eq!(device.device_type, DeviceType::Mobile);
        assert_eq!(device.brand, "Samsung");
        assert_eq!(device.model, "Galaxy A54");
        assert_eq!(device.serial_number.as_deref(), Some("SN123"));
        assert_eq!(device.imei.as_deref(), Some("356789012345678"));
        assert!(device.id.is_none());
    }

    #[test]
    fn test_parse_device_spec_minimal_and_errors() {
        let device = parse_device_spec("LAPTOP:Dell:XPS").unwrap();
        assert_eq!(device.device_type, DeviceType::Laptop);
        assert!(device.serial_number.is_none());

        assert!(parse_device_spec("LAPTOP:Dell").is_err());
        assert!(parse_device_spec("TOASTER:Dell:XPS").is_err());
        assert!(parse_device_spec("TABLET::iPad").is_err());
        assert!(parse_device_spec("a:b:c:d:e:f").is_err());
    }
}
