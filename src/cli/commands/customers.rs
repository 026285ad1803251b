use anyhow::Result;

use crate::backend::PosBackend;
use crate::checkout::{decode_customer_list, normalize_phone, validated_phone, CustomerDraft};
use crate::cli::commands::{connect, print_customer, report_backend_error};
use crate::config::PosCheckoutConfig;

pub struct SearchCustomersCommand {
    pub phone: String,
    pub limit: u32,
}

impl SearchCustomersCommand {
    pub async fn execute(&self, settings: &PosCheckoutConfig) -> Result<()> {
        let backend = connect(&settings.api)?;
        let query = normalize_phone(self.phone.trim());
        println!("🔍 Searching customers by {query}...");

        let payload = backend
            .search_customers(&query, self.limit)
            .await
            .map_err(|e| report_backend_error(e, "search customers"))?;
        let customers = decode_customer_list(payload);

        if customers.is_empty() {
            println!("📋 No matching customers");
            return Ok(());
        }
        println!("📋 {} matching customer(s):", customers.len());
        for customer in &customers {
            print_customer(customer);
        }
        Ok(())
    }
}

pub struct CreateCustomerCommand {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl CreateCustomerCommand {
    pub async fn execute(&self, settings: &PosCheckoutConfig) -> Result<()> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            anyhow::bail!("Customer name is required");
        }
        let draft = CustomerDraft {
            name,
            phone: validated_phone(&self.phone)?,
            email: self
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
        };

        let backend = connect(&settings.api)?;
        let customer = backend
            .create_customer(&draft)
            .await
            .map_err(|e| report_backend_error(e, "create the customer"))?;

        println!("✅ Customer registered");
        print_customer(&customer);
        Ok(())
    }
}
