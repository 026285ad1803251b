use anyhow::Result;

use crate::backend::PosBackend;
use crate::cli::commands::{connect, report_backend_error};
use crate::config::PosCheckoutConfig;

pub struct DevicesCommand {
    pub customer_id: String,
}

impl DevicesCommand {
    pub async fn execute(&self, settings: &PosCheckoutConfig) -> Result<()> {
        let backend = connect(&settings.api)?;
        let devices = backend
            .get_customer_devices(&self.customer_id)
            .await
            .map_err(|e| report_backend_error(e, "list devices"))?;

        if devices.is_empty() {
            println!("📋 No devices registered for customer {}", self.customer_id);
            return Ok(());
        }
        println!("📱 {} device(s) for customer {}:", devices.len(), self.customer_id);
        for device in &devices {
            let serial = device.serial_number.as_deref().unwrap_or("-");
            let imei = device.imei.as_deref().unwrap_or("-");
            println!(
                "   {} | {:?} | {} {} | serial {} | imei {}",
                device.id, device.device_type, device.brand, device.model, serial, imei
            );
        }
        Ok(())
    }
}
