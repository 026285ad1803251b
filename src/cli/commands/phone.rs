use anyhow::Result;

use crate::checkout::{is_valid_phone, normalize_phone};

pub struct NormalizePhoneCommand {
    pub phone: String,
}

impl NormalizePhoneCommand {
    pub fn new(phone: String) -> Self {
        Self { phone }
    }

    pub fn execute(&self) -> Result<()> {
        let normalized = normalize_phone(&self.phone);
        if is_valid_phone(&self.phone) {
            println!("{normalized}");
        } else {
            println!("{normalized} (not a valid +94 mobile number)");
        }
        Ok(())
    }
}
