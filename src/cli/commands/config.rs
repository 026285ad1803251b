use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::PosCheckoutConfig;

pub struct ShowConfigCommand;

impl ShowConfigCommand {
    pub fn execute(&self, settings: &PosCheckoutConfig) -> Result<()> {
        print!("{}", toml::to_string_pretty(&settings.redacted())?);
        Ok(())
    }
}

pub struct InitConfigCommand {
    pub path: PathBuf,
    pub force: bool,
}

impl InitConfigCommand {
    pub fn execute(&self) -> Result<()> {
        if self.path.exists() && !self.force {
            bail!(
                "{} already exists (use --force to overwrite)",
                self.path.display()
            );
        }
        PosCheckoutConfig::default().save_to_file(&self.path)?;
        println!("✅ Wrote default configuration to {}", self.path.display());
        println!("   💡 Set POS_API_TOKEN or api.token before talking to the POS API");
        Ok(())
    }
}
