use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{validate_url, Validate};
use std::env;

/// Settings of the form relay function, read from its environment.
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub form_url: String,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            form_url: env::var("FORM_URL").map_err(|_| LedgerError::MissingConfigError {
                field: "FORM_URL".to_string(),
            })?,
        })
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_url("FORM_URL", &self.form_url)?;

        tracing::info!("Lambda configuration validation passed");
        Ok(())
    }
}
