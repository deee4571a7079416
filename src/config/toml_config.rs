use crate::core::writer::BalancePolicy;
use crate::domain::model::ListName;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub lists: ListsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ledger: LedgerOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub site_url: String,
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListsConfig {
    #[serde(default = "default_products_list")]
    pub products: String,
    #[serde(default = "default_inbound_list")]
    pub inbound: String,
    #[serde(default = "default_outbound_list")]
    pub outbound: String,
    #[serde(default)]
    pub entity_types: EntityTypes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityTypes {
    pub products: Option<String>,
    pub inbound: Option<String>,
    pub outbound: Option<String>,
}

fn default_products_list() -> String {
    "Produtos".to_string()
}

fn default_inbound_list() -> String {
    "Entradas".to_string()
}

fn default_outbound_list() -> String {
    "Saidas".to_string()
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            products: default_products_list(),
            inbound: default_inbound_list(),
            outbound: default_outbound_list(),
            entity_types: EntityTypes::default(),
        }
    }
}

/// Where the request digest comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Ask the site's context endpoint before writes.
    #[default]
    ContextInfo,
    /// Digest handed over by the hosting page or environment.
    Static { digest: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerOptions {
    #[serde(default)]
    pub balance_policy: BalancePolicy,
}

impl LedgerConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LedgerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LedgerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` references (e.g. `${REQUEST_DIGEST}`) with environment values.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LedgerError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// The configured static digest, unless it is blank or an unresolved
    /// `${VAR}` placeholder.
    pub fn static_digest(&self) -> Option<&str> {
        match &self.auth {
            AuthConfig::Static { digest } => {
                let digest = digest.trim();
                if digest.is_empty() || digest.starts_with("${") {
                    None
                } else {
                    Some(digest)
                }
            }
            AuthConfig::ContextInfo => None,
        }
    }

    pub fn balance_policy(&self) -> BalancePolicy {
        self.ledger.balance_policy
    }
}

impl ConfigProvider for LedgerConfig {
    fn site_url(&self) -> &str {
        self.store.site_url.trim_end_matches('/')
    }

    fn list_title(&self, list: ListName) -> &str {
        match list {
            ListName::Products => &self.lists.products,
            ListName::InboundMovements => &self.lists.inbound,
            ListName::OutboundMovements => &self.lists.outbound,
        }
    }

    fn entity_type(&self, list: ListName) -> Option<&str> {
        let types = &self.lists.entity_types;
        match list {
            ListName::Products => types.products.as_deref(),
            ListName::InboundMovements => types.inbound.as_deref(),
            ListName::OutboundMovements => types.outbound.as_deref(),
        }
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.store.headers
    }

    fn timeout(&self) -> Option<Duration> {
        self.store.timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for LedgerConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_url("store.site_url", &self.store.site_url)?;

        if let Some(timeout) = self.store.timeout_seconds {
            validate_positive_number("store.timeout_seconds", timeout, 1)?;
        }

        validate_non_empty_string("lists.products", &self.lists.products)?;
        validate_non_empty_string("lists.inbound", &self.lists.inbound)?;
        validate_non_empty_string("lists.outbound", &self.lists.outbound)?;

        let titles = [
            &self.lists.products,
            &self.lists.inbound,
            &self.lists.outbound,
        ];
        if titles[0] == titles[1] || titles[0] == titles[2] || titles[1] == titles[2] {
            return Err(LedgerError::InvalidConfigValueError {
                field: "lists".to_string(),
                value: format!("{:?}", titles),
                reason: "each list needs its own title".to_string(),
            });
        }

        tracing::debug!("Ledger configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let toml_content = r#"
[store]
site_url = "https://contoso.sharepoint.com/sites/Stock/"
"#;

        let config = LedgerConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.site_url(), "https://contoso.sharepoint.com/sites/Stock");
        assert_eq!(config.list_title(ListName::Products), "Produtos");
        assert_eq!(config.list_title(ListName::OutboundMovements), "Saidas");
        assert_eq!(config.auth, AuthConfig::ContextInfo);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.balance_policy(), BalancePolicy::Captured);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[store]
site_url = "https://contoso.sharepoint.com/sites/Stock"
timeout_seconds = 15

[store.headers]
Cookie = "FedAuth=abc"

[lists]
products = "EntradaAPI"
inbound = "Entradas"
outbound = "Saidas"

[lists.entity_types]
products = "SP.Data.EntradaAPIListItem"

[auth]
type = "static"
digest = "0xDIGEST"

[ledger]
balance_policy = "recheck"
"#;

        let config = LedgerConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.list_title(ListName::Products), "EntradaAPI");
        assert_eq!(
            config.entity_type(ListName::Products),
            Some("SP.Data.EntradaAPIListItem")
        );
        assert_eq!(config.entity_type(ListName::InboundMovements), None);
        assert_eq!(config.headers().get("Cookie").unwrap(), "FedAuth=abc");
        assert_eq!(config.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.static_digest(), Some("0xDIGEST"));
        assert_eq!(config.balance_policy(), BalancePolicy::Recheck);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("STOCK_LEDGER_TEST_SITE", "https://env.sharepoint.com/sites/x");

        let toml_content = r#"
[store]
site_url = "${STOCK_LEDGER_TEST_SITE}"

[auth]
type = "static"
digest = "${STOCK_LEDGER_TEST_UNSET_DIGEST}"
"#;

        let config = LedgerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.site_url(), "https://env.sharepoint.com/sites/x");
        // unresolved placeholders never count as a digest
        assert_eq!(config.static_digest(), None);

        std::env::remove_var("STOCK_LEDGER_TEST_SITE");
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = LedgerConfig::from_toml_str(
            r#"
[store]
site_url = "not-a-url"
"#,
        )
        .unwrap();
        assert!(invalid_url.validate().is_err());

        let shared_title = LedgerConfig::from_toml_str(
            r#"
[store]
site_url = "https://contoso.sharepoint.com"

[lists]
products = "Stock"
inbound = "Stock"
"#,
        )
        .unwrap();
        assert!(shared_title.validate().is_err());

        let zero_timeout = LedgerConfig::from_toml_str(
            r#"
[store]
site_url = "https://contoso.sharepoint.com"
timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[store]
site_url = "https://file.sharepoint.com/sites/Stock"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = LedgerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.site_url(), "https://file.sharepoint.com/sites/Stock");
    }

    #[test]
    fn test_missing_store_section_fails() {
        assert!(matches!(
            LedgerConfig::from_toml_str("[lists]\nproducts = \"P\"\n"),
            Err(LedgerError::ConfigError { .. })
        ));
    }
}
