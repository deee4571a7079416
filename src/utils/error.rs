use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Required field is empty: {field}")]
    MissingField { field: String },

    #[error("Product with factory code {factory_code} is already registered")]
    DuplicateKey { factory_code: String },

    #[error(
        "Requested quantity {requested} exceeds the current balance of {balance} for {factory_code}"
    )]
    InsufficientBalance {
        factory_code: String,
        requested: f64,
        balance: f64,
    },

    #[error("Product not found: {key}")]
    ProductNotFound { key: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Remote store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote store returned HTTP {status}: {body}")]
    StoreStatus { status: u16, body: String },

    #[error("Unexpected response from remote store: {message}")]
    MalformedResponse { message: String },

    #[error("Request digest unavailable: {reason}")]
    TokenMissing { reason: String },

    #[error("Frame bridge error: {message}")]
    Bridge { message: String },

    #[error("Form relay failed: {message}")]
    Relay { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Failure kinds surfaced to whoever submitted the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    MissingRequiredField,
    DuplicateKey,
    InsufficientBalance,
    ProductNotFound,
    InvalidInput,
    StoreUnavailable,
    AuthenticationTokenMissing,
    Configuration,
    Relay,
    Internal,
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::MissingField { .. } => ErrorCategory::MissingRequiredField,
            LedgerError::DuplicateKey { .. } => ErrorCategory::DuplicateKey,
            LedgerError::InsufficientBalance { .. } => ErrorCategory::InsufficientBalance,
            LedgerError::ProductNotFound { .. } => ErrorCategory::ProductNotFound,
            LedgerError::InvalidInput { .. } => ErrorCategory::InvalidInput,
            LedgerError::Transport(_)
            | LedgerError::StoreStatus { .. }
            | LedgerError::MalformedResponse { .. } => ErrorCategory::StoreUnavailable,
            LedgerError::TokenMissing { .. } | LedgerError::Bridge { .. } => {
                ErrorCategory::AuthenticationTokenMissing
            }
            LedgerError::Relay { .. } => ErrorCategory::Relay,
            LedgerError::ConfigError { .. }
            | LedgerError::MissingConfigError { .. }
            | LedgerError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            LedgerError::IoError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::CsvError(_) => ErrorCategory::Internal,
        }
    }

    /// Validation failures leave the form as it was; everything else is an
    /// environment problem the user can only retry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::MissingRequiredField
                | ErrorCategory::DuplicateKey
                | ErrorCategory::InsufficientBalance
                | ErrorCategory::ProductNotFound
                | ErrorCategory::InvalidInput
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            LedgerError::MissingField { field } => {
                format!("Fill in every field before saving ({} is empty)", field)
            }
            LedgerError::DuplicateKey { factory_code } => {
                format!("Factory code {} is already registered", factory_code)
            }
            LedgerError::InsufficientBalance {
                requested, balance, ..
            } => format!(
                "Insufficient stock: requested {}, current balance is {}",
                requested, balance
            ),
            LedgerError::ProductNotFound { key } => format!("No product found for {}", key),
            LedgerError::InvalidInput { field, reason, .. } => {
                format!("Invalid {}: {}", field, reason)
            }
            LedgerError::TokenMissing { .. } | LedgerError::Bridge { .. } => {
                "Could not obtain an authorization token from the store".to_string()
            }
            LedgerError::Relay { .. } => "Failed to send the form".to_string(),
            other => match other.category() {
                ErrorCategory::StoreUnavailable => {
                    format!("Operation failed: the store is unavailable ({})", other)
                }
                ErrorCategory::Configuration => format!("Configuration problem: {}", other),
                _ => format!("Operation failed: {}", other),
            },
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::MissingRequiredField => "Complete the empty fields and submit again",
            ErrorCategory::DuplicateKey => "Look the product up instead of registering it again",
            ErrorCategory::InsufficientBalance => "Lower the quantity or record the inbound first",
            ErrorCategory::ProductNotFound => "Check the code or register the product first",
            ErrorCategory::InvalidInput => "Correct the value and submit again",
            ErrorCategory::StoreUnavailable => "Check the network and site URL, then retry",
            ErrorCategory::AuthenticationTokenMissing => {
                "Sign in to the site again or check the auth section of the config"
            }
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::Relay => "Retry later; the form endpoint did not answer",
            ErrorCategory::Internal => "Retry; report the problem if it persists",
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
