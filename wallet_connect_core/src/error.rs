use thiserror::Error;

/// EIP-1193 "user rejected request" error code
pub const USER_REJECTED_CODE: i64 = 4001;

const NO_PROVIDER_MESSAGE: &str = "Please install MetaMask or Rabby Wallet!";
const NO_ACCOUNTS_MESSAGE: &str = "No accounts returned from wallet";
const FALLBACK_CONNECT_MESSAGE: &str = "Failed to connect wallet";

#[derive(Error, Debug)]
pub enum CoreError {
    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No wallet provider found")]
    NoProviderFound,

    #[error("User rejected the request: {0}")]
    UserRejected(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No accounts returned from wallet")]
    NoAccountsReturned,

    #[error("Validation error: {0}")]
    Validation(String),

    #[cfg(feature = "native")]
    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl CoreError {
    /// Build an error from a provider's `{ code, message }` rejection
    pub fn from_rpc_error(code: Option<i64>, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            Some(USER_REJECTED_CODE) => CoreError::UserRejected(message),
            _ => CoreError::ConnectionFailed(message),
        }
    }

    /// Message shown in the error banner.
    ///
    /// Provider failures surface the provider's own text, the same way the
    /// wallet reported it.
    pub fn user_message(&self) -> String {
        let message = match self {
            CoreError::NoProviderFound => return NO_PROVIDER_MESSAGE.to_string(),
            CoreError::NoAccountsReturned => return NO_ACCOUNTS_MESSAGE.to_string(),
            CoreError::UserRejected(msg)
            | CoreError::ConnectionFailed(msg)
            | CoreError::Rpc(msg)
            | CoreError::ParseError(msg) => msg.clone(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            FALLBACK_CONNECT_MESSAGE.to_string()
        } else {
            message
        }
    }
}

#[cfg(feature = "native")]
impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::TomlSerialization(err.to_string())
    }
}
