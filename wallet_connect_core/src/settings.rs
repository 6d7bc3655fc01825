use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Where the "install a wallet" banner sends the user
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InstallLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Block height / gas price refresh interval while connected
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_mainnet_explorer_url")]
    pub mainnet_explorer_url: String,
    #[serde(default = "default_testnet_explorer_url")]
    pub testnet_explorer_url: String,
    /// Prepended to every persisted key
    #[serde(default)]
    pub storage_prefix: String,
    #[serde(default = "default_install_links")]
    pub install_links: Vec<InstallLink>,
    /// USD per unit of the native token, for the swap estimate
    #[serde(default = "default_reference_usd_rate")]
    pub reference_usd_rate: f64,
    #[serde(default = "default_swap_simulation_ms")]
    pub swap_simulation_ms: u64,
    #[serde(default = "default_swap_reset_ms")]
    pub swap_reset_ms: u64,
    /// JSON-RPC endpoint for the native HTTP provider
    #[serde(default)]
    pub rpc_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            mainnet_explorer_url: default_mainnet_explorer_url(),
            testnet_explorer_url: default_testnet_explorer_url(),
            storage_prefix: String::new(),
            install_links: default_install_links(),
            reference_usd_rate: default_reference_usd_rate(),
            swap_simulation_ms: default_swap_simulation_ms(),
            swap_reset_ms: default_swap_reset_ms(),
            rpc_url: None,
        }
    }
}

impl Settings {
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), CoreError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Settings handed over by the page; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Validate settings ranges and constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Validation("poll_interval_ms must be > 0".to_string()));
        }
        if self.swap_simulation_ms == 0 {
            return Err(CoreError::Validation("swap_simulation_ms must be > 0".to_string()));
        }
        if self.swap_reset_ms == 0 {
            return Err(CoreError::Validation("swap_reset_ms must be > 0".to_string()));
        }
        validate_http_url("mainnet_explorer_url", &self.mainnet_explorer_url)?;
        validate_http_url("testnet_explorer_url", &self.testnet_explorer_url)?;
        if !self.reference_usd_rate.is_finite() || self.reference_usd_rate < 0.0 {
            return Err(CoreError::Validation("reference_usd_rate must be a non-negative number".to_string()));
        }
        if self.install_links.is_empty() {
            return Err(CoreError::Validation("install_links must not be empty".to_string()));
        }
        for link in &self.install_links {
            if link.name.trim().is_empty() {
                return Err(CoreError::Validation("install link name must not be empty".to_string()));
            }
            validate_http_url("install link", &link.url)?;
        }
        if let Some(rpc_url) = &self.rpc_url {
            validate_http_url("rpc_url", rpc_url)?;
        }
        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), CoreError> {
    let parsed = Url::parse(value)
        .map_err(|e| CoreError::Validation(format!("{} is not a valid URL: {}", field, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CoreError::Validation(format!("{} must use http(s), got {}", field, other))),
    }
}

fn default_poll_interval_ms() -> u64 { 15_000 }
fn default_mainnet_explorer_url() -> String { "https://etherscan.io".to_string() }
fn default_testnet_explorer_url() -> String { "https://sepolia.etherscan.io".to_string() }
fn default_reference_usd_rate() -> f64 { 2500.0 }
fn default_swap_simulation_ms() -> u64 { 2000 }
fn default_swap_reset_ms() -> u64 { 3000 }
fn default_install_links() -> Vec<InstallLink> {
    vec![
        InstallLink {
            name: "MetaMask".to_string(),
            url: "https://metamask.io/download/".to_string(),
        },
        InstallLink {
            name: "Rabby".to_string(),
            url: "https://rabby.io/".to_string(),
        },
    ]
}
