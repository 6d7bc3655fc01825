// View-model helpers for the wallet button, wallet panel and swap form

use crate::models::WalletState;
use crate::network::round_decimal;
use crate::settings::{InstallLink, Settings};
use serde::{Deserialize, Serialize};

pub const LABEL_CONNECTING: &str = "Connecting...";
pub const LABEL_INSTALL: &str = "Install Wallet";
pub const LABEL_CONNECT: &str = "Connect Wallet";

/// Shorten an address for display: `0x1234...5678`
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Balance with four decimals. Unparseable input is shown as-is.
pub fn format_balance(balance: &str) -> String {
    let trimmed = balance.trim();
    let valid = !trimmed.is_empty()
        && trimmed.chars().filter(|c| *c == '.').count() <= 1
        && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.');
    if valid {
        round_decimal(trimmed, 4)
    } else {
        balance.to_string()
    }
}

/// Nothing to connect to: no announced wallet and no injected provider
pub fn has_no_wallet(state: &WalletState, has_legacy_provider: bool) -> bool {
    state.discovered_providers.is_empty() && !has_legacy_provider
}

pub fn connect_button_label(state: &WalletState, has_legacy_provider: bool) -> &'static str {
    if state.is_connecting {
        LABEL_CONNECTING
    } else if has_no_wallet(state, has_legacy_provider) {
        LABEL_INSTALL
    } else {
        LABEL_CONNECT
    }
}

/// The picker only makes sense with a choice to make
pub fn should_show_picker(state: &WalletState) -> bool {
    state.discovered_providers.len() > 1
}

/// Install links offered next to an error that asks the user to install a wallet
pub fn install_links_for<'a>(error: Option<&str>, settings: &'a Settings) -> &'a [InstallLink] {
    match error {
        Some(message) if message.contains("install") => &settings.install_links,
        _ => &[],
    }
}

/// Block explorer page for `address`; mainnet labels use the mainnet explorer,
/// everything else the testnet one
pub fn explorer_address_url(settings: &Settings, network_label: &str, address: &str) -> String {
    let base = if network_label.to_lowercase().contains("mainnet") {
        &settings.mainnet_explorer_url
    } else {
        &settings.testnet_explorer_url
    };
    format!("{}/address/{}", base.trim_end_matches('/'), address)
}

/// Entry in the swap form's recipient dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOption {
    pub address: String,
    pub label: String,
    pub is_current: bool,
}

pub fn recipient_options(state: &WalletState) -> Vec<RecipientOption> {
    state
        .available_accounts
        .iter()
        .map(|address| {
            let is_current = state
                .account
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(address));
            let label = if is_current {
                format!("{} (Current)", format_address(address))
            } else {
                format_address(address)
            };
            RecipientOption {
                address: address.clone(),
                label,
                is_current,
            }
        })
        .collect()
}
