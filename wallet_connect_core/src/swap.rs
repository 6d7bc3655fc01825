// Simulated swap form. Nothing is quoted or settled; the form only validates input
// and walks through the status sequence the page animates.

use crate::models::WalletState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a swap cannot start, checked in this order
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapError {
    #[error("Please connect your wallet first")]
    NotConnected,
    #[error("Please enter a valid amount")]
    InvalidAmount,
    #[error("Please select a recipient address")]
    MissingRecipient,
    #[error("A swap is already in progress")]
    Busy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl SwapStatus {
    /// Text on the swap button; `None` while loading (a spinner is shown)
    pub fn button_label(&self) -> Option<&'static str> {
        match self {
            SwapStatus::Loading => None,
            SwapStatus::Success => Some("Swap Complete!"),
            SwapStatus::Idle | SwapStatus::Error => Some("Swap"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapForm {
    pub amount: String,
    pub recipient: String,
    #[serde(default)]
    pub status: SwapStatus,
}

impl SwapForm {
    pub fn new(amount: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            recipient: recipient.into(),
            status: SwapStatus::Idle,
        }
    }

    /// Amount as a positive finite number, if it is one
    pub fn parsed_amount(&self) -> Option<f64> {
        self.amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite() && *a > 0.0)
    }

    pub fn validate(&self, state: &WalletState) -> Result<(), SwapError> {
        if !state.is_connected {
            return Err(SwapError::NotConnected);
        }
        if self.parsed_amount().is_none() {
            return Err(SwapError::InvalidAmount);
        }
        if self.recipient.trim().is_empty() {
            return Err(SwapError::MissingRecipient);
        }
        Ok(())
    }

    /// Fill the amount with the whole balance. Does nothing while disconnected.
    pub fn set_max(&mut self, state: &WalletState) {
        if let Some(max) = max_amount(state) {
            self.amount = max;
        }
    }

    /// USD value of the entered amount at `rate`; zero while disconnected
    pub fn usd_estimate(&self, state: &WalletState, rate: f64) -> f64 {
        if !state.is_connected {
            return 0.0;
        }
        self.amount.trim().parse::<f64>().ok().filter(|a| a.is_finite()).unwrap_or(0.0) * rate
    }

    /// Validate and enter `Loading`
    pub fn start(&mut self, state: &WalletState) -> Result<(), SwapError> {
        if self.status == SwapStatus::Loading {
            return Err(SwapError::Busy);
        }
        self.validate(state)?;
        self.status = SwapStatus::Loading;
        Ok(())
    }

    /// Simulated settlement finished
    pub fn complete(&mut self) {
        if self.status == SwapStatus::Loading {
            self.status = SwapStatus::Success;
        }
    }

    /// Back to idle once the success message has been shown
    pub fn reset(&mut self) {
        if self.status == SwapStatus::Success {
            self.status = SwapStatus::Idle;
        }
    }
}

/// What the MAX button puts in the amount field
pub fn max_amount(state: &WalletState) -> Option<String> {
    state.is_connected.then(|| state.balance.clone())
}

pub fn format_usd(value: f64) -> String {
    format!("{:.2}", value)
}
