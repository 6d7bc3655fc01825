// Network naming, unit formatting and address helpers

use crate::error::CoreError;
use alloy_primitives::utils::{format_ether, format_units};
use alloy_primitives::{Address, U256};
use std::str::FromStr;

/// Raw network name the chain client reports for Ethereum mainnet
pub const MAINNET_RAW_NAME: &str = "homestead";
/// Label displayed instead of [`MAINNET_RAW_NAME`]
pub const MAINNET_LABEL: &str = "Ethereum Mainnet";
/// Name reported for chain ids missing from the table
pub const UNKNOWN_NETWORK: &str = "unknown";

/// Raw network name for a chain id, using the names ethers-style clients report
pub fn network_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => MAINNET_RAW_NAME,
        11155111 => "sepolia",
        17000 => "holesky",
        10 => "optimism",
        56 => "bnb",
        137 => "matic",
        8453 => "base",
        42161 => "arbitrum",
        43114 => "avalanche",
        _ => UNKNOWN_NETWORK,
    }
}

/// Label shown to the user for a raw network name.
/// Only mainnet is renamed; everything else passes through untouched.
pub fn friendly_network_label(raw_name: &str) -> String {
    if raw_name == MAINNET_RAW_NAME {
        MAINNET_LABEL.to_string()
    } else {
        raw_name.to_string()
    }
}

/// Format a wei amount as ether: trailing zeros trimmed, one fractional digit minimum
/// (`1.5`, `0.0`, `2.0`)
pub fn format_ether_balance(wei: U256) -> String {
    trim_fraction(&format_ether(wei))
}

/// Format a wei amount as gwei with two decimals, e.g. `12.35`
pub fn format_gwei(wei: U256) -> Result<String, CoreError> {
    let gwei = format_units(wei, "gwei")
        .map_err(|e| CoreError::ParseError(format!("Failed to format gas price: {}", e)))?;
    Ok(round_decimal(&gwei, 2))
}

/// Normalise an address to its EIP-55 checksummed form
pub fn checksum_address(address: &str) -> Result<String, CoreError> {
    let parsed = Address::from_str(address.trim())
        .map_err(|e| CoreError::ParseError(format!("Invalid address {}: {}", address, e)))?;
    Ok(parsed.to_checksum(None))
}

/// Addresses are case-insensitive; checksum casing must not count as a change
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn trim_fraction(decimal: &str) -> String {
    match decimal.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{}.0", int)
            } else {
                format!("{}.{}", int, frac)
            }
        }
        None => format!("{}.0", decimal),
    }
}

/// Round a non-negative decimal string half-up to `places` fractional digits.
/// Works on the digits directly so large values keep full precision.
pub fn round_decimal(decimal: &str, places: usize) -> String {
    let (int, frac) = decimal.split_once('.').unwrap_or((decimal, ""));
    let int = if int.is_empty() { "0" } else { int };

    let mut digits: Vec<u8> = int
        .bytes()
        .chain(frac.bytes().chain(std::iter::repeat(b'0')).take(places))
        .map(|b| b.saturating_sub(b'0'))
        .collect();

    let round_up = frac.as_bytes().get(places).map(|d| *d >= b'5').unwrap_or(false);
    if round_up {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if !carry {
                break;
            }
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - places;
    let render = |ds: &[u8]| ds.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    let int_part = render(&digits[..split]);
    if places == 0 {
        int_part
    } else {
        format!("{}.{}", int_part, render(&digits[split..]))
    }
}
