//! Fixed-point price formatting.
//!
//! ETH amounts are 18-decimal wei integers, USD oracle prices are 8-decimal
//! integers. The two never share a code path.

use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const PRICE_UNAVAILABLE: &str = "Price unavailable";

const USD_DECIMALS: u32 = 8;

/// How a zero USD price is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroPricePolicy {
    /// Zero means "no oracle price", same as empty input
    #[default]
    Unavailable,
    /// Zero is a real price and renders as `$0.00`
    ShowZero,
}

fn parse_integer(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    U256::from_str_radix(raw, 10).ok()
}

/// Wei amount as a decimal ETH string, `"0"` when the input is not an integer
pub fn format_eth(wei: &str) -> String {
    match parse_integer(wei) {
        Some(value) => format_eth_amount(value),
        None => "0".to_string(),
    }
}

/// `1500000000000000000` -> `"1.5"`, `1000000000000000000` -> `"1.0"`
pub fn format_eth_amount(wei: U256) -> String {
    let full = format_ether(wei);
    match full.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, frac)
            }
        }
        None => format!("{}.0", full),
    }
}

/// 8-decimal USD amount as en-US currency, e.g. `150000000` -> `"$1.50"`
pub fn format_usd(raw: &str, policy: ZeroPricePolicy) -> String {
    let Some(value) = parse_integer(raw) else {
        return PRICE_UNAVAILABLE.to_string();
    };
    if value.is_zero() && policy == ZeroPricePolicy::Unavailable {
        return PRICE_UNAVAILABLE.to_string();
    }

    // Round to cents, half up
    let cent_unit = U256::from(10u64.pow(USD_DECIMALS - 2));
    let mut cents = value / cent_unit;
    if value % cent_unit >= cent_unit / U256::from(2) {
        cents += U256::from(1);
    }
    let dollars = cents / U256::from(100);
    let remainder = (cents % U256::from(100)).to::<u64>();

    format!("${}.{:02}", group_thousands(&dollars.to_string()), remainder)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Parse a decimal ETH amount typed by a user into wei
pub fn parse_eth(input: &str) -> Result<U256> {
    let input = input.trim();
    if input.is_empty() {
        bail!("Price is empty");
    }
    if input.starts_with('-') {
        bail!("Price must not be negative");
    }
    parse_ether(input).with_context(|| format!("Invalid ETH amount: {}", input))
}

/// `0x1234...abcd` form for headers and cards
pub fn short_address(address: Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
