//! Token registry
//!
//! Centralizes token metadata (addresses, decimals, symbols, reference prices)
//! for the native asset, its wrapped form and the stable token. The plan
//! builder resolves symbols through it and the portfolio store prices
//! receipt-confirmed effects with it.

use alloy::primitives::utils::parse_units;
use alloy::primitives::{address, Address, U256};

/// Token metadata
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenInfo {
    pub address: Address,
    /// Token symbol (e.g., "USDC", "WETH")
    pub symbol: &'static str,
    pub decimals: u8,
    pub is_native: bool,
    /// Reference USD price, used when no live quote is available
    pub reference_price_usd: f64,
}

/// Well-known Sepolia addresses
pub mod addresses {
    use super::*;

    pub const WETH_SEPOLIA: Address = address!("fff9976782d46cc05630d1f6ebab18b2324d6b14");
    pub const USDC_SEPOLIA: Address = address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238");

    /// Marker address for the native asset
    pub const NATIVE_ETH: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
}

/// Reference price of the native asset in USD
pub const ETH_REFERENCE_PRICE_USD: f64 = 3500.0;

/// Registry of the tokens the engine can trade
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    native: TokenInfo,
    wrapped: TokenInfo,
    stable: TokenInfo,
}

impl TokenRegistry {
    pub fn new(wrapped_native: Address, stable: Address) -> Self {
        Self {
            native: TokenInfo {
                address: addresses::NATIVE_ETH,
                symbol: "ETH",
                decimals: 18,
                is_native: true,
                reference_price_usd: ETH_REFERENCE_PRICE_USD,
            },
            wrapped: TokenInfo {
                address: wrapped_native,
                symbol: "WETH",
                decimals: 18,
                is_native: false,
                reference_price_usd: ETH_REFERENCE_PRICE_USD,
            },
            stable: TokenInfo {
                address: stable,
                symbol: "USDC",
                decimals: 6,
                is_native: false,
                reference_price_usd: 1.0,
            },
        }
    }

    pub fn native(&self) -> &TokenInfo {
        &self.native
    }

    pub fn wrapped_native(&self) -> &TokenInfo {
        &self.wrapped
    }

    pub fn stable(&self) -> &TokenInfo {
        &self.stable
    }

    /// Resolve a user-facing symbol (case-insensitive)
    pub fn by_symbol(&self, symbol: &str) -> Option<&TokenInfo> {
        match symbol.trim().to_ascii_uppercase().as_str() {
            "ETH" => Some(&self.native),
            "WETH" => Some(&self.wrapped),
            "USDC" | "STABLE" | "USD" => Some(&self.stable),
            _ => None,
        }
    }

    pub fn by_address(&self, address: &Address) -> Option<&TokenInfo> {
        [&self.native, &self.wrapped, &self.stable]
            .into_iter()
            .find(|t| t.address == *address)
    }

    /// The ERC-20 form of a token (native resolves to the wrapped token)
    pub fn erc20_form<'a>(&'a self, token: &'a TokenInfo) -> &'a TokenInfo {
        if token.is_native {
            &self.wrapped
        } else {
            token
        }
    }

    /// Estimate USD value for a raw token amount
    pub fn usd_value(&self, address: &Address, amount: U256) -> Option<f64> {
        let info = self.by_address(address)?;
        Some(raw_to_f64(amount, info.decimals) * info.reference_price_usd)
    }
}

/// Parse a human-readable decimal amount into raw units
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, String> {
    let parsed = parse_units(amount.trim(), decimals).map_err(|e| e.to_string())?;
    if parsed.is_negative() {
        return Err("amount must not be negative".to_string());
    }
    let raw = parsed.get_absolute();
    if raw.is_zero() {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(raw)
}

/// Convert a raw amount to a float in whole-token units
pub fn raw_to_f64(amount: U256, decimals: u8) -> f64 {
    let divisor = 10f64.powi(decimals as i32);
    amount.to_string().parse::<f64>().map(|v| v / divisor).unwrap_or(0.0)
}

/// Format a raw amount without trailing zeros ("1", "0.5")
pub fn format_amount(amount: U256, decimals: u8) -> String {
    let base = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / base;
    let frac = amount % base;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
