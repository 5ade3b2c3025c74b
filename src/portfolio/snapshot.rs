//! Point-in-time view of an account

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub symbol: String,
    pub balance_usd: f64,
}

/// Balances and open exposure of one user, in USD
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub account_value_usd: f64,
    /// Sorted by symbol
    pub balances: Vec<Balance>,
    /// Supplied, perp margin and event stake positions
    pub open_exposure_usd: f64,
}

impl PortfolioSnapshot {
    /// Build a snapshot, deriving the account value
    pub fn new(mut balances: Vec<Balance>, open_exposure_usd: f64) -> Self {
        balances.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let account_value_usd =
            balances.iter().map(|b| b.balance_usd).sum::<f64>() + open_exposure_usd;
        Self {
            account_value_usd,
            balances,
            open_exposure_usd,
        }
    }

    pub fn balance_usd(&self, symbol: &str) -> f64 {
        self.balances
            .iter()
            .find(|b| b.symbol == symbol)
            .map(|b| b.balance_usd)
            .unwrap_or(0.0)
    }
}
