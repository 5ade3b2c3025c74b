//! Before/after portfolio diff

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::PortfolioSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDelta {
    pub symbol: String,
    pub delta_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDelta {
    pub account_value_delta_usd: f64,
    pub balance_deltas: Vec<BalanceDelta>,
}

impl PortfolioDelta {
    /// Diff two snapshots over the union of their symbols
    pub fn between(before: &PortfolioSnapshot, after: &PortfolioSnapshot) -> Self {
        let mut symbols: BTreeMap<&str, f64> = BTreeMap::new();
        for b in &before.balances {
            *symbols.entry(b.symbol.as_str()).or_default() -= b.balance_usd;
        }
        for b in &after.balances {
            *symbols.entry(b.symbol.as_str()).or_default() += b.balance_usd;
        }

        Self {
            account_value_delta_usd: after.account_value_usd - before.account_value_usd,
            balance_deltas: symbols
                .into_iter()
                .map(|(symbol, delta_usd)| BalanceDelta {
                    symbol: symbol.to_string(),
                    delta_usd,
                })
                .collect(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.account_value_delta_usd == 0.0 && self.balance_deltas.iter().all(|d| d.delta_usd == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Balance;

    fn balance(symbol: &str, usd: f64) -> Balance {
        Balance {
            symbol: symbol.into(),
            balance_usd: usd,
        }
    }

    #[test]
    fn account_delta_is_after_minus_before() {
        let before = PortfolioSnapshot::new(vec![balance("WETH", 350.0)], 0.0);
        let after = PortfolioSnapshot::new(vec![balance("USDC", 348.25)], 0.0);

        let delta = PortfolioDelta::between(&before, &after);
        assert_eq!(
            delta.account_value_delta_usd,
            after.account_value_usd - before.account_value_usd
        );
        assert_eq!(
            delta.balance_deltas,
            vec![
                BalanceDelta {
                    symbol: "USDC".into(),
                    delta_usd: 348.25
                },
                BalanceDelta {
                    symbol: "WETH".into(),
                    delta_usd: -350.0
                },
            ]
        );
    }

    #[test]
    fn identical_snapshots_have_zero_delta() {
        let snapshot = PortfolioSnapshot::new(vec![balance("USDC", 10.0)], 5.0);
        assert!(PortfolioDelta::between(&snapshot, &snapshot.clone()).is_zero());
    }
}
