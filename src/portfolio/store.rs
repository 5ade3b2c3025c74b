//! Receipt-confirmed effects and the in-memory account store

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Balance, PortfolioSnapshot, PortfolioStore};
use crate::codec::ActionPayload;
use crate::plan::Plan;
use crate::tokens::TokenRegistry;

/// Financial effect of one executed action, in USD
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptEffect {
    Balance { symbol: &'static str, delta_usd: f64 },
    Exposure { delta_usd: f64 },
}

impl ReceiptEffect {
    /// Effects of a plan that executed successfully
    ///
    /// Swaps are credited at `amountOutMin`, the amount the router
    /// guaranteed. Pulls only move funds into the router and have no effect
    /// of their own.
    pub fn from_plan(plan: &Plan, registry: &TokenRegistry) -> Vec<ReceiptEffect> {
        let mut effects = Vec::new();
        let priced = |address: &Address, amount| {
            let info = registry.by_address(address)?;
            Some((info.symbol, registry.usd_value(address, amount)?))
        };

        for action in &plan.actions {
            let payload = match ActionPayload::decode(action.action_type, &action.data) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::debug!(action = action.action_type.name(), error = %e, "Skipping undecodable action");
                    continue;
                }
            };

            match payload {
                ActionPayload::Swap(p) => {
                    if let Some((symbol, usd)) = priced(&p.tokenIn, p.amountIn) {
                        effects.push(ReceiptEffect::Balance { symbol, delta_usd: -usd });
                    }
                    if let Some((symbol, usd)) = priced(&p.tokenOut, p.amountOutMin) {
                        effects.push(ReceiptEffect::Balance { symbol, delta_usd: usd });
                    }
                }
                ActionPayload::Wrap(p) => {
                    let native = registry.native();
                    let wrapped = registry.wrapped_native();
                    if let Some(usd) = registry.usd_value(&native.address, p.amount) {
                        effects.push(ReceiptEffect::Balance { symbol: native.symbol, delta_usd: -usd });
                        effects.push(ReceiptEffect::Balance { symbol: wrapped.symbol, delta_usd: usd });
                    }
                }
                ActionPayload::Pull(_) => {}
                ActionPayload::Supply(p) => {
                    if let Some((symbol, usd)) = priced(&p.asset, p.amount) {
                        effects.push(ReceiptEffect::Balance { symbol, delta_usd: -usd });
                        effects.push(ReceiptEffect::Exposure { delta_usd: usd });
                    }
                }
                ActionPayload::Perp(p) => {
                    let stable = registry.stable();
                    if let Some(usd) = registry.usd_value(&stable.address, p.margin) {
                        effects.push(ReceiptEffect::Balance { symbol: stable.symbol, delta_usd: -usd });
                        effects.push(ReceiptEffect::Exposure { delta_usd: usd });
                    }
                }
                ActionPayload::Event(p) => {
                    let stable = registry.stable();
                    if let Some(usd) = registry.usd_value(&stable.address, p.stake) {
                        effects.push(ReceiptEffect::Balance { symbol: stable.symbol, delta_usd: -usd });
                        effects.push(ReceiptEffect::Exposure { delta_usd: usd });
                    }
                }
            }
        }
        effects
    }
}

#[derive(Debug, Default)]
struct Account {
    balances: BTreeMap<String, f64>,
    exposure_usd: f64,
}

impl Account {
    fn snapshot(&self) -> PortfolioSnapshot {
        let balances = self
            .balances
            .iter()
            .map(|(symbol, usd)| Balance {
                symbol: symbol.clone(),
                balance_usd: *usd,
            })
            .collect();
        PortfolioSnapshot::new(balances, self.exposure_usd)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    accounts: HashMap<Address, Account>,
    applied: HashSet<B256>,
}

/// Process-local account state keyed by user
#[derive(Debug, Clone, Default)]
pub struct InMemoryPortfolioStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryPortfolioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a starting balance for a user
    pub async fn seed(&self, user: Address, symbol: &str, balance_usd: f64) {
        let mut state = self.state.write().await;
        state
            .accounts
            .entry(user)
            .or_default()
            .balances
            .insert(symbol.to_string(), balance_usd);
    }
}

#[async_trait]
impl PortfolioStore for InMemoryPortfolioStore {
    async fn snapshot(&self, user: Address) -> PortfolioSnapshot {
        let state = self.state.read().await;
        state
            .accounts
            .get(&user)
            .map(Account::snapshot)
            .unwrap_or_default()
    }

    async fn apply_confirmed(&self, user: Address, tx_hash: B256, effects: &[ReceiptEffect]) -> bool {
        let mut state = self.state.write().await;
        if !state.applied.insert(tx_hash) {
            tracing::debug!(tx_hash = %tx_hash, "Effects already applied");
            return false;
        }

        let account = state.accounts.entry(user).or_default();
        for effect in effects {
            match effect {
                ReceiptEffect::Balance { symbol, delta_usd } => {
                    *account.balances.entry(symbol.to_string()).or_default() += delta_usd;
                }
                ReceiptEffect::Exposure { delta_usd } => account.exposure_usd += delta_usd,
            }
        }
        tracing::info!(user = %user, tx_hash = %tx_hash, effects = effects.len(), "Applied confirmed effects");
        true
    }
}
