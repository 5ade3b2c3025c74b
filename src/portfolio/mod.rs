//! Portfolio snapshots and receipt-confirmed deltas
//!
//! The execution service reads a snapshot before waiting on a receipt and
//! another after. Effects are applied to the store only once the receipt is
//! confirmed, so a reverted or timed-out transaction always diffs to zero.

mod delta;
mod snapshot;
mod store;

pub use delta::{BalanceDelta, PortfolioDelta};
pub use snapshot::{Balance, PortfolioSnapshot};
pub use store::{InMemoryPortfolioStore, ReceiptEffect};

use alloy::primitives::{Address, B256};
use async_trait::async_trait;

/// Account state owned outside the execution engine
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn snapshot(&self, user: Address) -> PortfolioSnapshot;

    /// Record the effects of a confirmed transaction. Returns false when
    /// `tx_hash` was already applied.
    async fn apply_confirmed(&self, user: Address, tx_hash: B256, effects: &[ReceiptEffect]) -> bool;
}
