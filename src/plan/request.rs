//! Execution intents handed over by the upstream intent parser

use serde::{Deserialize, Serialize};

/// How the plan reaches the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The user's wallet sends `executeBySender`
    Direct,
    /// The relayer sends `executeWithSession` on the user's behalf
    #[default]
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerpSide {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    Yes,
    No,
}

/// Validated execution intent
///
/// Amounts are human-readable decimal strings in the asset's own units
/// (`"0.25"` ETH, `"100"` USDC). Immutable once handed to the plan builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionRequest {
    #[serde(rename_all = "camelCase")]
    Swap {
        token_in: String,
        token_out: String,
        #[serde(default)]
        amount_in: Option<String>,
        #[serde(default)]
        slippage_bps: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    LendSupply {
        asset: String,
        #[serde(default)]
        amount: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Perp {
        market: String,
        side: PerpSide,
        /// Margin in stable-token units
        #[serde(default)]
        margin: Option<String>,
        #[serde(default)]
        leverage: Option<u16>,
    },
    #[serde(rename_all = "camelCase")]
    Event {
        market_id: String,
        outcome: EventOutcome,
        /// Stake in stable-token units
        #[serde(default)]
        stake: Option<String>,
    },
}

impl ExecutionRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionRequest::Swap { .. } => "swap",
            ExecutionRequest::LendSupply { .. } => "lend_supply",
            ExecutionRequest::Perp { .. } => "perp",
            ExecutionRequest::Event { .. } => "event",
        }
    }
}
