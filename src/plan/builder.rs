//! Plan construction
//!
//! Turns an [`ExecutionRequest`] into an ordered [`Plan`] for one of the two
//! execution modes:
//!
//! | Request                | Direct mode                  | Session mode     |
//! |------------------------|------------------------------|------------------|
//! | swap, native in        | WRAP, SWAP (value = amount)  | PULL weth, SWAP  |
//! | swap, ERC-20 in        | SWAP + approval              | PULL, SWAP       |
//! | lend supply            | [WRAP,] SUPPLY + approval    | PULL, SUPPLY     |
//! | perp / event           | PERP / EVENT + approval      | PULL, PERP/EVENT |
//!
//! Session plans never carry native value: the relayer cannot attach the
//! user's ETH, so native inputs are taken in their wrapped form.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::aliases::U24;
use alloy::primitives::{keccak256, Address, B256, U256};
use async_trait::async_trait;
use serde::Serialize;

use super::request::{EventOutcome, ExecutionMode, ExecutionRequest, PerpSide};
use super::{Action, Plan, PlanError};
use crate::chain::{CallRequest, ChainClient, ChainError};
use crate::codec::{
    self, ActionPayload, EventParams, PerpParams, PullParams, SupplyParams, SwapParams, WrapParams,
};
use crate::config::{AdapterAddresses, ExecutionConfig, PlanSettings};
use crate::tokens::{parse_amount, raw_to_f64, TokenInfo, TokenRegistry};

/// Source of the router-level plan nonce for a user
#[async_trait]
pub trait NonceSource: Send + Sync {
    async fn next_nonce(&self, user: Address) -> Result<U256, ChainError>;
}

/// Reads `nonces(user)` from the execution router
pub struct RouterNonceSource {
    chain: Arc<dyn ChainClient>,
    router: Address,
}

impl RouterNonceSource {
    pub fn new(chain: Arc<dyn ChainClient>, router: Address) -> Self {
        Self { chain, router }
    }
}

#[async_trait]
impl NonceSource for RouterNonceSource {
    async fn next_nonce(&self, user: Address) -> Result<U256, ChainError> {
        let data = self
            .chain
            .call(CallRequest::new(self.router, codec::nonces_calldata(user)))
            .await?;
        Ok(codec::decode_nonce(&data)?)
    }
}

/// Where and how a swap executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRoute {
    pub adapter: Address,
    /// Pool fee tier in hundredths of a bip
    pub fee: u32,
    pub expected_out: U256,
}

/// Best-price venue lookup for a swap
#[async_trait]
pub trait SwapVenue: Send + Sync {
    async fn route(
        &self,
        token_in: &TokenInfo,
        token_out: &TokenInfo,
        amount_in: U256,
    ) -> Option<SwapRoute>;
}

/// Single configured adapter, quotes from reference prices
pub struct StaticSwapVenue {
    adapter: Option<Address>,
    fee: u32,
}

impl StaticSwapVenue {
    pub fn new(adapter: Option<Address>, fee: u32) -> Self {
        Self { adapter, fee }
    }
}

#[async_trait]
impl SwapVenue for StaticSwapVenue {
    async fn route(
        &self,
        token_in: &TokenInfo,
        token_out: &TokenInfo,
        amount_in: U256,
    ) -> Option<SwapRoute> {
        let adapter = self.adapter?;
        let value_usd = raw_to_f64(amount_in, token_in.decimals) * token_in.reference_price_usd;
        let out = value_usd / token_out.reference_price_usd;
        let raw = (out * 10f64.powi(token_out.decimals as i32)).floor();
        if !raw.is_finite() || raw < 0.0 {
            return None;
        }
        Some(SwapRoute {
            adapter,
            fee: self.fee,
            expected_out: U256::from(raw as u128),
        })
    }
}

/// ERC-20 allowance the user must grant before a direct execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequirement {
    pub token: Address,
    pub spender: Address,
    pub amount: U256,
}

/// Built plan plus what is needed to send it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedPlan {
    pub plan: Plan,
    pub mode: ExecutionMode,
    /// Native value attached to the execution call
    pub value: U256,
    pub requirements: Vec<ApprovalRequirement>,
}

/// Holds the mode-specific shape of a plan while it is being assembled
struct Assembly {
    mode: ExecutionMode,
    user: Address,
    router: Address,
    actions: Vec<Action>,
    value: U256,
    requirements: Vec<ApprovalRequirement>,
}

impl Assembly {
    fn push(&mut self, payload: ActionPayload, adapter: Address) {
        self.actions.push(payload.into_action(adapter));
    }
}

pub struct PlanBuilder {
    registry: TokenRegistry,
    adapters: AdapterAddresses,
    settings: PlanSettings,
    router: Address,
    venue: Arc<dyn SwapVenue>,
    nonces: Arc<dyn NonceSource>,
}

impl PlanBuilder {
    pub fn new(
        config: &ExecutionConfig,
        router: Address,
        venue: Arc<dyn SwapVenue>,
        nonces: Arc<dyn NonceSource>,
    ) -> Self {
        Self {
            registry: config.token_registry(),
            adapters: config.adapters.clone(),
            settings: config.plan.clone(),
            router,
            venue,
            nonces,
        }
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Build a plan for `user`. Reads the router nonce; nothing else leaves
    /// the process.
    pub async fn build(
        &self,
        request: &ExecutionRequest,
        user: Address,
        mode: ExecutionMode,
        now: u64,
    ) -> Result<PreparedPlan, PlanError> {
        let mut asm = Assembly {
            mode,
            user,
            router: self.router,
            actions: Vec::new(),
            value: U256::ZERO,
            requirements: Vec::new(),
        };

        match request {
            ExecutionRequest::Swap {
                token_in,
                token_out,
                amount_in,
                slippage_bps,
            } => {
                self.build_swap(&mut asm, token_in, token_out, amount_in.as_deref(), *slippage_bps)
                    .await?
            }
            ExecutionRequest::LendSupply { asset, amount } => {
                self.build_supply(&mut asm, asset, amount.as_deref())?
            }
            ExecutionRequest::Perp {
                market,
                side,
                margin,
                leverage,
            } => self.build_perp(&mut asm, market, *side, margin.as_deref(), *leverage)?,
            ExecutionRequest::Event {
                market_id,
                outcome,
                stake,
            } => self.build_event(&mut asm, market_id, *outcome, stake.as_deref())?,
        }

        let nonce = self
            .nonces
            .next_nonce(user)
            .await
            .map_err(PlanError::Nonce)?;

        let plan = Plan {
            user,
            nonce,
            deadline: now + self.settings.deadline_secs,
            actions: asm.actions,
        };

        tracing::debug!(
            kind = request.kind(),
            ?mode,
            actions = plan.actions.len(),
            user = %user,
            "Built execution plan"
        );

        Ok(PreparedPlan {
            plan,
            mode,
            value: asm.value,
            requirements: asm.requirements,
        })
    }

    fn resolve_token(&self, raw: &str) -> Result<TokenInfo, PlanError> {
        if let Some(info) = self.registry.by_symbol(raw) {
            return Ok(*info);
        }
        Address::from_str(raw.trim())
            .ok()
            .and_then(|addr| self.registry.by_address(&addr).copied())
            .ok_or_else(|| PlanError::UnsupportedAsset(raw.to_string()))
    }

    fn adapter(&self, adapter: Option<Address>, kind: &'static str) -> Result<Address, PlanError> {
        adapter.ok_or(PlanError::UnsupportedIntent { kind })
    }

    /// Move `amount` of `token` into the router for the next action.
    ///
    /// Returns the ERC-20 the following action consumes.
    fn fund(
        &self,
        asm: &mut Assembly,
        token: &TokenInfo,
        amount: U256,
    ) -> Result<Address, PlanError> {
        let erc20 = *self.registry.erc20_form(token);
        match asm.mode {
            ExecutionMode::Session => {
                let pull = self.adapter(self.adapters.pull, "session_pull")?;
                asm.push(
                    ActionPayload::Pull(PullParams {
                        token: erc20.address,
                        amount,
                    }),
                    pull,
                );
            }
            ExecutionMode::Direct if token.is_native => {
                let wrap = self.adapter(self.adapters.wrap, "wrap")?;
                asm.push(
                    ActionPayload::Wrap(WrapParams {
                        amount,
                        recipient: asm.router,
                    }),
                    wrap,
                );
                asm.value += amount;
            }
            ExecutionMode::Direct => {
                asm.requirements.push(ApprovalRequirement {
                    token: erc20.address,
                    spender: asm.router,
                    amount,
                });
            }
        }
        Ok(erc20.address)
    }

    async fn build_swap(
        &self,
        asm: &mut Assembly,
        token_in: &str,
        token_out: &str,
        amount_in: Option<&str>,
        slippage_bps: Option<u32>,
    ) -> Result<(), PlanError> {
        let amount_raw = amount_in.ok_or(PlanError::MissingParameter { field: "amountIn" })?;
        let input = self.resolve_token(token_in)?;
        let output = *self.registry.erc20_form(&self.resolve_token(token_out)?);

        if self.registry.erc20_form(&input).address == output.address {
            return Err(PlanError::InvalidRequest(format!(
                "swap input and output resolve to the same token ({})",
                output.symbol
            )));
        }

        let slippage = slippage_bps.unwrap_or(self.settings.default_slippage_bps);
        if slippage > self.settings.max_slippage_bps {
            return Err(PlanError::InvalidRequest(format!(
                "slippageBps {} exceeds maximum {}",
                slippage, self.settings.max_slippage_bps
            )));
        }

        let amount = parse_amount(amount_raw, input.decimals).map_err(|reason| {
            PlanError::InvalidAmount {
                field: "amountIn",
                reason,
            }
        })?;

        let route = self
            .venue
            .route(&input, &output, amount)
            .await
            .ok_or(PlanError::UnsupportedIntent { kind: "swap" })?;

        let token_in_erc20 = self.fund(asm, &input, amount)?;
        let kept_bps = 10_000u32.checked_sub(slippage).ok_or_else(|| {
            PlanError::InvalidRequest(format!("slippageBps {} exceeds 10000", slippage))
        })?;
        let amount_out_min = route.expected_out * U256::from(kept_bps) / U256::from(10_000u32);

        let recipient = asm.user;
        asm.push(
            ActionPayload::Swap(SwapParams {
                tokenIn: token_in_erc20,
                tokenOut: output.address,
                fee: U24::saturating_from(route.fee),
                amountIn: amount,
                amountOutMin: amount_out_min,
                recipient,
            }),
            route.adapter,
        );
        Ok(())
    }

    fn build_supply(
        &self,
        asm: &mut Assembly,
        asset: &str,
        amount: Option<&str>,
    ) -> Result<(), PlanError> {
        let supply = self.adapter(self.adapters.supply, "lend_supply")?;
        let amount_raw = amount.ok_or(PlanError::MissingParameter { field: "amount" })?;
        let token = self.resolve_token(asset)?;
        let amount = parse_amount(amount_raw, token.decimals).map_err(|reason| {
            PlanError::InvalidAmount {
                field: "amount",
                reason,
            }
        })?;

        let asset = self.fund(asm, &token, amount)?;
        let on_behalf_of = asm.user;
        asm.push(
            ActionPayload::Supply(SupplyParams {
                asset,
                amount,
                onBehalfOf: on_behalf_of,
            }),
            supply,
        );
        Ok(())
    }

    fn stable_amount(&self, raw: Option<&str>, field: &'static str) -> Result<U256, PlanError> {
        let raw = raw.ok_or(PlanError::MissingParameter { field })?;
        parse_amount(raw, self.registry.stable().decimals)
            .map_err(|reason| PlanError::InvalidAmount { field, reason })
    }

    fn build_perp(
        &self,
        asm: &mut Assembly,
        market: &str,
        side: PerpSide,
        margin: Option<&str>,
        leverage: Option<u16>,
    ) -> Result<(), PlanError> {
        let perp = self.adapter(self.adapters.perp, "perp")?;
        let margin = self.stable_amount(margin, "margin")?;
        let leverage = leverage.unwrap_or(1);
        if leverage == 0 {
            return Err(PlanError::InvalidRequest(
                "leverage must be at least 1".to_string(),
            ));
        }

        let stable = *self.registry.stable();
        self.fund(asm, &stable, margin)?;
        asm.push(
            ActionPayload::Perp(PerpParams {
                market: market_key(market),
                isLong: side == PerpSide::Long,
                margin,
                leverage,
            }),
            perp,
        );
        Ok(())
    }

    fn build_event(
        &self,
        asm: &mut Assembly,
        market_id: &str,
        outcome: EventOutcome,
        stake: Option<&str>,
    ) -> Result<(), PlanError> {
        let event = self.adapter(self.adapters.event, "event")?;
        let stake = self.stable_amount(stake, "stake")?;

        let stable = *self.registry.stable();
        self.fund(asm, &stable, stake)?;
        asm.push(
            ActionPayload::Event(EventParams {
                marketId: market_key(market_id),
                outcome: outcome == EventOutcome::Yes,
                stake,
            }),
            event,
        );
        Ok(())
    }
}

/// Market identifiers are either a 32-byte hex id or hashed from their name
fn market_key(raw: &str) -> B256 {
    B256::from_str(raw.trim()).unwrap_or_else(|_| keccak256(raw.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_swap;
    use crate::plan::ActionType;
    use crate::tokens::addresses;

    struct FixedNonce(u64);

    #[async_trait]
    impl NonceSource for FixedNonce {
        async fn next_nonce(&self, _user: Address) -> Result<U256, ChainError> {
            Ok(U256::from(self.0))
        }
    }

    const NOW: u64 = 1_700_000_000;

    fn user() -> Address {
        Address::repeat_byte(0x11)
    }

    fn router() -> Address {
        Address::repeat_byte(0x44)
    }

    fn config() -> ExecutionConfig {
        let mut config = ExecutionConfig::default();
        config.adapters = AdapterAddresses {
            swap: Some(Address::repeat_byte(0x22)),
            wrap: Some(Address::repeat_byte(0x33)),
            pull: Some(Address::repeat_byte(0x55)),
            supply: Some(Address::repeat_byte(0x66)),
            perp: None,
            event: Some(Address::repeat_byte(0x77)),
        };
        config
    }

    fn builder(config: &ExecutionConfig) -> PlanBuilder {
        PlanBuilder::new(
            config,
            router(),
            Arc::new(StaticSwapVenue::new(config.adapters.swap, 3000)),
            Arc::new(FixedNonce(7)),
        )
    }

    fn swap_request(token_in: &str, amount: Option<&str>) -> ExecutionRequest {
        ExecutionRequest::Swap {
            token_in: token_in.into(),
            token_out: "USDC".into(),
            amount_in: amount.map(Into::into),
            slippage_bps: None,
        }
    }

    fn kinds(plan: &Plan) -> Vec<ActionType> {
        plan.actions.iter().map(|a| a.action_type).collect()
    }

    #[tokio::test]
    async fn slippage_beyond_full_range_is_an_error() {
        let mut config = config();
        config.plan.max_slippage_bps = 20_000;
        let request = ExecutionRequest::Swap {
            token_in: "ETH".into(),
            token_out: "USDC".into(),
            amount_in: Some("0.1".into()),
            slippage_bps: Some(10_001),
        };
        let err = builder(&config)
            .build(&request, user(), ExecutionMode::Direct, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidRequest(ref m) if m == "slippageBps 10001 exceeds 10000"));
    }

    #[tokio::test]
    async fn direct_native_swap_wraps_then_swaps() {
        let config = config();
        let prepared = builder(&config)
            .build(&swap_request("ETH", Some("0.1")), user(), ExecutionMode::Direct, NOW)
            .await
            .unwrap();

        let tenth = U256::from(100_000_000_000_000_000u64);
        assert_eq!(kinds(&prepared.plan), vec![ActionType::Wrap, ActionType::Swap]);
        assert_eq!(prepared.value, tenth);
        assert!(prepared.requirements.is_empty());
        assert_eq!(prepared.plan.nonce, U256::from(7u64));
        assert_eq!(prepared.plan.deadline, NOW + 600);

        let swap = decode_swap(&prepared.plan.actions[1].data).unwrap();
        assert_eq!(swap.tokenIn, addresses::WETH_SEPOLIA);
        assert_eq!(swap.tokenOut, addresses::USDC_SEPOLIA);
        assert_eq!(swap.amountIn, tenth);
        assert_eq!(swap.recipient, user());
        // 0.1 ETH at 3500 USD is 350 USDC; 50 bps slippage
        assert_eq!(swap.amountOutMin, U256::from(348_250_000u64));
    }

    #[tokio::test]
    async fn session_swap_pulls_and_carries_no_value() {
        let config = config();
        let prepared = builder(&config)
            .build(&swap_request("ETH", Some("0.1")), user(), ExecutionMode::Session, NOW)
            .await
            .unwrap();

        assert_eq!(kinds(&prepared.plan), vec![ActionType::Pull, ActionType::Swap]);
        assert_eq!(prepared.value, U256::ZERO);
        let ActionPayload::Pull(pull) =
            ActionPayload::decode(ActionType::Pull, &prepared.plan.actions[0].data).unwrap()
        else {
            panic!("expected pull payload");
        };
        assert_eq!(pull.token, addresses::WETH_SEPOLIA);
    }

    #[tokio::test]
    async fn direct_erc20_swap_requires_approval() {
        let config = config();
        let request = ExecutionRequest::Swap {
            token_in: "USDC".into(),
            token_out: "WETH".into(),
            amount_in: Some("100".into()),
            slippage_bps: Some(100),
        };
        let prepared = builder(&config)
            .build(&request, user(), ExecutionMode::Direct, NOW)
            .await
            .unwrap();

        assert_eq!(kinds(&prepared.plan), vec![ActionType::Swap]);
        assert_eq!(
            prepared.requirements,
            vec![ApprovalRequirement {
                token: addresses::USDC_SEPOLIA,
                spender: router(),
                amount: U256::from(100_000_000u64),
            }]
        );
    }

    #[tokio::test]
    async fn missing_amount_is_reported() {
        let config = config();
        let err = builder(&config)
            .build(&swap_request("ETH", None), user(), ExecutionMode::Direct, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::MissingParameter { field: "amountIn" }));
        assert_eq!(err.code(), "MISSING_PARAMETER");
    }

    #[tokio::test]
    async fn unconfigured_adapter_is_unsupported_intent() {
        let config = config();
        let request = ExecutionRequest::Perp {
            market: "ETH-USD".into(),
            side: PerpSide::Long,
            margin: Some("50".into()),
            leverage: Some(3),
        };
        let err = builder(&config)
            .build(&request, user(), ExecutionMode::Session, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedIntent { kind: "perp" }));
    }

    #[tokio::test]
    async fn unknown_asset_and_excess_slippage_rejected() {
        let config = config();
        let b = builder(&config);
        let err = b
            .build(&swap_request("DOGE", Some("1")), user(), ExecutionMode::Direct, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedAsset(ref s) if s == "DOGE"));

        let greedy = ExecutionRequest::Swap {
            token_in: "ETH".into(),
            token_out: "USDC".into(),
            amount_in: Some("0.1".into()),
            slippage_bps: Some(501),
        };
        let err = b
            .build(&greedy, user(), ExecutionMode::Direct, NOW)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn session_supply_pulls_then_supplies_for_user() {
        let config = config();
        let request = ExecutionRequest::LendSupply {
            asset: "USDC".into(),
            amount: Some("25".into()),
        };
        let prepared = builder(&config)
            .build(&request, user(), ExecutionMode::Session, NOW)
            .await
            .unwrap();

        assert_eq!(kinds(&prepared.plan), vec![ActionType::Pull, ActionType::Supply]);
        let ActionPayload::Supply(supply) =
            ActionPayload::decode(ActionType::Supply, &prepared.plan.actions[1].data).unwrap()
        else {
            panic!("expected supply payload");
        };
        assert_eq!(supply.onBehalfOf, user());
        assert_eq!(supply.amount, U256::from(25_000_000u64));
    }

    #[tokio::test]
    async fn event_market_key_is_hashed_name() {
        let config = config();
        let request = ExecutionRequest::Event {
            market_id: "fed-cut-dec".into(),
            outcome: EventOutcome::Yes,
            stake: Some("10".into()),
        };
        let prepared = builder(&config)
            .build(&request, user(), ExecutionMode::Session, NOW)
            .await
            .unwrap();
        let ActionPayload::Event(event) =
            ActionPayload::decode(ActionType::Event, &prepared.plan.actions[1].data).unwrap()
        else {
            panic!("expected event payload");
        };
        assert_eq!(event.marketId, keccak256(b"fed-cut-dec"));
        assert!(event.outcome);
    }

    #[test]
    fn hex_market_ids_pass_through() {
        let id = B256::repeat_byte(0x42);
        assert_eq!(market_key(&id.to_string()), id);
    }
}
