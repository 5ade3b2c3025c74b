//! Typed ABI codec
//!
//! The single place where plans, adapter payloads and router calls are
//! encoded and decoded. The plan builder encodes through it, the guards decode
//! swap payloads through it and the relayer decodes the exact calldata it is
//! about to send through it.

pub mod abi;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolInterface, SolValue};
use thiserror::Error;

use crate::plan::{Action, ActionType, Plan};
use abi::ExecutionRouter::{self, ExecutionRouterCalls, ExecutionRouterErrors};
use abi::IERC20::{self, IERC20Errors};

pub use abi::{EventParams, PerpParams, PullParams, SupplyParams, SwapParams, WrapParams};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("Unknown action type {0}")]
    UnknownActionType(u8),

    #[error("Plan deadline {0} does not fit in 64 bits")]
    DeadlineOverflow(U256),

    #[error("Calldata is not a relayable router call")]
    NotARelayCall,
}

fn decode_err(what: &'static str, err: alloy::sol_types::Error) -> CodecError {
    CodecError::Decode {
        what,
        reason: err.to_string(),
    }
}

/// Decoded adapter payload, keyed by the action type that carries it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPayload {
    Swap(SwapParams),
    Wrap(WrapParams),
    Pull(PullParams),
    Supply(SupplyParams),
    Perp(PerpParams),
    Event(EventParams),
}

impl ActionPayload {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionPayload::Swap(_) => ActionType::Swap,
            ActionPayload::Wrap(_) => ActionType::Wrap,
            ActionPayload::Pull(_) => ActionType::Pull,
            ActionPayload::Supply(_) => ActionType::Supply,
            ActionPayload::Perp(_) => ActionType::Perp,
            ActionPayload::Event(_) => ActionType::Event,
        }
    }

    pub fn encode(&self) -> Bytes {
        let raw = match self {
            ActionPayload::Swap(p) => p.abi_encode(),
            ActionPayload::Wrap(p) => p.abi_encode(),
            ActionPayload::Pull(p) => p.abi_encode(),
            ActionPayload::Supply(p) => p.abi_encode(),
            ActionPayload::Perp(p) => p.abi_encode(),
            ActionPayload::Event(p) => p.abi_encode(),
        };
        Bytes::from(raw)
    }

    pub fn decode(action_type: ActionType, data: &[u8]) -> Result<Self, CodecError> {
        Ok(match action_type {
            ActionType::Swap => ActionPayload::Swap(
                SwapParams::abi_decode(data).map_err(|e| decode_err("swap params", e))?,
            ),
            ActionType::Wrap => ActionPayload::Wrap(
                WrapParams::abi_decode(data).map_err(|e| decode_err("wrap params", e))?,
            ),
            ActionType::Pull => ActionPayload::Pull(
                PullParams::abi_decode(data).map_err(|e| decode_err("pull params", e))?,
            ),
            ActionType::Supply => ActionPayload::Supply(
                SupplyParams::abi_decode(data).map_err(|e| decode_err("supply params", e))?,
            ),
            ActionType::Perp => ActionPayload::Perp(
                PerpParams::abi_decode(data).map_err(|e| decode_err("perp params", e))?,
            ),
            ActionType::Event => ActionPayload::Event(
                EventParams::abi_decode(data).map_err(|e| decode_err("event params", e))?,
            ),
        })
    }

    /// Build the plan action for this payload against `adapter`
    pub fn into_action(self, adapter: Address) -> Action {
        Action {
            action_type: self.action_type(),
            data: self.encode(),
            adapter,
        }
    }
}

/// Decode the payload of a swap action
pub fn decode_swap(data: &[u8]) -> Result<SwapParams, CodecError> {
    SwapParams::abi_decode(data).map_err(|e| decode_err("swap params", e))
}

impl From<&Action> for abi::Action {
    fn from(action: &Action) -> Self {
        abi::Action {
            actionType: action.action_type.as_u8(),
            adapter: action.adapter,
            data: action.data.clone(),
        }
    }
}

impl From<&Plan> for abi::Plan {
    fn from(plan: &Plan) -> Self {
        abi::Plan {
            user: plan.user,
            nonce: plan.nonce,
            deadline: U256::from(plan.deadline),
            actions: plan.actions.iter().map(abi::Action::from).collect(),
        }
    }
}

impl TryFrom<abi::Plan> for Plan {
    type Error = CodecError;

    fn try_from(plan: abi::Plan) -> Result<Self, Self::Error> {
        let deadline: u64 = plan
            .deadline
            .try_into()
            .map_err(|_| CodecError::DeadlineOverflow(plan.deadline))?;
        let actions = plan
            .actions
            .into_iter()
            .map(|a| {
                let action_type = ActionType::from_u8(a.actionType)
                    .ok_or(CodecError::UnknownActionType(a.actionType))?;
                Ok(Action {
                    action_type,
                    adapter: a.adapter,
                    data: a.data,
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;
        Ok(Plan {
            user: plan.user,
            nonce: plan.nonce,
            deadline,
            actions,
        })
    }
}

/// `abi.encode(plan)` as the router hashes it
pub fn encode_plan(plan: &Plan) -> Vec<u8> {
    abi::Plan::from(plan).abi_encode()
}

pub fn execute_by_sender_calldata(plan: &Plan) -> Bytes {
    ExecutionRouter::executeBySenderCall {
        plan: abi::Plan::from(plan),
    }
    .abi_encode()
    .into()
}

pub fn execute_with_session_calldata(session_id: B256, plan: &Plan) -> Bytes {
    ExecutionRouter::executeWithSessionCall {
        sessionId: session_id,
        plan: abi::Plan::from(plan),
    }
    .abi_encode()
    .into()
}

/// A router execution call recovered from raw calldata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedExecution {
    pub session_id: Option<B256>,
    pub plan: Plan,
}

/// Decode `executeBySender` / `executeWithSession` calldata back into a plan
pub fn decode_execution_calldata(data: &[u8]) -> Result<DecodedExecution, CodecError> {
    let call =
        ExecutionRouterCalls::abi_decode(data).map_err(|e| decode_err("router calldata", e))?;
    match call {
        ExecutionRouterCalls::executeBySender(c) => Ok(DecodedExecution {
            session_id: None,
            plan: c.plan.try_into()?,
        }),
        ExecutionRouterCalls::executeWithSession(c) => Ok(DecodedExecution {
            session_id: Some(c.sessionId),
            plan: c.plan.try_into()?,
        }),
        _ => Err(CodecError::NotARelayCall),
    }
}

pub fn create_session_calldata(
    session_id: B256,
    executor: Address,
    expires_at: u64,
    max_spend: U256,
    allowed_adapters: Vec<Address>,
) -> Bytes {
    ExecutionRouter::createSessionCall {
        sessionId: session_id,
        executor,
        expiresAt: expires_at,
        maxSpend: max_spend,
        allowedAdapters: allowed_adapters,
    }
    .abi_encode()
    .into()
}

pub fn revoke_session_calldata(session_id: B256) -> Bytes {
    ExecutionRouter::revokeSessionCall {
        sessionId: session_id,
    }
    .abi_encode()
    .into()
}

pub fn sessions_calldata(session_id: B256) -> Bytes {
    ExecutionRouter::sessionsCall {
        sessionId: session_id,
    }
    .abi_encode()
    .into()
}

/// On-chain session record as returned by `sessions(bytes32)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub owner: Address,
    pub executor: Address,
    pub expires_at: u64,
    pub max_spend: U256,
    pub spent: U256,
    pub active: bool,
}

pub fn decode_session_record(data: &[u8]) -> Result<SessionRecord, CodecError> {
    let ret = ExecutionRouter::sessionsCall::abi_decode_returns(data)
        .map_err(|e| decode_err("session record", e))?;
    Ok(SessionRecord {
        owner: ret.owner,
        executor: ret.executor,
        expires_at: ret.expiresAt,
        max_spend: ret.maxSpend,
        spent: ret.spent,
        active: ret.active,
    })
}

pub fn nonces_calldata(user: Address) -> Bytes {
    ExecutionRouter::noncesCall { user }.abi_encode().into()
}

pub fn decode_nonce(data: &[u8]) -> Result<U256, CodecError> {
    ExecutionRouter::noncesCall::abi_decode_returns(data).map_err(|e| decode_err("nonce", e))
}

pub fn is_adapter_allowed_calldata(adapter: Address) -> Bytes {
    ExecutionRouter::isAdapterAllowedCall { adapter }
        .abi_encode()
        .into()
}

pub fn decode_bool(data: &[u8]) -> Result<bool, CodecError> {
    ExecutionRouter::isAdapterAllowedCall::abi_decode_returns(data)
        .map_err(|e| decode_err("bool", e))
}

pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

/// Decode revert data into a typed router error, if it is one
pub fn decode_router_revert(data: &[u8]) -> Option<ExecutionRouterErrors> {
    ExecutionRouterErrors::abi_decode(data).ok()
}

/// Decode revert data into a typed ERC-20 error, if it is one
pub fn decode_token_revert(data: &[u8]) -> Option<IERC20Errors> {
    IERC20Errors::abi_decode(data).ok()
}

/// Reason string of a plain `Error(string)` revert
pub fn decode_revert_string(data: &[u8]) -> Option<String> {
    use alloy::sol_types::SolError;
    alloy::sol_types::Revert::abi_decode(data)
        .ok()
        .map(|r| r.reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::hex;
    use alloy::primitives::aliases::U24;

    fn sample_plan() -> Plan {
        let swap = ActionPayload::Swap(SwapParams {
            tokenIn: Address::repeat_byte(0xaa),
            tokenOut: Address::repeat_byte(0xbb),
            fee: U24::from(3000u32),
            amountIn: U256::from(100_000_000_000_000_000u64),
            amountOutMin: U256::from(1u64),
            recipient: Address::repeat_byte(0x11),
        });
        Plan {
            user: Address::repeat_byte(0x11),
            nonce: U256::from(7u64),
            deadline: 1_700_000_600,
            actions: vec![swap.into_action(Address::repeat_byte(0x22))],
        }
    }

    #[test]
    fn swap_payload_decodes_by_action_type() {
        let plan = sample_plan();
        let action = &plan.actions[0];
        let payload = ActionPayload::decode(action.action_type, &action.data).unwrap();
        match payload {
            ActionPayload::Swap(p) => {
                assert_eq!(p.tokenIn, Address::repeat_byte(0xaa));
                assert_eq!(p.amountIn, U256::from(100_000_000_000_000_000u64));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn truncated_swap_payload_is_rejected() {
        let err = decode_swap(&[0u8; 31]).unwrap_err();
        assert!(matches!(err, CodecError::Decode { what: "swap params", .. }));
    }

    #[test]
    fn session_calldata_recovers_plan_and_session() {
        let plan = sample_plan();
        let session_id = B256::repeat_byte(0x5e);
        let data = execute_with_session_calldata(session_id, &plan);

        let decoded = decode_execution_calldata(&data).unwrap();
        assert_eq!(decoded.session_id, Some(session_id));
        assert_eq!(decoded.plan, plan);
    }

    #[test]
    fn non_execution_calldata_is_not_relayable() {
        let data = revoke_session_calldata(B256::ZERO);
        assert_eq!(
            decode_execution_calldata(&data).unwrap_err(),
            CodecError::NotARelayCall
        );
    }

    #[test]
    fn unknown_action_type_fails_conversion() {
        let mut raw = abi::Plan::from(&sample_plan());
        raw.actions[0].actionType = 42;
        assert_eq!(
            Plan::try_from(raw).unwrap_err(),
            CodecError::UnknownActionType(42)
        );
    }

    #[test]
    fn router_selectors_are_pinned() {
        let by_sender = execute_by_sender_calldata(&sample_plan());
        let with_session = execute_with_session_calldata(B256::ZERO, &sample_plan());
        assert_eq!(
            hex::encode(&by_sender[..4]),
            hex::encode(ExecutionRouter::executeBySenderCall::SELECTOR)
        );
        assert_eq!(
            hex::encode(&with_session[..4]),
            hex::encode(ExecutionRouter::executeWithSessionCall::SELECTOR)
        );
        assert_eq!(hex::encode(&approve_calldata(Address::ZERO, U256::ZERO)[..4]), "095ea7b3");
        assert_eq!(
            hex::encode(&revoke_session_calldata(B256::ZERO)[..4]),
            "a7fed385"
        );
    }

    #[test]
    fn typed_revert_decodes() {
        use alloy::sol_types::SolError;
        let err = ExecutionRouter::SlippageExceeded {
            amountOut: U256::from(1u64),
            amountOutMin: U256::from(2u64),
        };
        let data = err.abi_encode();
        assert!(matches!(
            decode_router_revert(&data),
            Some(ExecutionRouterErrors::SlippageExceeded(_))
        ));
        assert!(decode_router_revert(&[0xde, 0xad, 0xbe, 0xef]).is_none());
    }

    #[test]
    fn erc20_and_string_reverts_decode() {
        use alloy::sol_types::SolError;
        let err = IERC20::ERC20InsufficientBalance {
            sender: Address::ZERO,
            balance: U256::ZERO,
            needed: U256::from(5u64),
        };
        assert!(matches!(
            decode_token_revert(&err.abi_encode()),
            Some(IERC20Errors::ERC20InsufficientBalance(_))
        ));

        let revert = alloy::sol_types::Revert::from("nope").abi_encode();
        assert_eq!(decode_revert_string(&revert).as_deref(), Some("nope"));
    }
}
