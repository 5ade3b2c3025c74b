//! Session relay from prepare to settled portfolio, against a scripted chain

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use intent_relay::audit::AuditLog;
use intent_relay::chain::{ChainReceipt, ReceiptPoll, Scripted, ScriptedChain};
use intent_relay::clock::ManualClock;
use intent_relay::codec::abi::ExecutionRouter;
use intent_relay::config::AdapterAddresses;
use intent_relay::execution::{PrepareRequest, ResultStatus, SubmitRequest};
use intent_relay::plan::{ExecutionMode, ExecutionRequest};
use intent_relay::portfolio::{InMemoryPortfolioStore, PortfolioDelta, PortfolioStore};
use intent_relay::relay::{ReceiptStatus, RelayRequest};
use intent_relay::{ExecutionConfig, ExecutionService};

const NOW: u64 = 1_700_000_000;
const CHAIN_ID: u64 = 11_155_111;

fn user() -> Address {
    Address::repeat_byte(0x11)
}

fn relayer() -> Address {
    Address::repeat_byte(0x99)
}

fn config() -> ExecutionConfig {
    let mut config = ExecutionConfig::default();
    config.rpc_url = Some("http://127.0.0.1:8545".into());
    config.router_address = Some(Address::repeat_byte(0x44));
    config.relayer_private_key = Some("0x01".to_string().into());
    config.adapters = AdapterAddresses {
        swap: Some(Address::repeat_byte(0x22)),
        wrap: Some(Address::repeat_byte(0x33)),
        pull: Some(Address::repeat_byte(0x55)),
        ..Default::default()
    };
    config
}

fn scripted_chain() -> Arc<ScriptedChain> {
    let chain = Arc::new(ScriptedChain::new(CHAIN_ID).with_signer(relayer()));
    chain.on_call(
        ExecutionRouter::noncesCall::SELECTOR,
        Scripted::Return(U256::ZERO.abi_encode().into()),
    );
    chain.on_call(
        ExecutionRouter::sessionsCall::SELECTOR,
        Scripted::Return(
            (
                user(),
                relayer(),
                NOW + 3_600,
                U256::from(10u64).pow(U256::from(18u64)),
                U256::ZERO,
                true,
            )
                .abi_encode_params()
                .into(),
        ),
    );
    chain
}

async fn setup(chain: Arc<ScriptedChain>) -> (ExecutionService, InMemoryPortfolioStore) {
    let store = InMemoryPortfolioStore::new();
    store.seed(user(), "WETH", 500.0).await;
    store.seed(user(), "USDC", 1_000.0).await;

    let service = ExecutionService::new(
        Arc::new(config()),
        Some(chain),
        Arc::new(store.clone()),
        AuditLog::disabled(),
        Arc::new(ManualClock::at_unix(NOW)),
    );
    (service, store)
}

async fn prepared_relay(service: &ExecutionService) -> RelayRequest {
    let prepared = service
        .prepare(&PrepareRequest {
            user_address: user(),
            mode: ExecutionMode::Session,
            execution_request: ExecutionRequest::Swap {
                token_in: "ETH".into(),
                token_out: "USDC".into(),
                amount_in: Some("0.1".into()),
                slippage_bps: None,
            },
        })
        .await
        .unwrap();
    assert!(prepared.call.is_none());

    RelayRequest {
        session_id: B256::repeat_byte(0x5e),
        plan: prepared.prepared.plan,
    }
}

#[tokio::test(start_paused = true)]
async fn relayed_swap_settles_after_receipt_is_mined() {
    let chain = scripted_chain();
    chain.set_receipt_script(vec![
        ReceiptPoll::Pending,
        ReceiptPoll::Pending,
        ReceiptPoll::Mined(ChainReceipt {
            success: true,
            block_number: Some(1_000),
        }),
    ]);
    let (service, store) = setup(chain.clone()).await;
    let request = prepared_relay(&service).await;
    let before = store.snapshot(user()).await;

    let result = service.relayed(&request).await.unwrap();

    assert!(result.success);
    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.receipt_status, ReceiptStatus::Confirmed);
    assert_eq!(result.block_number, Some(1_000));
    assert_eq!(
        result.portfolio_delta,
        Some(PortfolioDelta::between(&before, &result.portfolio))
    );
    assert_eq!(result.portfolio, store.snapshot(user()).await);

    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, Some(relayer()));
    let call = ExecutionRouter::executeWithSessionCall::abi_decode(&sent[0].data).unwrap();
    assert_eq!(call.sessionId, request.session_id);
    assert!(result.tx_hash.is_some());
}

#[tokio::test(start_paused = true)]
async fn relayed_swap_without_receipt_times_out_unsettled() {
    let chain = scripted_chain();
    chain.set_receipt_script(vec![ReceiptPoll::Pending]);
    let (service, store) = setup(chain.clone()).await;
    let request = prepared_relay(&service).await;
    let before = store.snapshot(user()).await;

    let result = service.relayed(&request).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.receipt_status, ReceiptStatus::Timeout);
    assert!(result.tx_hash.is_some());
    assert!(result.portfolio_delta.unwrap().is_zero());
    assert_eq!(store.snapshot(user()).await, before);
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn replayed_plan_is_not_broadcast_twice() {
    let chain = scripted_chain();
    chain.set_receipt_script(vec![ReceiptPoll::Mined(ChainReceipt {
        success: true,
        block_number: Some(7),
    })]);
    let (service, _store) = setup(chain.clone()).await;
    let request = prepared_relay(&service).await;

    let first = service.relayed(&request).await.unwrap();
    let err = service.relayed(&request).await.unwrap_err();

    assert!(first.success);
    assert_eq!(err.code(), "DUPLICATE_SUBMISSION");
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn relayed_effects_apply_once_per_transaction() {
    let chain = scripted_chain();
    chain.set_receipt_script(vec![ReceiptPoll::Mined(ChainReceipt {
        success: true,
        block_number: Some(9),
    })]);
    let (service, store) = setup(chain.clone()).await;
    let request = prepared_relay(&service).await;

    let relayed = service.relayed(&request).await.unwrap();
    assert!(!relayed.portfolio_delta.unwrap().is_zero());
    let settled = store.snapshot(user()).await;

    let resubmitted = service
        .submit(&SubmitRequest {
            tx_hash: relayed.tx_hash.unwrap(),
            user_address: user(),
            plan: Some(request.plan.clone()),
        })
        .await
        .unwrap();

    assert!(resubmitted.success);
    assert_eq!(resubmitted.block_number, Some(9));
    assert!(resubmitted.portfolio_delta.unwrap().is_zero());
    assert_eq!(store.snapshot(user()).await, settled);
}
