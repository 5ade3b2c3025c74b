//! In-memory chain client driven by a script
//!
//! Calls are answered by selector, receipts follow a per-transaction poll
//! sequence, and every broadcast is recorded. Used by the unit and
//! integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use alloy::primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;

use super::{CallRequest, ChainClient, ChainError, ChainReceipt, ChainTransaction};

/// Scripted answer to a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    Return(Bytes),
    Revert(Bytes),
    Fail(String),
    /// Never answers
    Stall,
}

/// One answer in a receipt poll sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptPoll {
    Pending,
    Error(String),
    Mined(ChainReceipt),
}

#[derive(Debug, Default)]
struct ScriptState {
    calls: HashMap<[u8; 4], Scripted>,
    code: HashMap<Address, Bytes>,
    receipt_script: Vec<ReceiptPoll>,
    receipts: HashMap<B256, VecDeque<ReceiptPoll>>,
    transactions: HashMap<B256, ChainTransaction>,
    send_result: Option<Scripted>,
    sent: Vec<CallRequest>,
    call_log: Vec<CallRequest>,
    unreachable: bool,
}

#[derive(Debug)]
pub struct ScriptedChain {
    chain_id: u64,
    signer: Option<Address>,
    state: Mutex<ScriptState>,
}

impl ScriptedChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            signer: None,
            state: Mutex::new(ScriptState::default()),
        }
    }

    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = Some(signer);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer calls with this selector
    pub fn on_call(&self, selector: [u8; 4], answer: Scripted) {
        self.state().calls.insert(selector, answer);
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state().code.insert(address, code);
    }

    /// Poll sequence given to every transaction sent from now on. The last
    /// entry repeats once the sequence is exhausted.
    pub fn set_receipt_script(&self, script: Vec<ReceiptPoll>) {
        self.state().receipt_script = script;
    }

    /// Make broadcasts fail or hang instead of returning a hash
    pub fn set_send_result(&self, result: Option<Scripted>) {
        self.state().send_result = result;
    }

    /// Every method fails with a transport error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    pub fn sent(&self) -> Vec<CallRequest> {
        self.state().sent.clone()
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.state().call_log.clone()
    }

    fn check_reachable(&self) -> Result<(), ChainError> {
        if self.state().unreachable {
            Err(ChainError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

async fn resolve(answer: Scripted) -> Result<Bytes, ChainError> {
    match answer {
        Scripted::Return(data) => Ok(data),
        Scripted::Revert(data) => Err(ChainError::Revert {
            data: Some(data),
            message: "execution reverted".to_string(),
        }),
        Scripted::Fail(reason) => Err(ChainError::Transport(reason)),
        Scripted::Stall => std::future::pending().await,
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.check_reachable()?;
        Ok(self.chain_id)
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, ChainError> {
        self.check_reachable()?;
        let answer = {
            let mut state = self.state();
            state.call_log.push(request.clone());
            request
                .selector()
                .and_then(|s| state.calls.get(&s).cloned())
                .unwrap_or(Scripted::Return(Bytes::new()))
        };
        resolve(answer).await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.check_reachable()?;
        Ok(self.state().code.get(&address).cloned().unwrap_or_default())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        self.check_reachable()?;
        let state = self.state();
        Ok(state
            .sent
            .iter()
            .filter(|tx| tx.from == Some(address))
            .count() as u64)
    }

    async fn transaction(&self, tx_hash: B256) -> Result<Option<ChainTransaction>, ChainError> {
        self.check_reachable()?;
        Ok(self.state().transactions.get(&tx_hash).cloned())
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<ChainReceipt>, ChainError> {
        self.check_reachable()?;
        let poll = {
            let mut state = self.state();
            match state.receipts.get_mut(&tx_hash) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match poll.unwrap_or(ReceiptPoll::Pending) {
            ReceiptPoll::Pending => Ok(None),
            ReceiptPoll::Error(reason) => Err(ChainError::Transport(reason)),
            ReceiptPoll::Mined(receipt) => Ok(Some(receipt)),
        }
    }

    async fn send_transaction(&self, request: CallRequest) -> Result<B256, ChainError> {
        self.check_reachable()?;
        let scripted_failure = self.state().send_result.clone();
        if let Some(answer) = scripted_failure {
            resolve(answer).await?;
            return Err(ChainError::Transport("broadcast rejected".to_string()));
        }

        let mut state = self.state();
        let mut preimage = request.data.to_vec();
        preimage.extend_from_slice(&(state.sent.len() as u64).to_be_bytes());
        let hash = keccak256(&preimage);
        let script: VecDeque<ReceiptPoll> = state.receipt_script.iter().cloned().collect();
        state.receipts.insert(hash, script);
        state.transactions.insert(
            hash,
            ChainTransaction {
                from: request.from.or(self.signer).unwrap_or_default(),
                to: Some(request.to),
                input: request.data.clone(),
                value: request.value,
            },
        );
        state.sent.push(request);
        Ok(hash)
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}
