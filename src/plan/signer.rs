//! Plan hashing and EIP-712 typed data
//!
//! `PlanHash = keccak256(abi.encode(plan))`. The typed-data view is what the
//! user's wallet signs for direct execution and what the relay endpoint echoes
//! back as `plan`.

use std::borrow::Cow;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{Plan, PlanHash};
use crate::codec::{self, abi};

/// EIP-712 domain name of the execution router
pub const DOMAIN_NAME: &str = "IntentExecutionRouter";
/// EIP-712 domain version of the execution router
pub const DOMAIN_VERSION: &str = "1";

/// Output of signing preparation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPlan {
    pub plan_hash: PlanHash,
    /// EIP-712 digest the wallet signs
    pub eip712_digest: B256,
    pub typed_data: Value,
}

/// Encodes plans for hashing and wallet signature
#[derive(Debug, Clone)]
pub struct PlanSigner {
    domain: Eip712Domain,
    chain_id: u64,
    router: Address,
}

impl PlanSigner {
    pub fn new(chain_id: u64, router: Address) -> Self {
        let domain = Eip712Domain::new(
            Some(Cow::Borrowed(DOMAIN_NAME)),
            Some(Cow::Borrowed(DOMAIN_VERSION)),
            Some(U256::from(chain_id)),
            Some(router),
            None,
        );
        Self {
            domain,
            chain_id,
            router,
        }
    }

    /// Pure function of plan content, including action order
    pub fn plan_hash(plan: &Plan) -> PlanHash {
        keccak256(codec::encode_plan(plan))
    }

    pub fn eip712_digest(&self, plan: &Plan) -> B256 {
        abi::Plan::from(plan).eip712_signing_hash(&self.domain)
    }

    /// EIP-712 encodeType string of the plan struct
    pub fn encode_type() -> String {
        abi::Plan::eip712_encode_type().into_owned()
    }

    pub fn typed_data(&self, plan: &Plan) -> Value {
        let actions: Vec<Value> = plan
            .actions
            .iter()
            .map(|a| {
                json!({
                    "actionType": a.action_type.as_u8(),
                    "adapter": a.adapter.to_string(),
                    "data": a.data.to_string(),
                })
            })
            .collect();

        json!({
            "domain": {
                "name": DOMAIN_NAME,
                "version": DOMAIN_VERSION,
                "chainId": self.chain_id,
                "verifyingContract": self.router.to_string(),
            },
            "types": self.types(),
            "primaryType": "Plan",
            "message": {
                "user": plan.user.to_string(),
                "nonce": plan.nonce.to_string(),
                "deadline": plan.deadline.to_string(),
                "actions": actions,
            },
        })
    }

    /// `types` block of the typed data, read off the domain and plan encodeType strings
    fn types(&self) -> Value {
        let encoded = format!("{}{}", self.domain.encode_type(), Self::encode_type());
        Value::Object(type_fields(&encoded))
    }

    pub fn sign(&self, plan: &Plan) -> SignedPlan {
        SignedPlan {
            plan_hash: Self::plan_hash(plan),
            eip712_digest: self.eip712_digest(plan),
            typed_data: self.typed_data(plan),
        }
    }
}

/// Splits `Name(type field,...)Other(...)` into `{ Name: [{name, type}, ...] }`
fn type_fields(encoded: &str) -> Map<String, Value> {
    encoded
        .split_inclusive(')')
        .filter_map(|def| def.strip_suffix(')')?.split_once('('))
        .map(|(name, fields)| {
            let members = fields
                .split(',')
                .filter_map(|field| field.rsplit_once(' '))
                .map(|(ty, field)| json!({ "name": field, "type": ty }))
                .collect();
            (name.to_string(), Value::Array(members))
        })
        .collect()
}
