//! Transaction Canonicalizer
//!
//! Turns a caller-supplied `EncodedTransaction` into the deterministic
//! `CanonicalTransaction` that the codec serializes and the signer signs.
//! The fee model is resolved here, once, into a `FeeModel` variant.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Address, Quantity};
use crate::utils::crypto::{decode_hex, encode_hex_prefixed};
use crate::{log_debug, log_warn};

const MODULE: &str = "evm::transaction";

/// Largest chain id whose EIP-155 `v` (`chainId * 2 + 36`) fits in a u64 (EIP-2294)
pub const MAX_CHAIN_ID: u64 = u64::MAX / 2 - 36;

/// Caller-facing transaction description.
///
/// Quantities accept JSON numbers, decimal strings or `0x` hex strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedTransaction {
    /// Recipient; absent for contract deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default)]
    pub nonce: Option<Quantity>,
    #[serde(default, alias = "gas")]
    pub gas_limit: Option<Quantity>,
    /// Hex call data
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub value: Option<Quantity>,
    #[serde(default)]
    pub chain_id: Option<Quantity>,
    #[serde(default)]
    pub gas_price: Option<Quantity>,
    #[serde(default)]
    pub max_fee_per_gas: Option<Quantity>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<Quantity>,
}

impl EncodedTransaction {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn uses_fee_market(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }
}

/// Fee model of a canonical transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeModel {
    /// Type 0: single gas price
    Legacy { gas_price: Quantity },
    /// Type 2: base-fee cap plus priority tip
    PriorityFee {
        max_fee_per_gas: Quantity,
        max_priority_fee_per_gas: Quantity,
    },
}

impl FeeModel {
    pub fn tx_type(&self) -> u8 {
        match self {
            FeeModel::Legacy { .. } => 0,
            FeeModel::PriorityFee { .. } => 2,
        }
    }
}

/// Normalized transaction; only `canonicalize` builds one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTransaction {
    to: Option<Address>,
    nonce: Quantity,
    gas_limit: Quantity,
    value: Quantity,
    data: Vec<u8>,
    chain_id: u64,
    fee: FeeModel,
}

impl CanonicalTransaction {
    pub fn to(&self) -> Option<&Address> {
        self.to.as_ref()
    }

    pub fn nonce(&self) -> Quantity {
        self.nonce
    }

    pub fn gas_limit(&self) -> Quantity {
        self.gas_limit
    }

    pub fn value(&self) -> Quantity {
        self.value
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn fee(&self) -> &FeeModel {
        &self.fee
    }

    /// 0 = legacy, 2 = priority-fee
    pub fn tx_type(&self) -> u8 {
        self.fee.tx_type()
    }

    pub fn gas_price(&self) -> Option<Quantity> {
        match self.fee {
            FeeModel::Legacy { gas_price } => Some(gas_price),
            FeeModel::PriorityFee { .. } => None,
        }
    }

    pub fn max_fee_per_gas(&self) -> Option<Quantity> {
        match self.fee {
            FeeModel::PriorityFee { max_fee_per_gas, .. } => Some(max_fee_per_gas),
            FeeModel::Legacy { .. } => None,
        }
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<Quantity> {
        match self.fee {
            FeeModel::PriorityFee { max_priority_fee_per_gas, .. } => Some(max_priority_fee_per_gas),
            FeeModel::Legacy { .. } => None,
        }
    }

    pub fn is_contract_deployment(&self) -> bool {
        self.to.is_none()
    }

    /// `0x`-prefixed call data, `0x` when empty
    pub fn data_hex(&self) -> String {
        encode_hex_prefixed(&self.data)
    }
}

/// Flat hex rendering with a `type` discriminant
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalTransactionJson {
    #[serde(rename = "type")]
    tx_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<Address>,
    nonce: Quantity,
    gas_limit: Quantity,
    value: Quantity,
    data: String,
    chain_id: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_price: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_fee_per_gas: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_priority_fee_per_gas: Option<Quantity>,
}

impl Serialize for CanonicalTransaction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CanonicalTransactionJson {
            tx_type: self.tx_type(),
            to: self.to,
            nonce: self.nonce,
            gas_limit: self.gas_limit,
            value: self.value,
            data: self.data_hex(),
            chain_id: Quantity::from_u64(self.chain_id),
            gas_price: self.gas_price(),
            max_fee_per_gas: self.max_fee_per_gas(),
            max_priority_fee_per_gas: self.max_priority_fee_per_gas(),
        }
        .serialize(serializer)
    }
}

/// Normalize a transaction description into its canonical form.
///
/// Fails with `MissingField` when `nonce`, `gasLimit` or `chainId` is
/// absent, or when the selected fee model is incomplete. A deployment
/// (`to` absent) always carries a zero value.
pub fn canonicalize(tx: &EncodedTransaction) -> CoreResult<CanonicalTransaction> {
    let nonce = tx.nonce.ok_or_else(|| CoreError::missing_field("nonce"))?;
    let gas_limit = tx.gas_limit.ok_or_else(|| CoreError::missing_field("gasLimit"))?;
    let chain_id = tx
        .chain_id
        .ok_or_else(|| CoreError::missing_field("chainId"))?
        .as_u64()
        .filter(|id| *id <= MAX_CHAIN_ID)
        .ok_or_else(|| {
            CoreError::invalid_input(format!("chainId exceeds the maximum of {}", MAX_CHAIN_ID))
        })?;

    let requested_value = tx.value.unwrap_or_default();
    let value = match tx.to {
        Some(_) => requested_value,
        None => {
            if !requested_value.is_zero() {
                log_warn!(
                    MODULE,
                    "Contract deployment carried a nonzero value; forcing value to 0x0",
                    requested_value = requested_value,
                );
            }
            Quantity::ZERO
        }
    };

    let fee = select_fee_model(tx)?;

    let data = match tx.data.as_deref() {
        Some(hex_data) => decode_hex(hex_data)?,
        None => Vec::new(),
    };

    log_debug!(
        MODULE,
        "Canonicalized transaction",
        tx_type = fee.tx_type(),
        chain_id = chain_id,
        nonce = nonce,
    );

    Ok(CanonicalTransaction {
        to: tx.to,
        nonce,
        gas_limit,
        value,
        data,
        chain_id,
        fee,
    })
}

fn select_fee_model(tx: &EncodedTransaction) -> CoreResult<FeeModel> {
    if tx.uses_fee_market() {
        let max_fee_per_gas = tx
            .max_fee_per_gas
            .ok_or_else(|| CoreError::missing_field("maxFeePerGas"))?;
        let max_priority_fee_per_gas = tx
            .max_priority_fee_per_gas
            .ok_or_else(|| CoreError::missing_field("maxPriorityFeePerGas"))?;
        if tx.gas_price.is_some() {
            log_debug!(MODULE, "Dropping gasPrice from a fee-market transaction");
        }
        Ok(FeeModel::PriorityFee {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    } else {
        let gas_price = tx
            .gas_price
            .ok_or_else(|| CoreError::missing_field("gasPrice"))?;
        Ok(FeeModel::Legacy { gas_price })
    }
}
