//! RLP Transaction Codec
//!
//! Wire encoding for the two supported transaction types:
//! - type 0: `rlp([nonce, gasPrice, gasLimit, to, value, data, v, r, s])`
//!   with EIP-155 replay protection (`chainId, 0, 0` while unsigned)
//! - type 2: `0x02 || rlp([chainId, nonce, maxPriorityFeePerGas,
//!   maxFeePerGas, gasLimit, to, value, data, accessList, yParity, r, s])`
//!
//! Access lists are always empty.

use super::secp256k1::recover_address;
use super::{SignatureTriple, TransactionCodec};
use crate::error::{CoreError, CoreResult};
use crate::evm::transaction::{CanonicalTransaction, FeeModel};
use crate::types::{Address, Quantity};
use crate::utils::crypto::keccak256;

/// EIP-2718 type byte of priority-fee transactions
const EIP1559_TX_TYPE: u8 = 0x02;

/// Legacy `v` offset for unprotected and message signatures
const LEGACY_V_OFFSET: u64 = 27;

/// EIP-155: `v = recovery_param + 35 + 2 * chainId`
const EIP155_V_OFFSET: u64 = 35;

#[derive(Debug, Clone, Copy, Default)]
pub struct RlpCodec;

impl TransactionCodec for RlpCodec {
    fn serialize_unsigned(&self, tx: &CanonicalTransaction) -> CoreResult<Vec<u8>> {
        let mut items = fields(tx);
        match tx.fee() {
            FeeModel::Legacy { .. } => {
                items.push(rlp_encode_u64(tx.chain_id()));
                items.push(rlp_encode_u64(0));
                items.push(rlp_encode_u64(0));
                Ok(rlp_encode_list(&items))
            }
            FeeModel::PriorityFee { .. } => Ok(typed_envelope(&items)),
        }
    }

    fn serialize_signed(
        &self,
        tx: &CanonicalTransaction,
        signature: &SignatureTriple,
    ) -> CoreResult<Vec<u8>> {
        check_recovery_param(signature.recovery_param)?;

        let mut items = fields(tx);
        items.push(rlp_encode_u64(self.wire_v(tx, signature)));
        items.push(rlp_encode_scalar(&signature.r));
        items.push(rlp_encode_scalar(&signature.s));

        match tx.fee() {
            FeeModel::Legacy { .. } => Ok(rlp_encode_list(&items)),
            FeeModel::PriorityFee { .. } => Ok(typed_envelope(&items)),
        }
    }

    fn split_signature(
        &self,
        recovery_param: u8,
        r: &[u8; 32],
        s: &[u8; 32],
    ) -> CoreResult<SignatureTriple> {
        check_recovery_param(recovery_param)?;
        Ok(SignatureTriple {
            v: LEGACY_V_OFFSET + recovery_param as u64,
            r: *r,
            s: *s,
            recovery_param,
        })
    }

    fn wire_v(&self, tx: &CanonicalTransaction, signature: &SignatureTriple) -> u64 {
        let recovery_param = signature.recovery_param as u64;
        match tx.fee() {
            FeeModel::Legacy { .. } => {
                // canonicalize bounds chain_id by MAX_CHAIN_ID, so this cannot overflow
                tx.chain_id() * 2 + EIP155_V_OFFSET + recovery_param
            }
            FeeModel::PriorityFee { .. } => recovery_param,
        }
    }

    fn recover_signer(
        &self,
        tx: &CanonicalTransaction,
        signature: &SignatureTriple,
    ) -> CoreResult<Address> {
        let digest = keccak256(&self.serialize_unsigned(tx)?);
        recover_address(&digest, &signature.r, &signature.s, signature.recovery_param)
    }
}

fn check_recovery_param(recovery_param: u8) -> CoreResult<()> {
    if recovery_param > 1 {
        return Err(CoreError::signing_primitive(format!(
            "Invalid recovery param: {}",
            recovery_param
        )));
    }
    Ok(())
}

/// Payload fields shared by the signed and unsigned forms, in wire order
fn fields(tx: &CanonicalTransaction) -> Vec<Vec<u8>> {
    let mut items = Vec::with_capacity(12);
    match tx.fee() {
        FeeModel::Legacy { gas_price } => {
            items.push(rlp_encode_quantity(&tx.nonce()));
            items.push(rlp_encode_quantity(gas_price));
            items.push(rlp_encode_quantity(&tx.gas_limit()));
            items.push(rlp_encode_address(tx.to()));
            items.push(rlp_encode_quantity(&tx.value()));
            items.push(rlp_encode_bytes(tx.data()));
        }
        FeeModel::PriorityFee {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            items.push(rlp_encode_u64(tx.chain_id()));
            items.push(rlp_encode_quantity(&tx.nonce()));
            items.push(rlp_encode_quantity(max_priority_fee_per_gas));
            items.push(rlp_encode_quantity(max_fee_per_gas));
            items.push(rlp_encode_quantity(&tx.gas_limit()));
            items.push(rlp_encode_address(tx.to()));
            items.push(rlp_encode_quantity(&tx.value()));
            items.push(rlp_encode_bytes(tx.data()));
            // empty access list
            items.push(rlp_encode_list(&[]));
        }
    }
    items
}

fn typed_envelope(items: &[Vec<u8>]) -> Vec<u8> {
    let rlp_data = rlp_encode_list(items);
    let mut out = Vec::with_capacity(1 + rlp_data.len());
    out.push(EIP1559_TX_TYPE);
    out.extend_from_slice(&rlp_data);
    out
}

// RLP encoding helpers

fn rlp_encode_u64(val: u64) -> Vec<u8> {
    rlp_encode_bytes(trim_leading_zeros(&val.to_be_bytes()))
}

fn rlp_encode_quantity(val: &Quantity) -> Vec<u8> {
    rlp_encode_bytes(&val.to_be_bytes_trimmed())
}

/// r and s are integers on the wire: leading zeros are dropped
fn rlp_encode_scalar(val: &[u8; 32]) -> Vec<u8> {
    rlp_encode_bytes(trim_leading_zeros(val))
}

fn rlp_encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }

    if data.len() < 56 {
        let mut result = vec![0x80 + data.len() as u8];
        result.extend_from_slice(data);
        result
    } else {
        let len_bytes = encode_length(data.len());
        let mut result = vec![0xb7 + len_bytes.len() as u8];
        result.extend_from_slice(&len_bytes);
        result.extend_from_slice(data);
        result
    }
}

fn rlp_encode_address(addr: Option<&Address>) -> Vec<u8> {
    match addr {
        Some(a) => rlp_encode_bytes(a.as_bytes()),
        // contract creation
        None => vec![0x80],
    }
}

fn rlp_encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();

    if payload.len() < 56 {
        let mut result = vec![0xc0 + payload.len() as u8];
        result.extend_from_slice(&payload);
        result
    } else {
        let len_bytes = encode_length(payload.len());
        let mut result = vec![0xf7 + len_bytes.len() as u8];
        result.extend_from_slice(&len_bytes);
        result.extend_from_slice(&payload);
        result
    }
}

fn encode_length(len: usize) -> Vec<u8> {
    trim_leading_zeros(&len.to_be_bytes()).to_vec()
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
