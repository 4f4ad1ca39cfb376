//! The signing serialization: the canonical preimage hashed to form the
//! message a transaction signature authenticates (BIP143 layout with the
//! mandatory Bitcoin Cash forkid).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::{
    crypto::Sha256,
    encoding::write_compact_size,
    state::TransactionContext,
};

/// Sign all outputs.
pub const SIGHASH_ALL: u8 = 0x01;
/// Sign no outputs.
pub const SIGHASH_NONE: u8 = 0x02;
/// Sign only the output at the input's index.
pub const SIGHASH_SINGLE: u8 = 0x03;
/// Mandatory on Bitcoin Cash: commits to the fork, replay-protecting
/// signatures against the BTC chain.
pub const SIGHASH_FORKID: u8 = 0x40;
/// Commit to this input only, allowing others to be added.
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

const ZERO_HASH: [u8; 32] = [0; 32];

/// The base output-selection mode of a hash-type byte.
pub fn base_hash_type(hash_type: u8) -> u8 {
    hash_type & !(SIGHASH_FORKID | SIGHASH_ANYONECANPAY)
}

pub fn uses_anyone_can_pay(hash_type: u8) -> bool {
    hash_type & SIGHASH_ANYONECANPAY != 0
}

/// True for the hash types this dialect accepts: ALL/NONE/SINGLE with the
/// forkid bit set, optionally combined with ANYONECANPAY. Any other bit
/// pattern invalidates the signature encoding.
pub fn is_defined_hash_type(hash_type: u8) -> bool {
    if hash_type & SIGHASH_FORKID == 0 {
        return false;
    }
    matches!(
        base_hash_type(hash_type),
        SIGHASH_ALL | SIGHASH_NONE | SIGHASH_SINGLE
    )
}

/// Assembles the preimage committing a signature to the transaction
/// context and the active `scriptCode`.
///
/// Layout: version, hashPrevouts, hashSequence, outpoint, varint-prefixed
/// scriptCode, value, sequence, hashOutputs, locktime, 4-byte hash type.
pub fn signing_serialization(
    context: &TransactionContext,
    script_code: &[u8],
    hash_type: u8,
) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(156 + script_code.len());

    preimage.extend_from_slice(&context.version.to_le_bytes());

    let hash_prevouts = if uses_anyone_can_pay(hash_type) {
        &ZERO_HASH
    } else {
        &context.transaction_outpoints_hash
    };
    preimage.extend_from_slice(hash_prevouts);

    let hash_sequence = if uses_anyone_can_pay(hash_type)
        || base_hash_type(hash_type) != SIGHASH_ALL
    {
        &ZERO_HASH
    } else {
        &context.transaction_sequence_numbers_hash
    };
    preimage.extend_from_slice(hash_sequence);

    preimage.extend_from_slice(&context.outpoint_transaction_hash);
    preimage.extend_from_slice(&context.outpoint_index.to_le_bytes());

    write_compact_size(&mut preimage, script_code.len() as u64);
    preimage.extend_from_slice(script_code);

    preimage.extend_from_slice(&context.outpoint_value.to_le_bytes());
    preimage.extend_from_slice(&context.sequence_number.to_le_bytes());

    let hash_outputs = match base_hash_type(hash_type) {
        SIGHASH_ALL => &context.transaction_outputs_hash,
        SIGHASH_SINGLE => context
            .corresponding_output_hash
            .as_ref()
            .unwrap_or(&ZERO_HASH),
        _ => &ZERO_HASH,
    };
    preimage.extend_from_slice(hash_outputs);

    preimage.extend_from_slice(&context.locktime.to_le_bytes());
    preimage.extend_from_slice(&(hash_type as u32).to_le_bytes());

    preimage
}

/// The 32-byte digest handed to the signature verifier: a double SHA-256
/// of the signing serialization.
pub fn signing_serialization_digest<C: Sha256>(
    crypto: &C,
    context: &TransactionContext,
    script_code: &[u8],
    hash_type: u8,
) -> [u8; 32] {
    let preimage = signing_serialization(context, script_code, hash_type);
    crypto.hash(&crypto.hash(&preimage))
}
