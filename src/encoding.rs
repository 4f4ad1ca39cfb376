//! Byte-level encodings shared across the instruction set: script numbers,
//! push operations, signature and public-key shapes.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};
#[cfg(feature = "std")]
use std::{vec, vec::Vec};

use secp256k1::ecdsa::Signature;

use crate::{
    opcodes::{OP_0, OP_1, OP_1NEGATE, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4},
    sighash::is_defined_hash_type,
    state::ScriptError,
};

/// Script numbers never exceed nine bytes: eight magnitude bytes plus a
/// possible padding byte carrying the sign bit.
pub const MAX_CODEC_SCRIPT_NUMBER_LENGTH: usize = 9;

/// Encodes a signed integer as a minimal little-endian script number.
///
/// Zero encodes as the empty element; the sign lives in the high bit of the
/// final byte, with a padding byte appended when the magnitude already uses
/// that bit.
pub fn encode_script_number(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut magnitude = value.unsigned_abs();

    while magnitude > 0 {
        result.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    let last = result.last_mut().expect("nonzero magnitude yields bytes");
    if *last & 0x80 != 0 {
        result.push(if value < 0 { 0x80 } else { 0x00 });
    } else if value < 0 {
        *last |= 0x80;
    }

    result
}

/// Decodes a minimally-encoded script number of at most `max_len` bytes.
///
/// Non-minimal encodings, over-long inputs and values outside the `i64`
/// range all fail with `InvalidScriptNumber`.
pub fn decode_script_number(bytes: &[u8], max_len: usize) -> Result<i64, ScriptError> {
    if bytes.len() > max_len || bytes.len() > MAX_CODEC_SCRIPT_NUMBER_LENGTH {
        return Err(ScriptError::InvalidScriptNumber);
    }
    if !is_minimally_encoded(bytes) {
        return Err(ScriptError::InvalidScriptNumber);
    }
    if bytes.is_empty() {
        return Ok(0);
    }

    let mut result: i128 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= (byte as i128) << (8 * i);
    }

    let last = bytes[bytes.len() - 1];
    if last & 0x80 != 0 {
        let mask = !(0x80i128 << (8 * (bytes.len() - 1)));
        result = -(result & mask);
    }

    i64::try_from(result).map_err(|_| ScriptError::InvalidScriptNumber)
}

/// True when no trailing `0x00`/`0x80` byte could be stripped without
/// changing the encoded value.
pub fn is_minimally_encoded(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return true;
    }

    let last = bytes[bytes.len() - 1];
    if last & 0x7f == 0 {
        if bytes.len() == 1 {
            return false;
        }
        if bytes[bytes.len() - 2] & 0x80 == 0 {
            return false;
        }
    }

    true
}

/// Rewrites a (possibly padded) number encoding into its minimal form,
/// preserving the value. Used by OP_BIN2NUM and OP_NUM2BIN.
pub fn minimally_encode(bytes: &[u8]) -> Vec<u8> {
    let mut data = bytes.to_vec();
    let Some(&last) = data.last() else {
        return data;
    };
    if last & 0x7f != 0 {
        return data;
    }
    if data.len() == 1 {
        return Vec::new();
    }
    if data[data.len() - 2] & 0x80 != 0 {
        return data;
    }

    for i in (1..data.len()).rev() {
        if data[i - 1] != 0 {
            if data[i - 1] & 0x80 != 0 {
                // The sign bit collides with the magnitude; keep one
                // padding byte for it.
                data[i] = last;
                data.truncate(i + 1);
            } else {
                data[i - 1] |= last;
                data.truncate(i);
            }
            return data;
        }
    }

    Vec::new()
}

/// The canonical boolean encodings: `0x01` for true, empty for false.
pub fn boolean_to_script_number(value: bool) -> Vec<u8> {
    if value {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Stack-element truthiness: false iff the element is zero, including
/// padded and negative-zero spellings.
pub fn cast_to_bool(element: &[u8]) -> bool {
    for (i, &byte) in element.iter().enumerate() {
        if byte != 0 {
            if i == element.len() - 1 && byte == 0x80 {
                return false;
            }
            return true;
        }
    }
    false
}

/// True when `opcode` is the shortest possible push of `data`.
pub fn is_minimal_push(opcode: u8, data: &[u8]) -> bool {
    if data.is_empty() {
        return opcode == OP_0;
    }

    if data.len() == 1 {
        let value = data[0];
        if value == 0x81 {
            return opcode == OP_1NEGATE;
        }
        if (1..=16).contains(&value) {
            return opcode == OP_1 + value - 1;
        }
    }

    if data.len() <= 75 {
        return opcode as usize == data.len();
    }
    if data.len() <= 0xff {
        return opcode == OP_PUSHDATA1;
    }
    if data.len() <= 0xffff {
        return opcode == OP_PUSHDATA2;
    }
    opcode == OP_PUSHDATA4
}

/// Builds the minimal push of `data`, the inverse of [`is_minimal_push`].
pub fn encode_data_push(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return vec![OP_0];
    }
    if data.len() == 1 {
        if (1..=16).contains(&data[0]) {
            return vec![OP_1 + data[0] - 1];
        }
        if data[0] == 0x81 {
            return vec![OP_1NEGATE];
        }
    }

    let mut script = Vec::with_capacity(data.len() + 5);
    if data.len() <= 75 {
        script.push(data.len() as u8);
    } else if data.len() <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(data.len() as u8);
    } else if data.len() <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(data.len() as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(data.len() as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
    script
}

/// Appends a Bitcoin variable-length integer.
pub fn write_compact_size(buffer: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => buffer.push(value as u8),
        0xfd..=0xffff => {
            buffer.push(0xfd);
            buffer.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buffer.push(0xfe);
            buffer.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buffer.push(0xff);
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Strict-DER shape check over a bare signature (no trailing hash type),
/// following the BIP66 rules.
pub fn is_valid_der_signature_encoding(sig: &[u8]) -> bool {
    if sig.len() < 8 || sig.len() > 72 {
        return false;
    }
    if sig[0] != 0x30 {
        return false;
    }
    if sig[1] as usize != sig.len() - 2 {
        return false;
    }

    let len_r = sig[3] as usize;
    if 5 + len_r >= sig.len() {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;

    if sig[2] != 0x02 {
        return false;
    }
    if len_r == 0 {
        return false;
    }
    if sig[4] & 0x80 != 0 {
        return false;
    }
    if len_r > 1 && sig[4] == 0x00 && (sig[5] & 0x80) == 0 {
        return false;
    }

    if sig[len_r + 4] != 0x02 {
        return false;
    }
    if len_s == 0 {
        return false;
    }
    if len_r + len_s + 6 != sig.len() {
        return false;
    }
    if sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0x00 && (sig[len_r + 7] & 0x80) == 0 {
        return false;
    }
    true
}

/// True when the signature's `s` component is already in the lower half of
/// the curve order, i.e. normalization would be a no-op.
pub fn is_low_s_signature(der: &[u8]) -> bool {
    let Ok(signature) = Signature::from_der(der) else {
        return false;
    };
    let mut normalized = signature;
    normalized.normalize_s();
    normalized == signature
}

/// Validates a transaction signature as pushed for OP_CHECKSIG: strict DER,
/// low-S, and a defined forkid hash type in the trailing byte.
pub fn check_transaction_signature_encoding(signature: &[u8]) -> Result<(), ScriptError> {
    let Some((&hash_type, der)) = signature.split_last() else {
        return Err(ScriptError::InvalidSignatureEncoding);
    };
    if !is_valid_der_signature_encoding(der) || !is_low_s_signature(der) {
        return Err(ScriptError::InvalidSignatureEncoding);
    }
    if !is_defined_hash_type(hash_type) {
        return Err(ScriptError::InvalidSignatureEncoding);
    }
    Ok(())
}

/// Validates a data signature as pushed for OP_CHECKDATASIG: strict DER and
/// low-S, with no hash-type byte.
pub fn check_data_signature_encoding(signature: &[u8]) -> Result<(), ScriptError> {
    if !is_valid_der_signature_encoding(signature) || !is_low_s_signature(signature) {
        return Err(ScriptError::InvalidSignatureEncoding);
    }
    Ok(())
}

/// SEC public-key shapes: compressed (33 bytes, `0x02`/`0x03`) or
/// uncompressed (65 bytes, `0x04`).
pub fn is_valid_public_key_encoding(public_key: &[u8]) -> bool {
    if public_key.len() == 33 {
        matches!(public_key[0], 0x02 | 0x03)
    } else if public_key.len() == 65 {
        public_key[0] == 0x04
    } else {
        false
    }
}
