//! The operator table: one transition, mnemonic renderer and description
//! per opcode of the BCH_2019May instruction set.
//!
//! Operations receive the program state by value and return it, recording
//! failures through [`ProgramState::fail`]. Apart from the four
//! conditionals, pushes and the unconditionally-invalid opcodes, every
//! operation is a no-op while the state sits in an untaken branch.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, format, string::String, vec::Vec};
#[cfg(feature = "std")]
use std::{boxed::Box, format, string::String, vec::Vec};

use crate::{
    crypto::{CryptoProvider, Ripemd160, Sha1, Sha256},
    encoding::{
        cast_to_bool, check_data_signature_encoding, check_transaction_signature_encoding,
        decode_script_number, is_minimal_push, is_valid_public_key_encoding, minimally_encode,
    },
    opcodes::{self, *},
    sighash::signing_serialization_digest,
    state::{
        ProgramState, ScriptError, LOCKTIME_SCRIPT_NUMBER_LENGTH, MAX_MULTISIG_PUBLIC_KEYS,
        MAX_OPERATION_COUNT, MAX_SCRIPT_NUMBER_LENGTH, MAX_STACK_ELEMENT_SIZE,
    },
    vm::{BchInstructionSet, Operator},
};

/// Locktimes below this threshold are block heights; above it, timestamps.
const LOCKTIME_THRESHOLD: u32 = 500_000_000;
const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;
const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;
const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;
const SEQUENCE_LOCKTIME_GRANULARITY: u32 = 9;

pub(crate) type Operation<C> = fn(ProgramState, &BchInstructionSet<C>) -> ProgramState;
pub(crate) type BchOperator<C> = Operator<ProgramState, BchInstructionSet<C>>;

/// Builds the dense dispatch table. Bytes without an entry (`0xbc..0xff`)
/// fail with `UnknownOpcode` at dispatch.
pub(crate) fn operator_table<C: CryptoProvider>() -> Box<[Option<BchOperator<C>>; 256]> {
    let mut table: Box<[Option<BchOperator<C>>; 256]> =
        Box::new(core::array::from_fn(|_| None));

    table[OP_0 as usize] = entry(op_push_empty);
    for opcode in OP_PUSHBYTES_1..=OP_PUSHBYTES_75 {
        table[opcode as usize] = push_entry(op_push);
    }
    for opcode in [OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4] {
        table[opcode as usize] = push_entry(op_push);
    }
    table[OP_1NEGATE as usize] = entry(op_push_negative_one);
    for opcode in OP_1..=OP_16 {
        table[opcode as usize] = entry(op_push_small_number);
    }

    table[OP_NOP as usize] = entry(op_nop);
    table[OP_IF as usize] = entry(op_if);
    table[OP_NOTIF as usize] = entry(op_notif);
    table[OP_ELSE as usize] = entry(op_else);
    table[OP_ENDIF as usize] = entry(op_endif);
    table[OP_VERIFY as usize] = entry(op_verify);
    table[OP_RETURN as usize] = entry(op_return);
    for opcode in [OP_RESERVED, OP_VER, OP_RESERVED1, OP_RESERVED2] {
        table[opcode as usize] = entry(op_reserved);
    }
    for opcode in [OP_VERIF, OP_VERNOTIF] {
        table[opcode as usize] = entry(op_invalid_conditional);
    }

    table[OP_TOALTSTACK as usize] = entry(op_to_alt_stack);
    table[OP_FROMALTSTACK as usize] = entry(op_from_alt_stack);
    table[OP_2DROP as usize] = entry(op_2drop);
    table[OP_2DUP as usize] = entry(op_2dup);
    table[OP_3DUP as usize] = entry(op_3dup);
    table[OP_2OVER as usize] = entry(op_2over);
    table[OP_2ROT as usize] = entry(op_2rot);
    table[OP_2SWAP as usize] = entry(op_2swap);
    table[OP_IFDUP as usize] = entry(op_ifdup);
    table[OP_DEPTH as usize] = entry(op_depth);
    table[OP_DROP as usize] = entry(op_drop);
    table[OP_DUP as usize] = entry(op_dup);
    table[OP_NIP as usize] = entry(op_nip);
    table[OP_OVER as usize] = entry(op_over);
    table[OP_PICK as usize] = entry(op_pick);
    table[OP_ROLL as usize] = entry(op_roll);
    table[OP_ROT as usize] = entry(op_rot);
    table[OP_SWAP as usize] = entry(op_swap);
    table[OP_TUCK as usize] = entry(op_tuck);

    table[OP_CAT as usize] = entry(op_cat);
    table[OP_SPLIT as usize] = entry(op_split);
    table[OP_NUM2BIN as usize] = entry(op_num2bin);
    table[OP_BIN2NUM as usize] = entry(op_bin2num);
    table[OP_SIZE as usize] = entry(op_size);

    table[OP_AND as usize] = entry(op_and);
    table[OP_OR as usize] = entry(op_or);
    table[OP_XOR as usize] = entry(op_xor);
    table[OP_EQUAL as usize] = entry(op_equal);
    table[OP_EQUALVERIFY as usize] = entry(op_equal_verify);

    table[OP_1ADD as usize] = entry(op_1add);
    table[OP_1SUB as usize] = entry(op_1sub);
    table[OP_NEGATE as usize] = entry(op_negate);
    table[OP_ABS as usize] = entry(op_abs);
    table[OP_NOT as usize] = entry(op_not);
    table[OP_0NOTEQUAL as usize] = entry(op_0notequal);
    table[OP_ADD as usize] = entry(op_add);
    table[OP_SUB as usize] = entry(op_sub);
    table[OP_DIV as usize] = entry(op_div);
    table[OP_MOD as usize] = entry(op_mod);
    table[OP_BOOLAND as usize] = entry(op_bool_and);
    table[OP_BOOLOR as usize] = entry(op_bool_or);
    table[OP_NUMEQUAL as usize] = entry(op_num_equal);
    table[OP_NUMEQUALVERIFY as usize] = entry(op_num_equal_verify);
    table[OP_NUMNOTEQUAL as usize] = entry(op_num_not_equal);
    table[OP_LESSTHAN as usize] = entry(op_less_than);
    table[OP_GREATERTHAN as usize] = entry(op_greater_than);
    table[OP_LESSTHANOREQUAL as usize] = entry(op_less_than_or_equal);
    table[OP_GREATERTHANOREQUAL as usize] = entry(op_greater_than_or_equal);
    table[OP_MIN as usize] = entry(op_min);
    table[OP_MAX as usize] = entry(op_max);
    table[OP_WITHIN as usize] = entry(op_within);

    for opcode in [OP_INVERT, OP_2MUL, OP_2DIV, OP_MUL, OP_LSHIFT, OP_RSHIFT] {
        table[opcode as usize] = entry(op_disabled);
    }

    table[OP_RIPEMD160 as usize] = entry(op_ripemd160);
    table[OP_SHA1 as usize] = entry(op_sha1);
    table[OP_SHA256 as usize] = entry(op_sha256);
    table[OP_HASH160 as usize] = entry(op_hash160);
    table[OP_HASH256 as usize] = entry(op_hash256);
    table[OP_CODESEPARATOR as usize] = entry(op_code_separator);
    table[OP_CHECKSIG as usize] = entry(op_checksig);
    table[OP_CHECKSIGVERIFY as usize] = entry(op_checksig_verify);
    table[OP_CHECKMULTISIG as usize] = entry(op_checkmultisig);
    table[OP_CHECKMULTISIGVERIFY as usize] = entry(op_checkmultisig_verify);
    table[OP_CHECKDATASIG as usize] = entry(op_checkdatasig);
    table[OP_CHECKDATASIGVERIFY as usize] = entry(op_checkdatasig_verify);

    table[OP_CHECKLOCKTIMEVERIFY as usize] = entry(op_check_lock_time_verify);
    table[OP_CHECKSEQUENCEVERIFY as usize] = entry(op_check_sequence_verify);
    for opcode in [
        OP_NOP1, OP_NOP4, OP_NOP5, OP_NOP6, OP_NOP7, OP_NOP8, OP_NOP9, OP_NOP10,
    ] {
        table[opcode as usize] = entry(op_nop);
    }

    table
}

fn entry<C: CryptoProvider>(operation: Operation<C>) -> Option<BchOperator<C>> {
    Some(Operator {
        asm: asm_opcode,
        description: describe_opcode,
        operation,
    })
}

fn push_entry<C: CryptoProvider>(operation: Operation<C>) -> Option<BchOperator<C>> {
    Some(Operator {
        asm: asm_push,
        description: describe_push,
        operation,
    })
}

// ---------------------------------------------------------------------------
// Transition plumbing

/// Runs `operation`, converting an `Err` into a terminal state.
fn attempt(
    mut state: ProgramState,
    operation: impl FnOnce(&mut ProgramState) -> Result<(), ScriptError>,
) -> ProgramState {
    match operation(&mut state) {
        Ok(()) => state,
        Err(error) => state.fail(error),
    }
}

/// Like [`attempt`], but a no-op while the state is in an untaken branch.
fn execute(
    state: ProgramState,
    operation: impl FnOnce(&mut ProgramState) -> Result<(), ScriptError>,
) -> ProgramState {
    if !state.executing() {
        return state;
    }
    attempt(state, operation)
}

fn require_depth(state: &ProgramState, depth: usize) -> Result<(), ScriptError> {
    if state.stack.len() < depth {
        Err(ScriptError::EmptyStack)
    } else {
        Ok(())
    }
}

fn pop_operands(state: &mut ProgramState) -> Result<(i64, i64), ScriptError> {
    let b = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
    let a = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
    Ok((a, b))
}

/// Locates the payload of the push instruction at `index`, checking the
/// length field, the 520-byte bound and truncation.
fn parse_push(script: &[u8], index: usize) -> Result<(usize, usize), ScriptError> {
    let opcode = script[index];
    let (payload_start, length) = match opcode {
        OP_PUSHBYTES_1..=OP_PUSHBYTES_75 => (index + 1, opcode as usize),
        OP_PUSHDATA1 => (
            index + 2,
            opcodes::read_le_length(script, index + 1, 1).ok_or(ScriptError::MalformedPush)?,
        ),
        OP_PUSHDATA2 => (
            index + 3,
            opcodes::read_le_length(script, index + 1, 2).ok_or(ScriptError::MalformedPush)?,
        ),
        OP_PUSHDATA4 => (
            index + 5,
            opcodes::read_le_length(script, index + 1, 4).ok_or(ScriptError::MalformedPush)?,
        ),
        _ => return Err(ScriptError::MalformedPush),
    };
    if length > MAX_STACK_ELEMENT_SIZE {
        return Err(ScriptError::ExceedsMaximumPush);
    }
    if payload_start + length > script.len() {
        return Err(ScriptError::MalformedPush);
    }
    Ok((payload_start, length))
}

// ---------------------------------------------------------------------------
// Push operations

fn op_push_empty<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| state.push(Vec::new()))
}

fn op_push_small_number<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let opcode = state.current_opcode().ok_or(ScriptError::MalformedPush)?;
        state.push_number((opcode - OP_1 + 1) as i64)
    })
}

fn op_push_negative_one<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| state.push_number(-1))
}

/// `OP_PUSHBYTES_1..=75` and `OP_PUSHDATA1/2/4` share this shape: the
/// instruction pointer advances over the payload even in untaken branches,
/// and truncation or oversize payloads fail regardless; only minimality and
/// the push itself are gated on execution.
fn push_payload(state: &mut ProgramState) -> Result<(), ScriptError> {
    let index = state.ip as usize;
    let opcode = state.script[index];
    let (payload_start, length) = parse_push(&state.script, index)?;
    state.ip = (payload_start + length) as i32 - 1;
    if state.executing() {
        let payload = state.script[payload_start..payload_start + length].to_vec();
        if !is_minimal_push(opcode, &payload) {
            return Err(ScriptError::NonMinimalPush);
        }
        state.push(payload)?;
    }
    Ok(())
}

fn op_push<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    attempt(state, push_payload)
}

// ---------------------------------------------------------------------------
// Flow control

fn op_nop<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    state
}

fn op_if<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    attempt(state, |state| {
        let mut branch = false;
        if state.executing() {
            let element = state.pop()?;
            branch = cast_to_bool(&element);
        }
        state.execution_stack.push(branch);
        Ok(())
    })
}

fn op_notif<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    attempt(state, |state| {
        let mut branch = false;
        if state.executing() {
            let element = state.pop()?;
            branch = !cast_to_bool(&element);
        }
        state.execution_stack.push(branch);
        Ok(())
    })
}

fn op_else<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    attempt(state, |state| {
        let branch = state
            .execution_stack
            .last_mut()
            .ok_or(ScriptError::UnbalancedConditional)?;
        *branch = !*branch;
        Ok(())
    })
}

fn op_endif<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    attempt(state, |state| {
        state
            .execution_stack
            .pop()
            .ok_or(ScriptError::UnbalancedConditional)?;
        Ok(())
    })
}

fn op_verify<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let element = state.pop()?;
        if cast_to_bool(&element) {
            Ok(())
        } else {
            Err(ScriptError::FailedVerify)
        }
    })
}

fn op_return<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |_| Err(ScriptError::OpReturn))
}

fn op_reserved<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |_| Err(ScriptError::UnknownOpcode))
}

/// OP_VERIF / OP_VERNOTIF invalidate the script even inside untaken
/// branches.
fn op_invalid_conditional<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    attempt(state, |_| Err(ScriptError::UnknownOpcode))
}

fn op_disabled<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    attempt(state, |_| Err(ScriptError::DisabledOpcode))
}

// ---------------------------------------------------------------------------
// Stack operations

fn op_to_alt_stack<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let element = state.pop()?;
        state.alt_stack.push(element);
        Ok(())
    })
}

fn op_from_alt_stack<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let element = state.alt_stack.pop().ok_or(ScriptError::EmptyStack)?;
        state.push(element)
    })
}

fn op_2drop<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        state.pop()?;
        state.pop()?;
        Ok(())
    })
}

fn op_2dup<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let first = state.peek(1)?.clone();
        let second = state.peek(0)?.clone();
        state.push(first)?;
        state.push(second)
    })
}

fn op_3dup<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let first = state.peek(2)?.clone();
        let second = state.peek(1)?.clone();
        let third = state.peek(0)?.clone();
        state.push(first)?;
        state.push(second)?;
        state.push(third)
    })
}

fn op_2over<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let first = state.peek(3)?.clone();
        let second = state.peek(2)?.clone();
        state.push(first)?;
        state.push(second)
    })
}

fn op_2rot<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        require_depth(state, 6)?;
        let pivot = state.stack.len() - 6;
        let mut moved: Vec<Vec<u8>> = state.stack.drain(pivot..pivot + 2).collect();
        state.stack.append(&mut moved);
        Ok(())
    })
}

fn op_2swap<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        require_depth(state, 4)?;
        let len = state.stack.len();
        state.stack.swap(len - 4, len - 2);
        state.stack.swap(len - 3, len - 1);
        Ok(())
    })
}

fn op_ifdup<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let top = state.peek(0)?.clone();
        if cast_to_bool(&top) {
            state.push(top)?;
        }
        Ok(())
    })
}

fn op_depth<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let depth = state.stack.len() as i64;
        state.push_number(depth)
    })
}

fn op_drop<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        state.pop()?;
        Ok(())
    })
}

fn op_dup<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let top = state.peek(0)?.clone();
        state.push(top)
    })
}

fn op_nip<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        require_depth(state, 2)?;
        let index = state.stack.len() - 2;
        state.stack.remove(index);
        Ok(())
    })
}

fn op_over<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let second = state.peek(1)?.clone();
        state.push(second)
    })
}

fn pop_stack_index(state: &mut ProgramState) -> Result<usize, ScriptError> {
    let depth = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
    if depth < 0 || depth as usize >= state.stack.len() {
        return Err(ScriptError::InvalidNaturalNumber);
    }
    Ok(state.stack.len() - 1 - depth as usize)
}

fn op_pick<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let index = pop_stack_index(state)?;
        let element = state.stack[index].clone();
        state.push(element)
    })
}

fn op_roll<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let index = pop_stack_index(state)?;
        let element = state.stack.remove(index);
        state.push(element)
    })
}

fn op_rot<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        require_depth(state, 3)?;
        let len = state.stack.len();
        state.stack.swap(len - 3, len - 2);
        state.stack.swap(len - 2, len - 1);
        Ok(())
    })
}

fn op_swap<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        require_depth(state, 2)?;
        let len = state.stack.len();
        state.stack.swap(len - 2, len - 1);
        Ok(())
    })
}

fn op_tuck<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        require_depth(state, 2)?;
        let top = state.peek(0)?.clone();
        let index = state.stack.len() - 2;
        state.stack.insert(index, top);
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Splice operations

fn op_cat<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let suffix = state.pop()?;
        let mut joined = state.pop()?;
        joined.extend_from_slice(&suffix);
        state.push(joined)
    })
}

fn op_split<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let position = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        let element = state.pop()?;
        if position < 0 || position as usize > element.len() {
            return Err(ScriptError::InvalidNaturalNumber);
        }
        let (left, right) = element.split_at(position as usize);
        let left = left.to_vec();
        let right = right.to_vec();
        state.push(left)?;
        state.push(right)
    })
}

fn op_num2bin<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let size = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        if size < 0 {
            return Err(ScriptError::InvalidNaturalNumber);
        }
        let size = size as usize;
        if size > MAX_STACK_ELEMENT_SIZE {
            return Err(ScriptError::ExceedsMaximumPush);
        }
        let number = state.pop()?;
        let mut bytes = minimally_encode(&number);
        if bytes.len() > size {
            return Err(ScriptError::InvalidScriptNumber);
        }
        if bytes.len() < size {
            let mut sign = 0u8;
            if let Some(last) = bytes.last_mut() {
                sign = *last & 0x80;
                *last &= 0x7f;
            }
            bytes.resize(size - 1, 0);
            bytes.push(sign);
        }
        state.push(bytes)
    })
}

fn op_bin2num<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let element = state.pop()?;
        let minimal = minimally_encode(&element);
        if minimal.len() > MAX_SCRIPT_NUMBER_LENGTH {
            return Err(ScriptError::InvalidScriptNumber);
        }
        state.push(minimal)
    })
}

fn op_size<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let length = state.peek(0)?.len() as i64;
        state.push_number(length)
    })
}

// ---------------------------------------------------------------------------
// Bitwise logic

fn pop_bitwise_operands(state: &mut ProgramState) -> Result<(Vec<u8>, Vec<u8>), ScriptError> {
    let b = state.pop()?;
    let a = state.pop()?;
    if a.len() != b.len() {
        return Err(ScriptError::MismatchedBitwiseOperandLength);
    }
    Ok((a, b))
}

fn op_and<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (mut a, b) = pop_bitwise_operands(state)?;
        for (byte, other) in a.iter_mut().zip(&b) {
            *byte &= other;
        }
        state.push(a)
    })
}

fn op_or<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (mut a, b) = pop_bitwise_operands(state)?;
        for (byte, other) in a.iter_mut().zip(&b) {
            *byte |= other;
        }
        state.push(a)
    })
}

fn op_xor<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (mut a, b) = pop_bitwise_operands(state)?;
        for (byte, other) in a.iter_mut().zip(&b) {
            *byte ^= other;
        }
        state.push(a)
    })
}

fn op_equal<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let b = state.pop()?;
        let a = state.pop()?;
        state.push_bool(a == b)
    })
}

fn op_equal_verify<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let b = state.pop()?;
        let a = state.pop()?;
        if a == b {
            Ok(())
        } else {
            Err(ScriptError::FailedVerify)
        }
    })
}

// ---------------------------------------------------------------------------
// Arithmetic

fn op_1add<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let value = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        state.push_number(value + 1)
    })
}

fn op_1sub<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let value = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        state.push_number(value - 1)
    })
}

fn op_negate<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let value = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        state.push_number(-value)
    })
}

fn op_abs<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let value = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        state.push_number(value.abs())
    })
}

fn op_not<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let value = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        state.push_bool(value == 0)
    })
}

fn op_0notequal<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let value = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        state.push_bool(value != 0)
    })
}

fn op_add<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_number(a + b)
    })
}

fn op_sub<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_number(a - b)
    })
}

fn op_div<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        if b == 0 {
            return Err(ScriptError::DivisionByZero);
        }
        state.push_number(a / b)
    })
}

fn op_mod<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        if b == 0 {
            return Err(ScriptError::DivisionByZero);
        }
        state.push_number(a % b)
    })
}

fn op_bool_and<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_bool(a != 0 && b != 0)
    })
}

fn op_bool_or<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_bool(a != 0 || b != 0)
    })
}

fn op_num_equal<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_bool(a == b)
    })
}

fn op_num_equal_verify<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        if a == b {
            Ok(())
        } else {
            Err(ScriptError::FailedVerify)
        }
    })
}

fn op_num_not_equal<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_bool(a != b)
    })
}

fn op_less_than<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_bool(a < b)
    })
}

fn op_greater_than<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_bool(a > b)
    })
}

fn op_less_than_or_equal<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_bool(a <= b)
    })
}

fn op_greater_than_or_equal<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_bool(a >= b)
    })
}

fn op_min<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_number(a.min(b))
    })
}

fn op_max<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let (a, b) = pop_operands(state)?;
        state.push_number(a.max(b))
    })
}

fn op_within<C: CryptoProvider>(state: ProgramState, _: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let max = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        let min = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        let value = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
        state.push_bool(value >= min && value < max)
    })
}

// ---------------------------------------------------------------------------
// Crypto operations

fn op_ripemd160<C: CryptoProvider>(state: ProgramState, set: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let element = state.pop()?;
        state.push(Ripemd160::hash(set.crypto(), &element).to_vec())
    })
}

fn op_sha1<C: CryptoProvider>(state: ProgramState, set: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let element = state.pop()?;
        state.push(Sha1::hash(set.crypto(), &element).to_vec())
    })
}

fn op_sha256<C: CryptoProvider>(state: ProgramState, set: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let element = state.pop()?;
        state.push(Sha256::hash(set.crypto(), &element).to_vec())
    })
}

fn op_hash160<C: CryptoProvider>(state: ProgramState, set: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let element = state.pop()?;
        let sha = Sha256::hash(set.crypto(), &element);
        state.push(Ripemd160::hash(set.crypto(), &sha).to_vec())
    })
}

fn op_hash256<C: CryptoProvider>(state: ProgramState, set: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let element = state.pop()?;
        let once = Sha256::hash(set.crypto(), &element);
        state.push(Sha256::hash(set.crypto(), &once).to_vec())
    })
}

fn op_code_separator<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        state.last_code_separator = state.ip;
        Ok(())
    })
}

fn checksig_result<C: CryptoProvider>(
    state: &mut ProgramState,
    set: &BchInstructionSet<C>,
) -> Result<bool, ScriptError> {
    let public_key = state.pop()?;
    let signature = state.pop()?;
    if !is_valid_public_key_encoding(&public_key) {
        return Err(ScriptError::InvalidPublicKeyEncoding);
    }
    check_transaction_signature_encoding(&signature)?;
    let (&hash_type, der) = signature
        .split_last()
        .ok_or(ScriptError::InvalidSignatureEncoding)?;
    let script_code = state.script_code().to_vec();
    let digest =
        signing_serialization_digest(set.crypto(), &state.environment, &script_code, hash_type);
    Ok(set.crypto().verify_der_low_s(der, &public_key, &digest))
}

fn op_checksig<C: CryptoProvider>(state: ProgramState, set: &BchInstructionSet<C>) -> ProgramState {
    execute(state, |state| {
        let approved = checksig_result(state, set)?;
        state.push_bool(approved)
    })
}

fn op_checksig_verify<C: CryptoProvider>(
    state: ProgramState,
    set: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        if checksig_result(state, set)? {
            Ok(())
        } else {
            Err(ScriptError::FailedVerify)
        }
    })
}

/// The multi-step OP_CHECKMULTISIG protocol: counts, keys and signatures
/// pop in script order, the extra protocol-bug element must be empty, and
/// the key/signature walk starts from the ends of both lists, advancing the
/// key cursor on every comparison and the signature cursor on matches only.
fn checkmultisig_result<C: CryptoProvider>(
    state: &mut ProgramState,
    set: &BchInstructionSet<C>,
) -> Result<bool, ScriptError> {
    let key_count = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
    if key_count < 0 {
        return Err(ScriptError::InvalidNaturalNumber);
    }
    if key_count > MAX_MULTISIG_PUBLIC_KEYS {
        return Err(ScriptError::ExceedsMaximumMultisigPublicKeyCount);
    }
    let key_count = key_count as usize;

    // Pop order: index 0 holds the key that was last in the script.
    let mut public_keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        public_keys.push(state.pop()?);
    }

    state.operation_count += key_count as u32;
    if state.operation_count > MAX_OPERATION_COUNT {
        return Err(ScriptError::ExceededMaximumOperationCount);
    }

    let signature_count = state.pop_number(MAX_SCRIPT_NUMBER_LENGTH)?;
    if signature_count < 0 {
        return Err(ScriptError::InvalidNaturalNumber);
    }
    if signature_count as usize > key_count {
        return Err(ScriptError::InsufficientPublicKeys);
    }
    let signature_count = signature_count as usize;

    let mut signatures = Vec::with_capacity(signature_count);
    for _ in 0..signature_count {
        signatures.push(state.pop()?);
    }

    let protocol_bug = state.pop()?;
    if !protocol_bug.is_empty() {
        return Err(ScriptError::InvalidProtocolBugValue);
    }

    let script_code = state.script_code().to_vec();
    let mut approved = true;
    let mut signature_index = 0;
    let mut key_index = 0;
    while approved && signature_index < signatures.len() {
        if public_keys.len() - key_index < signatures.len() - signature_index {
            approved = false;
            break;
        }

        let public_key = &public_keys[key_index];
        let signature = &signatures[signature_index];
        if !is_valid_public_key_encoding(public_key) {
            return Err(ScriptError::InvalidPublicKeyEncoding);
        }
        check_transaction_signature_encoding(signature)?;
        let (&hash_type, der) = signature
            .split_last()
            .ok_or(ScriptError::InvalidSignatureEncoding)?;
        let digest =
            signing_serialization_digest(set.crypto(), &state.environment, &script_code, hash_type);
        if set.crypto().verify_der_low_s(der, public_key, &digest) {
            signature_index += 1;
        }
        key_index += 1;
    }

    Ok(approved)
}

fn op_checkmultisig<C: CryptoProvider>(
    state: ProgramState,
    set: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let approved = checkmultisig_result(state, set)?;
        state.push_bool(approved)
    })
}

fn op_checkmultisig_verify<C: CryptoProvider>(
    state: ProgramState,
    set: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        if checkmultisig_result(state, set)? {
            Ok(())
        } else {
            Err(ScriptError::FailedVerify)
        }
    })
}

fn checkdatasig_result<C: CryptoProvider>(
    state: &mut ProgramState,
    set: &BchInstructionSet<C>,
) -> Result<bool, ScriptError> {
    let public_key = state.pop()?;
    let message = state.pop()?;
    let signature = state.pop()?;
    if !is_valid_public_key_encoding(&public_key) {
        return Err(ScriptError::InvalidPublicKeyEncoding);
    }
    check_data_signature_encoding(&signature)?;
    // Data signatures commit to a single SHA-256 of the raw message.
    let digest = Sha256::hash(set.crypto(), &message);
    Ok(set.crypto().verify_der_low_s(&signature, &public_key, &digest))
}

fn op_checkdatasig<C: CryptoProvider>(
    state: ProgramState,
    set: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let approved = checkdatasig_result(state, set)?;
        state.push_bool(approved)
    })
}

fn op_checkdatasig_verify<C: CryptoProvider>(
    state: ProgramState,
    set: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        if checkdatasig_result(state, set)? {
            Ok(())
        } else {
            Err(ScriptError::FailedVerify)
        }
    })
}

// ---------------------------------------------------------------------------
// Locktime operations

fn op_check_lock_time_verify<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let operand = state.peek(0)?.clone();
        let locktime = decode_script_number(&operand, LOCKTIME_SCRIPT_NUMBER_LENGTH)?;
        if locktime < 0 {
            return Err(ScriptError::NegativeLocktime);
        }
        if locktime > u32::MAX as i64 {
            return Err(ScriptError::UnsatisfiedLocktime);
        }
        let required = locktime as u32;
        let actual = state.environment.locktime;
        if actual < required {
            return Err(ScriptError::UnsatisfiedLocktime);
        }
        if (actual < LOCKTIME_THRESHOLD) != (required < LOCKTIME_THRESHOLD) {
            return Err(ScriptError::UnsatisfiedLocktime);
        }
        if state.environment.sequence_number == u32::MAX {
            return Err(ScriptError::UnsatisfiedLocktime);
        }
        Ok(())
    })
}

fn op_check_sequence_verify<C: CryptoProvider>(
    state: ProgramState,
    _: &BchInstructionSet<C>,
) -> ProgramState {
    execute(state, |state| {
        let operand = state.peek(0)?.clone();
        let sequence = decode_script_number(&operand, LOCKTIME_SCRIPT_NUMBER_LENGTH)?;
        if sequence < 0 {
            return Err(ScriptError::NegativeLocktime);
        }
        if sequence > u32::MAX as i64 {
            return Err(ScriptError::UnsatisfiedLocktime);
        }
        let required = sequence as u32;
        if required & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            return Ok(());
        }

        let actual = state.environment.sequence_number;
        if actual & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            return Err(ScriptError::UnsatisfiedLocktime);
        }
        let actual_type = actual & SEQUENCE_LOCKTIME_TYPE_FLAG;
        let required_type = required & SEQUENCE_LOCKTIME_TYPE_FLAG;
        if actual_type != required_type {
            return Err(ScriptError::UnsatisfiedLocktime);
        }

        let scale = |sequence: u32, type_flag: u32| {
            let masked = sequence & SEQUENCE_LOCKTIME_MASK;
            if type_flag != 0 {
                masked << SEQUENCE_LOCKTIME_GRANULARITY
            } else {
                masked
            }
        };
        if scale(actual, actual_type) < scale(required, required_type) {
            return Err(ScriptError::UnsatisfiedLocktime);
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Debugger renderers

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn asm_opcode(state: &ProgramState) -> String {
    match state.current_opcode() {
        Some(opcode) => opcodes::name(opcode).into(),
        None => String::new(),
    }
}

fn asm_push(state: &ProgramState) -> String {
    let Some(opcode) = state.current_opcode() else {
        return String::new();
    };
    let mnemonic = opcodes::name(opcode);
    match parse_push(&state.script, state.ip as usize) {
        Ok((_, 0)) => mnemonic.into(),
        Ok((start, length)) => format!(
            "{mnemonic} 0x{}",
            hex_string(&state.script[start..start + length])
        ),
        Err(_) => format!("{mnemonic} [malformed]"),
    }
}

fn describe_push(state: &ProgramState) -> String {
    match parse_push(&state.script, state.ip as usize) {
        Ok((_, length)) => format!("Push the next {length} byte(s) onto the stack."),
        Err(_) => "Push more bytes than remain in the script (malformed).".into(),
    }
}

fn describe_opcode(state: &ProgramState) -> String {
    let Some(opcode) = state.current_opcode() else {
        return String::new();
    };
    describe(opcode).into()
}

fn describe(opcode: u8) -> &'static str {
    match opcode {
        OP_0 => "Push an empty element (the number 0) onto the stack.",
        OP_1NEGATE => "Push the number -1 onto the stack.",
        OP_1..=OP_16 => "Push a small integer constant onto the stack.",
        OP_NOP | OP_NOP1 | OP_NOP4..=OP_NOP10 => "Do nothing.",
        OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 => {
            "Reserved: fails the program when executed."
        }
        OP_IF => "Pop a value; execute the following branch if it is truthy.",
        OP_NOTIF => "Pop a value; execute the following branch if it is falsy.",
        OP_VERIF | OP_VERNOTIF => "Invalid: fails the program even in untaken branches.",
        OP_ELSE => "Toggle the innermost conditional branch.",
        OP_ENDIF => "Close the innermost conditional branch.",
        OP_VERIFY => "Pop a value; fail the program unless it is truthy.",
        OP_RETURN => "Mark the program as invalid.",
        OP_TOALTSTACK => "Move the top element to the alt stack.",
        OP_FROMALTSTACK => "Move the top alt-stack element back to the stack.",
        OP_2DROP => "Remove the top two elements.",
        OP_2DUP => "Duplicate the top two elements.",
        OP_3DUP => "Duplicate the top three elements.",
        OP_2OVER => "Copy the third and fourth elements to the top.",
        OP_2ROT => "Move the fifth and sixth elements to the top.",
        OP_2SWAP => "Swap the top two pairs of elements.",
        OP_IFDUP => "Duplicate the top element if it is truthy.",
        OP_DEPTH => "Push the number of stack elements.",
        OP_DROP => "Remove the top element.",
        OP_DUP => "Duplicate the top element.",
        OP_NIP => "Remove the second element.",
        OP_OVER => "Copy the second element to the top.",
        OP_PICK => "Pop a depth; copy the element at that depth to the top.",
        OP_ROLL => "Pop a depth; move the element at that depth to the top.",
        OP_ROT => "Rotate the top three elements.",
        OP_SWAP => "Swap the top two elements.",
        OP_TUCK => "Copy the top element below the second.",
        OP_CAT => "Concatenate the top two elements.",
        OP_SPLIT => "Pop an index; split the next element at that index.",
        OP_NUM2BIN => "Pop a size; re-encode the next element as a number of that width.",
        OP_BIN2NUM => "Minimally re-encode the top element as a number.",
        OP_SIZE => "Push the byte length of the top element.",
        OP_INVERT | OP_2MUL | OP_2DIV | OP_MUL | OP_LSHIFT | OP_RSHIFT => {
            "Disabled: fails the program."
        }
        OP_AND => "Bitwise AND of two same-length elements.",
        OP_OR => "Bitwise OR of two same-length elements.",
        OP_XOR => "Bitwise XOR of two same-length elements.",
        OP_EQUAL => "Push whether the top two elements are byte-equal.",
        OP_EQUALVERIFY => "Fail the program unless the top two elements are byte-equal.",
        OP_1ADD => "Add 1 to the top number.",
        OP_1SUB => "Subtract 1 from the top number.",
        OP_NEGATE => "Negate the top number.",
        OP_ABS => "Replace the top number with its absolute value.",
        OP_NOT => "Push 1 if the top number is 0, else 0.",
        OP_0NOTEQUAL => "Push 1 if the top number is nonzero, else 0.",
        OP_ADD => "Add the top two numbers.",
        OP_SUB => "Subtract the top number from the second.",
        OP_DIV => "Divide the second number by the top (truncating).",
        OP_MOD => "Remainder of dividing the second number by the top.",
        OP_BOOLAND => "Push whether both top numbers are nonzero.",
        OP_BOOLOR => "Push whether either top number is nonzero.",
        OP_NUMEQUAL => "Push whether the top two numbers are equal.",
        OP_NUMEQUALVERIFY => "Fail the program unless the top two numbers are equal.",
        OP_NUMNOTEQUAL => "Push whether the top two numbers differ.",
        OP_LESSTHAN => "Push whether the second number is less than the top.",
        OP_GREATERTHAN => "Push whether the second number is greater than the top.",
        OP_LESSTHANOREQUAL => "Push whether the second number is at most the top.",
        OP_GREATERTHANOREQUAL => "Push whether the second number is at least the top.",
        OP_MIN => "Push the smaller of the top two numbers.",
        OP_MAX => "Push the larger of the top two numbers.",
        OP_WITHIN => "Push whether a value lies in a half-open range.",
        OP_RIPEMD160 => "Replace the top element with its RIPEMD-160 hash.",
        OP_SHA1 => "Replace the top element with its SHA-1 hash.",
        OP_SHA256 => "Replace the top element with its SHA-256 hash.",
        OP_HASH160 => "Replace the top element with RIPEMD-160(SHA-256(element)).",
        OP_HASH256 => "Replace the top element with SHA-256(SHA-256(element)).",
        OP_CODESEPARATOR => "Begin a new signed portion of the script.",
        OP_CHECKSIG => "Pop a public key and signature; push whether the signature \
             commits to this transaction under that key.",
        OP_CHECKSIGVERIFY => "Like OP_CHECKSIG, but fail the program on an invalid signature.",
        OP_CHECKMULTISIG => "Pop key and signature lists; push whether every signature \
             matches a distinct key in order.",
        OP_CHECKMULTISIGVERIFY => {
            "Like OP_CHECKMULTISIG, but fail the program on an invalid set."
        }
        OP_CHECKDATASIG => "Pop a public key, message and signature; push whether the \
             signature commits to the message under that key.",
        OP_CHECKDATASIGVERIFY => {
            "Like OP_CHECKDATASIG, but fail the program on an invalid signature."
        }
        OP_CHECKLOCKTIMEVERIFY => {
            "Fail the program unless the transaction locktime satisfies the top number."
        }
        OP_CHECKSEQUENCEVERIFY => {
            "Fail the program unless the input sequence satisfies the top number."
        }
        _ => "Unknown opcode: fails the program.",
    }
}
