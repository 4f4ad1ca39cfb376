//! Program state, the transaction context it evaluates against, and the
//! error taxonomy shared by every operator.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};
#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

use core::fmt;

use crate::encoding::{self, boolean_to_script_number};

/// Stack elements may not exceed 520 bytes.
pub const MAX_STACK_ELEMENT_SIZE: usize = 520;
/// Combined bound on the main and alternate stacks.
pub const MAX_STACK_DEPTH: usize = 1000;
/// Upper bound on `operation_count` within one evaluation.
pub const MAX_OPERATION_COUNT: u32 = 201;
/// Maximum number of public keys accepted by OP_CHECKMULTISIG.
pub const MAX_MULTISIG_PUBLIC_KEYS: i64 = 20;
/// Arithmetic operands decode from at most this many bytes.
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;
/// OP_CHECKLOCKTIMEVERIFY / OP_CHECKSEQUENCEVERIFY operand bound.
pub const LOCKTIME_SCRIPT_NUMBER_LENGTH: usize = 5;

/// Failure modes of script evaluation.
///
/// Every error is terminal: once set on a [`ProgramState`] no further
/// operator transitions occur. `EvalFalse` is never set by an operator; it
/// is the verdict returned by [`crate::verify`] for a program whose terminal
/// state is error-free but fails the final-validity predicate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScriptError {
    EmptyStack,
    InvalidScriptNumber,
    InvalidPublicKeyEncoding,
    InvalidSignatureEncoding,
    InvalidNaturalNumber,
    MalformedPush,
    NonMinimalPush,
    ExceedsMaximumPush,
    InsufficientPublicKeys,
    ExceedsMaximumMultisigPublicKeyCount,
    InvalidProtocolBugValue,
    ExceededMaximumOperationCount,
    ExceededMaximumStackDepth,
    UnknownOpcode,
    DisabledOpcode,
    P2shPushOnly,
    P2shEmptyStack,
    UnbalancedConditional,
    FailedVerify,
    OpReturn,
    DivisionByZero,
    MismatchedBitwiseOperandLength,
    NegativeLocktime,
    UnsatisfiedLocktime,
    EvalFalse,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ScriptError::*;

        let description = match *self {
            EmptyStack => "an operation popped from an empty stack",
            InvalidScriptNumber => "a script number was out of range or not minimally encoded",
            InvalidPublicKeyEncoding => "a public key was not SEC-encoded",
            InvalidSignatureEncoding => "a signature was not a strict-DER, low-S, forkid signature",
            InvalidNaturalNumber => "a natural-number operand was negative or out of range",
            MalformedPush => "a push operation was truncated by the end of the script",
            NonMinimalPush => "a push operation did not use the minimal encoding",
            ExceedsMaximumPush => "a pushed element exceeded 520 bytes",
            InsufficientPublicKeys => "more signatures were required than public keys provided",
            ExceedsMaximumMultisigPublicKeyCount => "more than 20 public keys in OP_CHECKMULTISIG",
            InvalidProtocolBugValue => "the OP_CHECKMULTISIG protocol bug value was not empty",
            ExceededMaximumOperationCount => "more than 201 operations in one evaluation",
            ExceededMaximumStackDepth => "more than 1000 combined stack and altstack elements",
            UnknownOpcode => "an undefined or reserved opcode was encountered",
            DisabledOpcode => "a disabled opcode was encountered",
            P2shPushOnly => "a P2SH unlocking script contained non-push operations",
            P2shEmptyStack => "a P2SH unlocking script left an empty stack",
            UnbalancedConditional => "an OP_IF or OP_NOTIF was not terminated before the script ended",
            FailedVerify => "a verify operation consumed a falsy element",
            OpReturn => "OP_RETURN marked the program invalid",
            DivisionByZero => "OP_DIV or OP_MOD with a zero divisor",
            MismatchedBitwiseOperandLength => "bitwise operands of different lengths",
            NegativeLocktime => "a locktime operand was negative",
            UnsatisfiedLocktime => "the transaction does not satisfy the required locktime",
            EvalFalse => "the final stack was not a single truthy element",
        };

        f.write_str(description)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScriptError {}

/// Immutable transaction-level context a program evaluates against.
///
/// The four transaction digests arrive precomputed, mirroring the way
/// signature hashing caches them: the VM never sees the spending
/// transaction itself, only the hashes its preimages embed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TransactionContext {
    pub version: u32,
    /// Double-SHA256 of every outpoint of the spending transaction.
    pub transaction_outpoints_hash: [u8; 32],
    /// Double-SHA256 of every input sequence number.
    pub transaction_sequence_numbers_hash: [u8; 32],
    /// Hash of the transaction that created the output being spent.
    pub outpoint_transaction_hash: [u8; 32],
    /// Double-SHA256 of the output at the same index as this input, when
    /// one exists (`SIGHASH_SINGLE`); `None` serializes as 32 zero bytes.
    pub corresponding_output_hash: Option<[u8; 32]>,
    /// Double-SHA256 of every output of the spending transaction.
    pub transaction_outputs_hash: [u8; 32],
    pub outpoint_index: u32,
    /// Value of the output being spent, in satoshis.
    pub outpoint_value: u64,
    pub sequence_number: u32,
    pub locktime: u32,
    pub block_height: u32,
    pub block_time: u32,
}

/// The structured state transformed by every operator.
///
/// `ip` begins at -1 so the instruction set's `before` hook advances to the
/// first opcode; `last_code_separator` begins at -1 so the initial
/// `scriptCode` covers the whole script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramState {
    pub environment: TransactionContext,
    pub script: Vec<u8>,
    pub ip: i32,
    pub last_code_separator: i32,
    pub operation_count: u32,
    /// Opcode bytes dispatched so far, in execution order.
    pub operations: Vec<u8>,
    pub stack: Vec<Vec<u8>>,
    pub alt_stack: Vec<Vec<u8>>,
    /// Branch flags of the enclosing OP_IF/OP_NOTIF nesting.
    pub execution_stack: Vec<bool>,
    pub error: Option<ScriptError>,
}

impl ProgramState {
    /// The pure constructor handed to script compilers: a fresh state over
    /// `script`, beginning with `stack` (empty for an unlocking phase,
    /// inherited for later phases).
    pub fn new(script: Vec<u8>, stack: Vec<Vec<u8>>, environment: TransactionContext) -> Self {
        Self {
            environment,
            script,
            ip: -1,
            last_code_separator: -1,
            operation_count: 0,
            operations: Vec::new(),
            stack,
            alt_stack: Vec::new(),
            execution_stack: Vec::new(),
            error: None,
        }
    }

    /// Marks the state terminal. The first error wins; all other fields are
    /// left intact so a debugger can inspect the state at the failure.
    pub fn fail(mut self, error: ScriptError) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    /// The opcode under the instruction pointer, if `ip` is within bounds.
    pub fn current_opcode(&self) -> Option<u8> {
        usize::try_from(self.ip)
            .ok()
            .and_then(|index| self.script.get(index))
            .copied()
    }

    /// The script bytes signatures commit to: everything after the most
    /// recently executed OP_CODESEPARATOR.
    pub fn script_code(&self) -> &[u8] {
        let start = (self.last_code_separator + 1) as usize;
        &self.script[start.min(self.script.len())..]
    }

    /// True while every enclosing conditional branch is taken.
    pub fn executing(&self) -> bool {
        self.execution_stack.iter().all(|&branch| branch)
    }

    pub fn push(&mut self, element: Vec<u8>) -> Result<(), ScriptError> {
        if element.len() > MAX_STACK_ELEMENT_SIZE {
            return Err(ScriptError::ExceedsMaximumPush);
        }
        if self.stack.len() + self.alt_stack.len() >= MAX_STACK_DEPTH {
            return Err(ScriptError::ExceededMaximumStackDepth);
        }
        self.stack.push(element);
        Ok(())
    }

    pub fn push_bool(&mut self, value: bool) -> Result<(), ScriptError> {
        self.push(boolean_to_script_number(value))
    }

    pub fn push_number(&mut self, value: i64) -> Result<(), ScriptError> {
        self.push(encoding::encode_script_number(value))
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.stack.pop().ok_or(ScriptError::EmptyStack)
    }

    /// The element `depth` positions below the top, without removing it.
    pub fn peek(&self, depth: usize) -> Result<&Vec<u8>, ScriptError> {
        self.stack
            .len()
            .checked_sub(1 + depth)
            .and_then(|index| self.stack.get(index))
            .ok_or(ScriptError::EmptyStack)
    }

    pub fn pop_number(&mut self, max_len: usize) -> Result<i64, ScriptError> {
        let bytes = self.pop()?;
        encoding::decode_script_number(&bytes, max_len)
    }
}

/// One captured step of a debug trace: the operator's renderings paired
/// with a deep copy of the state its transition produced.
#[derive(Debug, Clone)]
pub struct TraceEntry<S> {
    pub asm: String,
    pub description: String,
    pub state: S,
}
