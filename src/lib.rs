#![cfg_attr(not(feature = "std"), no_std)]
//! A Bitcoin Cash script evaluation engine: the stack-based authentication
//! virtual machine deciding whether an unlocking/locking script pair,
//! together with its transaction context, evaluates to a truthy final
//! stack.
//!
//! The engine reproduces bit-exact consensus behavior for the BCH_2019May
//! ruleset. Evaluation is purely sequential and shared-nothing; crypto
//! primitives are injected at construction (see [`crypto`]), so independent
//! program evaluations parallelize trivially.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

pub mod crypto;
pub mod encoding;
pub mod opcodes;
mod operations;
pub mod program;
pub mod sighash;
pub mod state;
pub mod vm;

pub use crate::{
    crypto::StandardCrypto,
    program::{
        debug_program, evaluate_program, is_pay_to_script_hash, validate_program_state,
        AuthenticationProgram,
    },
    state::{ProgramState, ScriptError, TraceEntry, TransactionContext},
    vm::{BchInstructionSet, InstructionSet, VirtualMachine},
};

/// A virtual machine over the BCH_2019May instruction set and the standard
/// crypto providers.
pub fn standard_vm() -> VirtualMachine<BchInstructionSet<StandardCrypto>> {
    VirtualMachine::default()
}

/// Runs `program` through the phase pipeline on a standard VM and returns
/// the final phase's terminal state.
pub fn evaluate(program: &AuthenticationProgram) -> ProgramState {
    evaluate_program(&standard_vm(), program)
}

/// Like [`evaluate`], but reduced to a verdict: the recorded script error,
/// `EvalFalse` for an error-free terminal state that fails the
/// final-validity predicate, or `Ok` for a valid program.
pub fn verify(program: &AuthenticationProgram) -> Result<(), ScriptError> {
    let state = evaluate(program);
    match state.error {
        Some(error) => Err(error),
        None if validate_program_state(&state) => Ok(()),
        None => Err(ScriptError::EvalFalse),
    }
}

/// Runs `program` on a standard VM, capturing a snapshot per step.
pub fn debug(program: &AuthenticationProgram) -> Vec<TraceEntry<ProgramState>> {
    debug_program(&standard_vm(), program)
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::state::TransactionContext;

    /// A fixed, arbitrary transaction context for unit tests.
    pub(crate) fn test_context() -> TransactionContext {
        TransactionContext {
            version: 2,
            transaction_outpoints_hash: [0x11; 32],
            transaction_sequence_numbers_hash: [0x22; 32],
            outpoint_transaction_hash: [0x33; 32],
            corresponding_output_hash: Some([0x44; 32]),
            transaction_outputs_hash: [0x55; 32],
            outpoint_index: 1,
            outpoint_value: 10_000,
            sequence_number: 0xffff_fffe,
            locktime: 0,
            block_height: 589_000,
            block_time: 1_557_500_000,
        }
    }
}
