//! The multi-phase evaluation pipeline: unlocking script, locking script,
//! and the pay-to-script-hash redeem phase, with the stack carried between
//! them by value.

#[cfg(not(feature = "std"))]
use alloc::{string::ToString, vec::Vec};
#[cfg(feature = "std")]
use std::{string::ToString, vec::Vec};

use crate::{
    encoding::cast_to_bool,
    opcodes::{OP_16, OP_EQUAL, OP_HASH160, OP_PUSHBYTES_20},
    state::{ProgramState, ScriptError, TraceEntry, TransactionContext},
    vm::{InstructionSet, VirtualMachine},
};

/// A pair of scripts and the transaction context they authorize.
#[derive(Debug, Clone)]
pub struct AuthenticationProgram {
    pub unlocking_script: Vec<u8>,
    pub locking_script: Vec<u8>,
    pub environment: TransactionContext,
}

pub const PHASE_UNLOCKING: &str = "unlocking script";
pub const PHASE_LOCKING: &str = "locking script";
pub const PHASE_REDEEM: &str = "redeem script";

/// The exact P2SH byte shape: `OP_HASH160 OP_PUSHBYTES_20 <20 bytes>
/// OP_EQUAL`. A pure predicate over the locking script only.
pub fn is_pay_to_script_hash(locking_script: &[u8]) -> bool {
    locking_script.len() == 23
        && locking_script[0] == OP_HASH160
        && locking_script[1] == OP_PUSHBYTES_20
        && locking_script[22] == OP_EQUAL
}

/// The final-validity predicate: no error, exactly one element, truthy.
pub fn validate_program_state(state: &ProgramState) -> bool {
    state.error.is_none() && state.stack.len() == 1 && cast_to_bool(&state.stack[0])
}

fn finalize_phase(state: ProgramState) -> ProgramState {
    if state.error.is_none() && !state.execution_stack.is_empty() {
        return state.fail(ScriptError::UnbalancedConditional);
    }
    state
}

fn run_phase<I>(
    vm: &VirtualMachine<I>,
    script: &[u8],
    stack: Vec<Vec<u8>>,
    environment: TransactionContext,
) -> ProgramState
where
    I: InstructionSet<State = ProgramState>,
{
    finalize_phase(vm.evaluate(ProgramState::new(script.to_vec(), stack, environment)))
}

/// P2SH prerequisites over the unlocking phase's terminal state: push-only
/// discipline, then redeem-script extraction from a copy of its stack.
fn extract_redeem_script(
    unlocked: &ProgramState,
) -> Result<(Vec<u8>, Vec<Vec<u8>>), ScriptError> {
    if unlocked.operations.iter().any(|&opcode| opcode >= OP_16) {
        return Err(ScriptError::P2shPushOnly);
    }
    let mut stack = unlocked.stack.clone();
    let Some(redeem_script) = stack.pop() else {
        return Err(ScriptError::P2shEmptyStack);
    };
    Ok((redeem_script, stack))
}

/// Runs the full pipeline and returns the final phase's terminal state.
pub fn evaluate_program<I>(vm: &VirtualMachine<I>, program: &AuthenticationProgram) -> ProgramState
where
    I: InstructionSet<State = ProgramState>,
{
    let unlocked = run_phase(
        vm,
        &program.unlocking_script,
        Vec::new(),
        program.environment,
    );
    if unlocked.error.is_some() {
        return unlocked;
    }

    let locked = run_phase(
        vm,
        &program.locking_script,
        unlocked.stack.clone(),
        program.environment,
    );
    if locked.error.is_some() || !is_pay_to_script_hash(&program.locking_script) {
        return locked;
    }
    // The redeem script only runs once the locking phase is satisfied.
    if !locked.stack.last().is_some_and(|top| cast_to_bool(top)) {
        return locked;
    }

    match extract_redeem_script(&unlocked) {
        Ok((redeem_script, stack)) => run_phase(vm, &redeem_script, stack, program.environment),
        Err(error) => locked.fail(error),
    }
}

fn debug_phase<I>(
    vm: &VirtualMachine<I>,
    script: &[u8],
    stack: Vec<Vec<u8>>,
    environment: TransactionContext,
    label: &str,
) -> (Vec<TraceEntry<ProgramState>>, ProgramState)
where
    I: InstructionSet<State = ProgramState>,
{
    let mut trace = vm.debug(
        ProgramState::new(script.to_vec(), stack, environment),
        label,
    );
    let terminal = trace
        .last()
        .expect("debug traces include the label entry")
        .state
        .clone();
    let finalized = finalize_phase(terminal);
    if let Some(error) = finalized.error {
        if trace
            .last()
            .is_some_and(|entry| entry.state.error.is_none())
        {
            trace.push(TraceEntry {
                asm: "[unbalanced]".to_string(),
                description: error.to_string(),
                state: finalized.clone(),
            });
        }
    }
    (trace, finalized)
}

/// The debugging variant of [`evaluate_program`]: per-phase traces are
/// concatenated, each opened by a phase-label pseudo-step, and a failed
/// P2SH prerequisite appends an error pseudo-step instead of a phase.
pub fn debug_program<I>(
    vm: &VirtualMachine<I>,
    program: &AuthenticationProgram,
) -> Vec<TraceEntry<ProgramState>>
where
    I: InstructionSet<State = ProgramState>,
{
    let (mut trace, unlocked) = debug_phase(
        vm,
        &program.unlocking_script,
        Vec::new(),
        program.environment,
        PHASE_UNLOCKING,
    );
    if unlocked.error.is_some() {
        return trace;
    }

    let (locking_trace, locked) = debug_phase(
        vm,
        &program.locking_script,
        unlocked.stack.clone(),
        program.environment,
        PHASE_LOCKING,
    );
    trace.extend(locking_trace);
    if locked.error.is_some() || !is_pay_to_script_hash(&program.locking_script) {
        return trace;
    }
    if !locked.stack.last().is_some_and(|top| cast_to_bool(top)) {
        return trace;
    }

    match extract_redeem_script(&unlocked) {
        Ok((redeem_script, stack)) => {
            let (redeem_trace, _) = debug_phase(
                vm,
                &redeem_script,
                stack,
                program.environment,
                PHASE_REDEEM,
            );
            trace.extend(redeem_trace);
        }
        Err(error) => {
            trace.push(TraceEntry {
                asm: "[p2sh]".to_string(),
                description: error.to_string(),
                state: locked.fail(error),
            });
        }
    }
    trace
}
