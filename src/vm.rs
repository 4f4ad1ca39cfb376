//! The generic evaluation driver and the BCH_2019May instruction set it is
//! instantiated with.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, string::ToString, vec, vec::Vec};
#[cfg(feature = "std")]
use std::{boxed::Box, string::String, string::ToString, vec, vec::Vec};

use crate::{
    crypto::{CryptoProvider, StandardCrypto},
    opcodes,
    operations::{operator_table, BchOperator},
    state::{ProgramState, ScriptError, TraceEntry, TransactionContext, MAX_OPERATION_COUNT},
};

/// One entry of an operator table: the debugger renderers and the state
/// transition. `S` is the program-state type, `I` the instruction set the
/// transition reaches its collaborators (crypto providers) through.
pub struct Operator<S, I> {
    pub asm: fn(&S) -> String,
    pub description: fn(&S) -> String,
    pub operation: fn(S, &I) -> S,
}

/// A script dialect: the per-step bookkeeping hook, state lifecycle
/// helpers, and the operator table the VM dispatches into.
pub trait InstructionSet: Sized {
    type State;

    /// Advances to the next instruction, charging it against the
    /// consensus operation budget.
    fn before(&self, state: Self::State) -> Self::State;

    /// Deep copy, used by the debugger to snapshot each step.
    fn clone_state(&self, state: &Self::State) -> Self::State;

    /// Whether evaluation proceeds: no error and instructions remain.
    fn should_continue(&self, state: &Self::State) -> bool;

    /// The opcode under the instruction pointer, if any.
    fn current_opcode(&self, state: &Self::State) -> Option<u8>;

    /// The operator registered for `opcode`.
    fn operator(&self, opcode: u8) -> Option<&Operator<Self::State, Self>>;

    /// Terminal state for a dispatch miss.
    fn fail_unknown_opcode(&self, state: Self::State) -> Self::State;
}

/// The BCH_2019May instruction set. Crypto providers are injected at
/// construction and live as long as the set; the operator table captures
/// nothing and reaches them through `&self`.
pub struct BchInstructionSet<C: CryptoProvider = StandardCrypto> {
    crypto: C,
    operators: Box<[Option<BchOperator<C>>; 256]>,
}

impl BchInstructionSet<StandardCrypto> {
    /// The instruction set over the standard providers.
    pub fn standard() -> Self {
        Self::new(StandardCrypto::new())
    }
}

impl<C: CryptoProvider> BchInstructionSet<C> {
    pub fn new(crypto: C) -> Self {
        Self {
            crypto,
            operators: operator_table(),
        }
    }

    pub fn crypto(&self) -> &C {
        &self.crypto
    }
}

impl<C: CryptoProvider> InstructionSet for BchInstructionSet<C> {
    type State = ProgramState;

    fn before(&self, mut state: ProgramState) -> ProgramState {
        state.ip += 1;
        if let Some(opcode) = state.current_opcode() {
            state.operations.push(opcode);
            state.operation_count += 1;
            if state.operation_count > MAX_OPERATION_COUNT {
                return state.fail(ScriptError::ExceededMaximumOperationCount);
            }
        }
        state
    }

    fn clone_state(&self, state: &ProgramState) -> ProgramState {
        state.clone()
    }

    fn should_continue(&self, state: &ProgramState) -> bool {
        state.error.is_none() && state.ip < state.script.len() as i32
    }

    fn current_opcode(&self, state: &ProgramState) -> Option<u8> {
        state.current_opcode()
    }

    fn operator(&self, opcode: u8) -> Option<&Operator<ProgramState, Self>> {
        self.operators[opcode as usize].as_ref()
    }

    fn fail_unknown_opcode(&self, state: ProgramState) -> ProgramState {
        state.fail(ScriptError::UnknownOpcode)
    }
}

/// The evaluation driver: a thin loop over an instruction set.
pub struct VirtualMachine<I: InstructionSet> {
    instruction_set: I,
}

impl<I: InstructionSet> VirtualMachine<I> {
    pub fn new(instruction_set: I) -> Self {
        Self { instruction_set }
    }

    pub fn instruction_set(&self) -> &I {
        &self.instruction_set
    }

    /// One step: advance, then dispatch the opcode under the instruction
    /// pointer. A pointer past the end of the script halts, as does a
    /// failure in the bookkeeping hook itself; an opcode with no table
    /// entry is a dispatch failure.
    pub fn step(&self, state: I::State) -> I::State {
        let state = self.instruction_set.before(state);
        if !self.instruction_set.should_continue(&state) {
            return state;
        }
        let Some(opcode) = self.instruction_set.current_opcode(&state) else {
            return state;
        };
        match self.instruction_set.operator(opcode) {
            Some(operator) => (operator.operation)(state, &self.instruction_set),
            None => self.instruction_set.fail_unknown_opcode(state),
        }
    }

    /// Runs to a terminal state.
    pub fn evaluate(&self, mut state: I::State) -> I::State {
        while self.instruction_set.should_continue(&state) {
            state = self.step(state);
        }
        state
    }

    /// Runs at most `max_steps` steps; the cooperative-cancellation hook.
    /// Returns the state reached and whether it is terminal — budget
    /// exhaustion is a caller-level condition, not a script error.
    pub fn evaluate_bounded(&self, mut state: I::State, max_steps: usize) -> (I::State, bool) {
        for _ in 0..max_steps {
            if !self.instruction_set.should_continue(&state) {
                return (state, true);
            }
            state = self.step(state);
        }
        let complete = !self.instruction_set.should_continue(&state);
        (state, complete)
    }

    /// Runs to a terminal state, capturing a deep snapshot per step along
    /// with the dispatched operator's renderings. The first entry carries
    /// `label` and the initial state; the final entry's state equals the
    /// result of [`evaluate`](Self::evaluate) on the same input.
    pub fn debug(&self, state: I::State, label: &str) -> Vec<TraceEntry<I::State>> {
        let mut trace = vec![TraceEntry {
            asm: label.to_string(),
            description: label.to_string(),
            state: self.instruction_set.clone_state(&state),
        }];

        let mut state = state;
        while self.instruction_set.should_continue(&state) {
            let advanced = self.instruction_set.before(state);
            let Some(opcode) = self.instruction_set.current_opcode(&advanced) else {
                // The halting advance past the final instruction is not an
                // operation; fold it into the preceding snapshot so the last
                // entry carries the terminal state.
                if let Some(last) = trace.last_mut() {
                    last.state = self.instruction_set.clone_state(&advanced);
                }
                state = advanced;
                continue;
            };
            let operator = self.instruction_set.operator(opcode);
            let (asm, description) = match operator {
                Some(operator) => ((operator.asm)(&advanced), (operator.description)(&advanced)),
                None => (
                    opcodes::name(opcode).to_string(),
                    ScriptError::UnknownOpcode.to_string(),
                ),
            };
            // A failure in the bookkeeping hook aborts the step before its
            // operator runs.
            let next = if !self.instruction_set.should_continue(&advanced) {
                advanced
            } else {
                match operator {
                    Some(operator) => (operator.operation)(advanced, &self.instruction_set),
                    None => self.instruction_set.fail_unknown_opcode(advanced),
                }
            };
            trace.push(TraceEntry {
                asm,
                description,
                state: self.instruction_set.clone_state(&next),
            });
            state = next;
        }

        trace
    }
}

impl<I: InstructionSet<State = ProgramState>> VirtualMachine<I> {
    /// Renders a script through the operators' `asm` renderers, without
    /// executing it.
    pub fn disassemble(&self, script: &[u8], environment: TransactionContext) -> String {
        let mut rendered: Vec<String> = Vec::new();
        let mut state = ProgramState::new(script.to_vec(), Vec::new(), environment);
        let mut index = 0usize;
        while index < script.len() {
            state.ip = index as i32;
            let opcode = script[index];
            let text = match self.instruction_set.operator(opcode) {
                Some(operator) => (operator.asm)(&state),
                None => opcodes::name(opcode).to_string(),
            };
            rendered.push(text);
            index += opcodes::instruction_length(script, index).max(1);
        }
        rendered.join(" ")
    }
}

impl Default for VirtualMachine<BchInstructionSet<StandardCrypto>> {
    fn default() -> Self {
        Self::new(BchInstructionSet::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{opcodes::*, test_util::test_context};

    fn vm() -> VirtualMachine<BchInstructionSet<StandardCrypto>> {
        VirtualMachine::default()
    }

    fn fresh(script: &[u8]) -> ProgramState {
        ProgramState::new(script.to_vec(), Vec::new(), test_context())
    }

    #[test]
    fn empty_script_halts_without_error() {
        let state = vm().evaluate(fresh(&[]));
        assert_eq!(state.error, None);
        assert!(state.stack.is_empty());
        assert_eq!(state.ip, 0);
    }

    #[test]
    fn before_counts_every_dispatched_opcode() {
        let state = vm().evaluate(fresh(&[OP_1, OP_2, OP_ADD]));
        assert_eq!(state.operation_count, 3);
        assert_eq!(state.operations, vec![OP_1, OP_2, OP_ADD]);
        assert_eq!(state.stack, vec![vec![3]]);
    }

    #[test]
    fn operation_budget_is_enforced() {
        let mut script = vec![OP_1];
        script.extend(core::iter::repeat(OP_DUP).take(MAX_OPERATION_COUNT as usize));
        let state = vm().evaluate(fresh(&script));
        assert_eq!(
            state.error,
            Some(ScriptError::ExceededMaximumOperationCount)
        );
        assert_eq!(state.operation_count, MAX_OPERATION_COUNT + 1);
    }

    #[test]
    fn dispatch_miss_is_an_unknown_opcode() {
        let state = vm().evaluate(fresh(&[0xbc]));
        assert_eq!(state.error, Some(ScriptError::UnknownOpcode));
    }

    #[test]
    fn bounded_evaluation_reports_exhaustion() {
        let script = [OP_1, OP_2, OP_ADD];
        let (state, complete) = vm().evaluate_bounded(fresh(&script), 2);
        assert!(!complete);
        assert_eq!(state.error, None);

        // Three instructions plus the halting advance.
        let (state, complete) = vm().evaluate_bounded(fresh(&script), 4);
        assert!(complete);
        assert_eq!(state.stack, vec![vec![3]]);
    }

    #[test]
    fn debug_terminal_state_matches_evaluate() {
        let script = [OP_1, OP_IF, OP_2, OP_3, OP_ADD, OP_ENDIF];
        let evaluated = vm().evaluate(fresh(&script));
        let trace = vm().debug(fresh(&script), "test phase");
        assert_eq!(trace.first().unwrap().asm, "test phase");
        assert_eq!(trace.last().unwrap().state, evaluated);
        // Label entry plus one entry per dispatched opcode.
        assert_eq!(trace.len(), 1 + script.len());
    }

    #[test]
    fn disassembles_through_operator_renderers() {
        let script = [OP_DUP, OP_HASH160, 0x02, 0xab, 0xcd, OP_EQUALVERIFY, 0xbc];
        let text = vm().disassemble(&script, test_context());
        assert_eq!(
            text,
            "OP_DUP OP_HASH160 OP_PUSHBYTES_2 0xabcd OP_EQUALVERIFY OP_UNKNOWN_0xbc"
        );
    }
}
