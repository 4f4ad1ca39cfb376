//! Data-driven script vectors: each entry runs the full pipeline against a
//! fixed transaction context and asserts the verdict.

mod script_asm;

use bch_vm::{verify, AuthenticationProgram, ScriptError, TransactionContext};
use script_asm::parse_script;
use serde_json::Value;

const VM_VECTORS: &str = include_str!("data/vm_vectors.json");

fn context() -> TransactionContext {
    TransactionContext {
        version: 2,
        transaction_outpoints_hash: [0x11; 32],
        transaction_sequence_numbers_hash: [0x22; 32],
        outpoint_transaction_hash: [0x33; 32],
        corresponding_output_hash: Some([0x44; 32]),
        transaction_outputs_hash: [0x55; 32],
        outpoint_index: 0,
        outpoint_value: 5_000,
        sequence_number: 0xffff_fffe,
        locktime: 0,
        block_height: 589_000,
        block_time: 1_557_500_000,
    }
}

fn expected_result(label: &str) -> Result<(), ScriptError> {
    use ScriptError::*;

    Err(match label {
        "OK" => return Ok(()),
        "EVAL_FALSE" => EvalFalse,
        "EMPTY_STACK" => EmptyStack,
        "INVALID_SCRIPT_NUMBER" => InvalidScriptNumber,
        "INVALID_NATURAL_NUMBER" => InvalidNaturalNumber,
        "NON_MINIMAL_PUSH" => NonMinimalPush,
        "MALFORMED_PUSH" => MalformedPush,
        "EXCEEDS_MAXIMUM_PUSH" => ExceedsMaximumPush,
        "UNKNOWN_OPCODE" => UnknownOpcode,
        "DISABLED_OPCODE" => DisabledOpcode,
        "UNBALANCED_CONDITIONAL" => UnbalancedConditional,
        "FAILED_VERIFY" => FailedVerify,
        "OP_RETURN" => OpReturn,
        "DIVISION_BY_ZERO" => DivisionByZero,
        "MISMATCHED_BITWISE_OPERAND_LENGTH" => MismatchedBitwiseOperandLength,
        "NEGATIVE_LOCKTIME" => NegativeLocktime,
        "UNSATISFIED_LOCKTIME" => UnsatisfiedLocktime,
        "INVALID_PROTOCOL_BUG_VALUE" => InvalidProtocolBugValue,
        other => panic!("unknown expectation label: {other}"),
    })
}

#[test]
fn vm_vectors() {
    let vectors: Vec<Value> = serde_json::from_str(VM_VECTORS).expect("vm_vectors.json parses");

    for (index, vector) in vectors.iter().enumerate() {
        let entry = vector.as_array().expect("vector entries are arrays");
        if entry.len() < 3 {
            // Single-string entries are section comments.
            continue;
        }

        let unlocking = entry[0].as_str().expect("unlocking script string");
        let locking = entry[1].as_str().expect("locking script string");
        let expected = entry[2].as_str().expect("expectation string");
        let comment = entry
            .get(3)
            .and_then(Value::as_str)
            .unwrap_or("(no comment)");

        let unlocking_script = parse_script(unlocking)
            .unwrap_or_else(|err| panic!("vector #{index} unlocking: {err}"));
        let locking_script = parse_script(locking)
            .unwrap_or_else(|err| panic!("vector #{index} locking: {err}"));

        let program = AuthenticationProgram {
            unlocking_script,
            locking_script,
            environment: context(),
        };

        assert_eq!(
            verify(&program),
            expected_result(expected),
            "vector #{index}: `{unlocking}` / `{locking}` — {comment}"
        );
    }
}
