//! End-to-end pipeline scenarios over real key material.

use bch_vm::{
    crypto::{Ripemd160, Sha256, StandardCrypto},
    debug, evaluate,
    encoding::encode_data_push,
    opcodes::*,
    program::{PHASE_LOCKING, PHASE_REDEEM, PHASE_UNLOCKING},
    sighash::{signing_serialization_digest, SIGHASH_ALL, SIGHASH_FORKID},
    verify, AuthenticationProgram, ScriptError, TransactionContext,
};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

fn context() -> TransactionContext {
    TransactionContext {
        version: 2,
        transaction_outpoints_hash: [0x11; 32],
        transaction_sequence_numbers_hash: [0x22; 32],
        outpoint_transaction_hash: [0x33; 32],
        corresponding_output_hash: Some([0x44; 32]),
        transaction_outputs_hash: [0x55; 32],
        outpoint_index: 0,
        outpoint_value: 100_000,
        sequence_number: 0xffff_fffe,
        locktime: 0,
        block_height: 589_000,
        block_time: 1_557_500_000,
    }
}

struct Keypair {
    secret_key: SecretKey,
    public_key: Vec<u8>,
}

fn keypair(seed: u8) -> Keypair {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(&[seed; 32]).expect("nonzero seed");
    let public_key = PublicKey::from_secret_key(&secp, &secret_key)
        .serialize()
        .to_vec();
    Keypair {
        secret_key,
        public_key,
    }
}

/// A Bitcoin-encoded transaction signature: DER || hashType.
fn sign_transaction(
    environment: &TransactionContext,
    script_code: &[u8],
    hash_type: u8,
    key: &Keypair,
) -> Vec<u8> {
    let secp = Secp256k1::new();
    let crypto = StandardCrypto::new();
    let digest = signing_serialization_digest(&crypto, environment, script_code, hash_type);
    let message = Message::from_digest(digest);
    let mut signature = secp
        .sign_ecdsa(&message, &key.secret_key)
        .serialize_der()
        .to_vec();
    signature.push(hash_type);
    signature
}

fn hash160(crypto: &StandardCrypto, data: &[u8]) -> [u8; 20] {
    Ripemd160::hash(crypto, &Sha256::hash(crypto, data))
}

fn p2pkh_locking_script(public_key_hash: &[u8]) -> Vec<u8> {
    [
        vec![OP_DUP, OP_HASH160],
        encode_data_push(public_key_hash),
        vec![OP_EQUALVERIFY, OP_CHECKSIG],
    ]
    .concat()
}

fn p2sh_locking_script(redeem_script_hash: &[u8]) -> Vec<u8> {
    [
        vec![OP_HASH160],
        encode_data_push(redeem_script_hash),
        vec![OP_EQUAL],
    ]
    .concat()
}

fn multisig_redeem_script(required: u8, public_keys: &[&[u8]]) -> Vec<u8> {
    let mut script = vec![OP_1 + required - 1];
    for public_key in public_keys {
        script.extend(encode_data_push(public_key));
    }
    script.push(OP_1 + public_keys.len() as u8 - 1);
    script.push(OP_CHECKMULTISIG);
    script
}

const ALL_FORKID: u8 = SIGHASH_ALL | SIGHASH_FORKID;

#[test]
fn single_sig_success() {
    let environment = context();
    let crypto = StandardCrypto::new();
    let key = keypair(0x01);

    let locking_script = p2pkh_locking_script(&hash160(&crypto, &key.public_key));
    let signature = sign_transaction(&environment, &locking_script, ALL_FORKID, &key);
    let unlocking_script = [
        encode_data_push(&signature),
        encode_data_push(&key.public_key),
    ]
    .concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script,
        environment,
    };

    let state = evaluate(&program);
    assert_eq!(state.error, None);
    assert_eq!(state.stack, vec![vec![0x01]]);
    assert_eq!(state.operation_count, 5);
    verify(&program).expect("valid spend");
}

#[test]
fn wrong_signature_is_a_false_result_not_an_error() {
    let environment = context();
    let crypto = StandardCrypto::new();
    let key = keypair(0x01);

    let locking_script = p2pkh_locking_script(&hash160(&crypto, &key.public_key));

    // Sign a different transaction context: same keys, wrong digest.
    let mut other = environment;
    other.outpoint_value = 1;
    let signature = sign_transaction(&other, &locking_script, ALL_FORKID, &key);
    let unlocking_script = [
        encode_data_push(&signature),
        encode_data_push(&key.public_key),
    ]
    .concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script,
        environment,
    };

    let state = evaluate(&program);
    assert_eq!(state.error, None);
    assert_eq!(state.stack, vec![Vec::<u8>::new()]);
    assert_eq!(verify(&program), Err(ScriptError::EvalFalse));
}

#[test]
fn non_minimal_push_fails() {
    let program = AuthenticationProgram {
        unlocking_script: vec![OP_PUSHDATA1, 0x01, 0x05],
        locking_script: vec![OP_1],
        environment: context(),
    };
    let state = evaluate(&program);
    assert_eq!(state.error, Some(ScriptError::NonMinimalPush));
    assert_eq!(verify(&program), Err(ScriptError::NonMinimalPush));
}

#[test]
fn p2sh_two_of_three_multisig() {
    let environment = context();
    let crypto = StandardCrypto::new();
    let keys = [keypair(0x01), keypair(0x02), keypair(0x03)];

    let redeem_script = multisig_redeem_script(
        2,
        &[
            keys[0].public_key.as_slice(),
            keys[1].public_key.as_slice(),
            keys[2].public_key.as_slice(),
        ],
    );
    let locking_script = p2sh_locking_script(&hash160(&crypto, &redeem_script));

    let signature_1 = sign_transaction(&environment, &redeem_script, ALL_FORKID, &keys[0]);
    let signature_2 = sign_transaction(&environment, &redeem_script, ALL_FORKID, &keys[1]);
    let unlocking_script = [
        vec![OP_0],
        encode_data_push(&signature_1),
        encode_data_push(&signature_2),
        encode_data_push(&redeem_script),
    ]
    .concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script,
        environment,
    };

    let state = evaluate(&program);
    assert_eq!(state.error, None);
    assert_eq!(state.stack, vec![vec![0x01]]);
    verify(&program).expect("valid 2-of-3 spend");

    // All three phases appear in the debug trace, in order.
    let trace = debug(&program);
    let labels: Vec<&str> = trace
        .iter()
        .map(|entry| entry.asm.as_str())
        .filter(|asm| [PHASE_UNLOCKING, PHASE_LOCKING, PHASE_REDEEM].contains(asm))
        .collect();
    assert_eq!(labels, vec![PHASE_UNLOCKING, PHASE_LOCKING, PHASE_REDEEM]);
    assert_eq!(trace.last().unwrap().state, state);
}

#[test]
fn p2sh_rejects_non_push_only_unlocking() {
    let environment = context();
    let crypto = StandardCrypto::new();
    let keys = [keypair(0x01), keypair(0x02), keypair(0x03)];

    let redeem_script = multisig_redeem_script(
        2,
        &[
            keys[0].public_key.as_slice(),
            keys[1].public_key.as_slice(),
            keys[2].public_key.as_slice(),
        ],
    );
    let locking_script = p2sh_locking_script(&hash160(&crypto, &redeem_script));

    // The unlocking script evaluates cleanly and satisfies the locking
    // phase, but OP_DUP breaks the push-only discipline.
    let unlocking_script = [encode_data_push(&redeem_script), vec![OP_DUP]].concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script,
        environment,
    };

    let state = evaluate(&program);
    assert_eq!(state.error, Some(ScriptError::P2shPushOnly));
    assert_eq!(verify(&program), Err(ScriptError::P2shPushOnly));
}

#[test]
fn multisig_protocol_bug_value_must_be_empty() {
    let environment = context();
    let key = keypair(0x01);

    let locking_script = [
        vec![OP_1],
        encode_data_push(&key.public_key),
        vec![OP_1, OP_CHECKMULTISIG],
    ]
    .concat();
    let signature = sign_transaction(&environment, &locking_script, ALL_FORKID, &key);
    // A non-empty protocol-bug element: a single 0x00 byte.
    let unlocking_script = [
        encode_data_push(&[0x00]),
        encode_data_push(&signature),
    ]
    .concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script,
        environment,
    };

    let state = evaluate(&program);
    assert_eq!(state.error, Some(ScriptError::InvalidProtocolBugValue));
}

#[test]
fn multisig_accepts_the_empty_protocol_bug_value() {
    let environment = context();
    let key = keypair(0x01);

    let locking_script = [
        vec![OP_1],
        encode_data_push(&key.public_key),
        vec![OP_1, OP_CHECKMULTISIG],
    ]
    .concat();
    let signature = sign_transaction(&environment, &locking_script, ALL_FORKID, &key);
    let unlocking_script = [vec![OP_0], encode_data_push(&signature)].concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script,
        environment,
    };

    verify(&program).expect("valid 1-of-1 spend");
}

#[test]
fn code_separator_limits_the_signed_script() {
    let environment = context();
    let crypto = StandardCrypto::new();
    let key = keypair(0x07);

    let suffix = p2pkh_locking_script(&hash160(&crypto, &key.public_key));
    let locking_script = [vec![OP_CODESEPARATOR], suffix.clone()].concat();

    // The signature commits to the script after the separator only.
    let signature = sign_transaction(&environment, &suffix, ALL_FORKID, &key);
    let unlocking_script = [
        encode_data_push(&signature),
        encode_data_push(&key.public_key),
    ]
    .concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script: locking_script.clone(),
        environment,
    };
    verify(&program).expect("valid spend against the separated script code");

    // Committing to the whole locking script instead must not verify.
    let wrong = sign_transaction(&environment, &locking_script, ALL_FORKID, &key);
    let program = AuthenticationProgram {
        unlocking_script: [encode_data_push(&wrong), encode_data_push(&key.public_key)].concat(),
        locking_script,
        environment,
    };
    assert_eq!(verify(&program), Err(ScriptError::EvalFalse));
}

#[test]
fn missing_forkid_invalidates_the_signature_encoding() {
    let environment = context();
    let crypto = StandardCrypto::new();
    let key = keypair(0x01);

    let locking_script = p2pkh_locking_script(&hash160(&crypto, &key.public_key));
    let signature = sign_transaction(&environment, &locking_script, SIGHASH_ALL, &key);
    let unlocking_script = [
        encode_data_push(&signature),
        encode_data_push(&key.public_key),
    ]
    .concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script,
        environment,
    };
    assert_eq!(verify(&program), Err(ScriptError::InvalidSignatureEncoding));
}

#[test]
fn malformed_public_key_is_rejected_before_verification() {
    let environment = context();
    let key = keypair(0x01);

    let bogus_key = [0x05u8; 33];
    let locking_script = [
        encode_data_push(&bogus_key),
        vec![OP_CHECKSIG],
    ]
    .concat();
    let signature = sign_transaction(&environment, &locking_script, ALL_FORKID, &key);
    let program = AuthenticationProgram {
        unlocking_script: encode_data_push(&signature),
        locking_script,
        environment,
    };
    assert_eq!(verify(&program), Err(ScriptError::InvalidPublicKeyEncoding));
}

#[test]
fn check_data_sig_commits_to_an_arbitrary_message() {
    let environment = context();
    let crypto = StandardCrypto::new();
    let key = keypair(0x09);
    let secp = Secp256k1::new();

    let message = b"oracle: price over threshold".to_vec();
    let digest = Sha256::hash(&crypto, &message);
    let signature = secp
        .sign_ecdsa(&Message::from_digest(digest), &key.secret_key)
        .serialize_der()
        .to_vec();

    let locking_script = [
        encode_data_push(&key.public_key),
        vec![OP_CHECKDATASIG],
    ]
    .concat();
    let unlocking_script = [
        encode_data_push(&signature),
        encode_data_push(&message),
    ]
    .concat();

    let program = AuthenticationProgram {
        unlocking_script: unlocking_script.clone(),
        locking_script: locking_script.clone(),
        environment,
    };
    verify(&program).expect("valid data signature");

    // A different message fails verification without a script error.
    let other_unlocking = [
        encode_data_push(&signature),
        encode_data_push(&b"oracle: price under threshold".to_vec()),
    ]
    .concat();
    let program = AuthenticationProgram {
        unlocking_script: other_unlocking,
        locking_script,
        environment,
    };
    assert_eq!(verify(&program), Err(ScriptError::EvalFalse));
}

#[test]
fn signatures_must_appear_in_key_order() {
    let environment = context();
    let crypto = StandardCrypto::new();
    let keys = [keypair(0x01), keypair(0x02), keypair(0x03)];

    let redeem_script = multisig_redeem_script(
        2,
        &[
            keys[0].public_key.as_slice(),
            keys[1].public_key.as_slice(),
            keys[2].public_key.as_slice(),
        ],
    );
    let locking_script = p2sh_locking_script(&hash160(&crypto, &redeem_script));

    let signature_1 = sign_transaction(&environment, &redeem_script, ALL_FORKID, &keys[0]);
    let signature_2 = sign_transaction(&environment, &redeem_script, ALL_FORKID, &keys[1]);

    // Reversed signature order cannot match the key walk.
    let unlocking_script = [
        vec![OP_0],
        encode_data_push(&signature_2),
        encode_data_push(&signature_1),
        encode_data_push(&redeem_script),
    ]
    .concat();

    let program = AuthenticationProgram {
        unlocking_script,
        locking_script,
        environment,
    };
    assert_eq!(verify(&program), Err(ScriptError::EvalFalse));
}
