//! Script-number codec behavior over the value/offset grid used by the
//! reference implementation's scriptnum unit tests.

use bch_vm::{
    encoding::{
        decode_script_number, encode_script_number, is_minimally_encoded,
        MAX_CODEC_SCRIPT_NUMBER_LENGTH,
    },
    ScriptError,
};

const VALUES: [i64; 13] = [
    0,
    1,
    -2,
    127,
    128,
    -255,
    256,
    (1i64 << 15) - 1,
    -(1i64 << 16),
    (1i64 << 24) - 1,
    1i64 << 31,
    1 - (1i64 << 32),
    1i64 << 40,
];

const OFFSETS: [i64; 9] = [1, 0x79, 0x80, 0x81, 0xFF, 0x7FFF, 0x8000, 0xFFFF, 0x10000];

fn assert_round_trip(value: i64) {
    let encoded = encode_script_number(value);
    assert!(
        is_minimally_encoded(&encoded),
        "encoding of {value} not minimal: {encoded:02x?}"
    );
    assert_eq!(
        decode_script_number(&encoded, MAX_CODEC_SCRIPT_NUMBER_LENGTH),
        Ok(value),
        "round trip of {value}"
    );
}

#[test]
fn grid_round_trips() {
    for &value in &VALUES {
        for &offset in &OFFSETS {
            for candidate in [
                value,
                value.saturating_add(offset),
                value.saturating_sub(offset),
                -value,
            ] {
                assert_round_trip(candidate);
            }
        }
    }
}

#[test]
fn extremes_round_trip() {
    assert_round_trip(i64::MAX);
    assert_round_trip(i64::MIN + 1);
    // i64::MAX occupies the full eight bytes without a padding byte.
    assert_eq!(encode_script_number(i64::MAX).len(), 8);
    // Its negation needs the sign bit in the final byte.
    assert_eq!(encode_script_number(i64::MIN + 1).len(), 8);
}

#[test]
fn padding_bytes_are_rejected() {
    for &value in &VALUES {
        if value == 0 {
            continue;
        }
        let mut padded = encode_script_number(value);
        let sign = padded.last().copied().unwrap_or(0) & 0x80;
        if let Some(last) = padded.last_mut() {
            *last &= 0x7f;
        }
        padded.push(sign);
        assert_eq!(
            decode_script_number(&padded, MAX_CODEC_SCRIPT_NUMBER_LENGTH),
            Err(ScriptError::InvalidScriptNumber),
            "padded encoding of {value} must be rejected: {padded:02x?}"
        );
    }
}

#[test]
fn zero_spellings() {
    assert_eq!(encode_script_number(0), Vec::<u8>::new());
    assert_eq!(
        decode_script_number(&[], MAX_CODEC_SCRIPT_NUMBER_LENGTH),
        Ok(0)
    );
    for zero in [&[0x00][..], &[0x80][..], &[0x00, 0x00][..], &[0x00, 0x80][..]] {
        assert_eq!(
            decode_script_number(zero, MAX_CODEC_SCRIPT_NUMBER_LENGTH),
            Err(ScriptError::InvalidScriptNumber),
            "non-minimal zero {zero:02x?}"
        );
    }
}

#[test]
fn over_long_encodings_are_rejected() {
    // Ten bytes can never be a valid script number.
    let ten = [0x01u8, 0, 0, 0, 0, 0, 0, 0, 0, 0x01];
    assert_eq!(
        decode_script_number(&ten, MAX_CODEC_SCRIPT_NUMBER_LENGTH),
        Err(ScriptError::InvalidScriptNumber)
    );

    // Nine minimal bytes hold magnitudes beyond i64: also rejected.
    let nine = [0u8, 0, 0, 0, 0, 0, 0, 0x80, 0x01];
    assert!(is_minimally_encoded(&nine));
    assert_eq!(
        decode_script_number(&nine, MAX_CODEC_SCRIPT_NUMBER_LENGTH),
        Err(ScriptError::InvalidScriptNumber)
    );
}

#[test]
fn operand_length_bounds_are_caller_chosen() {
    let five_bytes = encode_script_number(1i64 << 32);
    assert_eq!(five_bytes.len(), 5);
    assert_eq!(
        decode_script_number(&five_bytes, 4),
        Err(ScriptError::InvalidScriptNumber)
    );
    assert_eq!(decode_script_number(&five_bytes, 5), Ok(1i64 << 32));
}
