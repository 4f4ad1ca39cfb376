//! A small assembly format for script test vectors.
//!
//! Tokens are whitespace-separated: `OP_*` mnemonics emit their opcode
//! byte, decimal numbers emit their minimal push, `'text'` emits a minimal
//! push of the ASCII bytes, and `0x...` appends raw bytes verbatim (no
//! implied push opcode), which lets vectors spell malformed scripts.

#![allow(dead_code)]

use std::fmt;

use bch_vm::{
    encoding::{encode_data_push, encode_script_number},
    opcodes,
};

#[derive(Debug)]
pub enum ParseScriptError {
    UnknownMnemonic(String),
    BadHex(String),
    BadNumber(String),
}

impl fmt::Display for ParseScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseScriptError::UnknownMnemonic(token) => write!(f, "unknown mnemonic: {token}"),
            ParseScriptError::BadHex(token) => write!(f, "bad hex literal: {token}"),
            ParseScriptError::BadNumber(token) => write!(f, "bad number: {token}"),
        }
    }
}

fn opcode_byte(mnemonic: &str) -> Option<u8> {
    (0..=u8::MAX).find(|&opcode| opcodes::name(opcode) == mnemonic)
}

pub fn parse_script(source: &str) -> Result<Vec<u8>, ParseScriptError> {
    let mut script = Vec::new();
    for token in source.split_whitespace() {
        if let Some(digits) = token.strip_prefix("0x") {
            let bytes = hex::decode(digits)
                .map_err(|_| ParseScriptError::BadHex(token.to_string()))?;
            script.extend(bytes);
        } else if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
            script.extend(encode_data_push(token[1..token.len() - 1].as_bytes()));
        } else if token.starts_with("OP_") {
            let opcode = opcode_byte(token)
                .ok_or_else(|| ParseScriptError::UnknownMnemonic(token.to_string()))?;
            script.push(opcode);
        } else {
            let value: i64 = token
                .parse()
                .map_err(|_| ParseScriptError::BadNumber(token.to_string()))?;
            script.extend(encode_data_push(&encode_script_number(value)));
        }
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bch_vm::opcodes::*;

    #[test]
    fn parses_each_token_kind() {
        assert_eq!(
            parse_script("OP_DUP OP_HASH160").unwrap(),
            vec![OP_DUP, OP_HASH160]
        );
        assert_eq!(parse_script("0").unwrap(), vec![OP_0]);
        assert_eq!(parse_script("16").unwrap(), vec![OP_16]);
        assert_eq!(parse_script("-1").unwrap(), vec![OP_1NEGATE]);
        assert_eq!(parse_script("17").unwrap(), vec![0x01, 0x11]);
        assert_eq!(parse_script("'ab'").unwrap(), vec![0x02, 0x61, 0x62]);
        assert_eq!(parse_script("0x51ff").unwrap(), vec![0x51, 0xff]);
        assert_eq!(parse_script("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(parse_script("OP_NONSENSE").is_err());
        assert!(parse_script("0xzz").is_err());
        assert!(parse_script("12monkeys").is_err());
    }
}
