//! Opcode constants for the BCH_2019May instruction set.
//!
//! Values follow the wire encoding: a script is a flat byte stream in which
//! pushes carry their payload inline, so "one opcode" may span several bytes.

/// Push an empty element (the script number zero).
pub const OP_0: u8 = 0x00;
/// First of the constant-length pushes; `OP_PUSHBYTES_N` is the byte `N`.
pub const OP_PUSHBYTES_1: u8 = 0x01;
pub const OP_PUSHBYTES_2: u8 = 0x02;
pub const OP_PUSHBYTES_5: u8 = 0x05;
pub const OP_PUSHBYTES_20: u8 = 0x14;
/// Last of the constant-length pushes.
pub const OP_PUSHBYTES_75: u8 = 0x4b;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_RESERVED: u8 = 0x50;
pub const OP_1: u8 = 0x51;
pub const OP_2: u8 = 0x52;
pub const OP_3: u8 = 0x53;
pub const OP_4: u8 = 0x54;
pub const OP_5: u8 = 0x55;
pub const OP_6: u8 = 0x56;
pub const OP_7: u8 = 0x57;
pub const OP_8: u8 = 0x58;
pub const OP_9: u8 = 0x59;
pub const OP_10: u8 = 0x5a;
pub const OP_11: u8 = 0x5b;
pub const OP_12: u8 = 0x5c;
pub const OP_13: u8 = 0x5d;
pub const OP_14: u8 = 0x5e;
pub const OP_15: u8 = 0x5f;
pub const OP_16: u8 = 0x60;

pub const OP_NOP: u8 = 0x61;
pub const OP_VER: u8 = 0x62;
pub const OP_IF: u8 = 0x63;
pub const OP_NOTIF: u8 = 0x64;
pub const OP_VERIF: u8 = 0x65;
pub const OP_VERNOTIF: u8 = 0x66;
pub const OP_ELSE: u8 = 0x67;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_RETURN: u8 = 0x6a;

pub const OP_TOALTSTACK: u8 = 0x6b;
pub const OP_FROMALTSTACK: u8 = 0x6c;
pub const OP_2DROP: u8 = 0x6d;
pub const OP_2DUP: u8 = 0x6e;
pub const OP_3DUP: u8 = 0x6f;
pub const OP_2OVER: u8 = 0x70;
pub const OP_2ROT: u8 = 0x71;
pub const OP_2SWAP: u8 = 0x72;
pub const OP_IFDUP: u8 = 0x73;
pub const OP_DEPTH: u8 = 0x74;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_NIP: u8 = 0x77;
pub const OP_OVER: u8 = 0x78;
pub const OP_PICK: u8 = 0x79;
pub const OP_ROLL: u8 = 0x7a;
pub const OP_ROT: u8 = 0x7b;
pub const OP_SWAP: u8 = 0x7c;
pub const OP_TUCK: u8 = 0x7d;

pub const OP_CAT: u8 = 0x7e;
pub const OP_SPLIT: u8 = 0x7f;
pub const OP_NUM2BIN: u8 = 0x80;
pub const OP_BIN2NUM: u8 = 0x81;
pub const OP_SIZE: u8 = 0x82;

pub const OP_INVERT: u8 = 0x83;
pub const OP_AND: u8 = 0x84;
pub const OP_OR: u8 = 0x85;
pub const OP_XOR: u8 = 0x86;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_RESERVED1: u8 = 0x89;
pub const OP_RESERVED2: u8 = 0x8a;

pub const OP_1ADD: u8 = 0x8b;
pub const OP_1SUB: u8 = 0x8c;
pub const OP_2MUL: u8 = 0x8d;
pub const OP_2DIV: u8 = 0x8e;
pub const OP_NEGATE: u8 = 0x8f;
pub const OP_ABS: u8 = 0x90;
pub const OP_NOT: u8 = 0x91;
pub const OP_0NOTEQUAL: u8 = 0x92;
pub const OP_ADD: u8 = 0x93;
pub const OP_SUB: u8 = 0x94;
pub const OP_MUL: u8 = 0x95;
pub const OP_DIV: u8 = 0x96;
pub const OP_MOD: u8 = 0x97;
pub const OP_LSHIFT: u8 = 0x98;
pub const OP_RSHIFT: u8 = 0x99;
pub const OP_BOOLAND: u8 = 0x9a;
pub const OP_BOOLOR: u8 = 0x9b;
pub const OP_NUMEQUAL: u8 = 0x9c;
pub const OP_NUMEQUALVERIFY: u8 = 0x9d;
pub const OP_NUMNOTEQUAL: u8 = 0x9e;
pub const OP_LESSTHAN: u8 = 0x9f;
pub const OP_GREATERTHAN: u8 = 0xa0;
pub const OP_LESSTHANOREQUAL: u8 = 0xa1;
pub const OP_GREATERTHANOREQUAL: u8 = 0xa2;
pub const OP_MIN: u8 = 0xa3;
pub const OP_MAX: u8 = 0xa4;
pub const OP_WITHIN: u8 = 0xa5;

pub const OP_RIPEMD160: u8 = 0xa6;
pub const OP_SHA1: u8 = 0xa7;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_HASH256: u8 = 0xaa;
pub const OP_CODESEPARATOR: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

pub const OP_NOP1: u8 = 0xb0;
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;
pub const OP_NOP4: u8 = 0xb3;
pub const OP_NOP5: u8 = 0xb4;
pub const OP_NOP6: u8 = 0xb5;
pub const OP_NOP7: u8 = 0xb6;
pub const OP_NOP8: u8 = 0xb7;
pub const OP_NOP9: u8 = 0xb8;
pub const OP_NOP10: u8 = 0xb9;

pub const OP_CHECKDATASIG: u8 = 0xba;
pub const OP_CHECKDATASIGVERIFY: u8 = 0xbb;

/// The canonical mnemonic for an opcode byte.
///
/// Undefined bytes render as `OP_UNKNOWN_0x..` so disassembly of an invalid
/// script never loses information.
pub fn name(opcode: u8) -> &'static str {
    match opcode {
        OP_0 => "OP_0",
        OP_PUSHBYTES_1..=OP_PUSHBYTES_75 => PUSHBYTES_NAMES[(opcode - 1) as usize],
        OP_PUSHDATA1 => "OP_PUSHDATA1",
        OP_PUSHDATA2 => "OP_PUSHDATA2",
        OP_PUSHDATA4 => "OP_PUSHDATA4",
        OP_1NEGATE => "OP_1NEGATE",
        OP_RESERVED => "OP_RESERVED",
        OP_1 => "OP_1",
        OP_2 => "OP_2",
        OP_3 => "OP_3",
        OP_4 => "OP_4",
        OP_5 => "OP_5",
        OP_6 => "OP_6",
        OP_7 => "OP_7",
        OP_8 => "OP_8",
        OP_9 => "OP_9",
        OP_10 => "OP_10",
        OP_11 => "OP_11",
        OP_12 => "OP_12",
        OP_13 => "OP_13",
        OP_14 => "OP_14",
        OP_15 => "OP_15",
        OP_16 => "OP_16",
        OP_NOP => "OP_NOP",
        OP_VER => "OP_VER",
        OP_IF => "OP_IF",
        OP_NOTIF => "OP_NOTIF",
        OP_VERIF => "OP_VERIF",
        OP_VERNOTIF => "OP_VERNOTIF",
        OP_ELSE => "OP_ELSE",
        OP_ENDIF => "OP_ENDIF",
        OP_VERIFY => "OP_VERIFY",
        OP_RETURN => "OP_RETURN",
        OP_TOALTSTACK => "OP_TOALTSTACK",
        OP_FROMALTSTACK => "OP_FROMALTSTACK",
        OP_2DROP => "OP_2DROP",
        OP_2DUP => "OP_2DUP",
        OP_3DUP => "OP_3DUP",
        OP_2OVER => "OP_2OVER",
        OP_2ROT => "OP_2ROT",
        OP_2SWAP => "OP_2SWAP",
        OP_IFDUP => "OP_IFDUP",
        OP_DEPTH => "OP_DEPTH",
        OP_DROP => "OP_DROP",
        OP_DUP => "OP_DUP",
        OP_NIP => "OP_NIP",
        OP_OVER => "OP_OVER",
        OP_PICK => "OP_PICK",
        OP_ROLL => "OP_ROLL",
        OP_ROT => "OP_ROT",
        OP_SWAP => "OP_SWAP",
        OP_TUCK => "OP_TUCK",
        OP_CAT => "OP_CAT",
        OP_SPLIT => "OP_SPLIT",
        OP_NUM2BIN => "OP_NUM2BIN",
        OP_BIN2NUM => "OP_BIN2NUM",
        OP_SIZE => "OP_SIZE",
        OP_INVERT => "OP_INVERT",
        OP_AND => "OP_AND",
        OP_OR => "OP_OR",
        OP_XOR => "OP_XOR",
        OP_EQUAL => "OP_EQUAL",
        OP_EQUALVERIFY => "OP_EQUALVERIFY",
        OP_RESERVED1 => "OP_RESERVED1",
        OP_RESERVED2 => "OP_RESERVED2",
        OP_1ADD => "OP_1ADD",
        OP_1SUB => "OP_1SUB",
        OP_2MUL => "OP_2MUL",
        OP_2DIV => "OP_2DIV",
        OP_NEGATE => "OP_NEGATE",
        OP_ABS => "OP_ABS",
        OP_NOT => "OP_NOT",
        OP_0NOTEQUAL => "OP_0NOTEQUAL",
        OP_ADD => "OP_ADD",
        OP_SUB => "OP_SUB",
        OP_MUL => "OP_MUL",
        OP_DIV => "OP_DIV",
        OP_MOD => "OP_MOD",
        OP_LSHIFT => "OP_LSHIFT",
        OP_RSHIFT => "OP_RSHIFT",
        OP_BOOLAND => "OP_BOOLAND",
        OP_BOOLOR => "OP_BOOLOR",
        OP_NUMEQUAL => "OP_NUMEQUAL",
        OP_NUMEQUALVERIFY => "OP_NUMEQUALVERIFY",
        OP_NUMNOTEQUAL => "OP_NUMNOTEQUAL",
        OP_LESSTHAN => "OP_LESSTHAN",
        OP_GREATERTHAN => "OP_GREATERTHAN",
        OP_LESSTHANOREQUAL => "OP_LESSTHANOREQUAL",
        OP_GREATERTHANOREQUAL => "OP_GREATERTHANOREQUAL",
        OP_MIN => "OP_MIN",
        OP_MAX => "OP_MAX",
        OP_WITHIN => "OP_WITHIN",
        OP_RIPEMD160 => "OP_RIPEMD160",
        OP_SHA1 => "OP_SHA1",
        OP_SHA256 => "OP_SHA256",
        OP_HASH160 => "OP_HASH160",
        OP_HASH256 => "OP_HASH256",
        OP_CODESEPARATOR => "OP_CODESEPARATOR",
        OP_CHECKSIG => "OP_CHECKSIG",
        OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY",
        OP_CHECKMULTISIG => "OP_CHECKMULTISIG",
        OP_CHECKMULTISIGVERIFY => "OP_CHECKMULTISIGVERIFY",
        OP_NOP1 => "OP_NOP1",
        OP_CHECKLOCKTIMEVERIFY => "OP_CHECKLOCKTIMEVERIFY",
        OP_CHECKSEQUENCEVERIFY => "OP_CHECKSEQUENCEVERIFY",
        OP_NOP4 => "OP_NOP4",
        OP_NOP5 => "OP_NOP5",
        OP_NOP6 => "OP_NOP6",
        OP_NOP7 => "OP_NOP7",
        OP_NOP8 => "OP_NOP8",
        OP_NOP9 => "OP_NOP9",
        OP_NOP10 => "OP_NOP10",
        OP_CHECKDATASIG => "OP_CHECKDATASIG",
        OP_CHECKDATASIGVERIFY => "OP_CHECKDATASIGVERIFY",
        _ => UNKNOWN_NAMES[(opcode - 0xbc) as usize],
    }
}

const PUSHBYTES_NAMES: [&str; 75] = [
    "OP_PUSHBYTES_1",
    "OP_PUSHBYTES_2",
    "OP_PUSHBYTES_3",
    "OP_PUSHBYTES_4",
    "OP_PUSHBYTES_5",
    "OP_PUSHBYTES_6",
    "OP_PUSHBYTES_7",
    "OP_PUSHBYTES_8",
    "OP_PUSHBYTES_9",
    "OP_PUSHBYTES_10",
    "OP_PUSHBYTES_11",
    "OP_PUSHBYTES_12",
    "OP_PUSHBYTES_13",
    "OP_PUSHBYTES_14",
    "OP_PUSHBYTES_15",
    "OP_PUSHBYTES_16",
    "OP_PUSHBYTES_17",
    "OP_PUSHBYTES_18",
    "OP_PUSHBYTES_19",
    "OP_PUSHBYTES_20",
    "OP_PUSHBYTES_21",
    "OP_PUSHBYTES_22",
    "OP_PUSHBYTES_23",
    "OP_PUSHBYTES_24",
    "OP_PUSHBYTES_25",
    "OP_PUSHBYTES_26",
    "OP_PUSHBYTES_27",
    "OP_PUSHBYTES_28",
    "OP_PUSHBYTES_29",
    "OP_PUSHBYTES_30",
    "OP_PUSHBYTES_31",
    "OP_PUSHBYTES_32",
    "OP_PUSHBYTES_33",
    "OP_PUSHBYTES_34",
    "OP_PUSHBYTES_35",
    "OP_PUSHBYTES_36",
    "OP_PUSHBYTES_37",
    "OP_PUSHBYTES_38",
    "OP_PUSHBYTES_39",
    "OP_PUSHBYTES_40",
    "OP_PUSHBYTES_41",
    "OP_PUSHBYTES_42",
    "OP_PUSHBYTES_43",
    "OP_PUSHBYTES_44",
    "OP_PUSHBYTES_45",
    "OP_PUSHBYTES_46",
    "OP_PUSHBYTES_47",
    "OP_PUSHBYTES_48",
    "OP_PUSHBYTES_49",
    "OP_PUSHBYTES_50",
    "OP_PUSHBYTES_51",
    "OP_PUSHBYTES_52",
    "OP_PUSHBYTES_53",
    "OP_PUSHBYTES_54",
    "OP_PUSHBYTES_55",
    "OP_PUSHBYTES_56",
    "OP_PUSHBYTES_57",
    "OP_PUSHBYTES_58",
    "OP_PUSHBYTES_59",
    "OP_PUSHBYTES_60",
    "OP_PUSHBYTES_61",
    "OP_PUSHBYTES_62",
    "OP_PUSHBYTES_63",
    "OP_PUSHBYTES_64",
    "OP_PUSHBYTES_65",
    "OP_PUSHBYTES_66",
    "OP_PUSHBYTES_67",
    "OP_PUSHBYTES_68",
    "OP_PUSHBYTES_69",
    "OP_PUSHBYTES_70",
    "OP_PUSHBYTES_71",
    "OP_PUSHBYTES_72",
    "OP_PUSHBYTES_73",
    "OP_PUSHBYTES_74",
    "OP_PUSHBYTES_75",
];

const UNKNOWN_NAMES: [&str; 68] = [
    "OP_UNKNOWN_0xbc",
    "OP_UNKNOWN_0xbd",
    "OP_UNKNOWN_0xbe",
    "OP_UNKNOWN_0xbf",
    "OP_UNKNOWN_0xc0",
    "OP_UNKNOWN_0xc1",
    "OP_UNKNOWN_0xc2",
    "OP_UNKNOWN_0xc3",
    "OP_UNKNOWN_0xc4",
    "OP_UNKNOWN_0xc5",
    "OP_UNKNOWN_0xc6",
    "OP_UNKNOWN_0xc7",
    "OP_UNKNOWN_0xc8",
    "OP_UNKNOWN_0xc9",
    "OP_UNKNOWN_0xca",
    "OP_UNKNOWN_0xcb",
    "OP_UNKNOWN_0xcc",
    "OP_UNKNOWN_0xcd",
    "OP_UNKNOWN_0xce",
    "OP_UNKNOWN_0xcf",
    "OP_UNKNOWN_0xd0",
    "OP_UNKNOWN_0xd1",
    "OP_UNKNOWN_0xd2",
    "OP_UNKNOWN_0xd3",
    "OP_UNKNOWN_0xd4",
    "OP_UNKNOWN_0xd5",
    "OP_UNKNOWN_0xd6",
    "OP_UNKNOWN_0xd7",
    "OP_UNKNOWN_0xd8",
    "OP_UNKNOWN_0xd9",
    "OP_UNKNOWN_0xda",
    "OP_UNKNOWN_0xdb",
    "OP_UNKNOWN_0xdc",
    "OP_UNKNOWN_0xdd",
    "OP_UNKNOWN_0xde",
    "OP_UNKNOWN_0xdf",
    "OP_UNKNOWN_0xe0",
    "OP_UNKNOWN_0xe1",
    "OP_UNKNOWN_0xe2",
    "OP_UNKNOWN_0xe3",
    "OP_UNKNOWN_0xe4",
    "OP_UNKNOWN_0xe5",
    "OP_UNKNOWN_0xe6",
    "OP_UNKNOWN_0xe7",
    "OP_UNKNOWN_0xe8",
    "OP_UNKNOWN_0xe9",
    "OP_UNKNOWN_0xea",
    "OP_UNKNOWN_0xeb",
    "OP_UNKNOWN_0xec",
    "OP_UNKNOWN_0xed",
    "OP_UNKNOWN_0xee",
    "OP_UNKNOWN_0xef",
    "OP_UNKNOWN_0xf0",
    "OP_UNKNOWN_0xf1",
    "OP_UNKNOWN_0xf2",
    "OP_UNKNOWN_0xf3",
    "OP_UNKNOWN_0xf4",
    "OP_UNKNOWN_0xf5",
    "OP_UNKNOWN_0xf6",
    "OP_UNKNOWN_0xf7",
    "OP_UNKNOWN_0xf8",
    "OP_UNKNOWN_0xf9",
    "OP_UNKNOWN_0xfa",
    "OP_UNKNOWN_0xfb",
    "OP_UNKNOWN_0xfc",
    "OP_UNKNOWN_0xfd",
    "OP_UNKNOWN_0xfe",
    "OP_UNKNOWN_0xff",
];

/// Total encoded length of the instruction beginning at `index`, including
/// the opcode byte, any length field and the inline payload.
///
/// The result is clamped to the end of the script, so a truncated push
/// reports the bytes that are actually present.
pub fn instruction_length(script: &[u8], index: usize) -> usize {
    let remaining = script.len().saturating_sub(index);
    if remaining == 0 {
        return 0;
    }
    let claimed = match script[index] {
        opcode @ OP_PUSHBYTES_1..=OP_PUSHBYTES_75 => 1 + opcode as usize,
        OP_PUSHDATA1 => 2 + read_le_length(script, index + 1, 1).unwrap_or(0),
        OP_PUSHDATA2 => 3 + read_le_length(script, index + 1, 2).unwrap_or(0),
        OP_PUSHDATA4 => 5 + read_le_length(script, index + 1, 4).unwrap_or(0),
        _ => 1,
    };
    claimed.min(remaining)
}

/// Reads a `width`-byte little-endian push length, or `None` when the
/// length field itself is truncated.
pub fn read_le_length(script: &[u8], index: usize, width: usize) -> Option<usize> {
    let field = script.get(index..index + width)?;
    let mut length = 0usize;
    for (i, &byte) in field.iter().enumerate() {
        length |= (byte as usize) << (8 * i);
    }
    Some(length)
}
