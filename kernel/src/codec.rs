// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pure conversions between the chain's hexadecimal wire encoding and the
//! store's compact binary/decimal-string encoding. No I/O, no fallible
//! state beyond malformed hex.

use crate::error::{Error, Result};

/// Decodes a `0x`-prefixed (or bare) hex string into bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(stripped).map_err(|err| Error::Codec(format!("malformed hex: {}", err)))
}

/// Encodes bytes as a `0x`-prefixed lowercase hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Zero-pads a hex string's body to `n` hex characters (left padding, i.e.
/// the value grows numerically leftward, matching `leftPadHex` semantics).
pub fn left_pad_hex(hex_str: &str, n: usize) -> String {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    if stripped.len() >= n {
        format!("0x{}", stripped)
    } else {
        format!("0x{}{}", "0".repeat(n - stripped.len()), stripped)
    }
}

/// Parses a hex-encoded `u64` (as the chain's wire format represents block
/// numbers / capacities) into a decimal string, which is how the store
/// keeps large integers portable across SQL backends without 64-bit
/// overflow surprises in client drivers that lack unsigned types.
pub fn hex_to_decimal_string(hex_str: &str) -> Result<String> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let value = u128::from_str_radix(stripped, 16)
        .map_err(|err| Error::Codec(format!("malformed hex integer: {}", err)))?;
    Ok(value.to_string())
}

/// Renders a decimal-string bigint back to a `0x`-prefixed hex string.
pub fn decimal_string_to_hex(decimal: &str) -> Result<String> {
    let value: u128 = decimal
        .parse()
        .map_err(|err| Error::Codec(format!("malformed decimal integer: {}", err)))?;
    Ok(format!("0x{:x}", value))
}

/// Reads the first 16 bytes of `bytes` little-endian (zero-padding on the
/// right when fewer than 16 bytes are present) and renders the decimal
/// string, used to derive a cell's `udt_amount` from its output data.
pub fn data_le_to_u128_decimal(bytes: &[u8]) -> String {
    let mut buf = [0u8; 16];
    let take = bytes.len().min(16);
    buf[..take].copy_from_slice(&bytes[..take]);
    u128::from_le_bytes(buf).to_string()
}

/// Packs an epoch `(number, index, length)` triple into the store's 7-byte
/// big-endian representation: 3 bytes of block-in-epoch number, 2 bytes of
/// index, 2 bytes of length.
pub fn pack_epoch(number: u32, index: u16, length: u16) -> [u8; 7] {
    let number_bytes = number.to_be_bytes();
    let index_bytes = index.to_be_bytes();
    let length_bytes = length.to_be_bytes();
    [
        number_bytes[1],
        number_bytes[2],
        number_bytes[3],
        index_bytes[0],
        index_bytes[1],
        length_bytes[0],
        length_bytes[1],
    ]
}

/// Inverse of [`pack_epoch`].
pub fn unpack_epoch(packed: &[u8; 7]) -> (u32, u16, u16) {
    let number = u32::from_be_bytes([0, packed[0], packed[1], packed[2]]);
    let index = u16::from_be_bytes([packed[3], packed[4]]);
    let length = u16::from_be_bytes([packed[5], packed[6]]);
    (number, index, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_bytes_round_trip() {
        let bytes = vec![0xde, 0xad, 0xbe, 0xef];
        let hex_str = bytes_to_hex(&bytes);
        assert_eq!(hex_str, "0xdeadbeef");
        assert_eq!(hex_to_bytes(&hex_str).unwrap(), bytes);
        assert_eq!(hex_to_bytes("deadbeef").unwrap(), bytes);
    }

    #[test]
    fn malformed_hex_fails() {
        assert!(hex_to_bytes("0xzz").is_err());
    }

    #[test]
    fn left_pad_hex_pads_short_values() {
        assert_eq!(left_pad_hex("0xab", 4), "0x00ab");
        assert_eq!(left_pad_hex("0xabcd", 4), "0xabcd");
        assert_eq!(left_pad_hex("0xabcdef", 4), "0xabcdef");
    }

    #[test]
    fn decimal_string_round_trip() {
        let hex_str = "0x1000";
        let decimal = hex_to_decimal_string(hex_str).unwrap();
        assert_eq!(decimal, "4096");
        assert_eq!(decimal_string_to_hex(&decimal).unwrap(), hex_str);
    }

    #[test]
    fn udt_amount_reads_first_16_bytes_little_endian() {
        let mut data = vec![0u8; 16];
        data[0] = 1;
        assert_eq!(data_le_to_u128_decimal(&data), "1");
    }

    #[test]
    fn udt_amount_zero_pads_short_data() {
        assert_eq!(data_le_to_u128_decimal(&[]), "0");
        assert_eq!(data_le_to_u128_decimal(&[5]), "5");
    }

    #[test]
    fn udt_amount_ignores_bytes_past_16() {
        let mut data = vec![0u8; 20];
        data[0] = 7;
        data[19] = 0xff;
        assert_eq!(data_le_to_u128_decimal(&data), "7");
    }

    #[test]
    fn epoch_pack_round_trip() {
        let packed = pack_epoch(12345, 3, 1800);
        assert_eq!(unpack_epoch(&packed), (12345, 3, 1800));
    }
}
