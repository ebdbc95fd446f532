// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Wire/domain types for blocks, transactions, cells and scripts.
//!
//! These mirror the shapes named in the component design's external RPC
//! interface (`{header: {...}, transactions: [...]}`) closely enough to
//! deserialize directly from a JSON-RPC response, while staying chain-
//! agnostic: no consensus rules, no script VM, nothing beyond what the
//! follower and collectors need.

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::Byte32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashType {
    Data = 0,
    Type = 1,
}

impl TryFrom<u8> for HashType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(HashType::Data),
            1 => Ok(HashType::Type),
            other => Err(Error::Validation(format!(
                "hash_type must be 0 (data) or 1 (type), got {}",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub code_hash: Byte32,
    pub hash_type: HashType,
    #[serde(with = "hex_bytes")]
    pub args: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_hash: Byte32,
    pub index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInput {
    pub previous_output: OutPoint,
    pub since: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOutput {
    pub capacity: u64,
    pub lock: Script,
    #[serde(rename = "type")]
    pub type_: Option<Script>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub hash: Byte32,
    pub inputs: Vec<CellInput>,
    pub outputs: Vec<CellOutput>,
    #[serde(with = "hex_bytes_vec")]
    pub outputs_data: Vec<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderView {
    pub number: u64,
    pub hash: Byte32,
    pub parent_hash: Byte32,
    pub dao: Byte32,
    /// Packed `(number, index, length)` epoch triple; see `codec::pack_epoch`.
    pub epoch: [u8; 7],
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockView {
    pub header: HeaderView,
    pub transactions: Vec<TransactionView>,
}

/// The envelope returned by `get_transaction`: the transaction body plus
/// its inclusion status, mirroring CKB-family JSON-RPC conventions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionWithStatus {
    pub transaction: TransactionView,
    pub tx_status: TxStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Proposed,
    Committed,
    Unknown,
    Rejected,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        let stripped = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(stripped).map_err(serde::de::Error::custom)
    }
}

mod hex_bytes_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
        let hexed: Vec<String> = values
            .iter()
            .map(|v| format!("0x{}", hex::encode(v)))
            .collect();
        hexed.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let texts = Vec::<String>::deserialize(d)?;
        texts
            .into_iter()
            .map(|text| {
                let stripped = text.strip_prefix("0x").map(str::to_owned).unwrap_or(text);
                hex::decode(stripped).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

impl Script {
    /// Shape validation per the collector's construction rules: code_hash
    /// is always 32 bytes and hash_type one of the two known tags, both
    /// enforced by construction (`Byte32`, `HashType`); args is any byte
    /// string. Kept as an explicit call-site hook rather than inlined so
    /// collectors read as validating their inputs.
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
