// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Fixed-size hash type and the pluggable script hasher.
//!
//! Script serialization/hashing is out of scope for this crate (it is a
//! pure function of a script value, per the indexer's component design);
//! `ScriptHasher` lets an embedder plug in the chain's real domain hash
//! while `Blake2bScriptHasher` provides a working default.

use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Script;

/// A 32-byte hash: block hashes, tx hashes, script hashes, data hashes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Byte32(#[serde(with = "hex_bytes32")] [u8; 32]);

impl Byte32 {
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}

impl TryFrom<Vec<u8>> for Byte32 {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(Error::Data(format!(
                "incorrect hash length: expected 32, got {}",
                bytes.len()
            )));
        }
        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes[..]);
        Ok(Self(array))
    }
}

impl TryFrom<&[u8]> for Byte32 {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::try_from(bytes.to_vec())
    }
}

impl From<[u8; 32]> for Byte32 {
    fn from(array: [u8; 32]) -> Self {
        Self(array)
    }
}

impl fmt::Debug for Byte32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..]))
    }
}

impl fmt::Display for Byte32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..]))
    }
}

impl fmt::LowerHex for Byte32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..]))
    }
}

mod hex_bytes32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(&bytes[..])))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(d)?;
        let stripped = text.strip_prefix("0x").unwrap_or(&text);
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom(format!(
                "incorrect hash length: expected 32, got {}",
                bytes.len()
            )));
        }
        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes[..]);
        Ok(array)
    }
}

/// Computes the domain hash of a script's canonical serialization.
///
/// Kept pluggable: the chain's actual serialization/hash function is an
/// external collaborator per the component design, not something this
/// crate owns.
pub trait ScriptHasher: Send + Sync {
    fn hash(&self, script: &Script) -> Byte32;
}

/// A working default: blake2b over `code_hash || hash_type || args`, the
/// same primitive this pack's chain clients use for script hashing
/// (`blake2b-rs`/`blake2b-ref`).
pub struct Blake2bScriptHasher;

impl ScriptHasher for Blake2bScriptHasher {
    fn hash(&self, script: &Script) -> Byte32 {
        let mut hasher = blake2b_ref::Blake2bBuilder::new(32)
            .personal(b"ckb-default-hash")
            .build();
        hasher.update(script.code_hash.as_slice());
        hasher.update(&[script.hash_type as u8]);
        hasher.update(&script.args);
        let mut out = [0u8; 32];
        hasher.finalize(&mut out);
        Byte32::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_vec() {
        let bytes: Vec<u8> = (0u8..32).collect();
        let hash = Byte32::try_from(bytes.clone()).unwrap();
        assert_eq!(hash.as_slice(), &bytes[..]);
    }

    #[test]
    fn rejects_wrong_length() {
        let bytes = vec![0u8; 31];
        assert!(Byte32::try_from(bytes).is_err());
    }

    #[test]
    fn display_is_0x_prefixed_lowercase_hex() {
        let hash: Byte32 = [0x01u8; 32].into();
        assert_eq!(format!("{}", hash), format!("0x{}", "01".repeat(32)));
    }

    #[test]
    fn blake2b_hasher_is_deterministic() {
        let script = Script {
            code_hash: [0x02u8; 32].into(),
            hash_type: crate::types::HashType::Data,
            args: vec![0xde, 0xad],
        };
        let hasher = Blake2bScriptHasher;
        assert_eq!(hasher.hash(&script), hasher.hash(&script));
    }
}
