// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Deterministic core types and canonical encoding helpers.

use crate::core::math::Amount;
use bincode::Options;
use ring::digest;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization")]
    Serialize,
    #[error("deserialization")]
    Deserialize,
    #[error("size limit exceeded")]
    TooLarge,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Fixint encoding provides a stable integer representation.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules. Requires deterministic container ordering (use BTreeMap/BTreeSet).
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// 256-bit hash type (32 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct H256([u8; 32]);

impl H256 {
    /// Construct from raw bytes.
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }
    /// Return bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// Hex in human-readable formats (TOML, JSON), raw bytes in the canonical codec.
fn serialize_bytes<S: Serializer>(b: &[u8], s: S) -> Result<S::Ok, S::Error> {
    if s.is_human_readable() {
        s.serialize_str(&hex::encode(b))
    } else {
        b.serialize(s)
    }
}

fn deserialize_bytes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    if d.is_human_readable() {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)
    } else {
        Vec::<u8>::deserialize(d)
    }
}

/// Longest address a store key can carry; keys length-prefix it with one byte.
pub const MAX_ADDR_LEN: usize = u8::MAX as usize;

macro_rules! address_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub Vec<u8>);

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                serialize_bytes(&self.0, s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                deserialize_bytes(d).map(Self)
            }
        }

        impl $name {
            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
            /// True when no bytes are set.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0))
            }
        }

        impl From<&[u8]> for $name {
            fn from(b: &[u8]) -> Self {
                Self(b.to_vec())
            }
        }
    };
}

address_type!(
    /// Account (delegator) address.
    AccAddress
);
address_type!(
    /// Validator operator address. Shares its bytes with the operator's account.
    ValAddress
);
address_type!(
    /// Consensus address, derived from the consensus public key.
    ConsAddress
);

impl ValAddress {
    /// The operator's own account, used for self-delegation.
    pub fn to_account(&self) -> AccAddress {
        AccAddress(self.0.clone())
    }
}

impl AccAddress {
    /// Interpret this account as a validator operator address.
    pub fn to_validator(&self) -> ValAddress {
        ValAddress(self.0.clone())
    }
}

/// Consensus public key (Ed25519 public key bytes, expected 32).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsPubKey(pub Vec<u8>);

impl Serialize for ConsPubKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        serialize_bytes(&self.0, s)
    }
}

impl<'de> Deserialize<'de> for ConsPubKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        deserialize_bytes(d).map(Self)
    }
}

impl ConsPubKey {
    /// Interpret as Ed25519 public key bytes if length is 32.
    pub fn as_public_key_bytes(&self) -> Option<[u8; 32]> {
        if self.0.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0);
        Some(out)
    }

    /// Consensus address: first 20 bytes of SHA-256(pubkey).
    pub fn address(&self) -> ConsAddress {
        let d = digest::digest(&digest::SHA256, &self.0);
        ConsAddress(d.as_ref()[..20].to_vec())
    }
}

/// Denominated token amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination.
    pub denom: String,
    /// Amount in base units.
    pub amount: Amount,
}

impl Coin {
    /// Build a coin.
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Unix time in seconds.
pub type Timestamp = u64;

/// Header of the block currently being executed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block height.
    pub height: u64,
    /// Block time (unix seconds).
    pub time: Timestamp,
    /// Block hash, if known.
    #[serde(default)]
    pub hash: H256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cons_address_is_twenty_bytes() {
        let pk = ConsPubKey(vec![7u8; 32]);
        assert_eq!(pk.address().as_bytes().len(), 20);
        assert_eq!(pk.address(), pk.address());
        assert_ne!(pk.address(), ConsPubKey(vec![8u8; 32]).address());
    }

    #[test]
    fn canonical_codec_rejects_oversized_input() {
        let bytes = encode_canonical(&BlockInfo::default()).unwrap();
        let back: BlockInfo = decode_canonical_limited(&bytes, 1024).unwrap();
        assert_eq!(back, BlockInfo::default());
        assert!(matches!(
            decode_canonical_limited::<BlockInfo>(&bytes, 4),
            Err(CodecError::TooLarge)
        ));
    }

    #[test]
    fn addresses_are_hex_in_toml_and_bytes_in_codec() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct W {
            a: AccAddress,
        }
        let w = W {
            a: AccAddress(vec![0xab, 0x01]),
        };
        let t = toml::to_string(&w).unwrap();
        assert!(t.contains("\"ab01\""));
        assert_eq!(toml::from_str::<W>(&t).unwrap(), w);

        let b = encode_canonical(&w).unwrap();
        assert_eq!(decode_canonical_limited::<W>(&b, 64).unwrap(), w);
    }
}
