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

//! Binary Merkle tree over the sorted ledger snapshot.
//!
//! leaf = H( "Amunchain-Staking-Leaf-v1" || H(key) || H(value) )
//! node = H( "Amunchain-Staking-Node-v1" || left || right )
//!
//! An odd node at the end of a level is paired with itself.

use ring::digest;

/// Hash32 type.
pub type Hash32 = [u8; 32];

const LEAF_DOMAIN: &[u8] = b"Amunchain-Staking-Leaf-v1";
const NODE_DOMAIN: &[u8] = b"Amunchain-Staking-Node-v1";

/// Side of sibling in proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Sibling is left.
    Left,
    /// Sibling is right.
    Right,
}

/// One proof step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofItem {
    /// Whether sibling is left or right of current hash.
    pub side: Side,
    /// Sibling hash.
    pub sibling: Hash32,
}

/// Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    /// Leaf hash.
    pub leaf: Hash32,
    /// Path items from leaf to root.
    pub path: Vec<ProofItem>,
}

fn h(data: &[u8]) -> Hash32 {
    let d = digest::digest(&digest::SHA256, data);
    let mut out = [0u8; 32];
    out.copy_from_slice(d.as_ref());
    out
}

fn domain_hash(domain: &[u8], a: &Hash32, b: &Hash32) -> Hash32 {
    let mut buf = Vec::with_capacity(domain.len() + 64);
    buf.extend_from_slice(domain);
    buf.extend_from_slice(a);
    buf.extend_from_slice(b);
    h(&buf)
}

/// Leaf hash of one key/value pair.
pub fn leaf_hash(key: &[u8], value: &[u8]) -> Hash32 {
    domain_hash(LEAF_DOMAIN, &h(key), &h(value))
}

fn hash_node(left: Hash32, right: Hash32) -> Hash32 {
    domain_hash(NODE_DOMAIN, &left, &right)
}

fn next_level(level: &[Hash32]) -> Vec<Hash32> {
    level
        .chunks(2)
        .map(|pair| {
            let l = pair[0];
            let r = pair.get(1).copied().unwrap_or(l);
            hash_node(l, r)
        })
        .collect()
}

/// Root over sorted (key, value) pairs. Empty input hashes to zero.
pub fn merkle_root_sorted(pairs: &[(Vec<u8>, Vec<u8>)]) -> Hash32 {
    if pairs.is_empty() {
        return [0u8; 32];
    }
    let mut level: Vec<Hash32> = pairs.iter().map(|(k, v)| leaf_hash(k, v)).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Inclusion proof for the pair at `index` (pairs must be sorted).
pub fn merkle_proof_sorted(pairs: &[(Vec<u8>, Vec<u8>)], index: usize) -> Option<MerkleProof> {
    if index >= pairs.len() {
        return None;
    }
    let mut level: Vec<Hash32> = pairs.iter().map(|(k, v)| leaf_hash(k, v)).collect();
    let leaf = level[index];
    let mut idx = index;
    let mut path = Vec::new();
    while level.len() > 1 {
        let is_right = idx % 2 == 1;
        let sibling = if is_right {
            level[idx - 1]
        } else {
            level.get(idx + 1).copied().unwrap_or(level[idx])
        };
        path.push(ProofItem {
            side: if is_right { Side::Left } else { Side::Right },
            sibling,
        });
        level = next_level(&level);
        idx /= 2;
    }
    Some(MerkleProof { leaf, path })
}

/// Verify proof against root.
pub fn verify_proof(root: Hash32, proof: &MerkleProof) -> bool {
    let cur = proof.path.iter().fold(proof.leaf, |cur, item| match item.side {
        Side::Left => hash_node(item.sibling, cur),
        Side::Right => hash_node(cur, item.sibling),
    });
    cur == root
}

/// Verify that `proof` commits `key = value` under `root`.
pub fn verify_pair(root: Hash32, key: &[u8], value: &[u8], proof: &MerkleProof) -> bool {
    proof.leaf == leaf_hash(key, value) && verify_proof(root, proof)
}
