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

//! sled-backed key-value store holding the ledger snapshot, with a
//! deterministic Merkle root and inclusion proofs over every pair.

use crate::core::state::merkle::{
    merkle_proof_sorted, merkle_root_sorted, verify_proof, Hash32, MerkleProof,
};
use sled::transaction::ConflictableTransactionError;
use std::path::Path;
use thiserror::Error;

/// State errors.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("db open")]
    DbOpen,
    #[error("db io")]
    DbIo,
    #[error("tx conflict")]
    TxConflict,
}

/// Write operation inside an atomic commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KvOp {
    /// Put key/value.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete key.
    Del { key: Vec<u8> },
}

/// Key/value pairs in ascending key order.
pub type SortedPairs = Vec<(Vec<u8>, Vec<u8>)>;

/// Persistent store handle.
#[derive(Clone)]
pub struct PersistentState {
    db: sled::Db,
}

impl PersistentState {
    /// Open (or create) the sled database in directory `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db = sled::open(path).map_err(|_| StateError::DbOpen)?;
        Ok(Self { db })
    }

    /// Get value.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        let v = self.db.get(key).map_err(|_| StateError::DbIo)?;
        Ok(v.map(|iv| iv.to_vec()))
    }

    /// All pairs whose key starts with `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<SortedPairs, StateError> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (k, v) = item.map_err(|_| StateError::DbIo)?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }

    /// Apply every op or none of them.
    pub fn commit_atomic(&self, ops: Vec<KvOp>) -> Result<(), StateError> {
        let res = self.db.transaction(|t| {
            for op in ops.iter() {
                match op {
                    KvOp::Put { key, value } => {
                        t.insert(key.as_slice(), value.as_slice())
                            .map_err(|_| ConflictableTransactionError::Abort(StateError::DbIo))?;
                    }
                    KvOp::Del { key } => {
                        t.remove(key.as_slice())
                            .map_err(|_| ConflictableTransactionError::Abort(StateError::DbIo))?;
                    }
                }
            }
            Ok(())
        });
        match res {
            Ok(()) => {}
            Err(sled::transaction::TransactionError::Abort(e)) => return Err(e),
            Err(sled::transaction::TransactionError::Storage(_)) => return Err(StateError::DbIo),
        }
        self.db.flush().map_err(|_| StateError::DbIo)?;
        Ok(())
    }

    fn sorted_pairs(&self) -> Result<SortedPairs, StateError> {
        // sled iterates in lexicographic key order already
        let mut pairs = Vec::new();
        for item in self.db.iter() {
            let (k, v) = item.map_err(|_| StateError::DbIo)?;
            pairs.push((k.to_vec(), v.to_vec()));
        }
        Ok(pairs)
    }

    /// Deterministic Merkle root over all pairs.
    pub fn state_root(&self) -> Result<Hash32, StateError> {
        Ok(merkle_root_sorted(&self.sorted_pairs()?))
    }

    /// Inclusion proof for `key`, if present: `(key, value, root, proof)`.
    pub fn prove_key(
        &self,
        key: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>, Hash32, MerkleProof)>, StateError> {
        let pairs = self.sorted_pairs()?;
        let Ok(i) = pairs.binary_search_by(|p| p.0.as_slice().cmp(key)) else {
            return Ok(None);
        };
        let root = merkle_root_sorted(&pairs);
        Ok(merkle_proof_sorted(&pairs, i)
            .map(|p| (pairs[i].0.clone(), pairs[i].1.clone(), root, p)))
    }

    /// Verify a Merkle proof.
    pub fn verify_proof(root: Hash32, proof: &MerkleProof) -> bool {
        verify_proof(root, proof)
    }
}
