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

//! Typed in-memory mirror of the staking keyspaces.
//!
//! Every map corresponds to one key prefix in `keys`. Secondary indices
//! (consensus address, power ranking, by-validator/by-src/by-dst, unbonding
//! type) are maintained alongside the primary records and re-derived on load.
//! The snapshot is written to `PersistentState` as prefix-keyed canonical
//! bincode values in one atomic commit.

use crate::core::math::{Dec, MathError};
use crate::core::staking::delegation::{
    Delegation, DvPair, DvvTriplet, HistoricalInfo, Redelegation, UnbondingDelegation,
    UnbondingRef, UnbondingType,
};
use crate::core::staking::keys;
use crate::core::staking::params::Params;
use crate::core::staking::validator::Validator;
use crate::core::state::merkle::Hash32;
use crate::core::state::persistent_state::{KvOp, PersistentState, StateError};
use crate::core::types::{
    decode_canonical_limited, encode_canonical, AccAddress, CodecError, ConsAddress, Timestamp,
    ValAddress,
};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

const MAX_VALUE_BYTES: usize = 16 * 1024 * 1024;

/// Snapshot persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state: {0}")]
    State(#[from] StateError),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    #[error("malformed {0} key")]
    Key(&'static str),
}

/// (delegator, validator).
pub type DelegationKey = (AccAddress, ValAddress);
/// (delegator, src, dst).
pub type RedelegationKey = (AccAddress, ValAddress, ValAddress);

/// The whole staking ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StakingState {
    /// Params singleton.
    pub params: Params,
    /// Validators by operator.
    pub validators: BTreeMap<ValAddress, Validator>,
    /// Operator by consensus address.
    pub validators_by_cons: BTreeMap<ConsAddress, ValAddress>,
    /// Power ranking key to operator. Jailed validators are never indexed.
    pub power_index: BTreeMap<Vec<u8>, ValAddress>,
    /// Power recorded at the last validator set update.
    pub last_validator_powers: BTreeMap<ValAddress, u64>,
    /// Sum of `last_validator_powers`.
    pub last_total_power: u128,
    /// Delegations.
    pub delegations: BTreeMap<DelegationKey, Delegation>,
    /// Unbonding delegations.
    pub unbonding_delegations: BTreeMap<DelegationKey, UnbondingDelegation>,
    /// (validator, delegator) index over `unbonding_delegations`.
    pub ubd_by_validator: BTreeSet<(ValAddress, AccAddress)>,
    /// Redelegations.
    pub redelegations: BTreeMap<RedelegationKey, Redelegation>,
    /// (src, delegator, dst) index over `redelegations`.
    pub red_by_src: BTreeSet<(ValAddress, AccAddress, ValAddress)>,
    /// (dst, delegator, src) index over `redelegations`.
    pub red_by_dst: BTreeSet<(ValAddress, AccAddress, ValAddress)>,
    /// Unbonding delegation maturity queue.
    pub ubd_queue: BTreeMap<Timestamp, Vec<DvPair>>,
    /// Redelegation maturity queue.
    pub red_queue: BTreeMap<Timestamp, Vec<DvvTriplet>>,
    /// Validator maturity queue keyed by (unbonding time, unbonding height).
    pub validator_queue: BTreeMap<(Timestamp, u64), Vec<ValAddress>>,
    /// Last issued unbonding id.
    pub unbonding_id: u64,
    /// Unbonding id to owning record.
    pub unbonding_index: BTreeMap<u64, UnbondingRef>,
    /// Historical info by height.
    pub historical_info: BTreeMap<u64, HistoricalInfo>,
}

impl StakingState {
    /// Empty ledger with `params`.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    // ---- validators ----

    /// Store a validator record.
    pub fn set_validator(&mut self, v: Validator) {
        self.validators.insert(v.operator.clone(), v);
    }

    /// Index a validator by consensus address.
    pub fn set_validator_by_cons(&mut self, v: &Validator) {
        self.validators_by_cons
            .insert(v.cons_address(), v.operator.clone());
    }

    /// Index a validator by power. Jailed validators are skipped.
    pub fn set_power_index(&mut self, v: &Validator) {
        if v.jailed {
            return;
        }
        self.power_index
            .insert(v.power_index_key(self.params.power_reduction), v.operator.clone());
    }

    /// Drop a validator's power index entry for its current tokens.
    pub fn delete_power_index(&mut self, v: &Validator) {
        self.power_index
            .remove(&v.power_index_key(self.params.power_reduction));
    }

    /// Add a validator to the maturity queue at its unbonding (time, height).
    pub fn insert_validator_queue(&mut self, v: &Validator) {
        let slot = self
            .validator_queue
            .entry((v.unbonding_time, v.unbonding_height))
            .or_default();
        if !slot.contains(&v.operator) {
            slot.push(v.operator.clone());
        }
    }

    /// Remove a validator from the maturity queue.
    pub fn delete_validator_queue(&mut self, v: &Validator) {
        let k = (v.unbonding_time, v.unbonding_height);
        if let Some(slot) = self.validator_queue.get_mut(&k) {
            slot.retain(|a| a != &v.operator);
            if slot.is_empty() {
                self.validator_queue.remove(&k);
            }
        }
    }

    // ---- delegations ----

    /// Delegation lookup.
    pub fn delegation(&self, del: &AccAddress, val: &ValAddress) -> Option<&Delegation> {
        self.delegations.get(&(del.clone(), val.clone()))
    }

    /// Store a delegation.
    pub fn set_delegation(&mut self, d: Delegation) {
        self.delegations
            .insert((d.delegator.clone(), d.validator.clone()), d);
    }

    /// Delete a delegation.
    pub fn remove_delegation(&mut self, del: &AccAddress, val: &ValAddress) {
        self.delegations.remove(&(del.clone(), val.clone()));
    }

    /// Σ shares of all delegations to `val`.
    pub fn delegation_shares_of(&self, val: &ValAddress) -> Result<Dec, MathError> {
        self.delegations
            .values()
            .filter(|d| &d.validator == val)
            .try_fold(Dec::zero(), |acc, d| acc.checked_add(d.shares))
    }

    // ---- unbonding delegations ----

    /// Unbonding delegation lookup.
    pub fn ubd(&self, del: &AccAddress, val: &ValAddress) -> Option<&UnbondingDelegation> {
        self.unbonding_delegations.get(&(del.clone(), val.clone()))
    }

    /// Store an unbonding delegation; an empty record is deleted instead.
    pub fn set_ubd(&mut self, ubd: UnbondingDelegation) {
        if ubd.entries.is_empty() {
            self.remove_ubd(&ubd.delegator, &ubd.validator);
            return;
        }
        self.ubd_by_validator
            .insert((ubd.validator.clone(), ubd.delegator.clone()));
        self.unbonding_delegations
            .insert((ubd.delegator.clone(), ubd.validator.clone()), ubd);
    }

    /// Delete an unbonding delegation and its index.
    pub fn remove_ubd(&mut self, del: &AccAddress, val: &ValAddress) {
        self.unbonding_delegations
            .remove(&(del.clone(), val.clone()));
        self.ubd_by_validator.remove(&(val.clone(), del.clone()));
    }

    /// Unbonding delegations from validator `val`.
    pub fn ubds_from_validator(&self, val: &ValAddress) -> Vec<&UnbondingDelegation> {
        self.ubd_by_validator
            .range((val.clone(), AccAddress(Vec::new()))..)
            .take_while(|(v, _)| v == val)
            .filter_map(|(v, d)| self.ubd(d, v))
            .collect()
    }

    /// Queue a pair for maturity at `time`.
    pub fn insert_ubd_queue(&mut self, time: Timestamp, pair: DvPair) {
        let slot = self.ubd_queue.entry(time).or_default();
        if !slot.contains(&pair) {
            slot.push(pair);
        }
    }

    /// Remove and return every pair queued at or before `now`.
    pub fn dequeue_mature_ubds(&mut self, now: Timestamp) -> Vec<DvPair> {
        let mut out = Vec::new();
        while let Some(e) = self.ubd_queue.first_entry() {
            if *e.key() > now {
                break;
            }
            out.extend(e.remove());
        }
        out
    }

    // ---- redelegations ----

    /// Redelegation lookup.
    pub fn red(
        &self,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> Option<&Redelegation> {
        self.redelegations
            .get(&(del.clone(), src.clone(), dst.clone()))
    }

    /// Store a redelegation; an empty record is deleted instead.
    pub fn set_red(&mut self, red: Redelegation) {
        let (del, src, dst) = (
            red.delegator.clone(),
            red.validator_src.clone(),
            red.validator_dst.clone(),
        );
        if red.entries.is_empty() {
            self.remove_red(&del, &src, &dst);
            return;
        }
        self.red_by_src
            .insert((src.clone(), del.clone(), dst.clone()));
        self.red_by_dst
            .insert((dst.clone(), del.clone(), src.clone()));
        self.redelegations.insert((del, src, dst), red);
    }

    /// Delete a redelegation and its indices.
    pub fn remove_red(&mut self, del: &AccAddress, src: &ValAddress, dst: &ValAddress) {
        self.redelegations
            .remove(&(del.clone(), src.clone(), dst.clone()));
        self.red_by_src
            .remove(&(src.clone(), del.clone(), dst.clone()));
        self.red_by_dst
            .remove(&(dst.clone(), del.clone(), src.clone()));
    }

    /// Redelegations out of `src`.
    pub fn reds_from_src(&self, src: &ValAddress) -> Vec<&Redelegation> {
        self.red_by_src
            .range((src.clone(), AccAddress(Vec::new()), ValAddress(Vec::new()))..)
            .take_while(|(s, _, _)| s == src)
            .filter_map(|(s, d, dst)| self.red(d, s, dst))
            .collect()
    }

    /// Redelegations by `del` into `dst`.
    pub fn reds_into(&self, del: &AccAddress, dst: &ValAddress) -> Vec<&Redelegation> {
        self.red_by_dst
            .range((dst.clone(), del.clone(), ValAddress(Vec::new()))..)
            .take_while(|(d, a, _)| d == dst && a == del)
            .filter_map(|(d, a, src)| self.red(a, src, d))
            .collect()
    }

    /// Queue a triplet for maturity at `time`.
    pub fn insert_red_queue(&mut self, time: Timestamp, t: DvvTriplet) {
        let slot = self.red_queue.entry(time).or_default();
        if !slot.contains(&t) {
            slot.push(t);
        }
    }

    /// Remove and return every triplet queued at or before `now`.
    pub fn dequeue_mature_reds(&mut self, now: Timestamp) -> Vec<DvvTriplet> {
        let mut out = Vec::new();
        while let Some(e) = self.red_queue.first_entry() {
            if *e.key() > now {
                break;
            }
            out.extend(e.remove());
        }
        out
    }

    // ---- unbonding ids ----

    /// Issue the next unbonding id (starting at 1) and index it.
    pub fn next_unbonding_id(&mut self, owner: UnbondingRef) -> u64 {
        self.unbonding_id = self.unbonding_id.saturating_add(1);
        self.unbonding_index.insert(self.unbonding_id, owner);
        self.unbonding_id
    }

    // ---- snapshot ----

    /// Canonical key/value pairs for every keyspace, sorted by key.
    pub fn to_pairs(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CodecError> {
        let mut kv: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        kv.insert(vec![keys::PARAMS], encode_canonical(&self.params)?);
        kv.insert(
            vec![keys::LAST_TOTAL_POWER],
            encode_canonical(&self.last_total_power)?,
        );
        kv.insert(vec![keys::UNBONDING_ID], encode_canonical(&self.unbonding_id)?);

        for (op, v) in &self.validators {
            kv.insert(keys::validator_key(op), encode_canonical(v)?);
        }
        for (cons, op) in &self.validators_by_cons {
            kv.insert(keys::validator_by_cons_addr_key(cons), encode_canonical(op)?);
        }
        for (k, op) in &self.power_index {
            kv.insert(k.clone(), encode_canonical(op)?);
        }
        for (op, p) in &self.last_validator_powers {
            kv.insert(keys::last_validator_power_key(op), encode_canonical(p)?);
        }
        for ((del, val), d) in &self.delegations {
            kv.insert(keys::delegation_key(del, val), encode_canonical(d)?);
        }
        for ((del, val), u) in &self.unbonding_delegations {
            kv.insert(keys::ubd_key(del, val), encode_canonical(u)?);
        }
        for (val, del) in &self.ubd_by_validator {
            kv.insert(keys::ubd_by_val_index_key(del, val), Vec::new());
        }
        for ((del, src, dst), r) in &self.redelegations {
            kv.insert(keys::red_key(del, src, dst), encode_canonical(r)?);
        }
        for (src, del, dst) in &self.red_by_src {
            kv.insert(keys::red_by_src_index_key(del, src, dst), Vec::new());
        }
        for (dst, del, src) in &self.red_by_dst {
            kv.insert(keys::red_by_dst_index_key(del, src, dst), Vec::new());
        }
        for (t, pairs) in &self.ubd_queue {
            kv.insert(keys::time_queue_key(keys::UBD_QUEUE, *t), encode_canonical(pairs)?);
        }
        for (t, trips) in &self.red_queue {
            kv.insert(
                keys::time_queue_key(keys::REDELEGATION_QUEUE, *t),
                encode_canonical(trips)?,
            );
        }
        for ((t, h), vals) in &self.validator_queue {
            kv.insert(keys::validator_queue_key(*t, *h), encode_canonical(vals)?);
        }
        for (id, r) in &self.unbonding_index {
            kv.insert(keys::unbonding_index_key(*id), encode_canonical(r)?);
            kv.insert(keys::unbonding_type_key(*id), encode_canonical(&r.kind())?);
        }
        for (h, hi) in &self.historical_info {
            kv.insert(keys::historical_info_key(*h), encode_canonical(hi)?);
        }
        Ok(kv.into_iter().collect())
    }

    /// Write the snapshot, deleting staking keys that no longer exist, and
    /// return the new state root.
    pub fn commit(&self, store: &PersistentState) -> Result<Hash32, StoreError> {
        let pairs = self.to_pairs()?;
        let wanted: BTreeSet<&[u8]> = pairs.iter().map(|(k, _)| k.as_slice()).collect();
        let mut ops = Vec::new();
        for p in keys::ALL_PREFIXES {
            for (k, _) in store.scan_prefix(&[p])? {
                if !wanted.contains(k.as_slice()) {
                    ops.push(KvOp::Del { key: k });
                }
            }
        }
        for (key, value) in pairs {
            ops.push(KvOp::Put { key, value });
        }
        store.commit_atomic(ops)?;
        Ok(store.state_root()?)
    }

    /// Rebuild the ledger from a committed snapshot.
    pub fn load(store: &PersistentState) -> Result<Self, StoreError> {
        let mut s = StakingState::default();
        if let Some(b) = store.get(&[keys::PARAMS])? {
            s.params = decode(&b)?;
        }
        if let Some(b) = store.get(&[keys::LAST_TOTAL_POWER])? {
            s.last_total_power = decode(&b)?;
        }
        if let Some(b) = store.get(&[keys::UNBONDING_ID])? {
            s.unbonding_id = decode(&b)?;
        }

        for (_, b) in store.scan_prefix(&[keys::VALIDATORS])? {
            let v: Validator = decode(&b)?;
            s.set_validator_by_cons(&v);
            s.set_power_index(&v);
            s.set_validator(v);
        }
        for (k, b) in store.scan_prefix(&[keys::LAST_VALIDATOR_POWER])? {
            let comps = keys::split_components(&k).ok_or(StoreError::Key("last power"))?;
            let op = comps.first().ok_or(StoreError::Key("last power"))?;
            s.last_validator_powers
                .insert(ValAddress(op.to_vec()), decode(&b)?);
        }
        for (_, b) in store.scan_prefix(&[keys::DELEGATIONS])? {
            s.set_delegation(decode(&b)?);
        }
        for (_, b) in store.scan_prefix(&[keys::UNBONDING_DELEGATIONS])? {
            s.set_ubd(decode(&b)?);
        }
        for (_, b) in store.scan_prefix(&[keys::REDELEGATIONS])? {
            s.set_red(decode(&b)?);
        }
        for (k, b) in store.scan_prefix(&[keys::UBD_QUEUE])? {
            let t = keys::read_u64_be(&k, 1).ok_or(StoreError::Key("unbonding queue"))?;
            s.ubd_queue.insert(t, decode(&b)?);
        }
        for (k, b) in store.scan_prefix(&[keys::REDELEGATION_QUEUE])? {
            let t = keys::read_u64_be(&k, 1).ok_or(StoreError::Key("redelegation queue"))?;
            s.red_queue.insert(t, decode(&b)?);
        }
        for (k, b) in store.scan_prefix(&[keys::VALIDATOR_QUEUE])? {
            let t = keys::read_u64_be(&k, 1).ok_or(StoreError::Key("validator queue"))?;
            let h = keys::read_u64_be(&k, 9).ok_or(StoreError::Key("validator queue"))?;
            s.validator_queue.insert((t, h), decode(&b)?);
        }
        for (k, b) in store.scan_prefix(&[keys::UNBONDING_INDEX])? {
            let id = keys::read_u64_be(&k, 1).ok_or(StoreError::Key("unbonding index"))?;
            s.unbonding_index.insert(id, decode(&b)?);
        }
        for (k, b) in store.scan_prefix(&[keys::HISTORICAL_INFO])? {
            let h = keys::read_u64_be(&k, 1).ok_or(StoreError::Key("historical info"))?;
            s.historical_info.insert(h, decode(&b)?);
        }
        Ok(s)
    }

    /// Type tag recorded for an unbonding id.
    pub fn unbonding_type(&self, id: u64) -> Option<UnbondingType> {
        self.unbonding_index.get(&id).map(UnbondingRef::kind)
    }
}

fn decode<T: DeserializeOwned>(b: &[u8]) -> Result<T, CodecError> {
    decode_canonical_limited(b, MAX_VALUE_BYTES)
}
