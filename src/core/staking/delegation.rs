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

//! Delegation, unbonding and redelegation records.

use crate::core::math::{Amount, Dec};
use crate::core::staking::errors::StakingError;
use crate::core::staking::validator::Validator;
use crate::core::types::{AccAddress, BlockInfo, Timestamp, ValAddress};
use serde::{Deserialize, Serialize};

/// Shares held by a delegator in one validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Delegator.
    pub delegator: AccAddress,
    /// Validator.
    pub validator: ValAddress,
    /// Shares.
    pub shares: Dec,
}

/// Read-only view of a delegation exposed to other subsystems.
pub trait DelegationView {
    /// Delegator.
    fn delegator(&self) -> &AccAddress;
    /// Validator.
    fn validator(&self) -> &ValAddress;
    /// Shares.
    fn shares(&self) -> Dec;
}

impl Delegation {
    /// New delegation.
    pub fn new(delegator: AccAddress, validator: ValAddress, shares: Dec) -> Self {
        Self {
            delegator,
            validator,
            shares,
        }
    }
}

impl DelegationView for Delegation {
    fn delegator(&self) -> &AccAddress {
        &self.delegator
    }
    fn validator(&self) -> &ValAddress {
        &self.validator
    }
    fn shares(&self) -> Dec {
        self.shares
    }
}

/// One in-flight withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegationEntry {
    /// Height at which unbonding started.
    pub creation_height: u64,
    /// Time at which the tokens become spendable.
    pub completion_time: Timestamp,
    /// Tokens at creation.
    pub initial_balance: Amount,
    /// Tokens still owed (reduced by slashing).
    pub balance: Amount,
    /// Unbonding operation id.
    pub unbonding_id: u64,
    /// Holds placed by external modules.
    pub unbonding_on_hold_ref_count: u64,
}

impl UnbondingDelegationEntry {
    /// Completion time has passed.
    pub fn is_mature(&self, now: Timestamp) -> bool {
        self.completion_time <= now
    }

    /// Held by at least one external module.
    pub fn on_hold(&self) -> bool {
        self.unbonding_on_hold_ref_count > 0
    }
}

/// Withdrawals in flight for a (delegator, validator) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    /// Delegator.
    pub delegator: AccAddress,
    /// Validator.
    pub validator: ValAddress,
    /// Entries ordered by insertion.
    pub entries: Vec<UnbondingDelegationEntry>,
}

impl UnbondingDelegation {
    /// Empty record.
    pub fn new(delegator: AccAddress, validator: ValAddress) -> Self {
        Self {
            delegator,
            validator,
            entries: Vec::new(),
        }
    }

    /// Add tokens. An entry with the same creation height and completion
    /// time absorbs them; otherwise a new entry is appended. Returns true when
    /// a new entry was created.
    pub fn add_entry(
        &mut self,
        creation_height: u64,
        completion_time: Timestamp,
        balance: Amount,
        unbonding_id: u64,
    ) -> bool {
        if let Some(e) = self
            .entries
            .iter_mut()
            .find(|e| e.creation_height == creation_height && e.completion_time == completion_time)
        {
            e.balance = e.balance.saturating_add(balance);
            e.initial_balance = e.initial_balance.saturating_add(balance);
            return false;
        }
        self.entries.push(UnbondingDelegationEntry {
            creation_height,
            completion_time,
            initial_balance: balance,
            balance,
            unbonding_id,
            unbonding_on_hold_ref_count: 0,
        });
        true
    }

    /// Entry that `add_entry` would merge into, if any.
    pub fn merge_target(&self, creation_height: u64, completion_time: Timestamp) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.creation_height == creation_height && e.completion_time == completion_time)
    }

    /// Remove the entry at `i`.
    pub fn remove_entry(&mut self, i: usize) {
        self.entries.remove(i);
    }
}

/// One in-flight redelegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedelegationEntry {
    /// Height at which the redelegation started.
    pub creation_height: u64,
    /// Time at which the entry stops counting for slashing and transitivity.
    pub completion_time: Timestamp,
    /// Tokens moved at creation.
    pub initial_balance: Amount,
    /// Destination shares still attributable to this entry.
    pub shares_dst: Dec,
    /// Unbonding operation id.
    pub unbonding_id: u64,
    /// Holds placed by external modules.
    pub unbonding_on_hold_ref_count: u64,
}

impl RedelegationEntry {
    /// Completion time has passed.
    pub fn is_mature(&self, now: Timestamp) -> bool {
        self.completion_time <= now
    }

    /// Held by at least one external module.
    pub fn on_hold(&self) -> bool {
        self.unbonding_on_hold_ref_count > 0
    }
}

/// Redelegations for a (delegator, src, dst) triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redelegation {
    /// Delegator.
    pub delegator: AccAddress,
    /// Source validator.
    pub validator_src: ValAddress,
    /// Destination validator.
    pub validator_dst: ValAddress,
    /// Entries ordered by insertion.
    pub entries: Vec<RedelegationEntry>,
}

impl Redelegation {
    /// Empty record.
    pub fn new(delegator: AccAddress, validator_src: ValAddress, validator_dst: ValAddress) -> Self {
        Self {
            delegator,
            validator_src,
            validator_dst,
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    pub fn add_entry(
        &mut self,
        creation_height: u64,
        completion_time: Timestamp,
        initial_balance: Amount,
        shares_dst: Dec,
        unbonding_id: u64,
    ) {
        self.entries.push(RedelegationEntry {
            creation_height,
            completion_time,
            initial_balance,
            shares_dst,
            unbonding_id,
            unbonding_on_hold_ref_count: 0,
        });
    }

    /// Remove the entry at `i`.
    pub fn remove_entry(&mut self, i: usize) {
        self.entries.remove(i);
    }
}

/// (delegator, validator) pair stored in the unbonding queue.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DvPair {
    /// Delegator.
    pub delegator: AccAddress,
    /// Validator.
    pub validator: ValAddress,
}

/// (delegator, src, dst) triple stored in the redelegation queue.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DvvTriplet {
    /// Delegator.
    pub delegator: AccAddress,
    /// Source validator.
    pub validator_src: ValAddress,
    /// Destination validator.
    pub validator_dst: ValAddress,
}

/// What an unbonding id refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnbondingRef {
    /// An unbonding delegation entry.
    UnbondingDelegation(DvPair),
    /// A redelegation entry.
    Redelegation(DvvTriplet),
    /// A validator's own unbonding period.
    ValidatorUnbonding(ValAddress),
}

/// Record type tag of an unbonding id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnbondingType {
    /// Unbonding delegation entry.
    UnbondingDelegation,
    /// Redelegation entry.
    Redelegation,
    /// Validator unbonding.
    ValidatorUnbonding,
}

impl UnbondingRef {
    /// Type tag.
    pub fn kind(&self) -> UnbondingType {
        match self {
            UnbondingRef::UnbondingDelegation(_) => UnbondingType::UnbondingDelegation,
            UnbondingRef::Redelegation(_) => UnbondingType::Redelegation,
            UnbondingRef::ValidatorUnbonding(_) => UnbondingType::ValidatorUnbonding,
        }
    }
}

/// Header and bonded set at some height, for light-client style lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalInfo {
    /// Block header.
    pub header: BlockInfo,
    /// Bonded validators sorted by power.
    pub valset: Vec<Validator>,
}

impl HistoricalInfo {
    /// Build and validate.
    pub fn new(header: BlockInfo, valset: Vec<Validator>) -> Result<Self, StakingError> {
        let hi = Self { header, valset };
        hi.validate()?;
        Ok(hi)
    }

    /// The validator set may not be empty.
    pub fn validate(&self) -> Result<(), StakingError> {
        if self.valset.is_empty() {
            return Err(StakingError::InvalidHistoricalInfo);
        }
        Ok(())
    }
}
