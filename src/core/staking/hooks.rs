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

//! Lifecycle hooks other subsystems subscribe to.

use crate::core::math::Dec;
use crate::core::staking::errors::StakingError;
use crate::core::types::{AccAddress, ConsAddress, ValAddress};

/// Hook result.
pub type HookResult = Result<(), StakingError>;

/// Staking lifecycle hooks. Every method defaults to a no-op.
pub trait StakingHooks {
    /// A validator was created.
    fn after_validator_created(&mut self, _val: &ValAddress) -> HookResult {
        Ok(())
    }
    /// A validator is about to be modified.
    fn before_validator_modified(&mut self, _val: &ValAddress) -> HookResult {
        Ok(())
    }
    /// A validator was removed.
    fn after_validator_removed(&mut self, _cons: &ConsAddress, _val: &ValAddress) -> HookResult {
        Ok(())
    }
    /// A validator entered the bonded set.
    fn after_validator_bonded(&mut self, _cons: &ConsAddress, _val: &ValAddress) -> HookResult {
        Ok(())
    }
    /// A validator left the bonded set.
    fn after_validator_begin_unbonding(
        &mut self,
        _cons: &ConsAddress,
        _val: &ValAddress,
    ) -> HookResult {
        Ok(())
    }
    /// A new delegation is about to be created.
    fn before_delegation_created(&mut self, _del: &AccAddress, _val: &ValAddress) -> HookResult {
        Ok(())
    }
    /// Delegation shares are about to change.
    fn before_delegation_shares_modified(
        &mut self,
        _del: &AccAddress,
        _val: &ValAddress,
    ) -> HookResult {
        Ok(())
    }
    /// A delegation is about to be removed.
    fn before_delegation_removed(&mut self, _del: &AccAddress, _val: &ValAddress) -> HookResult {
        Ok(())
    }
    /// A delegation was created or modified.
    fn after_delegation_modified(&mut self, _del: &AccAddress, _val: &ValAddress) -> HookResult {
        Ok(())
    }
    /// A validator is about to be slashed by `fraction` of its tokens.
    fn before_validator_slashed(&mut self, _val: &ValAddress, _fraction: Dec) -> HookResult {
        Ok(())
    }
    /// An unbonding operation got id `id`.
    fn after_unbonding_initiated(&mut self, _id: u64) -> HookResult {
        Ok(())
    }
}

/// Ordered subscriber list. Dispatch stops at the first error.
#[derive(Default)]
pub struct MultiStakingHooks {
    hooks: Vec<Box<dyn StakingHooks>>,
}

impl MultiStakingHooks {
    /// Empty list.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Append a subscriber; dispatch follows insertion order.
    pub fn push(&mut self, h: Box<dyn StakingHooks>) {
        self.hooks.push(h);
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// No subscribers.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn each(&mut self, mut f: impl FnMut(&mut dyn StakingHooks) -> HookResult) -> HookResult {
        for h in self.hooks.iter_mut() {
            f(h.as_mut())?;
        }
        Ok(())
    }
}

impl StakingHooks for MultiStakingHooks {
    fn after_validator_created(&mut self, val: &ValAddress) -> HookResult {
        self.each(|h| h.after_validator_created(val))
    }
    fn before_validator_modified(&mut self, val: &ValAddress) -> HookResult {
        self.each(|h| h.before_validator_modified(val))
    }
    fn after_validator_removed(&mut self, cons: &ConsAddress, val: &ValAddress) -> HookResult {
        self.each(|h| h.after_validator_removed(cons, val))
    }
    fn after_validator_bonded(&mut self, cons: &ConsAddress, val: &ValAddress) -> HookResult {
        self.each(|h| h.after_validator_bonded(cons, val))
    }
    fn after_validator_begin_unbonding(
        &mut self,
        cons: &ConsAddress,
        val: &ValAddress,
    ) -> HookResult {
        self.each(|h| h.after_validator_begin_unbonding(cons, val))
    }
    fn before_delegation_created(&mut self, del: &AccAddress, val: &ValAddress) -> HookResult {
        self.each(|h| h.before_delegation_created(del, val))
    }
    fn before_delegation_shares_modified(
        &mut self,
        del: &AccAddress,
        val: &ValAddress,
    ) -> HookResult {
        self.each(|h| h.before_delegation_shares_modified(del, val))
    }
    fn before_delegation_removed(&mut self, del: &AccAddress, val: &ValAddress) -> HookResult {
        self.each(|h| h.before_delegation_removed(del, val))
    }
    fn after_delegation_modified(&mut self, del: &AccAddress, val: &ValAddress) -> HookResult {
        self.each(|h| h.after_delegation_modified(del, val))
    }
    fn before_validator_slashed(&mut self, val: &ValAddress, fraction: Dec) -> HookResult {
        self.each(|h| h.before_validator_slashed(val, fraction))
    }
    fn after_unbonding_initiated(&mut self, id: u64) -> HookResult {
        self.each(|h| h.after_unbonding_initiated(id))
    }
}
