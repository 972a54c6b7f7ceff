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

//! Delegation ledger: delegate, unbond, undelegate, cancel.

use super::Keeper;
use crate::core::math::{Amount, Dec};
use crate::core::staking::delegation::{Delegation, DvPair, UnbondingDelegation, UnbondingRef};
use crate::core::staking::errors::{ExecResult, LedgerFault, StakingError};
use crate::core::staking::expected::{BankKeeper, BONDED_POOL, NOT_BONDED_POOL};
use crate::core::staking::hooks::StakingHooks;
use crate::core::staking::msg::require_addr;
use crate::core::staking::validator::{BondStatus, ShareRounding};
use crate::core::types::{AccAddress, Timestamp, ValAddress};
use tracing::debug;

fn pool_fault(pool: &'static str) -> impl FnOnce(StakingError) -> LedgerFault {
    move |e| LedgerFault::Pool {
        pool,
        detail: e.to_string(),
    }
}

impl<B: BankKeeper> Keeper<B> {
    pub(crate) fn bonded_tokens_to_not_bonded(&mut self, amount: Amount) -> ExecResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.bank
            .send_coins_from_module_to_module(BONDED_POOL, NOT_BONDED_POOL, amount)
            .map_err(pool_fault(BONDED_POOL))?;
        Ok(())
    }

    pub(crate) fn not_bonded_tokens_to_bonded(&mut self, amount: Amount) -> ExecResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.bank
            .send_coins_from_module_to_module(NOT_BONDED_POOL, BONDED_POOL, amount)
            .map_err(pool_fault(NOT_BONDED_POOL))?;
        Ok(())
    }

    pub(crate) fn burn(&mut self, pool: &'static str, amount: Amount) -> ExecResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.bank.burn_coins(pool, amount).map_err(pool_fault(pool))?;
        Ok(())
    }

    /// Delegate `amount` tokens to `val` and return the shares issued.
    ///
    /// With `subtract_account` the tokens come from the delegator's spendable
    /// balance; otherwise they are already held by the pool matching
    /// `token_src` and only move between pools when the status differs.
    pub fn delegate(
        &mut self,
        del: &AccAddress,
        amount: Amount,
        token_src: BondStatus,
        val: &ValAddress,
        subtract_account: bool,
    ) -> ExecResult<Dec> {
        self.delegate_with(del, amount, token_src, val, subtract_account, ShareRounding::HalfEven)
    }

    pub(crate) fn delegate_with(
        &mut self,
        del: &AccAddress,
        amount: Amount,
        token_src: BondStatus,
        val: &ValAddress,
        subtract_account: bool,
        rounding: ShareRounding,
    ) -> ExecResult<Dec> {
        require_addr(del.as_bytes(), "delegator")?;
        let v = self
            .state
            .validators
            .get(val)
            .cloned()
            .ok_or(StakingError::NoValidatorFound)?;
        if v.invalid_ex_rate() {
            return Err(StakingError::DelegatorShareExRateInvalid.into());
        }

        if subtract_account {
            if token_src == BondStatus::Bonded {
                return Err(LedgerFault::Invariant(
                    "delegation token source cannot be bonded".into(),
                )
                .into());
            }
            let pool = if v.is_bonded() {
                BONDED_POOL
            } else {
                NOT_BONDED_POOL
            };
            self.bank
                .delegate_coins_from_account_to_module(del, pool, amount)?;
        } else {
            match (token_src == BondStatus::Bonded, v.is_bonded()) {
                (false, true) => self.not_bonded_tokens_to_bonded(amount)?,
                (true, false) => self.bonded_tokens_to_not_bonded(amount)?,
                _ => {}
            }
        }

        let existing = self.state.delegation(del, val).cloned();
        match existing {
            None => self.hooks.before_delegation_created(del, val)?,
            Some(_) => self.hooks.before_delegation_shares_modified(del, val)?,
        }
        let mut d = existing.unwrap_or_else(|| Delegation::new(del.clone(), val.clone(), Dec::zero()));

        let issued = self.add_validator_tokens_and_shares(val, amount, rounding)?;
        d.shares = d.shares.checked_add(issued)?;
        self.state.set_delegation(d);
        self.consume(self.costs.per_write, "delegate");
        debug!(delegator = %del, validator = %val, amount, shares = %issued, "delegated");
        self.hooks.after_delegation_modified(del, val)?;
        Ok(issued)
    }

    /// Remove `shares` from a delegation and from the validator, returning
    /// the tokens released. The caller decides where the tokens go.
    pub fn unbond(&mut self, del: &AccAddress, val: &ValAddress, shares: Dec) -> ExecResult<Amount> {
        let mut d = self
            .state
            .delegation(del, val)
            .cloned()
            .ok_or(StakingError::NoDelegation)?;
        if d.shares < shares {
            return Err(StakingError::InsufficientShares.into());
        }
        let v = self
            .state
            .validators
            .get(val)
            .cloned()
            .ok_or(StakingError::NoValidatorFound)?;

        self.hooks.before_delegation_shares_modified(del, val)?;
        d.shares = d.shares.checked_sub(shares)?;

        let is_operator = del.as_bytes() == val.as_bytes();
        if is_operator
            && !v.jailed
            && v.tokens_from_shares(d.shares)?.truncate_int()? < v.min_self_delegation
        {
            self.jail_validator(val)?;
        }

        if d.shares.is_zero() {
            self.hooks.before_delegation_removed(del, val)?;
            self.state.remove_delegation(del, val);
        } else {
            self.state.set_delegation(d);
            self.hooks.after_delegation_modified(del, val)?;
        }

        let released = self.remove_validator_tokens_and_shares(val, shares)?;
        let v = self.must_get_validator(val)?;
        if v.delegator_shares.is_zero() && v.is_unbonded() {
            self.remove_validator(val)?;
        }
        Ok(released)
    }

    /// Convert a token amount into the shares to unbond from a delegation.
    ///
    /// Rejects amounts whose truncated share value exceeds the delegation;
    /// the exact value is capped at the delegation so a full withdrawal is
    /// always possible despite rounding.
    pub fn validate_unbond_amount(
        &self,
        del: &AccAddress,
        val: &ValAddress,
        amount: Amount,
    ) -> ExecResult<Dec> {
        let v = self
            .state
            .validators
            .get(val)
            .ok_or(StakingError::NoValidatorFound)?;
        let d = self
            .state
            .delegation(del, val)
            .ok_or(StakingError::NoDelegation)?;
        if v.tokens == 0 {
            return Err(StakingError::DelegationValidatorEmpty.into());
        }
        let shares = v.shares_from_tokens(amount)?;
        let truncated = v.shares_from_tokens_truncated(amount)?;
        if truncated > d.shares {
            return Err(StakingError::BadSharesAmount.into());
        }
        Ok(shares.min(d.shares))
    }

    fn has_max_ubd_entries(&self, del: &AccAddress, val: &ValAddress) -> bool {
        let max = self.state.params.max_entries as usize;
        self.state
            .ubd(del, val)
            .map(|u| u.entries.len() >= max)
            .unwrap_or(false)
    }

    /// Add tokens to the unbonding record of (del, val), merging into an
    /// entry with the same creation height and completion time. A new
    /// entry gets a fresh unbonding id.
    pub(crate) fn set_unbonding_delegation_entry(
        &mut self,
        del: &AccAddress,
        val: &ValAddress,
        creation_height: u64,
        completion: Timestamp,
        balance: Amount,
    ) -> ExecResult<()> {
        let mut ubd = self
            .state
            .ubd(del, val)
            .cloned()
            .unwrap_or_else(|| UnbondingDelegation::new(del.clone(), val.clone()));
        let new_id = match ubd.merge_target(creation_height, completion) {
            Some(_) => None,
            None => Some(self.state.next_unbonding_id(UnbondingRef::UnbondingDelegation(
                DvPair {
                    delegator: del.clone(),
                    validator: val.clone(),
                },
            ))),
        };
        ubd.add_entry(creation_height, completion, balance, new_id.unwrap_or(0));
        self.state.set_ubd(ubd);
        if let Some(id) = new_id {
            self.hooks.after_unbonding_initiated(id)?;
        }
        Ok(())
    }

    /// Withdraw `shares` from (del, val) into an unbonding entry maturing
    /// one unbonding period from now. Returns (completion time, amount).
    pub fn undelegate(
        &mut self,
        del: &AccAddress,
        val: &ValAddress,
        shares: Dec,
    ) -> ExecResult<(Timestamp, Amount)> {
        let v = self
            .state
            .validators
            .get(val)
            .cloned()
            .ok_or(StakingError::NoValidatorFound)?;
        let completion = self
            .now()
            .saturating_add(self.state.params.unbonding_time_secs);
        let height = self.height();
        if self.has_max_ubd_entries(del, val)
            && self
                .state
                .ubd(del, val)
                .and_then(|u| u.merge_target(height, completion))
                .is_none()
        {
            return Err(StakingError::MaxUnbondingDelegationEntries.into());
        }

        let amount = self.unbond(del, val, shares)?;
        if v.is_bonded() {
            self.bonded_tokens_to_not_bonded(amount)?;
        }
        self.set_unbonding_delegation_entry(del, val, height, completion, amount)?;
        self.state.insert_ubd_queue(
            completion,
            DvPair {
                delegator: del.clone(),
                validator: val.clone(),
            },
        );
        self.consume(self.costs.per_write, "undelegate");
        debug!(delegator = %del, validator = %val, amount, completion, "undelegation started");
        Ok((completion, amount))
    }

    /// Return `amount` of the unbonding entry created at `creation_height`
    /// to the validator as a fresh delegation.
    pub fn cancel_unbonding_delegation(
        &mut self,
        del: &AccAddress,
        val: &ValAddress,
        creation_height: u64,
        amount: Amount,
    ) -> ExecResult<()> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount.into());
        }
        let v = self
            .state
            .validators
            .get(val)
            .ok_or(StakingError::NoValidatorFound)?;
        if v.invalid_ex_rate() {
            return Err(StakingError::DelegatorShareExRateInvalid.into());
        }
        if v.jailed {
            return Err(StakingError::ValidatorJailed.into());
        }
        let mut ubd = self
            .state
            .ubd(del, val)
            .cloned()
            .ok_or(StakingError::NoUnbondingDelegation)?;
        let i = ubd
            .entries
            .iter()
            .position(|e| e.creation_height == creation_height)
            .ok_or(StakingError::NoUnbondingDelegation)?;
        let entry = ubd.entries[i].clone();
        if entry.balance < amount {
            return Err(StakingError::UnbondingEntryBalanceExceeded.into());
        }
        if entry.completion_time < self.now() {
            return Err(StakingError::UnbondingEntryAlreadyProcessed.into());
        }

        self.delegate(del, amount, BondStatus::Unbonding, val, false)?;

        let left = entry.balance - amount;
        if left == 0 {
            ubd.remove_entry(i);
            self.state.unbonding_index.remove(&entry.unbonding_id);
        } else {
            let e = &mut ubd.entries[i];
            e.balance = left;
            e.initial_balance = e.initial_balance.saturating_sub(amount);
        }
        self.state.set_ubd(ubd);
        debug!(delegator = %del, validator = %val, amount, creation_height, "unbonding cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::errors::{ExecError, StakingError};
    use crate::core::staking::expected::{BankKeeper, MemoryBank, NOT_BONDED_POOL};
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::{BondStatus, Description};
    use crate::core::types::{AccAddress, BlockInfo, ConsPubKey, ValAddress};

    fn setup() -> (Keeper<MemoryBank>, ValAddress, AccAddress) {
        let mut k = Keeper::new(Params::default(), MemoryBank::new());
        k.begin_block(BlockInfo {
            height: 10,
            time: 1_000,
            ..Default::default()
        });
        let val = ValAddress(vec![1; 20]);
        k.create_validator(
            val.clone(),
            ConsPubKey(vec![9; 32]),
            Description::with_moniker("v"),
            CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
            1,
        )
        .unwrap();
        let alice = AccAddress(vec![7; 20]);
        k.bank_mut().mint_to(&alice, 10_000);
        (k, val, alice)
    }

    #[test]
    fn delegate_moves_funds_into_not_bonded_pool() {
        let (mut k, val, alice) = setup();
        let shares = k
            .delegate(&alice, 1000, BondStatus::Unbonded, &val, true)
            .unwrap();
        assert_eq!(shares, Dec::from_int(1000));
        assert_eq!(k.bank().spendable(&alice), 9_000);
        assert_eq!(k.bank().module_balance(NOT_BONDED_POOL), 1000);
        assert_eq!(k.state().validators[&val].tokens, 1000);
    }

    #[test]
    fn unbond_more_than_delegated_is_rejected() {
        let (mut k, val, alice) = setup();
        k.delegate(&alice, 100, BondStatus::Unbonded, &val, true)
            .unwrap();
        assert_eq!(
            k.unbond(&alice, &val, Dec::from_int(101)),
            Err(ExecError::Rejected(StakingError::InsufficientShares))
        );
        assert_eq!(
            k.unbond(&AccAddress(vec![3; 20]), &val, Dec::one()),
            Err(ExecError::Rejected(StakingError::NoDelegation))
        );
    }

    #[test]
    fn entry_cap_rejects_without_touching_entries() {
        let (mut k, val, alice) = setup();
        k.delegate(&alice, 1000, BondStatus::Unbonded, &val, true)
            .unwrap();
        let max = k.params().max_entries as u64;
        for i in 0..max {
            k.begin_block(BlockInfo {
                height: 10 + i,
                time: 1_000 + i,
                ..Default::default()
            });
            k.undelegate(&alice, &val, Dec::from_int(1)).unwrap();
        }
        k.begin_block(BlockInfo {
            height: 100,
            time: 2_000,
            ..Default::default()
        });
        let before = k.state().clone();
        assert_eq!(
            k.undelegate(&alice, &val, Dec::from_int(1)),
            Err(ExecError::Rejected(StakingError::MaxUnbondingDelegationEntries))
        );
        assert_eq!(k.state(), &before);
    }

    #[test]
    fn same_block_undelegations_merge_at_cap() {
        let (mut k, val, alice) = setup();
        k.delegate(&alice, 1000, BondStatus::Unbonded, &val, true)
            .unwrap();
        for _ in 0..10 {
            k.undelegate(&alice, &val, Dec::from_int(1)).unwrap();
        }
        let ubd = k.state().ubd(&alice, &val).unwrap();
        assert_eq!(ubd.entries.len(), 1);
        assert_eq!(ubd.entries[0].balance, 10);
        assert_eq!(k.state().unbonding_id, 1);
    }

    #[test]
    fn cancel_unbonding_redelegates_and_shrinks_entry() {
        let (mut k, val, alice) = setup();
        k.delegate(&alice, 1000, BondStatus::Unbonded, &val, true)
            .unwrap();
        k.undelegate(&alice, &val, Dec::from_int(400)).unwrap();
        assert_eq!(
            k.cancel_unbonding_delegation(&alice, &val, 10, 401),
            Err(ExecError::Rejected(StakingError::UnbondingEntryBalanceExceeded))
        );
        assert_eq!(
            k.cancel_unbonding_delegation(&alice, &val, 11, 1),
            Err(ExecError::Rejected(StakingError::NoUnbondingDelegation))
        );
        k.cancel_unbonding_delegation(&alice, &val, 10, 150).unwrap();
        let e = &k.state().ubd(&alice, &val).unwrap().entries[0];
        assert_eq!((e.balance, e.initial_balance), (250, 250));
        assert_eq!(k.state().validators[&val].tokens, 750);

        k.cancel_unbonding_delegation(&alice, &val, 10, 250).unwrap();
        assert!(k.state().ubd(&alice, &val).is_none());
        assert_eq!(k.state().validators[&val].tokens, 1000);
    }

    #[test]
    fn validate_unbond_amount_caps_at_delegation() {
        let (mut k, val, alice) = setup();
        k.delegate(&alice, 1000, BondStatus::Unbonded, &val, true)
            .unwrap();
        assert_eq!(
            k.validate_unbond_amount(&alice, &val, 1000).unwrap(),
            Dec::from_int(1000)
        );
        assert_eq!(
            k.validate_unbond_amount(&alice, &val, 1001),
            Err(ExecError::Rejected(StakingError::BadSharesAmount))
        );
    }
}
