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

//! Unbonding maturity, queue sweeps and external holds.

use super::Keeper;
use crate::core::math::Amount;
use crate::core::staking::delegation::UnbondingRef;
use crate::core::staking::errors::{ExecError, ExecResult, LedgerFault, StakingError};
use crate::core::staking::expected::{BankKeeper, NOT_BONDED_POOL};
use crate::core::types::{AccAddress, ValAddress};
use tracing::debug;

fn skippable(e: &ExecError) -> bool {
    matches!(
        e.rejection(),
        Some(
            StakingError::NoUnbondingDelegation
                | StakingError::NoRedelegation
                | StakingError::NotMature
        )
    )
}

impl<B: BankKeeper> Keeper<B> {
    /// Remove matured, unheld entries of (del, val) and pay their balance
    /// out of the not-bonded pool. Returns (entries removed, tokens paid).
    pub(crate) fn complete_matured_ubd_entries(
        &mut self,
        del: &AccAddress,
        val: &ValAddress,
    ) -> ExecResult<(usize, Amount)> {
        let mut ubd = self
            .state
            .ubd(del, val)
            .cloned()
            .ok_or(StakingError::NoUnbondingDelegation)?;
        let now = self.now();
        let mut removed = 0usize;
        let mut paid: Amount = 0;
        let mut i = 0;
        while i < ubd.entries.len() {
            self.consume(self.costs.per_entry, "complete unbonding entry");
            let e = ubd.entries[i].clone();
            if e.is_mature(now) && !e.on_hold() {
                ubd.remove_entry(i);
                removed += 1;
                self.state.unbonding_index.remove(&e.unbonding_id);
                if e.balance > 0 {
                    self.bank
                        .undelegate_coins_from_module_to_account(NOT_BONDED_POOL, del, e.balance)
                        .map_err(|err| LedgerFault::Pool {
                            pool: NOT_BONDED_POOL,
                            detail: err.to_string(),
                        })?;
                    paid = paid.saturating_add(e.balance);
                }
            } else {
                i += 1;
            }
        }
        self.state.set_ubd(ubd);
        Ok((removed, paid))
    }

    /// Release every matured, unheld entry of (del, val) to the delegator.
    /// `NotMature` when nothing could be released.
    pub fn complete_unbonding(&mut self, del: &AccAddress, val: &ValAddress) -> ExecResult<Amount> {
        let (removed, paid) = self.complete_matured_ubd_entries(del, val)?;
        if removed == 0 {
            return Err(StakingError::NotMature.into());
        }
        Ok(paid)
    }

    /// Dequeue every unbonding pair due by now and complete it. Records
    /// cancelled or still held since they were queued are skipped. Returns
    /// the number of entries released.
    pub fn sweep_mature_unbondings(&mut self) -> ExecResult<usize> {
        let due = self.state.dequeue_mature_ubds(self.now());
        let mut released = 0;
        for pair in due {
            self.consume(self.costs.per_write, "unbonding queue");
            match self.complete_matured_ubd_entries(&pair.delegator, &pair.validator) {
                Ok((n, paid)) => {
                    released += n;
                    if n > 0 {
                        debug!(delegator = %pair.delegator, validator = %pair.validator, paid, "unbonding completed");
                    }
                }
                Err(e) if skippable(&e) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(released)
    }

    /// Dequeue every redelegation triplet due by now and complete it.
    /// Returns the number of entries removed.
    pub fn sweep_mature_redelegations(&mut self) -> ExecResult<usize> {
        let due = self.state.dequeue_mature_reds(self.now());
        let mut removed = 0;
        for t in due {
            self.consume(self.costs.per_write, "redelegation queue");
            match self.complete_matured_red_entries(&t.delegator, &t.validator_src, &t.validator_dst)
            {
                Ok((n, _)) => removed += n,
                Err(e) if skippable(&e) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    /// Place a hold on an unbonding operation; it cannot complete until
    /// every hold is released.
    pub fn put_unbonding_on_hold(&mut self, id: u64) -> ExecResult<()> {
        let owner = self
            .state
            .unbonding_index
            .get(&id)
            .cloned()
            .ok_or(StakingError::UnbondingNotFound)?;
        match owner {
            UnbondingRef::UnbondingDelegation(p) => {
                let mut ubd = self
                    .state
                    .ubd(&p.delegator, &p.validator)
                    .cloned()
                    .ok_or(StakingError::UnbondingNotFound)?;
                let e = ubd
                    .entries
                    .iter_mut()
                    .find(|e| e.unbonding_id == id)
                    .ok_or(StakingError::UnbondingNotFound)?;
                e.unbonding_on_hold_ref_count += 1;
                self.state.set_ubd(ubd);
            }
            UnbondingRef::Redelegation(t) => {
                let mut red = self
                    .state
                    .red(&t.delegator, &t.validator_src, &t.validator_dst)
                    .cloned()
                    .ok_or(StakingError::UnbondingNotFound)?;
                let e = red
                    .entries
                    .iter_mut()
                    .find(|e| e.unbonding_id == id)
                    .ok_or(StakingError::UnbondingNotFound)?;
                e.unbonding_on_hold_ref_count += 1;
                self.state.set_red(red);
            }
            UnbondingRef::ValidatorUnbonding(op) => {
                let mut v = self
                    .state
                    .validators
                    .get(&op)
                    .cloned()
                    .ok_or(StakingError::UnbondingNotFound)?;
                v.unbonding_on_hold_ref_count += 1;
                self.state.set_validator(v);
            }
        }
        Ok(())
    }

    /// Release one hold. A matured unbonding delegation or redelegation
    /// entry whose last hold is released completes immediately; a validator
    /// completes at the next maturity sweep.
    pub fn unbonding_can_complete(&mut self, id: u64) -> ExecResult<()> {
        let owner = self
            .state
            .unbonding_index
            .get(&id)
            .cloned()
            .ok_or(StakingError::UnbondingNotFound)?;
        let now = self.now();
        match owner {
            UnbondingRef::UnbondingDelegation(p) => {
                let mut ubd = self
                    .state
                    .ubd(&p.delegator, &p.validator)
                    .cloned()
                    .ok_or(StakingError::UnbondingNotFound)?;
                let i = ubd
                    .entries
                    .iter()
                    .position(|e| e.unbonding_id == id)
                    .ok_or(StakingError::UnbondingNotFound)?;
                let e = &mut ubd.entries[i];
                if e.unbonding_on_hold_ref_count == 0 {
                    return Err(StakingError::UnbondingOnHoldRefCountNegative.into());
                }
                e.unbonding_on_hold_ref_count -= 1;
                if !e.on_hold() && e.is_mature(now) {
                    let balance = e.balance;
                    ubd.remove_entry(i);
                    self.state.unbonding_index.remove(&id);
                    if balance > 0 {
                        self.bank
                            .undelegate_coins_from_module_to_account(
                                NOT_BONDED_POOL,
                                &p.delegator,
                                balance,
                            )
                            .map_err(|err| LedgerFault::Pool {
                                pool: NOT_BONDED_POOL,
                                detail: err.to_string(),
                            })?;
                    }
                }
                self.state.set_ubd(ubd);
            }
            UnbondingRef::Redelegation(t) => {
                let mut red = self
                    .state
                    .red(&t.delegator, &t.validator_src, &t.validator_dst)
                    .cloned()
                    .ok_or(StakingError::UnbondingNotFound)?;
                let i = red
                    .entries
                    .iter()
                    .position(|e| e.unbonding_id == id)
                    .ok_or(StakingError::UnbondingNotFound)?;
                let e = &mut red.entries[i];
                if e.unbonding_on_hold_ref_count == 0 {
                    return Err(StakingError::UnbondingOnHoldRefCountNegative.into());
                }
                e.unbonding_on_hold_ref_count -= 1;
                if !e.on_hold() && e.is_mature(now) {
                    red.remove_entry(i);
                    self.state.unbonding_index.remove(&id);
                }
                self.state.set_red(red);
            }
            UnbondingRef::ValidatorUnbonding(op) => {
                let mut v = self
                    .state
                    .validators
                    .get(&op)
                    .cloned()
                    .ok_or(StakingError::UnbondingNotFound)?;
                if v.unbonding_on_hold_ref_count == 0 {
                    return Err(StakingError::UnbondingOnHoldRefCountNegative.into());
                }
                v.unbonding_on_hold_ref_count -= 1;
                self.state.set_validator(v);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::errors::{ExecError, StakingError};
    use crate::core::staking::expected::{BankKeeper, MemoryBank};
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::{BondStatus, Description};
    use crate::core::types::{AccAddress, BlockInfo, ConsPubKey, ValAddress};

    fn at(k: &mut Keeper<MemoryBank>, height: u64, time: u64) {
        k.begin_block(BlockInfo {
            height,
            time,
            ..Default::default()
        });
    }

    fn setup() -> (Keeper<MemoryBank>, ValAddress, AccAddress) {
        let mut p = Params::default();
        p.unbonding_time_secs = 100;
        let mut k = Keeper::new(p, MemoryBank::new());
        at(&mut k, 1, 1_000);
        let val = ValAddress(vec![1; 20]);
        k.create_validator(
            val.clone(),
            ConsPubKey(vec![9; 32]),
            Description::default(),
            CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
            1,
        )
        .unwrap();
        let del = AccAddress(vec![7; 20]);
        k.bank_mut().mint_to(&del, 1000);
        k.delegate(&del, 1000, BondStatus::Unbonded, &val, true)
            .unwrap();
        k.undelegate(&del, &val, Dec::from_int(400)).unwrap();
        (k, val, del)
    }

    #[test]
    fn premature_completion_is_not_mature() {
        let (mut k, val, del) = setup();
        at(&mut k, 2, 1_099);
        assert_eq!(
            k.complete_unbonding(&del, &val),
            Err(ExecError::Rejected(StakingError::NotMature))
        );
    }

    #[test]
    fn sweep_is_idempotent() {
        let (mut k, val, del) = setup();
        at(&mut k, 2, 1_100);
        assert_eq!(k.sweep_mature_unbondings().unwrap(), 1);
        assert_eq!(k.bank().spendable(&del), 400);
        let after = k.state().clone();
        assert_eq!(k.sweep_mature_unbondings().unwrap(), 0);
        assert_eq!(k.state(), &after);
        assert_eq!(k.bank().spendable(&del), 400);
        assert!(k.state().ubd(&del, &val).is_none());
    }

    #[test]
    fn held_entry_completes_on_release() {
        let (mut k, val, del) = setup();
        let id = k.state().ubd(&del, &val).unwrap().entries[0].unbonding_id;
        k.put_unbonding_on_hold(id).unwrap();
        at(&mut k, 2, 2_000);
        assert_eq!(k.sweep_mature_unbondings().unwrap(), 0);
        assert_eq!(k.bank().spendable(&del), 0);

        k.unbonding_can_complete(id).unwrap();
        assert_eq!(k.bank().spendable(&del), 400);
        assert!(k.state().ubd(&del, &val).is_none());
        assert_eq!(
            k.unbonding_can_complete(id),
            Err(ExecError::Rejected(StakingError::UnbondingNotFound))
        );
    }

    #[test]
    fn releasing_unheld_entry_fails() {
        let (mut k, val, del) = setup();
        let id = k.state().ubd(&del, &val).unwrap().entries[0].unbonding_id;
        assert_eq!(
            k.unbonding_can_complete(id),
            Err(ExecError::Rejected(StakingError::UnbondingOnHoldRefCountNegative))
        );
    }
}
