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

//! Redelegation tracker.

use super::Keeper;
use crate::core::math::{Amount, Dec};
use crate::core::staking::delegation::{DvvTriplet, Redelegation, UnbondingRef};
use crate::core::staking::errors::{ExecResult, StakingError};
use crate::core::staking::expected::BankKeeper;
use crate::core::staking::hooks::StakingHooks;
use crate::core::staking::validator::{BondStatus, ShareRounding};
use crate::core::types::{AccAddress, Timestamp, ValAddress};
use tracing::debug;

impl<B: BankKeeper> Keeper<B> {
    /// True when `del` has a redelegation into `val` that has not matured.
    pub fn has_receiving_redelegation(&self, del: &AccAddress, val: &ValAddress) -> bool {
        let now = self.now();
        self.state
            .reds_into(del, val)
            .iter()
            .any(|r| r.entries.iter().any(|e| !e.is_mature(now)))
    }

    fn has_max_redelegation_entries(
        &self,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> bool {
        let max = self.state.params.max_entries as usize;
        self.state
            .red(del, src, dst)
            .map(|r| r.entries.len() >= max)
            .unwrap_or(false)
    }

    /// Completion time and height for a redelegation out of `src`, or
    /// `None` when it completes immediately (src is Unbonded).
    fn begin_info(&self, src: &ValAddress) -> Option<(Timestamp, u64)> {
        let full = (
            self.now()
                .saturating_add(self.state.params.unbonding_time_secs),
            self.height(),
        );
        match self.state.validators.get(src) {
            None => Some(full),
            Some(v) => match v.status {
                BondStatus::Bonded => Some(full),
                BondStatus::Unbonding => Some((v.unbonding_time, v.unbonding_height)),
                BondStatus::Unbonded => None,
            },
        }
    }

    /// Move `shares` of (del, src) to dst without waiting out the unbonding
    /// period. Returns the completion time of the tracking entry (the
    /// current time when no entry is needed).
    pub fn begin_redelegation(
        &mut self,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
        shares: Dec,
    ) -> ExecResult<Timestamp> {
        if src == dst {
            return Err(StakingError::SelfRedelegation.into());
        }
        let dst_val = self
            .state
            .validators
            .get(dst)
            .ok_or(StakingError::BadRedelegationDst)?;
        let src_val = self
            .state
            .validators
            .get(src)
            .ok_or(StakingError::NoValidatorFound)?;
        let src_status = src_val.status;
        if self.has_receiving_redelegation(del, src) {
            return Err(StakingError::TransitiveRedelegation.into());
        }
        if self.has_max_redelegation_entries(del, src, dst) {
            return Err(StakingError::MaxRedelegationEntries.into());
        }
        let held = self
            .state
            .delegation(del, src)
            .map(|d| d.shares)
            .ok_or(StakingError::NoDelegation)?;
        if held < shares {
            return Err(StakingError::InsufficientShares.into());
        }
        if src_val.tokens_released_by(shares)? == 0 {
            return Err(StakingError::TinyRedelegationAmount.into());
        }
        if dst_val.invalid_ex_rate() {
            return Err(StakingError::DelegatorShareExRateInvalid.into());
        }

        let amount = self.unbond(del, src, shares)?;
        let shares_dst =
            self.delegate_with(del, amount, src_status, dst, false, ShareRounding::Truncate)?;

        let Some((completion, height)) = self.begin_info(src) else {
            debug!(delegator = %del, src = %src, dst = %dst, amount, "redelegation completed immediately");
            return Ok(self.now());
        };

        let triplet = DvvTriplet {
            delegator: del.clone(),
            validator_src: src.clone(),
            validator_dst: dst.clone(),
        };
        let id = self
            .state
            .next_unbonding_id(UnbondingRef::Redelegation(triplet.clone()));
        let mut red = self
            .state
            .red(del, src, dst)
            .cloned()
            .unwrap_or_else(|| Redelegation::new(del.clone(), src.clone(), dst.clone()));
        red.add_entry(height, completion, amount, shares_dst, id);
        self.state.set_red(red);
        self.state.insert_red_queue(completion, triplet);
        self.consume(self.costs.per_write, "begin redelegation");
        debug!(delegator = %del, src = %src, dst = %dst, amount, completion, "redelegation started");
        self.hooks.after_unbonding_initiated(id)?;
        Ok(completion)
    }

    /// Remove matured, unheld entries of (del, src, dst). Returns the
    /// number of entries removed and their summed initial balance.
    pub(crate) fn complete_matured_red_entries(
        &mut self,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> ExecResult<(usize, Amount)> {
        let mut red = self
            .state
            .red(del, src, dst)
            .cloned()
            .ok_or(StakingError::NoRedelegation)?;
        let now = self.now();
        let mut removed = 0usize;
        let mut total: Amount = 0;
        let mut i = 0;
        while i < red.entries.len() {
            self.consume(self.costs.per_entry, "complete redelegation entry");
            let e = &red.entries[i];
            if e.is_mature(now) && !e.on_hold() {
                self.state.unbonding_index.remove(&e.unbonding_id);
                total = total.saturating_add(e.initial_balance);
                red.remove_entry(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        self.state.set_red(red);
        Ok((removed, total))
    }

    /// Drop every matured, unheld entry of a redelegation. Tokens already
    /// sit with the destination; nothing moves.
    pub fn complete_redelegation(
        &mut self,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> ExecResult<Amount> {
        let (removed, total) = self.complete_matured_red_entries(del, src, dst)?;
        if removed == 0 {
            return Err(StakingError::NotMature.into());
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::errors::{ExecError, StakingError};
    use crate::core::staking::expected::MemoryBank;
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::{BondStatus, Description};
    use crate::core::types::{AccAddress, BlockInfo, ConsPubKey, ValAddress};

    fn keeper_with(n: u8) -> (Keeper<MemoryBank>, Vec<ValAddress>, AccAddress) {
        let mut k = Keeper::new(Params::default(), MemoryBank::new());
        k.begin_block(BlockInfo {
            height: 5,
            time: 500,
            ..Default::default()
        });
        let vals: Vec<ValAddress> = (1..=n).map(|i| ValAddress(vec![i; 20])).collect();
        for (i, v) in vals.iter().enumerate() {
            k.create_validator(
                v.clone(),
                ConsPubKey(vec![100 + i as u8; 32]),
                Description::default(),
                CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
                1,
            )
            .unwrap();
        }
        let del = AccAddress(vec![42; 20]);
        k.bank_mut().mint_to(&del, 1_000_000);
        (k, vals, del)
    }

    #[test]
    fn self_and_unknown_destination_rejected() {
        let (mut k, vals, del) = keeper_with(2);
        k.delegate(&del, 100, BondStatus::Unbonded, &vals[0], true)
            .unwrap();
        assert_eq!(
            k.begin_redelegation(&del, &vals[0], &vals[0], Dec::one()),
            Err(ExecError::Rejected(StakingError::SelfRedelegation))
        );
        assert_eq!(
            k.begin_redelegation(&del, &vals[0], &ValAddress(vec![9; 20]), Dec::one()),
            Err(ExecError::Rejected(StakingError::BadRedelegationDst))
        );
    }

    #[test]
    fn unbonded_source_completes_immediately() {
        let (mut k, vals, del) = keeper_with(2);
        k.delegate(&del, 100, BondStatus::Unbonded, &vals[0], true)
            .unwrap();
        let t = k
            .begin_redelegation(&del, &vals[0], &vals[1], Dec::from_int(40))
            .unwrap();
        assert_eq!(t, 500);
        assert!(k.state().redelegations.is_empty());
        assert_eq!(k.state().validators[&vals[1]].tokens, 40);
    }

    #[test]
    fn tiny_amount_rejected() {
        let (mut k, vals, del) = keeper_with(2);
        k.delegate(&del, 100, BondStatus::Unbonded, &vals[0], true)
            .unwrap();
        let before = k.state().clone();
        assert_eq!(
            k.begin_redelegation(&del, &vals[0], &vals[1], Dec::from_raw(1u64.into())),
            Err(ExecError::Rejected(StakingError::TinyRedelegationAmount))
        );
        assert_eq!(k.state(), &before);
    }

    #[test]
    fn destination_shares_truncate_against_slashed_validator() {
        let (mut k, vals, del) = keeper_with(2);
        k.delegate(&del, 100, BondStatus::Unbonded, &vals[0], true)
            .unwrap();
        k.delegate(&del, 300, BondStatus::Unbonded, &vals[1], true)
            .unwrap();
        k.remove_validator_tokens(&vals[1], 1).unwrap();
        let expected = k.state().validators[&vals[1]]
            .shares_from_tokens_truncated(1)
            .unwrap();
        assert_eq!(expected.to_string(), "1.003344481605351170");

        let held = k.state().delegation(&del, &vals[1]).unwrap().shares;
        k.begin_redelegation(&del, &vals[0], &vals[1], Dec::from_int(1))
            .unwrap();
        let got = k
            .state()
            .delegation(&del, &vals[1])
            .unwrap()
            .shares
            .checked_sub(held)
            .unwrap();
        assert_eq!(got, expected);
        assert_eq!(
            k.state().validators[&vals[1]].delegator_shares,
            Dec::from_int(300).checked_add(expected).unwrap()
        );
    }

    #[test]
    fn missing_delegation_rejected_before_any_write() {
        let (mut k, vals, del) = keeper_with(2);
        k.delegate(&del, 100, BondStatus::Unbonded, &vals[0], true)
            .unwrap();
        let before = k.state().clone();
        assert_eq!(
            k.begin_redelegation(&del, &vals[0], &vals[1], Dec::from_int(101)),
            Err(ExecError::Rejected(StakingError::InsufficientShares))
        );
        assert_eq!(
            k.begin_redelegation(&AccAddress(vec![1; 20]), &vals[0], &vals[1], Dec::one()),
            Err(ExecError::Rejected(StakingError::NoDelegation))
        );
        assert_eq!(k.state(), &before);
    }
}
