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

//! Slashing of validators and of the stake that left them after an
//! infraction.

use super::Keeper;
use crate::core::math::{Amount, Dec};
use crate::core::staking::delegation::{Redelegation, UnbondingDelegation};
use crate::core::staking::errors::{ExecResult, LedgerFault, StakingError};
use crate::core::staking::expected::{BankKeeper, BONDED_POOL, NOT_BONDED_POOL};
use crate::core::staking::hooks::StakingHooks;
use crate::core::staking::validator::BondStatus;
use crate::core::types::ConsAddress;
use tracing::{info, warn};

impl<B: BankKeeper> Keeper<B> {
    /// Slash the validator behind `cons` for an infraction at
    /// `infraction_height` while it had `power`.
    ///
    /// The amount due is `power * power_reduction * factor`. For past
    /// infractions, unbonding and redelegation entries created since then pay
    /// first; the validator covers what remains, capped at its tokens.
    /// Returns the tokens burned from the validator itself.
    pub fn slash(
        &mut self,
        cons: &ConsAddress,
        infraction_height: u64,
        power: u64,
        factor: Dec,
    ) -> ExecResult<Amount> {
        if factor > Dec::one() {
            return Err(StakingError::InvalidSlashFactor.into());
        }
        let amount = Dec::from_int(power as u128)
            .mul_int(self.state.params.power_reduction)?
            .mul_truncate(factor)?
            .truncate_int()?;

        let Some(op) = self.state.validators_by_cons.get(cons).cloned() else {
            warn!(cons = %cons, "slash of unknown validator ignored");
            return Ok(0);
        };
        let v = self.must_get_validator(&op)?;
        if v.is_unbonded() {
            return Err(LedgerFault::SlashUnbonded(op.to_string()).into());
        }
        let height = self.height();
        if infraction_height > height {
            return Err(LedgerFault::FutureInfraction {
                infraction: infraction_height,
                current: height,
            }
            .into());
        }

        let mut remaining = amount;
        if infraction_height < height {
            let ubds: Vec<UnbondingDelegation> = self
                .state
                .ubds_from_validator(&op)
                .into_iter()
                .cloned()
                .collect();
            for ubd in ubds {
                let paid = self.slash_unbonding_delegation(ubd, infraction_height, factor)?;
                remaining = remaining.saturating_sub(paid);
            }
            let reds: Vec<Redelegation> = self
                .state
                .reds_from_src(&op)
                .into_iter()
                .cloned()
                .collect();
            for red in reds {
                let paid = self.slash_redelegation(red, infraction_height, factor)?;
                remaining = remaining.saturating_sub(paid);
            }
        }

        let v = self.must_get_validator(&op)?;
        let burn = remaining.min(v.tokens);
        if burn == 0 {
            return Ok(0);
        }
        let effective = Dec::from_ratio(burn, v.tokens)?;
        self.hooks.before_validator_slashed(&op, effective)?;
        let v = self.remove_validator_tokens(&op, burn)?;
        let pool = match v.status {
            BondStatus::Bonded => BONDED_POOL,
            BondStatus::Unbonding | BondStatus::Unbonded => NOT_BONDED_POOL,
        };
        self.burn(pool, burn)?;
        info!(
            operator = %op,
            infraction_height,
            factor = %factor,
            burned = burn,
            "validator slashed"
        );
        Ok(burn)
    }

    /// Slash the entries of `ubd` created at or after the infraction and not
    /// yet released. Returns the amount the entries owed, which may exceed
    /// what they still held.
    pub(crate) fn slash_unbonding_delegation(
        &mut self,
        mut ubd: UnbondingDelegation,
        infraction_height: u64,
        factor: Dec,
    ) -> ExecResult<Amount> {
        let now = self.now();
        let mut owed: Amount = 0;
        let mut burned: Amount = 0;
        for e in ubd.entries.iter_mut() {
            self.consume(self.costs.per_entry, "slash unbonding entry");
            if e.creation_height < infraction_height {
                continue;
            }
            if e.is_mature(now) && !e.on_hold() {
                continue;
            }
            let due = factor.mul_int(e.initial_balance)?.truncate_int()?;
            owed = owed.saturating_add(due);
            let take = due.min(e.balance);
            if take == 0 {
                continue;
            }
            e.balance -= take;
            burned = burned.saturating_add(take);
        }
        if burned > 0 {
            self.state.set_ubd(ubd);
            self.burn(NOT_BONDED_POOL, burned)?;
        }
        Ok(owed)
    }

    /// Slash the entries of `red` created at or after the infraction by
    /// unbonding the matching shares from the destination and burning the
    /// tokens. Returns the amount the entries owed.
    pub(crate) fn slash_redelegation(
        &mut self,
        mut red: Redelegation,
        infraction_height: u64,
        factor: Dec,
    ) -> ExecResult<Amount> {
        let now = self.now();
        let dst = red.validator_dst.clone();
        let del = red.delegator.clone();
        let mut owed: Amount = 0;
        let mut bonded_burn: Amount = 0;
        let mut not_bonded_burn: Amount = 0;
        let mut touched = false;

        for i in 0..red.entries.len() {
            self.consume(self.costs.per_entry, "slash redelegation entry");
            let e = &red.entries[i];
            if e.creation_height < infraction_height {
                continue;
            }
            if e.is_mature(now) && !e.on_hold() {
                continue;
            }
            let due = factor.mul_int(e.initial_balance)?.truncate_int()?;
            owed = owed.saturating_add(due);

            let wanted = factor.mul(e.shares_dst)?;
            let Some(held) = self.state.delegation(&del, &dst).map(|d| d.shares) else {
                continue;
            };
            let shares = wanted.min(held);
            if shares.is_zero() {
                continue;
            }
            let dst_status = self.must_get_validator(&dst)?.status;
            let tokens = self.unbond(&del, &dst, shares)?;
            match dst_status {
                BondStatus::Bonded => bonded_burn = bonded_burn.saturating_add(tokens),
                BondStatus::Unbonding | BondStatus::Unbonded => {
                    not_bonded_burn = not_bonded_burn.saturating_add(tokens)
                }
            }
            let entry = &mut red.entries[i];
            entry.shares_dst = entry.shares_dst.checked_sub(shares)?;
            touched = true;
        }

        if touched {
            self.state.set_red(red);
        }
        self.burn(BONDED_POOL, bonded_burn)?;
        self.burn(NOT_BONDED_POOL, not_bonded_burn)?;
        Ok(owed)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::errors::{ExecError, StakingError};
    use crate::core::staking::expected::{BankKeeper, MemoryBank, BONDED_POOL, NOT_BONDED_POOL};
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::{BondStatus, Description};
    use crate::core::types::{AccAddress, BlockInfo, ConsAddress, ConsPubKey, ValAddress};

    fn at(k: &mut Keeper<MemoryBank>, height: u64, time: u64) {
        k.begin_block(BlockInfo {
            height,
            time,
            ..Default::default()
        });
    }

    fn bonded_validator(k: &mut Keeper<MemoryBank>, b: u8, stake: u128) -> (ValAddress, ConsAddress) {
        let op = ValAddress(vec![b; 20]);
        let pk = ConsPubKey(vec![b; 32]);
        k.create_validator(
            op.clone(),
            pk.clone(),
            Description::default(),
            CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
            1,
        )
        .unwrap();
        let acc = op.to_account();
        k.bank_mut().mint_to(&acc, stake);
        k.delegate(&acc, stake, BondStatus::Unbonded, &op, true)
            .unwrap();
        (op, pk.address())
    }

    fn keeper() -> Keeper<MemoryBank> {
        let mut p = Params::default();
        p.power_reduction = 1;
        p.unbonding_time_secs = 1000;
        let mut k = Keeper::new(p, MemoryBank::new());
        at(&mut k, 1, 100);
        k
    }

    #[test]
    fn factor_above_one_rejected() {
        let mut k = keeper();
        let (_, cons) = bonded_validator(&mut k, 1, 100);
        assert_eq!(
            k.slash(&cons, 1, 100, Dec::percent(101)),
            Err(ExecError::Rejected(StakingError::InvalidSlashFactor))
        );
    }

    #[test]
    fn unknown_validator_is_a_no_op() {
        let mut k = keeper();
        assert_eq!(
            k.slash(&ConsAddress(vec![7; 20]), 1, 10, Dec::percent(50)),
            Ok(0)
        );
    }

    #[test]
    fn current_infraction_burns_from_bonded_pool() {
        let mut k = keeper();
        let (op, cons) = bonded_validator(&mut k, 1, 1000);
        k.apply_and_return_validator_set_updates().unwrap();
        let burned = k.slash(&cons, 1, 1000, Dec::percent(10)).unwrap();
        assert_eq!(burned, 100);
        assert_eq!(k.state().validators[&op].tokens, 900);
        assert_eq!(k.bank().module_balance(BONDED_POOL), 900);
        assert_eq!(k.bank().burned(), 100);
    }

    #[test]
    fn unbonding_entries_pay_before_the_validator() {
        let mut k = keeper();
        let (op, cons) = bonded_validator(&mut k, 1, 1000);
        k.apply_and_return_validator_set_updates().unwrap();
        let del = AccAddress(vec![42; 20]);
        k.bank_mut().mint_to(&del, 1000);
        k.delegate(&del, 1000, BondStatus::Unbonded, &op, true)
            .unwrap();

        at(&mut k, 5, 200);
        k.undelegate(&del, &op, Dec::from_int(500)).unwrap();
        assert_eq!(k.bank().module_balance(NOT_BONDED_POOL), 500);

        at(&mut k, 6, 210);
        // infraction at height 4 with 2000 power, 10%: 200 owed
        let burned = k.slash(&cons, 4, 2000, Dec::percent(10)).unwrap();
        // entry pays 50, validator the remaining 150
        assert_eq!(burned, 150);
        let ubd = k.state().ubd(&del, &op).unwrap();
        assert_eq!(ubd.entries[0].balance, 450);
        assert_eq!(ubd.entries[0].initial_balance, 500);
        assert_eq!(k.bank().module_balance(NOT_BONDED_POOL), 450);
        assert_eq!(k.state().validators[&op].tokens, 1350);
        assert_eq!(k.bank().burned(), 200);
    }

    #[test]
    fn redelegated_stake_is_slashed_at_destination() {
        let mut k = keeper();
        let (v1, cons1) = bonded_validator(&mut k, 1, 1000);
        let (v2, _) = bonded_validator(&mut k, 2, 1000);
        k.apply_and_return_validator_set_updates().unwrap();
        let del = AccAddress(vec![42; 20]);
        k.bank_mut().mint_to(&del, 400);
        k.delegate(&del, 400, BondStatus::Unbonded, &v1, true)
            .unwrap();

        at(&mut k, 5, 200);
        k.begin_redelegation(&del, &v1, &v2, Dec::from_int(400))
            .unwrap();
        assert_eq!(k.state().validators[&v2].tokens, 1400);

        at(&mut k, 6, 210);
        k.slash(&cons1, 5, 1400, Dec::percent(50)).unwrap();
        // redelegation owed 200, validator pays 700 - 200 = 500
        assert_eq!(k.state().validators[&v2].tokens, 1200);
        assert_eq!(k.state().validators[&v1].tokens, 500);
        let red = k.state().red(&del, &v1, &v2).unwrap();
        assert_eq!(red.entries[0].shares_dst, Dec::from_int(200));
        assert_eq!(k.state().delegation(&del, &v2).unwrap().shares, Dec::from_int(200));
    }
}
