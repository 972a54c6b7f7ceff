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

//! Read-only views over the ledger.

use super::Keeper;
use crate::core::math::Amount;
use crate::core::staking::delegation::{Delegation, Redelegation, UnbondingDelegation, UnbondingRef};
use crate::core::staking::errors::ExecResult;
use crate::core::staking::expected::{BankKeeper, BONDED_POOL, NOT_BONDED_POOL};
use crate::core::staking::validator::{BondStatus, Validator};
use crate::core::types::{AccAddress, ValAddress};
use serde::{Deserialize, Serialize};

/// Balances of the two staking pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Tokens backing bonded validators.
    pub bonded_tokens: Amount,
    /// Tokens of non-bonded validators and pending unbondings.
    pub not_bonded_tokens: Amount,
}

impl<B: BankKeeper> Keeper<B> {
    /// Validator by operator.
    pub fn validator(&self, addr: &ValAddress) -> Option<&Validator> {
        self.state.validators.get(addr)
    }

    /// All validators in operator order, optionally filtered by status.
    pub fn validators(&self, status: Option<BondStatus>) -> Vec<&Validator> {
        self.state
            .validators
            .values()
            .filter(|v| status.map_or(true, |s| v.status == s))
            .collect()
    }

    /// Non-jailed validators ranked by power, highest first.
    pub fn validators_by_power(&self) -> Vec<&Validator> {
        self.state
            .power_index
            .values()
            .rev()
            .filter_map(|a| self.state.validators.get(a))
            .collect()
    }

    /// The current bonded set with the power last reported for each.
    pub fn last_validators(&self) -> Vec<(&Validator, u64)> {
        self.state
            .last_validator_powers
            .iter()
            .filter_map(|(a, p)| self.state.validators.get(a).map(|v| (v, *p)))
            .collect()
    }

    /// Total power of the bonded set at the last update.
    pub fn last_total_power(&self) -> u128 {
        self.state.last_total_power
    }

    /// Delegation of `del` to `val`.
    pub fn delegation(&self, del: &AccAddress, val: &ValAddress) -> Option<&Delegation> {
        self.state.delegation(del, val)
    }

    /// Every delegation made by `del`.
    pub fn delegator_delegations(&self, del: &AccAddress) -> Vec<&Delegation> {
        self.state
            .delegations
            .range((del.clone(), ValAddress(Vec::new()))..)
            .take_while(|((d, _), _)| d == del)
            .map(|(_, d)| d)
            .collect()
    }

    /// Every delegation to `val`.
    pub fn validator_delegations(&self, val: &ValAddress) -> Vec<&Delegation> {
        self.state
            .delegations
            .values()
            .filter(|d| &d.validator == val)
            .collect()
    }

    /// Validators `del` delegates to.
    pub fn delegator_validators(&self, del: &AccAddress) -> Vec<&Validator> {
        self.delegator_delegations(del)
            .into_iter()
            .filter_map(|d| self.state.validators.get(&d.validator))
            .collect()
    }

    /// Tokens currently backing `del`'s delegations, truncated per validator.
    pub fn delegator_bonded_tokens(&self, del: &AccAddress) -> ExecResult<Amount> {
        let mut total: Amount = 0;
        for d in self.delegator_delegations(del) {
            let Some(v) = self.state.validators.get(&d.validator) else {
                continue;
            };
            let tokens = v.tokens_from_shares_truncated(d.shares)?.truncate_int()?;
            total = total.saturating_add(tokens);
        }
        Ok(total)
    }

    /// Unbonding delegation of `del` from `val`.
    pub fn unbonding_delegation(
        &self,
        del: &AccAddress,
        val: &ValAddress,
    ) -> Option<&UnbondingDelegation> {
        self.state.ubd(del, val)
    }

    /// Every unbonding delegation of `del`.
    pub fn delegator_unbonding_delegations(&self, del: &AccAddress) -> Vec<&UnbondingDelegation> {
        self.state
            .unbonding_delegations
            .range((del.clone(), ValAddress(Vec::new()))..)
            .take_while(|((d, _), _)| d == del)
            .map(|(_, u)| u)
            .collect()
    }

    /// Every unbonding delegation out of `val`.
    pub fn validator_unbonding_delegations(&self, val: &ValAddress) -> Vec<&UnbondingDelegation> {
        self.state.ubds_from_validator(val)
    }

    /// Redelegations of `del`, optionally narrowed by source and destination.
    pub fn redelegations(
        &self,
        del: &AccAddress,
        src: Option<&ValAddress>,
        dst: Option<&ValAddress>,
    ) -> Vec<&Redelegation> {
        self.state
            .redelegations
            .range((del.clone(), ValAddress(Vec::new()), ValAddress(Vec::new()))..)
            .take_while(|((d, _, _), _)| d == del)
            .filter(|((_, s, t), _)| src.map_or(true, |x| x == s) && dst.map_or(true, |x| x == t))
            .map(|(_, r)| r)
            .collect()
    }

    /// Redelegations out of `src`, across delegators.
    pub fn validator_redelegations(&self, src: &ValAddress) -> Vec<&Redelegation> {
        self.state.reds_from_src(src)
    }

    /// Owner of an unbonding id.
    pub fn unbonding_by_id(&self, id: u64) -> Option<&UnbondingRef> {
        self.state.unbonding_index.get(&id)
    }

    /// Pool balances as held by the bank.
    pub fn pool(&self) -> Pool {
        Pool {
            bonded_tokens: self.bank.module_balance(BONDED_POOL),
            not_bonded_tokens: self.bank.module_balance(NOT_BONDED_POOL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Pool;
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::expected::MemoryBank;
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::{BondStatus, Description};
    use crate::core::types::{AccAddress, BlockInfo, ConsPubKey, ValAddress};

    #[test]
    fn delegator_views() {
        let mut p = Params::default();
        p.power_reduction = 1;
        let mut k = Keeper::new(p, MemoryBank::new());
        k.begin_block(BlockInfo {
            height: 1,
            time: 1,
            ..Default::default()
        });
        let vals: Vec<ValAddress> = (1..=2u8).map(|b| ValAddress(vec![b; 20])).collect();
        for (i, op) in vals.iter().enumerate() {
            k.create_validator(
                op.clone(),
                ConsPubKey(vec![i as u8 + 10; 32]),
                Description::default(),
                CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
                1,
            )
            .unwrap();
        }
        let del = AccAddress(vec![7; 20]);
        let other = AccAddress(vec![8; 20]);
        k.bank_mut().mint_to(&del, 300);
        k.bank_mut().mint_to(&other, 50);
        k.delegate(&del, 100, BondStatus::Unbonded, &vals[0], true)
            .unwrap();
        k.delegate(&del, 200, BondStatus::Unbonded, &vals[1], true)
            .unwrap();
        k.delegate(&other, 50, BondStatus::Unbonded, &vals[1], true)
            .unwrap();
        k.undelegate(&del, &vals[1], Dec::from_int(20)).unwrap();

        assert_eq!(k.delegator_delegations(&del).len(), 2);
        assert_eq!(k.validator_delegations(&vals[1]).len(), 2);
        assert_eq!(k.delegator_validators(&del).len(), 2);
        assert_eq!(k.delegator_bonded_tokens(&del).unwrap(), 280);
        assert_eq!(k.delegator_unbonding_delegations(&del).len(), 1);
        assert!(k.delegator_unbonding_delegations(&other).is_empty());
        assert_eq!(k.validators(Some(BondStatus::Unbonded)).len(), 2);
        assert_eq!(k.validators_by_power()[0].operator, vals[1]);
        assert_eq!(
            k.pool(),
            Pool {
                bonded_tokens: 0,
                not_bonded_tokens: 350,
            }
        );
    }
}
