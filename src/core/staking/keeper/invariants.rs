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

//! Ledger-wide consistency checks.

use super::Keeper;
use crate::core::math::{Amount, Dec};
use crate::core::staking::delegation::UnbondingRef;
use crate::core::staking::errors::{ExecResult, LedgerFault};
use crate::core::staking::expected::{BankKeeper, BONDED_POOL, NOT_BONDED_POOL};
use crate::core::types::ValAddress;
use std::collections::BTreeMap;
use tracing::warn;

/// Named invariants and what broke, if anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvariantReport {
    /// `(invariant, message)` for every violation found.
    pub broken: Vec<(&'static str, String)>,
}

impl InvariantReport {
    /// No violations.
    pub fn is_ok(&self) -> bool {
        self.broken.is_empty()
    }

    fn fail(&mut self, name: &'static str, msg: String) {
        self.broken.push((name, msg));
    }
}

impl<B: BankKeeper> Keeper<B> {
    /// Run every invariant and collect the violations.
    pub fn check_invariants(&self) -> InvariantReport {
        let mut r = InvariantReport::default();
        self.module_accounts_invariant(&mut r);
        self.power_index_invariant(&mut r);
        self.positive_delegation_invariant(&mut r);
        self.delegator_shares_invariant(&mut r);
        self.unbonding_index_invariant(&mut r);
        r
    }

    /// Fault with the first violation, if any.
    pub fn assert_invariants(&self) -> ExecResult<()> {
        let r = self.check_invariants();
        if let Some((name, msg)) = r.broken.first() {
            warn!(count = r.broken.len(), "staking invariants broken");
            return Err(LedgerFault::Invariant(format!("{name}: {msg}")).into());
        }
        Ok(())
    }

    fn module_accounts_invariant(&self, r: &mut InvariantReport) {
        let mut bonded: Amount = 0;
        let mut not_bonded: Amount = 0;
        for v in self.state.validators.values() {
            if v.is_bonded() {
                bonded = bonded.saturating_add(v.tokens);
            } else {
                not_bonded = not_bonded.saturating_add(v.tokens);
            }
        }
        for ubd in self.state.unbonding_delegations.values() {
            for e in &ubd.entries {
                not_bonded = not_bonded.saturating_add(e.balance);
            }
        }
        let pool_bonded = self.bank.module_balance(BONDED_POOL);
        let pool_not_bonded = self.bank.module_balance(NOT_BONDED_POOL);
        if pool_bonded != bonded {
            r.fail(
                "module-accounts",
                format!("bonded pool holds {pool_bonded}, validators account for {bonded}"),
            );
        }
        if pool_not_bonded != not_bonded {
            r.fail(
                "module-accounts",
                format!("not-bonded pool holds {pool_not_bonded}, ledger accounts for {not_bonded}"),
            );
        }
    }

    fn power_index_invariant(&self, r: &mut InvariantReport) {
        let reduction = self.state.params.power_reduction;
        for (key, addr) in &self.state.power_index {
            match self.state.validators.get(addr) {
                None => r.fail("power-index", format!("{addr} indexed but missing")),
                Some(v) if v.jailed => r.fail("power-index", format!("{addr} jailed but indexed")),
                Some(v) if &v.power_index_key(reduction) != key => {
                    r.fail("power-index", format!("{addr} indexed under a stale key"))
                }
                Some(_) => {}
            }
        }
        for addr in self.state.last_validator_powers.keys() {
            if !self.state.validators.contains_key(addr) {
                r.fail("power-index", format!("{addr} in last set but missing"));
            }
        }
    }

    fn positive_delegation_invariant(&self, r: &mut InvariantReport) {
        for d in self.state.delegations.values() {
            if d.shares.is_zero() {
                r.fail(
                    "positive-delegation",
                    format!("{} -> {} has zero shares", d.delegator, d.validator),
                );
            }
        }
    }

    fn delegator_shares_invariant(&self, r: &mut InvariantReport) {
        let mut sums: BTreeMap<&ValAddress, Dec> = BTreeMap::new();
        for d in self.state.delegations.values() {
            let s = sums.entry(&d.validator).or_insert_with(Dec::zero);
            match s.checked_add(d.shares) {
                Ok(n) => *s = n,
                Err(e) => r.fail("delegator-shares", format!("{}: {e}", d.validator)),
            }
        }
        for (addr, v) in &self.state.validators {
            let sum = sums.get(addr).copied().unwrap_or_else(Dec::zero);
            if sum != v.delegator_shares {
                r.fail(
                    "delegator-shares",
                    format!("{addr} issued {} shares, delegations hold {sum}", v.delegator_shares),
                );
            }
        }
        for addr in sums.keys() {
            if !self.state.validators.contains_key(*addr) {
                r.fail("delegator-shares", format!("delegation to missing validator {addr}"));
            }
        }
    }

    fn unbonding_index_invariant(&self, r: &mut InvariantReport) {
        for (id, owner) in &self.state.unbonding_index {
            let found = match owner {
                UnbondingRef::UnbondingDelegation(p) => self
                    .state
                    .ubd(&p.delegator, &p.validator)
                    .is_some_and(|u| u.entries.iter().any(|e| e.unbonding_id == *id)),
                UnbondingRef::Redelegation(t) => self
                    .state
                    .red(&t.delegator, &t.validator_src, &t.validator_dst)
                    .is_some_and(|x| x.entries.iter().any(|e| e.unbonding_id == *id)),
                UnbondingRef::ValidatorUnbonding(a) => self
                    .state
                    .validators
                    .get(a)
                    .is_some_and(|v| v.unbonding_ids.contains(id)),
            };
            if !found {
                r.fail("unbonding-index", LedgerFault::DanglingUnbondingIndex(*id).to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::expected::{BankKeeper, MemoryBank, NOT_BONDED_POOL};
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::{BondStatus, Description};
    use crate::core::types::{AccAddress, BlockInfo, ConsPubKey, ValAddress};

    fn busy_keeper() -> Keeper<MemoryBank> {
        let mut p = Params::default();
        p.power_reduction = 1;
        let mut k = Keeper::new(p, MemoryBank::new());
        k.begin_block(BlockInfo {
            height: 1,
            time: 1,
            ..Default::default()
        });
        let vals: Vec<ValAddress> = (1..=3u8).map(|b| ValAddress(vec![b; 20])).collect();
        for (i, op) in vals.iter().enumerate() {
            k.create_validator(
                op.clone(),
                ConsPubKey(vec![i as u8 + 1; 32]),
                Description::default(),
                CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
                1,
            )
            .unwrap();
            k.bank_mut().mint_to(&op.to_account(), 100);
            k.delegate(&op.to_account(), 100, BondStatus::Unbonded, op, true)
                .unwrap();
        }
        k.end_block().unwrap();
        let del = AccAddress(vec![9; 20]);
        k.bank_mut().mint_to(&del, 500);
        k.delegate(&del, 500, BondStatus::Unbonded, &vals[0], true)
            .unwrap();
        k.undelegate(&del, &vals[0], Dec::from_int(100)).unwrap();
        k.begin_redelegation(&del, &vals[0], &vals[1], Dec::from_int(100))
            .unwrap();
        k
    }

    #[test]
    fn healthy_ledger_passes() {
        let k = busy_keeper();
        let r = k.check_invariants();
        assert!(r.is_ok(), "{:?}", r.broken);
        assert!(k.assert_invariants().is_ok());
    }

    #[test]
    fn pool_drift_is_reported() {
        let mut k = busy_keeper();
        k.bank_mut()
            .send_coins_from_module_to_module(NOT_BONDED_POOL, "elsewhere", 1)
            .unwrap();
        let r = k.check_invariants();
        assert_eq!(r.broken.len(), 1);
        assert_eq!(r.broken[0].0, "module-accounts");
        assert!(k.assert_invariants().unwrap_err().is_fault());
    }
}
