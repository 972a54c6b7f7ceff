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

//! Validator status transitions driven by the power ranking and time.

use super::Keeper;
use crate::core::staking::delegation::UnbondingRef;
use crate::core::staking::errors::{ExecResult, LedgerFault};
use crate::core::staking::expected::BankKeeper;
use crate::core::staking::hooks::StakingHooks;
use crate::core::staking::validator::BondStatus;
use crate::core::types::{ConsPubKey, ValAddress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Consensus power change for one validator. Power zero removes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    /// Consensus key.
    pub pubkey: ConsPubKey,
    /// New power.
    pub power: u64,
}

/// Outcome of `end_block`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndBlockReport {
    /// Validator set changes for the consensus engine.
    pub updates: Vec<ValidatorUpdate>,
    /// Validators that finished unbonding.
    pub matured_validators: usize,
    /// Unbonding entries released to delegators.
    pub matured_unbondings: usize,
    /// Redelegation entries retired.
    pub matured_redelegations: usize,
}

impl<B: BankKeeper> Keeper<B> {
    fn bond_validator(&mut self, addr: &ValAddress) -> ExecResult<()> {
        let mut v = self.must_get_validator(addr)?;
        if v.is_bonded() {
            return Err(LedgerFault::StatusTransition(addr.to_string(), "already bonded").into());
        }
        self.state.delete_power_index(&v);
        self.state.delete_validator_queue(&v);
        v.update_status(BondStatus::Bonded);
        self.state.set_power_index(&v);
        let cons = v.cons_address();
        self.state.set_validator(v);
        info!(operator = %addr, "validator bonded");
        self.hooks.after_validator_bonded(&cons, addr)?;
        Ok(())
    }

    fn begin_unbonding_validator(&mut self, addr: &ValAddress) -> ExecResult<()> {
        let mut v = self.must_get_validator(addr)?;
        if !v.is_bonded() {
            return Err(LedgerFault::StatusTransition(addr.to_string(), "not bonded").into());
        }
        self.state.delete_power_index(&v);
        let id = self
            .state
            .next_unbonding_id(UnbondingRef::ValidatorUnbonding(addr.clone()));
        v.update_status(BondStatus::Unbonding);
        v.unbonding_time = self
            .now()
            .saturating_add(self.state.params.unbonding_time_secs);
        v.unbonding_height = self.height();
        v.unbonding_ids.push(id);
        self.state.set_power_index(&v);
        self.state.insert_validator_queue(&v);
        let cons = v.cons_address();
        info!(operator = %addr, until = v.unbonding_time, "validator unbonding");
        self.state.set_validator(v);
        self.hooks.after_validator_begin_unbonding(&cons, addr)?;
        self.hooks.after_unbonding_initiated(id)?;
        Ok(())
    }

    /// Recompute the bonded set from the power ranking.
    ///
    /// Walks the index from highest power, bonding up to `max_validators`
    /// non-zero-power validators; previously bonded validators that fell out
    /// begin unbonding. Net tokens move between pools once. Returns the
    /// power changes, with zero power for removed validators.
    pub fn apply_and_return_validator_set_updates(&mut self) -> ExecResult<Vec<ValidatorUpdate>> {
        let max = self.state.params.max_validators as usize;
        let reduction = self.state.params.power_reduction;
        let mut last: BTreeMap<ValAddress, u64> = self.state.last_validator_powers.clone();
        let ranked: Vec<ValAddress> = self.state.power_index.values().rev().cloned().collect();

        let mut updates = Vec::new();
        let mut total_power: u128 = 0;
        let mut to_bonded: u128 = 0;
        let mut to_not_bonded: u128 = 0;
        let mut count = 0usize;

        for addr in ranked {
            if count >= max {
                break;
            }
            self.consume(self.costs.per_validator, "validator set update");
            let v = self.must_get_validator(&addr)?;
            if v.jailed {
                return Err(LedgerFault::JailedInPowerIndex(addr.to_string()).into());
            }
            if v.potential_consensus_power(reduction) == 0 {
                break;
            }
            if !v.is_bonded() {
                self.bond_validator(&addr)?;
                to_bonded = to_bonded.saturating_add(v.tokens);
            }
            let power = v.potential_consensus_power(reduction);
            if last.remove(&addr) != Some(power) {
                updates.push(ValidatorUpdate {
                    pubkey: v.consensus_pubkey.clone(),
                    power,
                });
                self.state.last_validator_powers.insert(addr.clone(), power);
            }
            total_power = total_power.saturating_add(power as u128);
            count += 1;
        }

        for (addr, _) in last {
            self.consume(self.costs.per_validator, "validator set update");
            self.begin_unbonding_validator(&addr)?;
            let v = self.must_get_validator(&addr)?;
            to_not_bonded = to_not_bonded.saturating_add(v.tokens);
            self.state.last_validator_powers.remove(&addr);
            updates.push(ValidatorUpdate {
                pubkey: v.consensus_pubkey,
                power: 0,
            });
        }

        if to_bonded > to_not_bonded {
            self.not_bonded_tokens_to_bonded(to_bonded - to_not_bonded)?;
        } else if to_not_bonded > to_bonded {
            self.bonded_tokens_to_not_bonded(to_not_bonded - to_bonded)?;
        }
        if !updates.is_empty() {
            self.state.last_total_power = total_power;
        }
        Ok(updates)
    }

    /// Move every matured, unheld Unbonding validator to Unbonded and remove
    /// the ones without shares. Returns how many finished unbonding.
    pub fn unbond_all_mature_validators(&mut self) -> ExecResult<usize> {
        let (now, height) = (self.now(), self.height());
        let due: Vec<((u64, u64), Vec<ValAddress>)> = self
            .state
            .validator_queue
            .range(..=(now, u64::MAX))
            .filter(|((_, h), _)| *h <= height)
            .map(|(k, v)| (*k, v.clone()))
            .collect();

        let mut matured = 0;
        for (_, addrs) in due {
            for addr in addrs {
                self.consume(self.costs.per_validator, "validator queue");
                let mut v = self.must_get_validator(&addr)?;
                if !v.is_unbonding() {
                    return Err(LedgerFault::StatusTransition(
                        addr.to_string(),
                        "queued validator is not unbonding",
                    )
                    .into());
                }
                if v.unbonding_on_hold_ref_count > 0 {
                    continue;
                }
                for id in std::mem::take(&mut v.unbonding_ids) {
                    self.state.unbonding_index.remove(&id);
                }
                self.state.delete_validator_queue(&v);
                self.state.delete_power_index(&v);
                v.update_status(BondStatus::Unbonded);
                self.state.set_power_index(&v);
                let no_shares = v.delegator_shares.is_zero();
                self.state.set_validator(v);
                info!(operator = %addr, "validator unbonded");
                if no_shares {
                    self.remove_validator(&addr)?;
                }
                matured += 1;
            }
        }
        Ok(matured)
    }

    /// End-of-block processing: validator set update, validator maturity,
    /// unbonding and redelegation sweeps, historical info.
    pub fn end_block(&mut self) -> ExecResult<EndBlockReport> {
        let updates = self.apply_and_return_validator_set_updates()?;
        let matured_validators = self.unbond_all_mature_validators()?;
        let matured_unbondings = self.sweep_mature_unbondings()?;
        let matured_redelegations = self.sweep_mature_redelegations()?;
        self.track_historical_info()?;
        Ok(EndBlockReport {
            updates,
            matured_validators,
            matured_unbondings,
            matured_redelegations,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::expected::{BankKeeper, MemoryBank, BONDED_POOL, NOT_BONDED_POOL};
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::{BondStatus, Description};
    use crate::core::types::{BlockInfo, ConsPubKey, ValAddress};

    fn keeper(max_validators: u32) -> Keeper<MemoryBank> {
        let mut p = Params::default();
        p.max_validators = max_validators;
        p.unbonding_time_secs = 50;
        p.power_reduction = 1;
        let mut k = Keeper::new(p, MemoryBank::new());
        k.begin_block(BlockInfo {
            height: 1,
            time: 100,
            ..Default::default()
        });
        k
    }

    fn add_validator(k: &mut Keeper<MemoryBank>, b: u8, stake: u128) -> ValAddress {
        let op = ValAddress(vec![b; 20]);
        k.create_validator(
            op.clone(),
            ConsPubKey(vec![b; 32]),
            Description::default(),
            CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
            1,
        )
        .unwrap();
        let acc = op.to_account();
        k.bank_mut().mint_to(&acc, stake);
        k.delegate(&acc, stake, BondStatus::Unbonded, &op, true)
            .unwrap();
        op
    }

    #[test]
    fn top_validators_bond_and_pools_follow() {
        let mut k = keeper(2);
        let a = add_validator(&mut k, 1, 30);
        let b = add_validator(&mut k, 2, 20);
        let c = add_validator(&mut k, 3, 10);
        let updates = k.apply_and_return_validator_set_updates().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].power, 30);
        assert!(k.state().validators[&a].is_bonded());
        assert!(k.state().validators[&b].is_bonded());
        assert!(k.state().validators[&c].is_unbonded());
        assert_eq!(k.bank().module_balance(BONDED_POOL), 50);
        assert_eq!(k.bank().module_balance(NOT_BONDED_POOL), 10);
        assert_eq!(k.state().last_total_power, 50);

        // unchanged set yields no updates
        assert!(k.apply_and_return_validator_set_updates().unwrap().is_empty());
    }

    #[test]
    fn displaced_validator_unbonds_then_matures() {
        let mut k = keeper(1);
        let a = add_validator(&mut k, 1, 30);
        k.apply_and_return_validator_set_updates().unwrap();
        let b = add_validator(&mut k, 2, 40);
        let updates = k.apply_and_return_validator_set_updates().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].power, 0);
        let va = &k.state().validators[&a];
        assert!(va.is_unbonding());
        assert_eq!(va.unbonding_time, 150);
        assert!(k.state().validators[&b].is_bonded());
        assert_eq!(k.bank().module_balance(BONDED_POOL), 40);
        assert_eq!(k.bank().module_balance(NOT_BONDED_POOL), 30);

        k.begin_block(BlockInfo {
            height: 2,
            time: 150,
            ..Default::default()
        });
        assert_eq!(k.unbond_all_mature_validators().unwrap(), 1);
        assert!(k.state().validators[&a].is_unbonded());
        assert!(k.state().validator_queue.is_empty());
    }

    #[test]
    fn zero_power_validators_are_not_bonded() {
        let mut k = keeper(5);
        let op = ValAddress(vec![1; 20]);
        k.create_validator(
            op.clone(),
            ConsPubKey(vec![1; 32]),
            Description::default(),
            CommissionRates::default(),
            1,
        )
        .unwrap();
        assert!(k.apply_and_return_validator_set_updates().unwrap().is_empty());
        assert!(k.state().validators[&op].is_unbonded());
    }
}
