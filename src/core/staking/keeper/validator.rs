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

//! Validator registry operations.

use super::Keeper;
use crate::core::math::{Amount, Dec};
use crate::core::staking::commission::{Commission, CommissionRates};
use crate::core::staking::errors::{ExecResult, LedgerFault, StakingError};
use crate::core::staking::expected::BankKeeper;
use crate::core::staking::hooks::StakingHooks;
use crate::core::staking::msg::require_addr;
use crate::core::staking::validator::{Description, ShareRounding, Validator};
use crate::core::types::{ConsAddress, ConsPubKey, ValAddress};
use tracing::info;

impl<B: BankKeeper> Keeper<B> {
    /// Register a new Unbonded validator with zero tokens. The caller is
    /// expected to follow up with the self-delegation.
    pub fn create_validator(
        &mut self,
        operator: ValAddress,
        pubkey: ConsPubKey,
        description: Description,
        rates: CommissionRates,
        min_self_delegation: Amount,
    ) -> ExecResult<()> {
        require_addr(operator.as_bytes(), "validator")?;
        if self.state.validators.contains_key(&operator) {
            return Err(StakingError::ValidatorOwnerExists.into());
        }
        if self.state.validators_by_cons.contains_key(&pubkey.address()) {
            return Err(StakingError::ValidatorPubKeyExists.into());
        }
        description.ensure_length()?;
        rates.validate()?;
        if rates.rate < self.state.params.min_commission_rate {
            return Err(StakingError::CommissionLTMinRate.into());
        }

        let commission = Commission::new(rates, self.now());
        let v = Validator::new(
            operator.clone(),
            pubkey,
            description,
            commission,
            min_self_delegation,
        );
        self.state.set_validator_by_cons(&v);
        self.state.set_power_index(&v);
        self.state.set_validator(v);
        self.consume(self.costs.per_write, "create validator");
        info!(operator = %operator, "validator created");
        self.hooks.after_validator_created(&operator)?;
        Ok(())
    }

    /// Apply an `EditValidator`: merge the description, optionally change
    /// the commission rate and raise the minimum self-delegation.
    pub fn edit_validator(
        &mut self,
        operator: &ValAddress,
        description: &Description,
        new_rate: Option<Dec>,
        min_self_delegation: Option<Amount>,
    ) -> ExecResult<()> {
        let mut v = self
            .state
            .validators
            .get(operator)
            .cloned()
            .ok_or(StakingError::NoValidatorFound)?;

        let merged = v.description.update(description);
        merged.ensure_length()?;

        if let Some(rate) = new_rate {
            v.commission.validate_new_rate(
                rate,
                self.now(),
                self.state.params.commission_cooldown_secs,
            )?;
            if rate < self.state.params.min_commission_rate {
                return Err(StakingError::CommissionLTMinRate.into());
            }
        }
        if let Some(min) = min_self_delegation {
            if min <= v.min_self_delegation {
                return Err(StakingError::MinSelfDelegationDecreased.into());
            }
            if min > v.tokens {
                return Err(StakingError::SelfDelegationBelowMinimum.into());
            }
        }

        if let Some(rate) = new_rate {
            self.hooks.before_validator_modified(operator)?;
            v.commission.update(
                rate,
                self.now(),
                self.state.params.commission_cooldown_secs,
            )?;
        }
        if let Some(min) = min_self_delegation {
            v.min_self_delegation = min;
        }
        v.description = merged;
        self.state.set_validator(v);
        self.consume(self.costs.per_write, "edit validator");
        Ok(())
    }

    /// Add delegated tokens, re-keying the power index. Returns issued shares.
    pub(crate) fn add_validator_tokens_and_shares(
        &mut self,
        addr: &ValAddress,
        amount: Amount,
        rounding: ShareRounding,
    ) -> ExecResult<Dec> {
        let mut v = self.must_get_validator(addr)?;
        self.state.delete_power_index(&v);
        let issued = v.add_tokens_with(amount, rounding)?;
        self.state.set_power_index(&v);
        self.state.set_validator(v);
        Ok(issued)
    }

    /// Remove delegator shares, re-keying the power index. Returns released
    /// tokens.
    pub(crate) fn remove_validator_tokens_and_shares(
        &mut self,
        addr: &ValAddress,
        shares: Dec,
    ) -> ExecResult<Amount> {
        let mut v = self.must_get_validator(addr)?;
        self.state.delete_power_index(&v);
        let released = v.remove_del_shares(shares)?;
        self.state.set_power_index(&v);
        self.state.set_validator(v);
        Ok(released)
    }

    /// Remove tokens without touching shares (slashing).
    pub(crate) fn remove_validator_tokens(
        &mut self,
        addr: &ValAddress,
        amount: Amount,
    ) -> ExecResult<Validator> {
        let mut v = self.must_get_validator(addr)?;
        self.state.delete_power_index(&v);
        v.remove_tokens(amount)?;
        self.state.set_power_index(&v);
        self.state.set_validator(v.clone());
        Ok(v)
    }

    /// Delete an Unbonded, token-less validator and its indices.
    pub(crate) fn remove_validator(&mut self, addr: &ValAddress) -> ExecResult<()> {
        let Some(v) = self.state.validators.get(addr).cloned() else {
            return Ok(());
        };
        if !v.is_unbonded() {
            return Err(LedgerFault::RemoveValidator(addr.to_string(), "not unbonded").into());
        }
        if v.tokens > 0 {
            return Err(LedgerFault::RemoveValidator(addr.to_string(), "still holds tokens").into());
        }
        let cons = v.cons_address();
        self.state.validators.remove(addr);
        self.state.validators_by_cons.remove(&cons);
        self.state.delete_power_index(&v);
        self.consume(self.costs.per_write, "remove validator");
        info!(operator = %addr, "validator removed");
        self.hooks.after_validator_removed(&cons, addr)?;
        Ok(())
    }

    pub(crate) fn jail_validator(&mut self, addr: &ValAddress) -> ExecResult<()> {
        let mut v = self.must_get_validator(addr)?;
        if v.jailed {
            return Err(LedgerFault::AlreadyJailed(addr.to_string()).into());
        }
        self.state.delete_power_index(&v);
        v.jailed = true;
        self.state.set_validator(v);
        info!(operator = %addr, "validator jailed");
        Ok(())
    }

    fn operator_by_cons(&self, cons: &ConsAddress) -> ExecResult<ValAddress> {
        self.state
            .validators_by_cons
            .get(cons)
            .cloned()
            .ok_or_else(|| LedgerFault::MissingValidator(cons.to_string()).into())
    }

    /// Jail the validator behind a consensus address; it leaves the power
    /// index and drops out of the set at the next update.
    pub fn jail(&mut self, cons: &ConsAddress) -> ExecResult<()> {
        let op = self.operator_by_cons(cons)?;
        self.jail_validator(&op)
    }

    /// Unjail the validator behind a consensus address.
    pub fn unjail(&mut self, cons: &ConsAddress) -> ExecResult<()> {
        let op = self.operator_by_cons(cons)?;
        let mut v = self.must_get_validator(&op)?;
        if !v.jailed {
            return Err(LedgerFault::NotJailed(op.to_string()).into());
        }
        v.jailed = false;
        self.state.set_power_index(&v);
        self.state.set_validator(v);
        info!(operator = %op, "validator unjailed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::errors::{ExecError, StakingError};
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::Description;
    use crate::core::staking::expected::MemoryBank;
    use crate::core::types::{ConsPubKey, ValAddress};

    fn rates() -> CommissionRates {
        CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1))
    }

    #[test]
    fn duplicate_operator_and_pubkey_rejected() {
        let mut k = Keeper::new(Params::default(), MemoryBank::new());
        let op = ValAddress(vec![1; 20]);
        let pk = ConsPubKey(vec![9; 32]);
        k.create_validator(op.clone(), pk.clone(), Description::with_moniker("a"), rates(), 1)
            .unwrap();
        assert_eq!(
            k.create_validator(op, ConsPubKey(vec![8; 32]), Description::default(), rates(), 1),
            Err(ExecError::Rejected(StakingError::ValidatorOwnerExists))
        );
        assert_eq!(
            k.create_validator(ValAddress(vec![2; 20]), pk, Description::default(), rates(), 1),
            Err(ExecError::Rejected(StakingError::ValidatorPubKeyExists))
        );
    }

    #[test]
    fn commission_below_params_minimum_rejected() {
        let mut p = Params::default();
        p.min_commission_rate = Dec::percent(10);
        let mut k = Keeper::new(p, MemoryBank::new());
        assert_eq!(
            k.create_validator(
                ValAddress(vec![1; 20]),
                ConsPubKey(vec![9; 32]),
                Description::default(),
                rates(),
                1
            ),
            Err(ExecError::Rejected(StakingError::CommissionLTMinRate))
        );
    }

    #[test]
    fn jail_removes_from_power_index() {
        let mut k = Keeper::new(Params::default(), MemoryBank::new());
        let pk = ConsPubKey(vec![9; 32]);
        k.create_validator(ValAddress(vec![1; 20]), pk.clone(), Description::default(), rates(), 1)
            .unwrap();
        assert_eq!(k.state().power_index.len(), 1);
        k.jail(&pk.address()).unwrap();
        assert!(k.state().power_index.is_empty());
        assert!(k.jail(&pk.address()).unwrap_err().is_fault());
        k.unjail(&pk.address()).unwrap();
        assert_eq!(k.state().power_index.len(), 1);
    }
}
