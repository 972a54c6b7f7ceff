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

//! Message dispatch. Every handler runs inside `Keeper::execute`.

use super::Keeper;
use crate::core::staking::errors::{ExecResult, StakingError};
use crate::core::staking::expected::BankKeeper;
use crate::core::staking::msg::{
    MsgBeginRedelegate, MsgCancelUnbondingDelegation, MsgCreateValidator, MsgDelegate,
    MsgResponse, MsgUndelegate, MsgUpdateParams, StakingMsg,
};
use crate::core::staking::validator::BondStatus;
use crate::core::types::Coin;
use tracing::{debug, info};

impl<B: BankKeeper + Clone> Keeper<B> {
    /// Validate and apply one message atomically.
    pub fn handle(&mut self, msg: &StakingMsg) -> ExecResult<MsgResponse> {
        msg.validate_basic()?;
        let res = self.execute(|k| k.dispatch(msg));
        debug!(type_url = msg.type_url(), ok = res.is_ok(), "message handled");
        res
    }
}

impl<B: BankKeeper> Keeper<B> {
    fn dispatch(&mut self, msg: &StakingMsg) -> ExecResult<MsgResponse> {
        match msg {
            StakingMsg::CreateValidator(m) => self.msg_create_validator(m),
            StakingMsg::EditValidator(m) => {
                self.edit_validator(
                    &m.validator_address,
                    &m.description,
                    m.commission_rate,
                    m.min_self_delegation,
                )?;
                Ok(MsgResponse::Empty)
            }
            StakingMsg::Delegate(m) => self.msg_delegate(m),
            StakingMsg::Undelegate(m) => self.msg_undelegate(m),
            StakingMsg::BeginRedelegate(m) => self.msg_begin_redelegate(m),
            StakingMsg::CancelUnbondingDelegation(m) => self.msg_cancel_unbonding(m),
            StakingMsg::UpdateParams(m) => self.msg_update_params(m),
        }
    }

    fn check_denom(&self, c: &Coin) -> Result<(), StakingError> {
        let expected = &self.state.params.bond_denom;
        if &c.denom != expected {
            return Err(StakingError::BadDenom {
                got: c.denom.clone(),
                expected: expected.clone(),
            });
        }
        Ok(())
    }

    fn msg_create_validator(&mut self, m: &MsgCreateValidator) -> ExecResult<MsgResponse> {
        self.check_denom(&m.value)?;
        if m.value.amount < m.min_self_delegation {
            return Err(StakingError::SelfDelegationBelowMinimum.into());
        }
        self.create_validator(
            m.validator_address.clone(),
            m.pubkey.clone(),
            m.description.clone(),
            m.commission.clone(),
            m.min_self_delegation,
        )?;
        let owner = m.validator_address.to_account();
        self.delegate(
            &owner,
            m.value.amount,
            BondStatus::Unbonded,
            &m.validator_address,
            true,
        )?;
        Ok(MsgResponse::Empty)
    }

    fn msg_delegate(&mut self, m: &MsgDelegate) -> ExecResult<MsgResponse> {
        self.check_denom(&m.amount)?;
        self.delegate(
            &m.delegator_address,
            m.amount.amount,
            BondStatus::Unbonded,
            &m.validator_address,
            true,
        )?;
        Ok(MsgResponse::Empty)
    }

    fn msg_undelegate(&mut self, m: &MsgUndelegate) -> ExecResult<MsgResponse> {
        self.check_denom(&m.amount)?;
        let shares =
            self.validate_unbond_amount(&m.delegator_address, &m.validator_address, m.amount.amount)?;
        let (completion_time, amount) =
            self.undelegate(&m.delegator_address, &m.validator_address, shares)?;
        Ok(MsgResponse::Undelegate {
            completion_time,
            amount: Coin::new(self.state.params.bond_denom.clone(), amount),
        })
    }

    fn msg_begin_redelegate(&mut self, m: &MsgBeginRedelegate) -> ExecResult<MsgResponse> {
        self.check_denom(&m.amount)?;
        let shares = self.validate_unbond_amount(
            &m.delegator_address,
            &m.validator_src_address,
            m.amount.amount,
        )?;
        let completion_time = self.begin_redelegation(
            &m.delegator_address,
            &m.validator_src_address,
            &m.validator_dst_address,
            shares,
        )?;
        Ok(MsgResponse::BeginRedelegate { completion_time })
    }

    fn msg_cancel_unbonding(&mut self, m: &MsgCancelUnbondingDelegation) -> ExecResult<MsgResponse> {
        self.check_denom(&m.amount)?;
        self.cancel_unbonding_delegation(
            &m.delegator_address,
            &m.validator_address,
            m.creation_height,
            m.amount.amount,
        )?;
        Ok(MsgResponse::Empty)
    }

    fn msg_update_params(&mut self, m: &MsgUpdateParams) -> ExecResult<MsgResponse> {
        let expected = &self.state.params.authority;
        if &m.authority != expected {
            return Err(StakingError::Unauthorized {
                expected: expected.clone(),
                got: m.authority.clone(),
            }
            .into());
        }
        m.params.validate()?;
        let rekey = m.params.power_reduction != self.state.params.power_reduction;
        self.state.params = m.params.clone();
        if rekey {
            // power index keys embed the reduction
            self.state.power_index.clear();
            let vals: Vec<_> = self.state.validators.values().cloned().collect();
            for v in &vals {
                self.state.set_power_index(v);
            }
        }
        info!(authority = %m.authority, "staking params updated");
        Ok(MsgResponse::Empty)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::errors::{ExecError, StakingError};
    use crate::core::staking::expected::{BankKeeper, MemoryBank};
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::msg::{
        MsgCreateValidator, MsgDelegate, MsgResponse, MsgUndelegate, MsgUpdateParams, StakingMsg,
    };
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::Description;
    use crate::core::types::{AccAddress, BlockInfo, Coin, ConsPubKey, ValAddress};

    fn keeper() -> Keeper<MemoryBank> {
        let mut p = Params::default();
        p.authority = "gov".into();
        p.unbonding_time_secs = 100;
        let mut k = Keeper::new(p, MemoryBank::new());
        k.begin_block(BlockInfo {
            height: 1,
            time: 10,
            ..Default::default()
        });
        k
    }

    fn create(op: &ValAddress, amount: u128) -> StakingMsg {
        StakingMsg::CreateValidator(MsgCreateValidator {
            description: Description::with_moniker("node"),
            commission: CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
            min_self_delegation: 10,
            validator_address: op.clone(),
            pubkey: ConsPubKey(vec![3; 32]),
            value: Coin::new("uamun", amount),
        })
    }

    #[test]
    fn create_then_delegate_and_undelegate() {
        let mut k = keeper();
        let op = ValAddress(vec![1; 20]);
        k.bank_mut().mint_to(&op.to_account(), 100);
        assert_eq!(k.handle(&create(&op, 100)), Ok(MsgResponse::Empty));
        assert_eq!(k.state().validators[&op].tokens, 100);

        let del = AccAddress(vec![5; 20]);
        k.bank_mut().mint_to(&del, 50);
        k.handle(&StakingMsg::Delegate(MsgDelegate {
            delegator_address: del.clone(),
            validator_address: op.clone(),
            amount: Coin::new("uamun", 50),
        }))
        .unwrap();
        let res = k
            .handle(&StakingMsg::Undelegate(MsgUndelegate {
                delegator_address: del,
                validator_address: op,
                amount: Coin::new("uamun", 20),
            }))
            .unwrap();
        assert_eq!(
            res,
            MsgResponse::Undelegate {
                completion_time: 110,
                amount: Coin::new("uamun", 20),
            }
        );
    }

    #[test]
    fn wrong_denom_rejected() {
        let mut k = keeper();
        let op = ValAddress(vec![1; 20]);
        let StakingMsg::CreateValidator(mut m) = create(&op, 100) else {
            unreachable!()
        };
        m.value.denom = "uatom".into();
        assert!(matches!(
            k.handle(&StakingMsg::CreateValidator(m)),
            Err(ExecError::Rejected(StakingError::BadDenom { .. }))
        ));
    }

    #[test]
    fn failed_self_delegation_rolls_back_creation() {
        let mut k = keeper();
        let op = ValAddress(vec![1; 20]);
        // operator has no funds
        assert!(matches!(
            k.handle(&create(&op, 100)),
            Err(ExecError::Rejected(StakingError::InsufficientFunds(_)))
        ));
        assert!(k.state().validators.is_empty());
        assert!(k.state().validators_by_cons.is_empty());
        assert_eq!(k.bank().spendable(&op.to_account()), 0);
    }

    #[test]
    fn params_update_requires_authority() {
        let mut k = keeper();
        let mut params = k.params().clone();
        params.max_validators = 3;
        let msg = |authority: &str| {
            StakingMsg::UpdateParams(MsgUpdateParams {
                authority: authority.into(),
                params: params.clone(),
            })
        };
        assert!(matches!(
            k.handle(&msg("mallory")),
            Err(ExecError::Rejected(StakingError::Unauthorized { .. }))
        ));
        k.handle(&msg("gov")).unwrap();
        assert_eq!(k.params().max_validators, 3);
    }
}
