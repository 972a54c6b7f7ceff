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

//! Collaborators the ledger consumes: token movements and work metering.

use crate::core::math::Amount;
use crate::core::staking::errors::StakingError;
use crate::core::types::AccAddress;
use std::collections::BTreeMap;

/// Module account holding tokens of bonded validators.
pub const BONDED_POOL: &str = "bonded_tokens_pool";
/// Module account holding tokens of unbonded/unbonding validators and
/// unbonding entries.
pub const NOT_BONDED_POOL: &str = "not_bonded_tokens_pool";

/// Token movements between accounts and the staking pools.
pub trait BankKeeper {
    /// Move `amount` from a delegator's spendable balance into `pool`.
    fn delegate_coins_from_account_to_module(
        &mut self,
        from: &AccAddress,
        pool: &'static str,
        amount: Amount,
    ) -> Result<(), StakingError>;

    /// Release `amount` from `pool` back to a delegator.
    fn undelegate_coins_from_module_to_account(
        &mut self,
        pool: &'static str,
        to: &AccAddress,
        amount: Amount,
    ) -> Result<(), StakingError>;

    /// Move tokens between pools.
    fn send_coins_from_module_to_module(
        &mut self,
        from: &'static str,
        to: &'static str,
        amount: Amount,
    ) -> Result<(), StakingError>;

    /// Destroy tokens held by `pool`.
    fn burn_coins(&mut self, pool: &'static str, amount: Amount) -> Result<(), StakingError>;

    /// Balance of a pool.
    fn module_balance(&self, pool: &'static str) -> Amount;

    /// Spendable balance of an account.
    fn spendable(&self, addr: &AccAddress) -> Amount;
}

/// In-memory bank used by the daemon and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryBank {
    accounts: BTreeMap<AccAddress, Amount>,
    modules: BTreeMap<&'static str, Amount>,
    burned: Amount,
}

impl MemoryBank {
    /// Empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account (genesis / faucet).
    pub fn mint_to(&mut self, addr: &AccAddress, amount: Amount) {
        let bal = self.accounts.entry(addr.clone()).or_insert(0);
        *bal = bal.saturating_add(amount);
    }

    /// Total burned so far.
    pub fn burned(&self) -> Amount {
        self.burned
    }

    fn debit_module(&mut self, pool: &'static str, amount: Amount) -> Result<(), StakingError> {
        let bal = self.modules.entry(pool).or_insert(0);
        if *bal < amount {
            return Err(StakingError::InsufficientFunds(format!(
                "{pool} has {bal}, needs {amount}"
            )));
        }
        *bal -= amount;
        Ok(())
    }

    fn credit_module(&mut self, pool: &'static str, amount: Amount) {
        let bal = self.modules.entry(pool).or_insert(0);
        *bal = bal.saturating_add(amount);
    }
}

impl BankKeeper for MemoryBank {
    fn delegate_coins_from_account_to_module(
        &mut self,
        from: &AccAddress,
        pool: &'static str,
        amount: Amount,
    ) -> Result<(), StakingError> {
        let bal = self.accounts.entry(from.clone()).or_insert(0);
        if *bal < amount {
            return Err(StakingError::InsufficientFunds(format!(
                "{from} has {bal}, needs {amount}"
            )));
        }
        *bal -= amount;
        self.credit_module(pool, amount);
        Ok(())
    }

    fn undelegate_coins_from_module_to_account(
        &mut self,
        pool: &'static str,
        to: &AccAddress,
        amount: Amount,
    ) -> Result<(), StakingError> {
        self.debit_module(pool, amount)?;
        self.mint_to(to, amount);
        Ok(())
    }

    fn send_coins_from_module_to_module(
        &mut self,
        from: &'static str,
        to: &'static str,
        amount: Amount,
    ) -> Result<(), StakingError> {
        self.debit_module(from, amount)?;
        self.credit_module(to, amount);
        Ok(())
    }

    fn burn_coins(&mut self, pool: &'static str, amount: Amount) -> Result<(), StakingError> {
        self.debit_module(pool, amount)?;
        self.burned = self.burned.saturating_add(amount);
        Ok(())
    }

    fn module_balance(&self, pool: &'static str) -> Amount {
        self.modules.get(pool).copied().unwrap_or(0)
    }

    fn spendable(&self, addr: &AccAddress) -> Amount {
        self.accounts.get(addr).copied().unwrap_or(0)
    }
}

/// Sink for metered work units.
pub trait WorkMeter {
    /// Record `units` of work for `descriptor`.
    fn consume(&mut self, units: u64, descriptor: &'static str);
    /// Units consumed so far.
    fn consumed(&self) -> u64;
}

/// Meter that only counts.
#[derive(Clone, Debug, Default)]
pub struct CountingMeter {
    total: u64,
}

impl WorkMeter for CountingMeter {
    fn consume(&mut self, units: u64, _descriptor: &'static str) {
        self.total = self.total.saturating_add(units);
    }

    fn consumed(&self) -> u64 {
        self.total
    }
}
