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

//! The staking keeper: owns the ledger state and drives every transition.
//!
//! Keeper methods validate before they mutate, but a multi-step operation
//! (hooks, bank transfers, nested unbond/delegate) is only atomic when run
//! through [`Keeper::execute`], which snapshots state and bank and restores
//! both on failure. Message handlers and `end_block` always go through it.

mod delegation;
mod historical;
mod invariants;
mod msg_server;
mod query;
mod redelegation;
mod slash;
mod unbonding;
mod val_state_change;
mod validator;

pub use invariants::InvariantReport;
pub use query::Pool;
pub use val_state_change::{EndBlockReport, ValidatorUpdate};

use crate::core::staking::errors::{ExecError, ExecResult, LedgerFault};
use crate::core::staking::expected::{BankKeeper, CountingMeter, WorkMeter};
use crate::core::staking::hooks::MultiStakingHooks;
use crate::core::staking::params::{Params, WorkCosts};
use crate::core::staking::state::StakingState;
use crate::core::staking::validator::Validator;
use crate::core::types::{BlockInfo, ValAddress};
use tracing::error;

/// Staking keeper over a bank implementation `B`.
pub struct Keeper<B: BankKeeper> {
    state: StakingState,
    bank: B,
    hooks: MultiStakingHooks,
    meter: Box<dyn WorkMeter>,
    costs: WorkCosts,
    block: BlockInfo,
}

impl<B: BankKeeper> Keeper<B> {
    /// Fresh ledger with `params`.
    pub fn new(params: Params, bank: B) -> Self {
        Self::with_state(StakingState::new(params), bank)
    }

    /// Keeper over an existing (e.g. loaded) ledger.
    pub fn with_state(state: StakingState, bank: B) -> Self {
        Self {
            state,
            bank,
            hooks: MultiStakingHooks::new(),
            meter: Box::new(CountingMeter::default()),
            costs: WorkCosts::default(),
            block: BlockInfo::default(),
        }
    }

    /// Replace the hook subscribers.
    pub fn set_hooks(&mut self, hooks: MultiStakingHooks) {
        self.hooks = hooks;
    }

    /// Replace the work meter.
    pub fn set_meter(&mut self, meter: Box<dyn WorkMeter>) {
        self.meter = meter;
    }

    /// Replace the per-iteration work costs.
    pub fn set_work_costs(&mut self, costs: WorkCosts) {
        self.costs = costs;
    }

    /// Units consumed by the meter so far.
    pub fn work_consumed(&self) -> u64 {
        self.meter.consumed()
    }

    /// Set the header of the block being executed.
    pub fn begin_block(&mut self, block: BlockInfo) {
        self.block = block;
    }

    /// Header of the block being executed.
    pub fn block_info(&self) -> &BlockInfo {
        &self.block
    }

    /// Ledger state.
    pub fn state(&self) -> &StakingState {
        &self.state
    }

    /// Consume the keeper, returning state and bank.
    pub fn into_parts(self) -> (StakingState, B) {
        (self.state, self.bank)
    }

    /// Bank.
    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Mutable bank (genesis funding, tests).
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Current params.
    pub fn params(&self) -> &Params {
        &self.state.params
    }

    fn now(&self) -> u64 {
        self.block.time
    }

    fn height(&self) -> u64 {
        self.block.height
    }

    fn consume(&mut self, units: u64, descriptor: &'static str) {
        self.meter.consume(units, descriptor);
    }

    fn must_get_validator(&self, addr: &ValAddress) -> ExecResult<Validator> {
        self.state
            .validators
            .get(addr)
            .cloned()
            .ok_or_else(|| LedgerFault::MissingValidator(addr.to_string()).into())
    }
}

impl<B: BankKeeper + Clone> Keeper<B> {
    /// Run `f` atomically: on any error the ledger and bank are restored to
    /// their state before the call. Faults are logged.
    ///
    /// The snapshot is a full clone of the ledger and bank, so each call costs
    /// time and memory linear in ledger size. Keeper operations reject bad
    /// input before their first write; the snapshot only matters for hook
    /// errors and faults raised mid-operation. Callers that never install
    /// failing hooks may call the keeper operations directly.
    pub fn execute<T>(&mut self, f: impl FnOnce(&mut Self) -> ExecResult<T>) -> ExecResult<T> {
        let state = self.state.clone();
        let bank = self.bank.clone();
        let res = f(self);
        if let Err(e) = &res {
            if let ExecError::Fault(fault) = e {
                error!(%fault, height = self.block.height, "staking ledger fault");
            }
            self.state = state;
            self.bank = bank;
        }
        res
    }
}
