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

//! Governance-controlled staking parameters and the work cost model.

use crate::core::math::{Amount, Dec};
use crate::core::staking::errors::StakingError;
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: u64 = 86_400;

/// Default unbonding period: 21 days.
pub const DEFAULT_UNBONDING_TIME: u64 = 21 * SECONDS_PER_DAY;
/// Default size of the active set.
pub const DEFAULT_MAX_VALIDATORS: u32 = 100;
/// Default cap on unbonding/redelegation entries per pair/triple.
pub const DEFAULT_MAX_ENTRIES: u32 = 7;
/// Default number of historical info entries kept.
pub const DEFAULT_HISTORICAL_ENTRIES: u32 = 10_000;
/// Default tokens per unit of consensus power.
pub const DEFAULT_POWER_REDUCTION: Amount = 1_000_000;
/// Minimum spacing between commission changes.
pub const DEFAULT_COMMISSION_COOLDOWN: u64 = SECONDS_PER_DAY;

/// Staking parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Unbonding period in seconds.
    pub unbonding_time_secs: u64,
    /// Maximum number of bonded validators.
    pub max_validators: u32,
    /// Maximum entries per unbonding pair / redelegation triple.
    pub max_entries: u32,
    /// Number of historical info entries to keep (0 disables tracking).
    pub historical_entries: u32,
    /// Bondable denomination.
    pub bond_denom: String,
    /// Lower bound on any validator commission rate.
    pub min_commission_rate: Dec,
    /// Tokens per unit of consensus power.
    pub power_reduction: Amount,
    /// Minimum seconds between two commission changes.
    pub commission_cooldown_secs: u64,
    /// Account allowed to submit `UpdateParams` (hex).
    pub authority: String,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            unbonding_time_secs: DEFAULT_UNBONDING_TIME,
            max_validators: DEFAULT_MAX_VALIDATORS,
            max_entries: DEFAULT_MAX_ENTRIES,
            historical_entries: DEFAULT_HISTORICAL_ENTRIES,
            bond_denom: "uamun".to_string(),
            min_commission_rate: Dec::zero(),
            power_reduction: DEFAULT_POWER_REDUCTION,
            commission_cooldown_secs: DEFAULT_COMMISSION_COOLDOWN,
            authority: String::new(),
        }
    }
}

impl Params {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), StakingError> {
        let bad = |m: &str| Err(StakingError::InvalidParams(m.to_string()));
        if self.unbonding_time_secs == 0 {
            return bad("unbonding time must be positive");
        }
        if self.max_validators == 0 {
            return bad("max validators must be positive");
        }
        if self.max_entries == 0 {
            return bad("max entries must be positive");
        }
        if self.bond_denom.trim().is_empty() {
            return bad("bond denom cannot be blank");
        }
        if self.min_commission_rate > Dec::one() {
            return bad("minimum commission rate cannot be greater than 100%");
        }
        if self.power_reduction == 0 {
            return bad("power reduction must be positive");
        }
        Ok(())
    }
}

/// Work units charged per loop iteration. Exposed so hosts can tune the
/// metering policy without code changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkCosts {
    /// Per unbonding/redelegation entry visited.
    pub per_entry: u64,
    /// Per validator visited while walking an index.
    pub per_validator: u64,
    /// Per queue slice or record written.
    pub per_write: u64,
}

impl Default for WorkCosts {
    fn default() -> Self {
        Self {
            per_entry: 10,
            per_validator: 20,
            per_write: 30,
        }
    }
}
