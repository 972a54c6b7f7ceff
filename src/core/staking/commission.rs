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

//! Validator commission rates and their change rules.

use crate::core::math::{Dec, MathError};
use crate::core::staking::errors::StakingError;
use crate::core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Commission bounds chosen at validator creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    /// Current rate.
    pub rate: Dec,
    /// Upper bound the rate can ever reach.
    pub max_rate: Dec,
    /// Largest move allowed in a single update.
    pub max_change_rate: Dec,
}

impl CommissionRates {
    /// Build from values.
    pub fn new(rate: Dec, max_rate: Dec, max_change_rate: Dec) -> Self {
        Self {
            rate,
            max_rate,
            max_change_rate,
        }
    }

    /// Parse from decimal strings; a negative value is a `CommissionNegative`.
    pub fn parse(rate: &str, max_rate: &str, max_change_rate: &str) -> Result<Self, StakingError> {
        let p = |s: &str| -> Result<Dec, StakingError> {
            s.parse::<Dec>().map_err(|e| match e {
                MathError::Negative => StakingError::CommissionNegative,
                other => StakingError::InvalidParams(other.to_string()),
            })
        };
        Ok(Self::new(p(rate)?, p(max_rate)?, p(max_change_rate)?))
    }

    /// Check `rate <= max_rate <= 1` and `max_change_rate <= max_rate`.
    pub fn validate(&self) -> Result<(), StakingError> {
        if self.max_rate > Dec::one() {
            return Err(StakingError::CommissionHuge);
        }
        if self.rate > self.max_rate {
            return Err(StakingError::CommissionGTMaxRate);
        }
        if self.max_change_rate > self.max_rate {
            return Err(StakingError::CommissionChangeRateGTMaxRate);
        }
        Ok(())
    }
}

/// Commission with the time of its last change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    /// Rates.
    pub rates: CommissionRates,
    /// Last update time (unix seconds).
    pub update_time: Timestamp,
}

impl Commission {
    /// Initial commission; `update_time` is the creation time.
    pub fn new(rates: CommissionRates, now: Timestamp) -> Self {
        Self {
            rates,
            update_time: now,
        }
    }

    /// Current rate.
    pub fn rate(&self) -> Dec {
        self.rates.rate
    }

    /// Validate a proposed new rate against cooldown and bounds.
    pub fn validate_new_rate(
        &self,
        new_rate: Dec,
        now: Timestamp,
        cooldown_secs: u64,
    ) -> Result<(), StakingError> {
        if now.saturating_sub(self.update_time) < cooldown_secs {
            return Err(StakingError::CommissionUpdateTime);
        }
        if new_rate > self.rates.max_rate {
            return Err(StakingError::CommissionGTMaxRate);
        }
        if new_rate.abs_diff(self.rates.rate) > self.rates.max_change_rate {
            return Err(StakingError::CommissionGTMaxChangeRate);
        }
        Ok(())
    }

    /// Validate and apply a new rate.
    pub fn update(
        &mut self,
        new_rate: Dec,
        now: Timestamp,
        cooldown_secs: u64,
    ) -> Result<(), StakingError> {
        self.validate_new_rate(new_rate, now, cooldown_secs)?;
        self.rates.rate = new_rate;
        self.update_time = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn rates(r: u64, m: u64, c: u64) -> CommissionRates {
        CommissionRates::new(Dec::percent(r), Dec::percent(m), Dec::percent(c))
    }

    #[test]
    fn validate_bounds() {
        assert!(rates(10, 20, 1).validate().is_ok());
        assert_eq!(rates(30, 20, 1).validate(), Err(StakingError::CommissionGTMaxRate));
        assert_eq!(rates(10, 120, 1).validate(), Err(StakingError::CommissionHuge));
        assert_eq!(
            rates(10, 20, 30).validate(),
            Err(StakingError::CommissionChangeRateGTMaxRate)
        );
        assert_eq!(
            CommissionRates::parse("-0.1", "0.2", "0.01"),
            Err(StakingError::CommissionNegative)
        );
    }

    #[test]
    fn cooldown_boundary() {
        let mut c = Commission::new(rates(10, 20, 2), 1_000);
        assert_eq!(
            c.update(Dec::percent(11), 1_000 + DAY - 1, DAY),
            Err(StakingError::CommissionUpdateTime)
        );
        c.update(Dec::percent(11), 1_000 + DAY, DAY).unwrap();
        assert_eq!(c.rate(), Dec::percent(11));
        assert_eq!(
            c.update(Dec::percent(12), 1_000 + DAY + 10, DAY),
            Err(StakingError::CommissionUpdateTime)
        );
    }

    #[test]
    fn change_is_bounded_both_ways() {
        let c = Commission::new(rates(10, 20, 2), 0);
        assert_eq!(
            c.validate_new_rate(Dec::percent(13), DAY, DAY),
            Err(StakingError::CommissionGTMaxChangeRate)
        );
        assert_eq!(
            c.validate_new_rate(Dec::percent(7), DAY, DAY),
            Err(StakingError::CommissionGTMaxChangeRate)
        );
        assert_eq!(
            c.validate_new_rate(Dec::percent(21), DAY, DAY),
            Err(StakingError::CommissionGTMaxRate)
        );
        assert!(c.validate_new_rate(Dec::percent(8), DAY, DAY).is_ok());
    }
}
