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

use super::Keeper;
use crate::core::staking::delegation::HistoricalInfo;
use crate::core::staking::errors::ExecResult;
use crate::core::staking::expected::BankKeeper;
use crate::core::staking::validator::Validator;
use std::cmp::Reverse;

impl<B: BankKeeper> Keeper<B> {
    /// Record the current header and bonded set, pruning entries older than
    /// `historical_entries` blocks.
    pub fn track_historical_info(&mut self) -> ExecResult<()> {
        let entries = self.state.params.historical_entries as u64;
        let height = self.height();

        let cutoff = height.saturating_sub(entries);
        let stale: Vec<u64> = self
            .state
            .historical_info
            .range(..=cutoff)
            .map(|(h, _)| *h)
            .collect();
        for h in stale {
            self.state.historical_info.remove(&h);
        }
        if entries == 0 {
            return Ok(());
        }

        let mut valset: Vec<(u64, Validator)> = Vec::new();
        for (addr, power) in self.state.last_validator_powers.clone() {
            valset.push((power, self.must_get_validator(&addr)?));
        }
        valset.sort_by_key(|(p, v)| (Reverse(*p), v.operator.clone()));
        let valset: Vec<Validator> = valset.into_iter().map(|(_, v)| v).collect();

        // Nothing to record before the first validator bonds.
        let Ok(info) = HistoricalInfo::new(self.block.clone(), valset) else {
            return Ok(());
        };
        self.state.historical_info.insert(height, info);
        Ok(())
    }

    /// Header and bonded set stored for `height`.
    pub fn get_historical_info(&self, height: u64) -> Option<&HistoricalInfo> {
        self.state.historical_info.get(&height)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::math::Dec;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::expected::MemoryBank;
    use crate::core::staking::keeper::Keeper;
    use crate::core::staking::params::Params;
    use crate::core::staking::validator::{BondStatus, Description};
    use crate::core::types::{BlockInfo, ConsPubKey, ValAddress};

    #[test]
    fn keeps_a_window_sorted_by_power() {
        let mut p = Params::default();
        p.historical_entries = 2;
        p.power_reduction = 1;
        let mut k = Keeper::new(p, MemoryBank::new());
        for (b, stake) in [(1u8, 10u128), (2, 30)] {
            let op = ValAddress(vec![b; 20]);
            k.create_validator(
                op.clone(),
                ConsPubKey(vec![b; 32]),
                Description::default(),
                CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
                1,
            )
            .unwrap();
            k.bank_mut().mint_to(&op.to_account(), stake);
            k.delegate(&op.to_account(), stake, BondStatus::Unbonded, &op, true)
                .unwrap();
        }

        k.begin_block(BlockInfo {
            height: 1,
            time: 10,
            ..Default::default()
        });
        // empty bonded set: nothing recorded
        k.track_historical_info().unwrap();
        assert!(k.get_historical_info(1).is_none());

        for h in 2..=5 {
            k.begin_block(BlockInfo {
                height: h,
                time: 10 * h,
                ..Default::default()
            });
            k.end_block().unwrap();
        }
        let kept: Vec<u64> = k.state().historical_info.keys().copied().collect();
        assert_eq!(kept, vec![4, 5]);
        let info = k.get_historical_info(5).unwrap();
        assert_eq!(info.valset[0].operator, ValAddress(vec![2; 20]));
        assert_eq!(info.header.height, 5);
    }
}
