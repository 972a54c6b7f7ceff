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

use amunchain_staking::core::math::Dec;
use amunchain_staking::core::staking::commission::CommissionRates;
use amunchain_staking::core::staking::expected::MemoryBank;
use amunchain_staking::core::staking::validator::{BondStatus, Description};
use amunchain_staking::core::staking::{Keeper, Params, StakingState};
use amunchain_staking::core::state::persistent_state::PersistentState;
use amunchain_staking::core::types::{AccAddress, BlockInfo, ConsPubKey, ValAddress};
use proptest::prelude::*;

/// (delegator byte, validator index, amount, undelegate percent)
type Op = (u8, usize, u128, u8);

fn replay(ops: &[Op]) -> StakingState {
    let mut p = Params::default();
    p.power_reduction = 1;
    p.max_validators = 2;
    let mut k = Keeper::new(p, MemoryBank::new());
    let vals: Vec<ValAddress> = (1..=3u8).map(|b| ValAddress(vec![b; 20])).collect();
    k.begin_block(BlockInfo {
        height: 1,
        time: 10,
        ..Default::default()
    });
    for (i, op) in vals.iter().enumerate() {
        k.create_validator(
            op.clone(),
            ConsPubKey(vec![i as u8 + 1; 32]),
            Description::with_moniker("v"),
            CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
            1,
        )
        .unwrap();
    }
    for (h, (d, vi, amount, pct)) in ops.iter().enumerate() {
        k.begin_block(BlockInfo {
            height: h as u64 + 2,
            time: 10 + 5 * (h as u64 + 1),
            ..Default::default()
        });
        let del = AccAddress(vec![100 + d; 20]);
        let val = &vals[*vi];
        k.bank_mut().mint_to(&del, *amount);
        k.delegate(&del, *amount, BondStatus::Unbonded, val, true)
            .unwrap();
        if *pct > 0 {
            let shares = k.delegation(&del, val).unwrap().shares;
            let part = shares.mul_truncate(Dec::percent(*pct as u64)).unwrap();
            if !part.is_zero() {
                let _ = k.execute(|k| k.undelegate(&del, val, part));
            }
        }
        k.execute(|k| k.end_block()).unwrap();
    }
    k.state().clone()
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec((0u8..4, 0usize..3, 1u128..1_000_000, 0u8..60), 1..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_state_root_deterministic(ops in ops()) {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        let st1 = PersistentState::open(dir1.path()).unwrap();
        let st2 = PersistentState::open(dir2.path()).unwrap();

        let r1 = replay(&ops).commit(&st1).unwrap();
        let r2 = replay(&ops).commit(&st2).unwrap();
        prop_assert_eq!(r1, r2);
        prop_assert_eq!(r1, st1.state_root().unwrap());
    }

    #[test]
    fn prop_recommit_over_older_snapshot_matches_fresh(ops in ops()) {
        let split = ops.len() / 2;
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        let reused = PersistentState::open(dir1.path()).unwrap();
        let fresh = PersistentState::open(dir2.path()).unwrap();

        replay(&ops[..split]).commit(&reused).unwrap();
        let full = replay(&ops);
        prop_assert_eq!(full.commit(&reused).unwrap(), full.commit(&fresh).unwrap());
        prop_assert_eq!(StakingState::load(&reused).unwrap(), full);
    }
}
