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
use amunchain_staking::core::staking::commission::{Commission, CommissionRates};
use amunchain_staking::core::staking::keys::power_index_key;
use amunchain_staking::core::staking::validator::{Description, Validator};
use amunchain_staking::core::types::{ConsPubKey, ValAddress};
use proptest::prelude::*;

fn validator() -> Validator {
    Validator::new(
        ValAddress(vec![7; 20]),
        ConsPubKey(vec![7; 32]),
        Description::default(),
        Commission::new(
            CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
            0,
        ),
        1,
    )
}

fn dec() -> impl Strategy<Value = Dec> {
    (0u128..1_000_000_000_000, 1u128..1_000_000).prop_map(|(n, d)| Dec::from_ratio(n, d).unwrap())
}

proptest! {
    #[test]
    fn rounding_modes_bracket_each_other(a in dec(), b in dec()) {
        let lo = a.mul_truncate(b).unwrap();
        let mid = a.mul(b).unwrap();
        let hi = a.mul_round_up(b).unwrap();
        prop_assert!(lo <= mid && mid <= hi);
        prop_assert!(hi.checked_sub(lo).unwrap() <= Dec::from_raw(1u64.into()));

        if !b.is_zero() {
            let lo = a.quo_truncate(b).unwrap();
            let mid = a.quo(b).unwrap();
            let hi = a.quo_round_up(b).unwrap();
            prop_assert!(lo <= mid && mid <= hi);
        }
    }

    #[test]
    fn shares_convert_back_to_at_most_the_tokens(
        deposits in prop::collection::vec(1u128..1_000_000_000, 1..8),
        slash_permille in 0u128..900,
        pick in any::<u64>(),
    ) {
        let mut v = validator();
        for d in &deposits {
            v.add_tokens_from_del(*d).unwrap();
        }
        let slash = v.tokens * slash_permille / 1000;
        v.remove_tokens(slash).unwrap();
        prop_assume!(v.tokens > 0);

        let x = (pick as u128) % v.tokens + 1;
        let shares = v.shares_from_tokens(x).unwrap();
        let back = v.tokens_from_shares_truncated(shares).unwrap().truncate_int().unwrap();
        prop_assert!(back <= x);
        prop_assert!(back + 1 >= x);

        let up = v.tokens_from_shares_round_up(shares).unwrap();
        prop_assert!(up >= v.tokens_from_shares_truncated(shares).unwrap());
    }

    #[test]
    fn power_index_orders_by_power(
        a in 0u128..1_000_000_000_000,
        b in 0u128..1_000_000_000_000,
        op_a in prop::collection::vec(any::<u8>(), 20),
        op_b in prop::collection::vec(any::<u8>(), 20),
    ) {
        let reduction = 1_000_000;
        let ka = power_index_key(&ValAddress(op_a.clone()), a, reduction);
        let kb = power_index_key(&ValAddress(op_b.clone()), b, reduction);
        let (pa, pb) = (a / reduction, b / reduction);
        if pa < pb {
            prop_assert!(ka < kb);
        } else if pa > pb {
            prop_assert!(ka > kb);
        } else if op_a < op_b {
            // equal power: reverse iteration yields the lower address first
            prop_assert!(ka > kb);
        }
    }
}
