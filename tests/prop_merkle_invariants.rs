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

use proptest::prelude::*;

use amunchain_staking::core::staking::keys;
use amunchain_staking::core::state::merkle::{merkle_proof_sorted, merkle_root_sorted, verify_pair, verify_proof};
use amunchain_staking::core::types::{AccAddress, ValAddress};

proptest! {
    #[test]
    fn merkle_proof_verifies_for_every_leaf(
        entries in proptest::collection::btree_map(
            (prop::collection::vec(any::<u8>(), 20), prop::collection::vec(any::<u8>(), 20)),
            any::<[u8; 32]>(),
            1..48,
        )
    ) {
        let mut kv_pairs: Vec<(Vec<u8>, Vec<u8>)> = entries
            .iter()
            .map(|((d, v), value)| {
                (keys::delegation_key(&AccAddress(d.clone()), &ValAddress(v.clone())), value.to_vec())
            })
            .collect();
        kv_pairs.sort_by(|a, b| a.0.cmp(&b.0));
        kv_pairs.dedup_by(|a, b| a.0 == b.0);

        let root = merkle_root_sorted(&kv_pairs);
        for (i, (k, v)) in kv_pairs.iter().enumerate() {
            let proof = merkle_proof_sorted(&kv_pairs, i).unwrap();
            prop_assert!(verify_proof(root, &proof));
            prop_assert!(verify_pair(root, k, v, &proof));
        }
        prop_assert!(merkle_proof_sorted(&kv_pairs, kv_pairs.len()).is_none());
    }
}
