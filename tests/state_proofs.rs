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
use amunchain_staking::core::staking::keys;
use amunchain_staking::core::staking::validator::{BondStatus, Description};
use amunchain_staking::core::staking::{Keeper, Params};
use amunchain_staking::core::state::merkle::verify_pair;
use amunchain_staking::core::state::persistent_state::PersistentState;
use amunchain_staking::core::types::{decode_canonical_limited, AccAddress, BlockInfo, ConsPubKey, ValAddress};
use amunchain_staking::core::staking::delegation::Delegation;

#[test]
fn committed_delegation_is_provable() {
    let mut k = Keeper::new(Params::default(), MemoryBank::new());
    k.begin_block(BlockInfo {
        height: 1,
        time: 1,
        ..Default::default()
    });
    let op = ValAddress(vec![1; 20]);
    k.create_validator(
        op.clone(),
        ConsPubKey(vec![1; 32]),
        Description::with_moniker("v"),
        CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
        1,
    )
    .unwrap();
    let del = AccAddress(vec![2; 20]);
    k.bank_mut().mint_to(&del, 5_000_000);
    k.delegate(&del, 5_000_000, BondStatus::Unbonded, &op, true)
        .unwrap();
    k.end_block().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let st = PersistentState::open(dir.path()).unwrap();
    let root = k.state().commit(&st).unwrap();
    assert_eq!(root, st.state_root().unwrap());

    let key = keys::delegation_key(&del, &op);
    let (k2, value, root2, proof) = st.prove_key(&key).unwrap().unwrap();
    assert_eq!(k2, key);
    assert_eq!(root, root2);
    assert!(PersistentState::verify_proof(root, &proof));
    assert!(verify_pair(root, &key, &value, &proof));

    let d: Delegation = decode_canonical_limited(&value, 4096).unwrap();
    assert_eq!(d.shares, Dec::from_int(5_000_000));

    // a forged value does not verify
    assert!(!verify_pair(root, &key, b"forged", &proof));
    assert!(st
        .prove_key(&keys::delegation_key(&del, &ValAddress(vec![9; 20])))
        .unwrap()
        .is_none());
}
