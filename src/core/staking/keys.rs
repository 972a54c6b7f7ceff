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

//! Store key layout for the staking keyspaces.
//!
//! Variable-length addresses are length-prefixed with one byte so composite
//! keys stay unambiguous and sort by their first component.

use crate::core::math::Amount;
use crate::core::types::{AccAddress, ConsAddress, Timestamp, ValAddress, MAX_ADDR_LEN};

/// Last validator power, by operator.
pub const LAST_VALIDATOR_POWER: u8 = 0x11;
/// Last total power.
pub const LAST_TOTAL_POWER: u8 = 0x12;
/// Validator records, by operator.
pub const VALIDATORS: u8 = 0x21;
/// Operator, by consensus address.
pub const VALIDATORS_BY_CONS_ADDR: u8 = 0x22;
/// Power ranking index.
pub const VALIDATORS_BY_POWER_INDEX: u8 = 0x23;
/// Delegations, by (delegator, validator).
pub const DELEGATIONS: u8 = 0x31;
/// Unbonding delegations, by (delegator, validator).
pub const UNBONDING_DELEGATIONS: u8 = 0x32;
/// Unbonding delegations, by (validator, delegator).
pub const UNBONDING_DELEGATIONS_BY_VAL: u8 = 0x33;
/// Redelegations, by (delegator, src, dst).
pub const REDELEGATIONS: u8 = 0x34;
/// Redelegations, by (src, delegator, dst).
pub const REDELEGATIONS_BY_SRC: u8 = 0x35;
/// Redelegations, by (dst, delegator, src).
pub const REDELEGATIONS_BY_DST: u8 = 0x36;
/// Unbonding id counter.
pub const UNBONDING_ID: u8 = 0x37;
/// Unbonding id to owning record.
pub const UNBONDING_INDEX: u8 = 0x38;
/// Unbonding id to record type.
pub const UNBONDING_TYPE: u8 = 0x39;
/// Unbonding delegation maturity queue.
pub const UBD_QUEUE: u8 = 0x41;
/// Redelegation maturity queue.
pub const REDELEGATION_QUEUE: u8 = 0x42;
/// Validator maturity queue.
pub const VALIDATOR_QUEUE: u8 = 0x43;
/// Historical info, by height.
pub const HISTORICAL_INFO: u8 = 0x50;
/// Params singleton.
pub const PARAMS: u8 = 0x51;

/// All prefixes owned by the staking store.
pub const ALL_PREFIXES: [u8; 19] = [
    LAST_VALIDATOR_POWER,
    LAST_TOTAL_POWER,
    VALIDATORS,
    VALIDATORS_BY_CONS_ADDR,
    VALIDATORS_BY_POWER_INDEX,
    DELEGATIONS,
    UNBONDING_DELEGATIONS,
    UNBONDING_DELEGATIONS_BY_VAL,
    REDELEGATIONS,
    REDELEGATIONS_BY_SRC,
    REDELEGATIONS_BY_DST,
    UNBONDING_ID,
    UNBONDING_INDEX,
    UNBONDING_TYPE,
    UBD_QUEUE,
    REDELEGATION_QUEUE,
    VALIDATOR_QUEUE,
    HISTORICAL_INFO,
    PARAMS,
];

// Callers reject addresses longer than MAX_ADDR_LEN before they reach a key.
fn push_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    debug_assert!(bytes.len() <= MAX_ADDR_LEN);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
}

fn key(prefix: u8, parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + parts.iter().map(|p| p.len() + 1).sum::<usize>());
    out.push(prefix);
    for p in parts {
        push_len_prefixed(&mut out, p);
    }
    out
}

/// Split the length-prefixed components following the prefix byte.
pub fn split_components(k: &[u8]) -> Option<Vec<&[u8]>> {
    let mut rest = k.get(1..)?;
    let mut out = Vec::new();
    while let Some((&len, tail)) = rest.split_first() {
        let len = len as usize;
        out.push(tail.get(..len)?);
        rest = &tail[len..];
    }
    Some(out)
}

/// Big-endian u64 at `offset`.
pub fn read_u64_be(k: &[u8], offset: usize) -> Option<u64> {
    let b: [u8; 8] = k.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_be_bytes(b))
}

/// Tokens to consensus power.
pub fn tokens_to_consensus_power(tokens: Amount, power_reduction: Amount) -> u64 {
    if power_reduction == 0 {
        return 0;
    }
    let p = tokens / power_reduction;
    if p > u64::MAX as u128 {
        u64::MAX
    } else {
        p as u64
    }
}

/// Power ranking key:
/// `prefix || 8 || power (u64 BE) || len(addr) || !addr`.
///
/// Iterated in reverse byte order this yields higher power first and, among
/// equal powers, ascending operator address.
pub fn power_index_key(operator: &ValAddress, tokens: Amount, power_reduction: Amount) -> Vec<u8> {
    let power = tokens_to_consensus_power(tokens, power_reduction);
    let addr = operator.as_bytes();
    let mut out = Vec::with_capacity(1 + 1 + 8 + 1 + addr.len());
    out.push(VALIDATORS_BY_POWER_INDEX);
    out.push(8);
    out.extend_from_slice(&power.to_be_bytes());
    debug_assert!(addr.len() <= MAX_ADDR_LEN);
    out.push(addr.len() as u8);
    out.extend(addr.iter().map(|b| !b));
    out
}

/// Decode the operator from a power ranking key.
pub fn operator_from_power_index_key(k: &[u8]) -> Option<ValAddress> {
    if k.len() < 11 || k[0] != VALIDATORS_BY_POWER_INDEX || k[1] != 8 {
        return None;
    }
    let len = k[10] as usize;
    let inv = k.get(11..11 + len)?;
    Some(ValAddress(inv.iter().map(|b| !b).collect()))
}

/// Validator record key.
pub fn validator_key(operator: &ValAddress) -> Vec<u8> {
    key(VALIDATORS, &[operator.as_bytes()])
}

/// Consensus address index key.
pub fn validator_by_cons_addr_key(cons: &ConsAddress) -> Vec<u8> {
    key(VALIDATORS_BY_CONS_ADDR, &[cons.as_bytes()])
}

/// Last power key.
pub fn last_validator_power_key(operator: &ValAddress) -> Vec<u8> {
    key(LAST_VALIDATOR_POWER, &[operator.as_bytes()])
}

/// Delegation key.
pub fn delegation_key(del: &AccAddress, val: &ValAddress) -> Vec<u8> {
    key(DELEGATIONS, &[del.as_bytes(), val.as_bytes()])
}

/// Unbonding delegation key.
pub fn ubd_key(del: &AccAddress, val: &ValAddress) -> Vec<u8> {
    key(UNBONDING_DELEGATIONS, &[del.as_bytes(), val.as_bytes()])
}

/// Unbonding delegation by-validator index key.
pub fn ubd_by_val_index_key(del: &AccAddress, val: &ValAddress) -> Vec<u8> {
    key(UNBONDING_DELEGATIONS_BY_VAL, &[val.as_bytes(), del.as_bytes()])
}

/// Redelegation key.
pub fn red_key(del: &AccAddress, src: &ValAddress, dst: &ValAddress) -> Vec<u8> {
    key(REDELEGATIONS, &[del.as_bytes(), src.as_bytes(), dst.as_bytes()])
}

/// Redelegation by-source index key.
pub fn red_by_src_index_key(del: &AccAddress, src: &ValAddress, dst: &ValAddress) -> Vec<u8> {
    key(REDELEGATIONS_BY_SRC, &[src.as_bytes(), del.as_bytes(), dst.as_bytes()])
}

/// Redelegation by-destination index key.
pub fn red_by_dst_index_key(del: &AccAddress, src: &ValAddress, dst: &ValAddress) -> Vec<u8> {
    key(REDELEGATIONS_BY_DST, &[dst.as_bytes(), del.as_bytes(), src.as_bytes()])
}

/// Time-bucketed queue key (unbonding or redelegation).
pub fn time_queue_key(prefix: u8, time: Timestamp) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    out.push(prefix);
    out.extend_from_slice(&time.to_be_bytes());
    out
}

/// Validator queue key: `prefix || time (BE) || height (BE)`.
pub fn validator_queue_key(time: Timestamp, height: u64) -> Vec<u8> {
    let mut out = time_queue_key(VALIDATOR_QUEUE, time);
    out.extend_from_slice(&height.to_be_bytes());
    out
}

/// Unbonding index key.
pub fn unbonding_index_key(id: u64) -> Vec<u8> {
    let mut out = vec![UNBONDING_INDEX];
    out.extend_from_slice(&id.to_be_bytes());
    out
}

/// Unbonding type key.
pub fn unbonding_type_key(id: u64) -> Vec<u8> {
    let mut out = vec![UNBONDING_TYPE];
    out.extend_from_slice(&id.to_be_bytes());
    out
}

/// Historical info key.
pub fn historical_info_key(height: u64) -> Vec<u8> {
    let mut out = vec![HISTORICAL_INFO];
    out.extend_from_slice(&height.to_be_bytes());
    out
}
