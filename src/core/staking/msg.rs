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

//! Staking transaction messages and their type-url registry.

use crate::core::math::{Amount, Dec};
use crate::core::staking::commission::CommissionRates;
use crate::core::staking::errors::StakingError;
use crate::core::staking::params::Params;
use crate::core::staking::validator::Description;
use crate::core::types::{
    decode_canonical_limited, encode_canonical, AccAddress, CodecError, Coin, ConsPubKey,
    Timestamp, ValAddress, MAX_ADDR_LEN,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Upper bound on an encoded message.
pub const MAX_MSG_BYTES: usize = 64 * 1024;

pub(crate) fn require_addr(addr: &[u8], what: &str) -> Result<(), StakingError> {
    if addr.is_empty() {
        return Err(StakingError::InvalidParams(format!("empty {what} address")));
    }
    if addr.len() > MAX_ADDR_LEN {
        return Err(StakingError::InvalidParams(format!(
            "{what} address longer than {MAX_ADDR_LEN} bytes"
        )));
    }
    Ok(())
}

fn require_positive(c: &Coin) -> Result<(), StakingError> {
    if c.amount == 0 {
        return Err(StakingError::InvalidAmount);
    }
    if c.denom.trim().is_empty() {
        return Err(StakingError::BadDenom {
            got: c.denom.clone(),
            expected: "a denom".to_string(),
        });
    }
    Ok(())
}

/// Register a validator and self-delegate `value`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateValidator {
    pub description: Description,
    pub commission: CommissionRates,
    pub min_self_delegation: Amount,
    pub validator_address: ValAddress,
    pub pubkey: ConsPubKey,
    pub value: Coin,
}

/// Edit metadata, commission rate or minimum self-delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEditValidator {
    pub validator_address: ValAddress,
    pub description: Description,
    pub commission_rate: Option<Dec>,
    pub min_self_delegation: Option<Amount>,
}

/// Bond tokens from a delegator's balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    pub delegator_address: AccAddress,
    pub validator_address: ValAddress,
    pub amount: Coin,
}

/// Start unbonding `amount` worth of shares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUndelegate {
    pub delegator_address: AccAddress,
    pub validator_address: ValAddress,
    pub amount: Coin,
}

/// Move stake between validators without waiting out the unbonding period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    pub delegator_address: AccAddress,
    pub validator_src_address: ValAddress,
    pub validator_dst_address: ValAddress,
    pub amount: Coin,
}

/// Return part of an unbonding entry to the validator it left.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCancelUnbondingDelegation {
    pub delegator_address: AccAddress,
    pub validator_address: ValAddress,
    pub amount: Coin,
    pub creation_height: u64,
}

/// Replace the staking params; only `authority` may send it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    pub authority: String,
    pub params: Params,
}

impl MsgCreateValidator {
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        require_addr(self.validator_address.as_bytes(), "validator")?;
        if self.pubkey.0.is_empty() {
            return Err(StakingError::InvalidParams("empty validator pubkey".into()));
        }
        require_positive(&self.value)?;
        if self.description.moniker.trim().is_empty() {
            return Err(StakingError::InvalidParams("empty moniker".into()));
        }
        self.commission.validate()?;
        if self.min_self_delegation == 0 {
            return Err(StakingError::InvalidParams(
                "minimum self delegation must be positive".into(),
            ));
        }
        if self.value.amount < self.min_self_delegation {
            return Err(StakingError::SelfDelegationBelowMinimum);
        }
        Ok(())
    }
}

impl MsgEditValidator {
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        require_addr(self.validator_address.as_bytes(), "validator")?;
        if let Some(rate) = self.commission_rate {
            if rate > Dec::one() {
                return Err(StakingError::CommissionHuge);
            }
        }
        if self.min_self_delegation == Some(0) {
            return Err(StakingError::InvalidParams(
                "minimum self delegation must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl MsgDelegate {
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        require_addr(self.delegator_address.as_bytes(), "delegator")?;
        require_addr(self.validator_address.as_bytes(), "validator")?;
        require_positive(&self.amount)
    }
}

impl MsgUndelegate {
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        require_addr(self.delegator_address.as_bytes(), "delegator")?;
        require_addr(self.validator_address.as_bytes(), "validator")?;
        require_positive(&self.amount)
    }
}

impl MsgBeginRedelegate {
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        require_addr(self.delegator_address.as_bytes(), "delegator")?;
        require_addr(self.validator_src_address.as_bytes(), "source validator")?;
        require_addr(self.validator_dst_address.as_bytes(), "destination validator")?;
        require_positive(&self.amount)
    }
}

impl MsgCancelUnbondingDelegation {
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        require_addr(self.delegator_address.as_bytes(), "delegator")?;
        require_addr(self.validator_address.as_bytes(), "validator")?;
        require_positive(&self.amount)?;
        if self.creation_height == 0 {
            return Err(StakingError::InvalidParams(
                "creation height must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl MsgUpdateParams {
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        if self.authority.trim().is_empty() {
            return Err(StakingError::InvalidParams("empty authority".into()));
        }
        self.params.validate()
    }
}

/// Any staking message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingMsg {
    CreateValidator(MsgCreateValidator),
    EditValidator(MsgEditValidator),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
    BeginRedelegate(MsgBeginRedelegate),
    CancelUnbondingDelegation(MsgCancelUnbondingDelegation),
    UpdateParams(MsgUpdateParams),
}

impl StakingMsg {
    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        match self {
            StakingMsg::CreateValidator(m) => m.validate_basic(),
            StakingMsg::EditValidator(m) => m.validate_basic(),
            StakingMsg::Delegate(m) => m.validate_basic(),
            StakingMsg::Undelegate(m) => m.validate_basic(),
            StakingMsg::BeginRedelegate(m) => m.validate_basic(),
            StakingMsg::CancelUnbondingDelegation(m) => m.validate_basic(),
            StakingMsg::UpdateParams(m) => m.validate_basic(),
        }
    }

    /// Type url this message is registered under.
    pub fn type_url(&self) -> &'static str {
        match self {
            StakingMsg::CreateValidator(_) => TYPE_CREATE_VALIDATOR,
            StakingMsg::EditValidator(_) => TYPE_EDIT_VALIDATOR,
            StakingMsg::Delegate(_) => TYPE_DELEGATE,
            StakingMsg::Undelegate(_) => TYPE_UNDELEGATE,
            StakingMsg::BeginRedelegate(_) => TYPE_BEGIN_REDELEGATE,
            StakingMsg::CancelUnbondingDelegation(_) => TYPE_CANCEL_UNBONDING,
            StakingMsg::UpdateParams(_) => TYPE_UPDATE_PARAMS,
        }
    }

    /// Canonical bytes of the inner message.
    pub fn encode_body(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            StakingMsg::CreateValidator(m) => encode_canonical(m),
            StakingMsg::EditValidator(m) => encode_canonical(m),
            StakingMsg::Delegate(m) => encode_canonical(m),
            StakingMsg::Undelegate(m) => encode_canonical(m),
            StakingMsg::BeginRedelegate(m) => encode_canonical(m),
            StakingMsg::CancelUnbondingDelegation(m) => encode_canonical(m),
            StakingMsg::UpdateParams(m) => encode_canonical(m),
        }
    }
}

/// Handler outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgResponse {
    Empty,
    /// Completion time of an undelegation and the tokens it will release.
    Undelegate { completion_time: Timestamp, amount: Coin },
    /// Completion time of a redelegation.
    BeginRedelegate { completion_time: Timestamp },
}

pub const TYPE_CREATE_VALIDATOR: &str = "/amunchain.staking.v1.MsgCreateValidator";
pub const TYPE_EDIT_VALIDATOR: &str = "/amunchain.staking.v1.MsgEditValidator";
pub const TYPE_DELEGATE: &str = "/amunchain.staking.v1.MsgDelegate";
pub const TYPE_UNDELEGATE: &str = "/amunchain.staking.v1.MsgUndelegate";
pub const TYPE_BEGIN_REDELEGATE: &str = "/amunchain.staking.v1.MsgBeginRedelegate";
pub const TYPE_CANCEL_UNBONDING: &str = "/amunchain.staking.v1.MsgCancelUnbondingDelegation";
pub const TYPE_UPDATE_PARAMS: &str = "/amunchain.staking.v1.MsgUpdateParams";

/// Registry decode errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown message type {0}")]
    UnknownType(String),
    #[error("type {0} registered twice")]
    Duplicate(&'static str),
    #[error("decode {type_url}: {source}")]
    Decode {
        type_url: String,
        #[source]
        source: CodecError,
    },
    #[error("encode {type_url}: {source}")]
    Encode {
        type_url: &'static str,
        #[source]
        source: CodecError,
    },
}

type Decoder = fn(&[u8]) -> Result<StakingMsg, CodecError>;

fn decode_as<T: DeserializeOwned + Into<StakingMsg>>(b: &[u8]) -> Result<StakingMsg, CodecError> {
    decode_canonical_limited::<T>(b, MAX_MSG_BYTES).map(Into::into)
}

macro_rules! into_staking_msg {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for StakingMsg {
            fn from(m: $ty) -> Self {
                StakingMsg::$variant(m)
            }
        })*
    };
}

into_staking_msg!(
    CreateValidator(MsgCreateValidator),
    EditValidator(MsgEditValidator),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
    BeginRedelegate(MsgBeginRedelegate),
    CancelUnbondingDelegation(MsgCancelUnbondingDelegation),
    UpdateParams(MsgUpdateParams),
);

/// Explicit map from type url to decoder. Built once at startup and passed
/// by reference.
#[derive(Clone, Default)]
pub struct MsgRegistry {
    decoders: BTreeMap<&'static str, Decoder>,
}

impl std::fmt::Debug for MsgRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

impl MsgRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every staking message.
    pub fn standard() -> Self {
        let mut r = Self::new();
        let entries: [(&'static str, Decoder); 7] = [
            (TYPE_CREATE_VALIDATOR, decode_as::<MsgCreateValidator>),
            (TYPE_EDIT_VALIDATOR, decode_as::<MsgEditValidator>),
            (TYPE_DELEGATE, decode_as::<MsgDelegate>),
            (TYPE_UNDELEGATE, decode_as::<MsgUndelegate>),
            (TYPE_BEGIN_REDELEGATE, decode_as::<MsgBeginRedelegate>),
            (TYPE_CANCEL_UNBONDING, decode_as::<MsgCancelUnbondingDelegation>),
            (TYPE_UPDATE_PARAMS, decode_as::<MsgUpdateParams>),
        ];
        for (url, d) in entries {
            r.decoders.insert(url, d);
        }
        r
    }

    /// Register a decoder for `type_url`.
    pub fn register(&mut self, type_url: &'static str, d: Decoder) -> Result<(), RegistryError> {
        if self.decoders.contains_key(type_url) {
            return Err(RegistryError::Duplicate(type_url));
        }
        self.decoders.insert(type_url, d);
        Ok(())
    }

    /// Registered type urls in order.
    pub fn type_urls(&self) -> impl Iterator<Item = &&'static str> {
        self.decoders.keys()
    }

    /// Decode `(type_url, bytes)`.
    pub fn decode(&self, type_url: &str, bytes: &[u8]) -> Result<StakingMsg, RegistryError> {
        let d = self
            .decoders
            .get(type_url)
            .ok_or_else(|| RegistryError::UnknownType(type_url.to_string()))?;
        d(bytes).map_err(|source| RegistryError::Decode {
            type_url: type_url.to_string(),
            source,
        })
    }

    /// Encode a message as `(type_url, bytes)`.
    pub fn encode(&self, msg: &StakingMsg) -> Result<(&'static str, Vec<u8>), RegistryError> {
        let url = msg.type_url();
        if !self.decoders.contains_key(url) {
            return Err(RegistryError::UnknownType(url.to_string()));
        }
        let body = msg
            .encode_body()
            .map_err(|source| RegistryError::Encode { type_url: url, source })?;
        Ok((url, body))
    }
}
