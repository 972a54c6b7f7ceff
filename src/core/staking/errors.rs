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

//! Staking error taxonomy.
//!
//! `StakingError` values are rejections a user can trigger; they are returned
//! before any state is touched. `LedgerFault` values mean an internal invariant
//! broke and the block must not be committed.

use crate::core::math::MathError;
use thiserror::Error;

/// User-facing staking failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StakingError {
    #[error("validator does not exist")]
    NoValidatorFound,
    #[error("validator already exist for this operator address; must use new validator operator address")]
    ValidatorOwnerExists,
    #[error("validator already exist for this pubkey; must use new validator pubkey")]
    ValidatorPubKeyExists,
    #[error("validator for this address is currently jailed")]
    ValidatorJailed,
    #[error("commission must be positive")]
    CommissionNegative,
    #[error("commission cannot be more than 100%")]
    CommissionHuge,
    #[error("commission cannot be more than the max rate")]
    CommissionGTMaxRate,
    #[error("commission cannot be changed more than once in 24h")]
    CommissionUpdateTime,
    #[error("commission cannot be changed more than max change rate")]
    CommissionGTMaxChangeRate,
    #[error("commission change rate cannot be more than the max rate")]
    CommissionChangeRateGTMaxRate,
    #[error("commission cannot be less than min rate")]
    CommissionLTMinRate,
    #[error("insufficient delegation shares")]
    InsufficientShares,
    #[error("validator for this delegation is empty")]
    DelegationValidatorEmpty,
    #[error("cannot delegate to validators with invalid (zero) ex-rate")]
    DelegatorShareExRateInvalid,
    #[error("no delegation for (address, validator) tuple")]
    NoDelegation,
    #[error("invalid shares amount")]
    BadSharesAmount,
    #[error("entry not mature")]
    NotMature,
    #[error("no unbonding delegation found")]
    NoUnbondingDelegation,
    #[error("too many unbonding delegation entries for (delegator, validator) tuple")]
    MaxUnbondingDelegationEntries,
    #[error("amount is greater than the unbonding delegation entry balance")]
    UnbondingEntryBalanceExceeded,
    #[error("unbonding delegation entry is already processed")]
    UnbondingEntryAlreadyProcessed,
    #[error("no redelegation found")]
    NoRedelegation,
    #[error("cannot redelegate to the same validator")]
    SelfRedelegation,
    #[error("redelegation to this validator already in progress; first redelegation to this validator must complete before next redelegation")]
    TransitiveRedelegation,
    #[error("too many redelegation entries for (delegator, src-validator, dst-validator) tuple")]
    MaxRedelegationEntries,
    #[error("too few tokens to redelegate (truncates to zero tokens)")]
    TinyRedelegationAmount,
    #[error("redelegation destination validator not found")]
    BadRedelegationDst,
    #[error("invalid historical info")]
    InvalidHistoricalInfo,
    #[error("cannot un-hold unbonding operation that is not on hold")]
    UnbondingOnHoldRefCountNegative,
    #[error("unbonding operation not found")]
    UnbondingNotFound,
    #[error("invalid coin denomination: got {got}, expected {expected}")]
    BadDenom { got: String, expected: String },
    #[error("invalid amount")]
    InvalidAmount,
    #[error("validator's self delegation must be greater than their minimum self delegation")]
    SelfDelegationBelowMinimum,
    #[error("minimum self delegation cannot be decrease")]
    MinSelfDelegationDecreased,
    #[error("{field} is longer than {max} characters")]
    DescriptionLength { field: &'static str, max: usize },
    #[error("expected authority {expected}, got {got}")]
    Unauthorized { expected: String, got: String },
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("slash factor must be in range [0, 1]")]
    InvalidSlashFactor,
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("hook failed: {0}")]
    Hook(String),
}

/// Broken ledger invariants. Never caused by user input alone.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerFault {
    #[error("math: {0}")]
    Math(#[from] MathError),
    #[error("validator {0} missing from store")]
    MissingValidator(String),
    #[error("attempted to remove {requested} tokens from validator holding {held}")]
    TokensUnderflow { requested: String, held: String },
    #[error("cannot remove validator {0}: {1}")]
    RemoveValidator(String, &'static str),
    #[error("bad validator status transition for {0}: {1}")]
    StatusTransition(String, &'static str),
    #[error("jailed validator {0} found in power index")]
    JailedInPowerIndex(String),
    #[error("cannot jail already jailed validator {0}")]
    AlreadyJailed(String),
    #[error("cannot unjail validator {0} that is not jailed")]
    NotJailed(String),
    #[error("slashing unbonded validator {0}")]
    SlashUnbonded(String),
    #[error("infraction height {infraction} is in the future (current {current})")]
    FutureInfraction { infraction: u64, current: u64 },
    #[error("module account {pool}: {detail}")]
    Pool { pool: &'static str, detail: String },
    #[error("unbonding index points at missing {0}")]
    DanglingUnbondingIndex(u64),
    #[error("invariant broken: {0}")]
    Invariant(String),
}

/// Result of executing a staking operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExecError {
    /// Operation rejected, state untouched.
    #[error(transparent)]
    Rejected(#[from] StakingError),
    /// Invariant violation; the host must halt block processing.
    #[error("ledger fault: {0}")]
    Fault(#[from] LedgerFault),
}

impl From<MathError> for ExecError {
    fn from(e: MathError) -> Self {
        ExecError::Fault(LedgerFault::Math(e))
    }
}

impl ExecError {
    /// True for invariant violations.
    pub fn is_fault(&self) -> bool {
        matches!(self, ExecError::Fault(_))
    }

    /// The user-facing error, if this is a rejection.
    pub fn rejection(&self) -> Option<&StakingError> {
        match self {
            ExecError::Rejected(e) => Some(e),
            ExecError::Fault(_) => None,
        }
    }
}

/// Staking result alias.
pub type ExecResult<T> = Result<T, ExecError>;
