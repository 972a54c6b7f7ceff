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

//! Validator record and the share/token exchange arithmetic.

use crate::core::math::{Amount, Dec, MathError};
use crate::core::staking::commission::Commission;
use crate::core::staking::errors::{ExecResult, LedgerFault, StakingError};
use crate::core::staking::keys;
use crate::core::types::{ConsAddress, ConsPubKey, Timestamp, ValAddress};
use serde::{Deserialize, Serialize};

const MAX_MONIKER_LEN: usize = 70;
const MAX_IDENTITY_LEN: usize = 3000;
const MAX_WEBSITE_LEN: usize = 140;
const MAX_SECURITY_CONTACT_LEN: usize = 140;
const MAX_DETAILS_LEN: usize = 280;

/// Placeholder meaning "leave unchanged" in `EditValidator`.
pub const DO_NOT_MODIFY: &str = "[do-not-modify]";

/// Validator lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BondStatus {
    /// Not in the active set; tokens sit in the not-bonded pool.
    Unbonded,
    /// Left the active set; waiting out the unbonding period.
    Unbonding,
    /// In the active set.
    Bonded,
}

/// Rounding applied when issuing shares for deposited tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareRounding {
    /// Nearest, ties to even.
    HalfEven,
    /// Toward zero.
    Truncate,
}

/// Human-facing validator metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// Display name.
    pub moniker: String,
    /// Optional identity signature (e.g. keybase).
    pub identity: String,
    /// Website.
    pub website: String,
    /// Security contact.
    pub security_contact: String,
    /// Free-form details.
    pub details: String,
}

impl Description {
    /// Build a description with just a moniker.
    pub fn with_moniker(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
            ..Default::default()
        }
    }

    /// Merge an edit, keeping fields set to `DO_NOT_MODIFY`.
    pub fn update(&self, d: &Description) -> Description {
        let pick = |new: &String, old: &String| {
            if new == DO_NOT_MODIFY {
                old.clone()
            } else {
                new.clone()
            }
        };
        Description {
            moniker: pick(&d.moniker, &self.moniker),
            identity: pick(&d.identity, &self.identity),
            website: pick(&d.website, &self.website),
            security_contact: pick(&d.security_contact, &self.security_contact),
            details: pick(&d.details, &self.details),
        }
    }

    /// Enforce per-field length limits.
    pub fn ensure_length(&self) -> Result<(), StakingError> {
        let checks: [(&'static str, &String, usize); 5] = [
            ("moniker", &self.moniker, MAX_MONIKER_LEN),
            ("identity", &self.identity, MAX_IDENTITY_LEN),
            ("website", &self.website, MAX_WEBSITE_LEN),
            ("security contact", &self.security_contact, MAX_SECURITY_CONTACT_LEN),
            ("details", &self.details, MAX_DETAILS_LEN),
        ];
        for (field, value, max) in checks {
            if value.chars().count() > max {
                return Err(StakingError::DescriptionLength { field, max });
            }
        }
        Ok(())
    }
}

/// Validator record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Operator address.
    pub operator: ValAddress,
    /// Consensus public key.
    pub consensus_pubkey: ConsPubKey,
    /// Whether the validator is jailed.
    pub jailed: bool,
    /// Lifecycle status.
    pub status: BondStatus,
    /// Total tokens held on behalf of delegators.
    pub tokens: Amount,
    /// Total delegator shares issued.
    pub delegator_shares: Dec,
    /// Metadata.
    pub description: Description,
    /// Height at which unbonding began.
    pub unbonding_height: u64,
    /// Time at which unbonding completes.
    pub unbonding_time: Timestamp,
    /// Commission.
    pub commission: Commission,
    /// Minimum self-delegation, in tokens.
    pub min_self_delegation: Amount,
    /// Holds placed by external modules on the validator's unbonding.
    pub unbonding_on_hold_ref_count: u64,
    /// Unbonding ids of the validator's own unbonding periods.
    pub unbonding_ids: Vec<u64>,
}

/// Read-only view of a validator exposed to other subsystems.
pub trait ValidatorView {
    /// Operator address.
    fn operator(&self) -> &ValAddress;
    /// Consensus public key.
    fn consensus_pubkey(&self) -> &ConsPubKey;
    /// Status.
    fn status(&self) -> BondStatus;
    /// Jailed flag.
    fn is_jailed(&self) -> bool;
    /// Token balance.
    fn tokens(&self) -> Amount;
    /// Tokens counted toward consensus (zero unless bonded).
    fn bonded_tokens(&self) -> Amount;
    /// Delegator shares.
    fn delegator_shares(&self) -> Dec;
    /// Commission rate.
    fn commission_rate(&self) -> Dec;
    /// Consensus power (zero unless bonded).
    fn consensus_power(&self, power_reduction: Amount) -> u64;
}

impl Validator {
    /// New unbonded validator with zero tokens.
    pub fn new(
        operator: ValAddress,
        consensus_pubkey: ConsPubKey,
        description: Description,
        commission: Commission,
        min_self_delegation: Amount,
    ) -> Self {
        Self {
            operator,
            consensus_pubkey,
            jailed: false,
            status: BondStatus::Unbonded,
            tokens: 0,
            delegator_shares: Dec::zero(),
            description,
            unbonding_height: 0,
            unbonding_time: 0,
            commission,
            min_self_delegation,
            unbonding_on_hold_ref_count: 0,
            unbonding_ids: Vec::new(),
        }
    }

    /// Consensus address.
    pub fn cons_address(&self) -> ConsAddress {
        self.consensus_pubkey.address()
    }

    /// Bonded status check.
    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    /// Unbonded status check.
    pub fn is_unbonded(&self) -> bool {
        self.status == BondStatus::Unbonded
    }

    /// Unbonding status check.
    pub fn is_unbonding(&self) -> bool {
        self.status == BondStatus::Unbonding
    }

    /// Unbonding period elapsed at `(now, height)`.
    pub fn is_mature(&self, now: Timestamp, height: u64) -> bool {
        self.unbonding_time <= now && self.unbonding_height <= height
    }

    /// Tokens are gone but shares remain: no meaningful exchange rate.
    pub fn invalid_ex_rate(&self) -> bool {
        self.tokens == 0 && !self.delegator_shares.is_zero()
    }

    /// Power ranking key for the current token balance.
    pub fn power_index_key(&self, power_reduction: Amount) -> Vec<u8> {
        keys::power_index_key(&self.operator, self.tokens, power_reduction)
    }

    /// Power the validator would have if bonded.
    pub fn potential_consensus_power(&self, power_reduction: Amount) -> u64 {
        keys::tokens_to_consensus_power(self.tokens, power_reduction)
    }

    /// Shares issued for `amount` tokens, rounded half-even.
    pub fn shares_from_tokens(&self, amount: Amount) -> ExecResult<Dec> {
        if self.tokens == 0 {
            return Err(StakingError::InsufficientShares.into());
        }
        Ok(self
            .delegator_shares
            .mul_int(amount)?
            .quo(Dec::from_int(self.tokens))?)
    }

    /// Shares issued for `amount` tokens, truncated.
    pub fn shares_from_tokens_truncated(&self, amount: Amount) -> ExecResult<Dec> {
        if self.tokens == 0 {
            return Err(StakingError::InsufficientShares.into());
        }
        Ok(self
            .delegator_shares
            .mul_int(amount)?
            .quo_truncate(Dec::from_int(self.tokens))?)
    }

    fn tokens_ratio(&self, shares: Dec) -> Result<(Dec, Dec), MathError> {
        Ok((shares.mul_int(self.tokens)?, self.delegator_shares))
    }

    /// Tokens owed for `shares`, rounded half-even.
    pub fn tokens_from_shares(&self, shares: Dec) -> Result<Dec, MathError> {
        let (n, d) = self.tokens_ratio(shares)?;
        n.quo(d)
    }

    /// Tokens owed for `shares`, truncated.
    pub fn tokens_from_shares_truncated(&self, shares: Dec) -> Result<Dec, MathError> {
        let (n, d) = self.tokens_ratio(shares)?;
        n.quo_truncate(d)
    }

    /// Tokens owed for `shares`, rounded up.
    pub fn tokens_from_shares_round_up(&self, shares: Dec) -> Result<Dec, MathError> {
        let (n, d) = self.tokens_ratio(shares)?;
        n.quo_round_up(d)
    }

    /// Add tokens from a delegation and return the shares issued.
    ///
    /// A validator without shares issues them 1:1.
    pub fn add_tokens_from_del(&mut self, amount: Amount) -> ExecResult<Dec> {
        self.add_tokens_with(amount, ShareRounding::HalfEven)
    }

    /// Like [`Validator::add_tokens_from_del`] but never issues more shares
    /// than the exact value. Redelegations credit the destination this way.
    pub fn add_tokens_from_del_truncated(&mut self, amount: Amount) -> ExecResult<Dec> {
        self.add_tokens_with(amount, ShareRounding::Truncate)
    }

    /// Add tokens, issuing shares with the given rounding.
    pub fn add_tokens_with(&mut self, amount: Amount, rounding: ShareRounding) -> ExecResult<Dec> {
        let issued = if self.delegator_shares.is_zero() {
            Dec::from_int(amount)
        } else {
            match rounding {
                ShareRounding::HalfEven => self.shares_from_tokens(amount)?,
                ShareRounding::Truncate => self.shares_from_tokens_truncated(amount)?,
            }
        };
        self.tokens = self
            .tokens
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        self.delegator_shares = self.delegator_shares.checked_add(issued)?;
        Ok(issued)
    }

    /// Tokens that removing `shares` would release, without removing them.
    pub fn tokens_released_by(&self, shares: Dec) -> ExecResult<Amount> {
        let remaining = self.delegator_shares.checked_sub(shares)?;
        if remaining.is_zero() {
            Ok(self.tokens)
        } else {
            Ok(self.tokens_from_shares(shares)?.truncate_int()?)
        }
    }

    /// Remove delegator shares and return the tokens released.
    ///
    /// Removing the last shares releases every remaining token.
    pub fn remove_del_shares(&mut self, shares: Dec) -> ExecResult<Amount> {
        let released = self.tokens_released_by(shares)?;
        let held = self.tokens;
        self.tokens = held.checked_sub(released).ok_or_else(|| LedgerFault::TokensUnderflow {
            requested: released.to_string(),
            held: held.to_string(),
        })?;
        self.delegator_shares = self.delegator_shares.checked_sub(shares)?;
        Ok(released)
    }

    /// Remove tokens without touching shares (slashing).
    pub fn remove_tokens(&mut self, amount: Amount) -> ExecResult<()> {
        let held = self.tokens;
        self.tokens = held.checked_sub(amount).ok_or_else(|| LedgerFault::TokensUnderflow {
            requested: amount.to_string(),
            held: held.to_string(),
        })?;
        Ok(())
    }

    /// Set status.
    pub fn update_status(&mut self, status: BondStatus) {
        self.status = status;
    }
}

impl ValidatorView for Validator {
    fn operator(&self) -> &ValAddress {
        &self.operator
    }
    fn consensus_pubkey(&self) -> &ConsPubKey {
        &self.consensus_pubkey
    }
    fn status(&self) -> BondStatus {
        self.status
    }
    fn is_jailed(&self) -> bool {
        self.jailed
    }
    fn tokens(&self) -> Amount {
        self.tokens
    }
    fn bonded_tokens(&self) -> Amount {
        if self.is_bonded() {
            self.tokens
        } else {
            0
        }
    }
    fn delegator_shares(&self) -> Dec {
        self.delegator_shares
    }
    fn commission_rate(&self) -> Dec {
        self.commission.rate()
    }
    fn consensus_power(&self, power_reduction: Amount) -> u64 {
        if self.is_bonded() {
            self.potential_consensus_power(power_reduction)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::staking::commission::CommissionRates;
    use crate::core::staking::errors::ExecError;

    fn val() -> Validator {
        Validator::new(
            ValAddress(vec![1; 20]),
            ConsPubKey(vec![2; 32]),
            Description::with_moniker("v"),
            Commission::new(CommissionRates::default(), 0),
            1,
        )
    }

    #[test]
    fn first_delegation_seeds_one_to_one() {
        let mut v = val();
        assert_eq!(v.add_tokens_from_del(1000).unwrap(), Dec::from_int(1000));
        assert_eq!(v.tokens, 1000);
    }

    #[test]
    fn shares_from_tokens_requires_tokens() {
        let v = val();
        assert_eq!(
            v.shares_from_tokens(10),
            Err(ExecError::Rejected(StakingError::InsufficientShares))
        );
    }

    #[test]
    fn removing_all_shares_releases_dust() {
        let mut v = val();
        v.add_tokens_from_del(100).unwrap();
        // slash leaves an uneven exchange rate
        v.remove_tokens(1).unwrap();
        let out = v.remove_del_shares(Dec::from_int(100)).unwrap();
        assert_eq!(out, 99);
        assert_eq!(v.tokens, 0);
        assert!(v.delegator_shares.is_zero());
    }

    #[test]
    fn remove_then_add_restores_state() {
        let mut v = val();
        v.add_tokens_from_del(1000).unwrap();
        let before = (v.tokens, v.delegator_shares);
        let released = v.remove_del_shares(Dec::from_int(400)).unwrap();
        assert_eq!(released, 400);
        v.add_tokens_from_del(released).unwrap();
        assert_eq!((v.tokens, v.delegator_shares), before);
    }

    #[test]
    fn truncated_issue_never_exceeds_half_even() {
        let mut v = val();
        v.add_tokens_from_del(300).unwrap();
        v.remove_tokens(1).unwrap();
        let mut t = v.clone();
        let exact = v.add_tokens_from_del(1).unwrap();
        let truncated = t.add_tokens_from_del_truncated(1).unwrap();
        assert_eq!(exact.to_string(), "1.003344481605351171");
        assert_eq!(truncated.to_string(), "1.003344481605351170");
        assert_eq!(t.tokens, v.tokens);
    }

    #[test]
    fn release_preview_matches_removal() {
        let mut v = val();
        v.add_tokens_from_del(100).unwrap();
        v.remove_tokens(3).unwrap();
        for s in [Dec::from_int(10), Dec::from_int(90)] {
            let preview = v.tokens_released_by(s).unwrap();
            assert_eq!(v.remove_del_shares(s).unwrap(), preview);
        }
        assert_eq!(v.tokens, 0);
    }

    #[test]
    fn invalid_ex_rate_detected() {
        let mut v = val();
        v.add_tokens_from_del(10).unwrap();
        v.remove_tokens(10).unwrap();
        assert!(v.invalid_ex_rate());
    }

    #[test]
    fn description_limits() {
        let mut d = Description::with_moniker("x".repeat(71));
        assert_eq!(
            d.ensure_length(),
            Err(StakingError::DescriptionLength { field: "moniker", max: 70 })
        );
        d.moniker = "ok".into();
        let merged = d.update(&Description {
            moniker: DO_NOT_MODIFY.into(),
            identity: DO_NOT_MODIFY.into(),
            website: "https://example.org".into(),
            security_contact: DO_NOT_MODIFY.into(),
            details: DO_NOT_MODIFY.into(),
        });
        assert_eq!(merged.moniker, "ok");
        assert_eq!(merged.website, "https://example.org");
    }
}
