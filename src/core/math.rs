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

//! Deterministic fixed-point arithmetic for stake accounting.
//!
//! `Amount` is an integer token quantity. `Dec` is a non-negative decimal with
//! 18 fractional digits stored as a scaled `U256`; products and quotients are
//! computed in `U512` and narrowed back, so no intermediate can wrap.
//!
//! Rounding: half-even for bookkeeping, truncation when paying out, round-up
//! when removing value from a pool.

use primitive_types::{U256, U512};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Integer token amount.
pub type Amount = u128;

/// Number of fractional decimal digits carried by `Dec`.
pub const PRECISION: usize = 18;

const SCALE: u128 = 1_000_000_000_000_000_000;

/// Arithmetic errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("negative decimal")]
    Negative,
    #[error("invalid decimal: {0}")]
    Parse(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rounding {
    HalfEven,
    Down,
    Up,
}

fn scale() -> U256 {
    U256::from(SCALE)
}

fn narrow(x: U512) -> Result<U256, MathError> {
    let mut buf = [0u8; 64];
    x.to_little_endian(&mut buf);
    if buf[32..].iter().any(|b| *b != 0) {
        return Err(MathError::Overflow);
    }
    Ok(U256::from_little_endian(&buf[..32]))
}

fn div_round(n: U512, d: U512, mode: Rounding) -> Result<U512, MathError> {
    if d.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let q = n / d;
    let r = n % d;
    if r.is_zero() {
        return Ok(q);
    }
    let bump = match mode {
        Rounding::Down => false,
        Rounding::Up => true,
        Rounding::HalfEven => {
            let twice = r + r;
            twice > d || (twice == d && q.bit(0))
        }
    };
    if bump {
        Ok(q + U512::one())
    } else {
        Ok(q)
    }
}

/// Non-negative fixed-point decimal with 18 fractional digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(U256);

impl Dec {
    /// 0.
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// 1.
    pub fn one() -> Self {
        Self(scale())
    }

    /// Whole-number decimal.
    pub fn from_int(v: Amount) -> Self {
        Self(U256::from(v) * scale())
    }

    /// `num / den` rounded half-even.
    pub fn from_ratio(num: Amount, den: Amount) -> Result<Self, MathError> {
        Self::from_int(num).quo(Self::from_int(den))
    }

    /// `p / 100`.
    pub fn percent(p: u64) -> Self {
        Self(U256::from(p) * U256::from(SCALE / 100))
    }

    /// Build from the scaled raw representation.
    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Scaled raw representation.
    pub fn raw(&self) -> U256 {
        self.0
    }

    /// True when the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition.
    pub fn checked_add(self, o: Dec) -> Result<Dec, MathError> {
        self.0
            .checked_add(o.0)
            .map(Dec)
            .ok_or(MathError::Overflow)
    }

    /// Checked subtraction; decimals never go negative.
    pub fn checked_sub(self, o: Dec) -> Result<Dec, MathError> {
        self.0
            .checked_sub(o.0)
            .map(Dec)
            .ok_or(MathError::Underflow)
    }

    /// `|self - o|`.
    pub fn abs_diff(self, o: Dec) -> Dec {
        if self >= o {
            Dec(self.0 - o.0)
        } else {
            Dec(o.0 - self.0)
        }
    }

    fn mul_with(self, o: Dec, mode: Rounding) -> Result<Dec, MathError> {
        let n = self.0.full_mul(o.0);
        narrow(div_round(n, U512::from(scale()), mode)?).map(Dec)
    }

    fn quo_with(self, o: Dec, mode: Rounding) -> Result<Dec, MathError> {
        let n = self.0.full_mul(scale());
        narrow(div_round(n, U512::from(o.0), mode)?).map(Dec)
    }

    /// Product rounded half-even.
    pub fn mul(self, o: Dec) -> Result<Dec, MathError> {
        self.mul_with(o, Rounding::HalfEven)
    }

    /// Product truncated.
    pub fn mul_truncate(self, o: Dec) -> Result<Dec, MathError> {
        self.mul_with(o, Rounding::Down)
    }

    /// Product rounded up.
    pub fn mul_round_up(self, o: Dec) -> Result<Dec, MathError> {
        self.mul_with(o, Rounding::Up)
    }

    /// Product with an integer; exact.
    pub fn mul_int(self, v: Amount) -> Result<Dec, MathError> {
        narrow(self.0.full_mul(U256::from(v))).map(Dec)
    }

    /// Quotient rounded half-even.
    pub fn quo(self, o: Dec) -> Result<Dec, MathError> {
        self.quo_with(o, Rounding::HalfEven)
    }

    /// Quotient truncated.
    pub fn quo_truncate(self, o: Dec) -> Result<Dec, MathError> {
        self.quo_with(o, Rounding::Down)
    }

    /// Quotient rounded up.
    pub fn quo_round_up(self, o: Dec) -> Result<Dec, MathError> {
        self.quo_with(o, Rounding::Up)
    }

    /// Integer part, dropping the fraction.
    pub fn truncate_int(self) -> Result<Amount, MathError> {
        let whole = self.0 / scale();
        if whole > U256::from(u128::MAX) {
            return Err(MathError::Overflow);
        }
        Ok(whole.low_u128())
    }

    /// Smaller of two values.
    pub fn min(self, o: Dec) -> Dec {
        if self <= o {
            self
        } else {
            o
        }
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / scale();
        let frac = (self.0 % scale()).low_u128();
        write!(f, "{}.{:0width$}", whole, frac, width = PRECISION)
    }
}

impl FromStr for Dec {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(MathError::Negative);
        }
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(MathError::Parse(s.to_string()));
        }
        if frac_part.len() > PRECISION {
            return Err(MathError::Parse(s.to_string()));
        }
        let digits_ok = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if !digits_ok(int_part) || !digits_ok(frac_part) {
            return Err(MathError::Parse(s.to_string()));
        }
        let whole = if int_part.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(int_part).map_err(|_| MathError::Parse(s.to_string()))?
        };
        let mut frac_digits = frac_part.to_string();
        while frac_digits.len() < PRECISION {
            frac_digits.push('0');
        }
        let frac = U256::from_dec_str(&frac_digits).map_err(|_| MathError::Parse(s.to_string()))?;
        let raw = whole
            .checked_mul(scale())
            .and_then(|w| w.checked_add(frac))
            .ok_or(MathError::Overflow)?;
        Ok(Dec(raw))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Dec::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(d("1").to_string(), "1.000000000000000000");
        assert_eq!(d("0.05"), Dec::percent(5));
        assert_eq!(d(".5"), Dec::from_ratio(1, 2).unwrap());
        assert_eq!("-0.1".parse::<Dec>(), Err(MathError::Negative));
        assert!("1.0000000000000000001".parse::<Dec>().is_err());
        assert!("abc".parse::<Dec>().is_err());
    }

    #[test]
    fn rounding_policies() {
        let two = Dec::from_int(2);
        let three = Dec::from_int(3);
        // 2/3 = 0.666...6|66 -> half-even rounds the last digit up
        assert_eq!(two.quo(three).unwrap(), d("0.666666666666666667"));
        assert_eq!(two.quo_truncate(three).unwrap(), d("0.666666666666666666"));
        assert_eq!(two.quo_round_up(three).unwrap(), d("0.666666666666666667"));

        let one = Dec::one();
        assert_eq!(one.quo(three).unwrap(), d("0.333333333333333333"));
        assert_eq!(one.quo_round_up(three).unwrap(), d("0.333333333333333334"));
    }

    #[test]
    fn half_even_ties() {
        let tiny = Dec::from_raw(U256::from(5u8));
        let tenth = d("0.1");
        // 5e-18 * 0.1 = 0.5e-18 -> ties to even (0)
        assert!(tiny.mul(tenth).unwrap().is_zero());
        let tiny15 = Dec::from_raw(U256::from(15u8));
        // 1.5e-18 -> 2e-18
        assert_eq!(tiny15.mul(tenth).unwrap(), Dec::from_raw(U256::from(2u8)));
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert_eq!(Dec::one().quo(Dec::zero()), Err(MathError::DivisionByZero));
    }

    #[test]
    fn sub_never_goes_negative() {
        assert_eq!(Dec::zero().checked_sub(Dec::one()), Err(MathError::Underflow));
        assert_eq!(Dec::from_int(3).abs_diff(Dec::from_int(5)), Dec::from_int(2));
    }

    #[test]
    fn large_values_do_not_wrap() {
        let big = Dec::from_int(u128::MAX);
        assert_eq!(big.mul_int(2).unwrap().truncate_int(), Err(MathError::Overflow));
        assert_eq!(big.quo(Dec::from_int(2)).unwrap().truncate_int().unwrap(), u128::MAX / 2);
    }
}
