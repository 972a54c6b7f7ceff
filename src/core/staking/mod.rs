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

//! Delegated proof-of-stake bonding ledger.
//!
//! [`keeper::Keeper`] owns a [`state::StakingState`] and a [`expected::BankKeeper`]
//! and implements every transition; [`msg`] carries the user-facing messages
//! and their registry.

pub mod commission;
pub mod delegation;
pub mod errors;
pub mod expected;
pub mod hooks;
pub mod keeper;
pub mod keys;
pub mod msg;
pub mod params;
pub mod state;
pub mod validator;

pub use errors::{ExecError, ExecResult, LedgerFault, StakingError};
pub use keeper::{EndBlockReport, Keeper, ValidatorUpdate};
pub use msg::{MsgRegistry, MsgResponse, StakingMsg};
pub use params::{Params, WorkCosts};
pub use state::StakingState;
