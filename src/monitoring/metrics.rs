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

use crate::core::staking::expected::BankKeeper;
use crate::core::staking::keeper::{EndBlockReport, Keeper};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
    #[error("encode")]
    Encode,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, MetricsError> {
    let g = IntGauge::new(name, help).map_err(|_| MetricsError::Prom)?;
    registry
        .register(Box::new(g.clone()))
        .map_err(|_| MetricsError::Prom)?;
    Ok(g)
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let c = IntCounter::new(name, help).map_err(|_| MetricsError::Prom)?;
    registry
        .register(Box::new(c.clone()))
        .map_err(|_| MetricsError::Prom)?;
    Ok(c)
}

// Gauges are i64; token amounts beyond that saturate.
fn clamp(v: u128) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Block height gauge.
    pub block_height: IntGauge,
    /// Bonded pool balance.
    pub bonded_tokens: IntGauge,
    /// Not-bonded pool balance.
    pub not_bonded_tokens: IntGauge,
    /// Size of the bonded set.
    pub bonded_validators: IntGauge,

    /// Unbonding entries released to delegators.
    pub matured_unbondings_total: IntCounter,
    /// Redelegation entries retired.
    pub matured_redelegations_total: IntCounter,
    /// Slash events that burned tokens.
    pub slashes_total: IntCounter,
    /// Ledger faults.
    pub faults_total: IntCounter,
    /// Messages applied.
    pub messages_total: IntCounter,
    /// Messages rejected.
    pub messages_rejected_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();
        Ok(Self {
            block_height: gauge(&registry, "amunchain_staking_block_height", "Current block height")?,
            bonded_tokens: gauge(&registry, "amunchain_staking_bonded_tokens", "Bonded pool balance")?,
            not_bonded_tokens: gauge(
                &registry,
                "amunchain_staking_not_bonded_tokens",
                "Not-bonded pool balance",
            )?,
            bonded_validators: gauge(
                &registry,
                "amunchain_staking_bonded_validators",
                "Validators in the bonded set",
            )?,
            matured_unbondings_total: counter(
                &registry,
                "amunchain_staking_matured_unbondings_total",
                "Unbonding entries released",
            )?,
            matured_redelegations_total: counter(
                &registry,
                "amunchain_staking_matured_redelegations_total",
                "Redelegation entries retired",
            )?,
            slashes_total: counter(&registry, "amunchain_staking_slashes_total", "Slash events")?,
            faults_total: counter(&registry, "amunchain_staking_faults_total", "Ledger faults")?,
            messages_total: counter(
                &registry,
                "amunchain_staking_messages_total",
                "Messages applied",
            )?,
            messages_rejected_total: counter(
                &registry,
                "amunchain_staking_messages_rejected_total",
                "Messages rejected",
            )?,
            registry,
        })
    }

    /// Refresh gauges from the ledger.
    pub fn observe<B: BankKeeper>(&self, keeper: &Keeper<B>) {
        let pool = keeper.pool();
        self.block_height.set(clamp(keeper.block_info().height as u128));
        self.bonded_tokens.set(clamp(pool.bonded_tokens));
        self.not_bonded_tokens.set(clamp(pool.not_bonded_tokens));
        self.bonded_validators
            .set(clamp(keeper.last_validators().len() as u128));
    }

    /// Count what an end block matured.
    pub fn record_end_block(&self, report: &EndBlockReport) {
        self.matured_unbondings_total
            .inc_by(report.matured_unbondings as u64);
        self.matured_redelegations_total
            .inc_by(report.matured_redelegations as u64);
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|_| MetricsError::Encode)?;
        String::from_utf8(buf).map_err(|_| MetricsError::Encode)
    }
}
