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

//! Staking ledger daemon.
//!
//! `stakingd [config.toml] [replay.toml]` replays a block script against a
//! fresh ledger, commits the snapshot to sled, checks it reloads to the same
//! state and prints the state root followed by the metrics exposition.
//!
//! Replay format:
//!
//! ```text
//! [[accounts]]
//! address = "0a0a..."
//! amount = 1000000
//!
//! [[blocks]]
//! height = 1
//! time = 1700000000
//!
//! [[blocks.msgs]]
//! [blocks.msgs.Delegate]
//! delegator_address = "0a0a..."
//! validator_address = "0b0b..."
//! amount = { denom = "uamun", amount = 1000 }
//!
//! [[blocks.slashes]]
//! cons_address = "..."
//! infraction_height = 1
//! power = 10
//! factor = "0.05"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use amunchain_staking::core::config::LedgerConfig;
use amunchain_staking::core::math::{Amount, Dec};
use amunchain_staking::core::staking::expected::MemoryBank;
use amunchain_staking::core::staking::{
    ExecError, ExecResult, Keeper, MsgRegistry, StakingMsg, StakingState,
};
use amunchain_staking::core::state::persistent_state::PersistentState;
use amunchain_staking::core::types::{AccAddress, BlockInfo, ConsAddress};
use amunchain_staking::monitoring::metrics::Metrics;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Replay {
    accounts: Vec<GenesisAccount>,
    blocks: Vec<ReplayBlock>,
}

#[derive(Debug, Deserialize)]
struct GenesisAccount {
    address: AccAddress,
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct ReplayBlock {
    height: u64,
    time: u64,
    #[serde(default)]
    msgs: Vec<StakingMsg>,
    #[serde(default)]
    slashes: Vec<SlashEvent>,
    #[serde(default)]
    jail: Vec<ConsAddress>,
    #[serde(default)]
    unjail: Vec<ConsAddress>,
}

#[derive(Debug, Deserialize)]
struct SlashEvent {
    cons_address: ConsAddress,
    infraction_height: u64,
    power: u64,
    factor: Dec,
}

fn init_tracing(cfg: &LedgerConfig) {
    let filter = EnvFilter::try_new(&cfg.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);
    let _ = if cfg.logging.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}

/// Route an outcome to the metrics; faults abort the replay.
fn tally<T>(metrics: &Metrics, what: &str, res: ExecResult<T>) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(ExecError::Rejected(e)) => {
            metrics.messages_rejected_total.inc();
            warn!(what, error = %e, "rejected");
            Ok(None)
        }
        Err(ExecError::Fault(f)) => {
            metrics.faults_total.inc();
            bail!("{what}: ledger fault: {f}")
        }
    }
}

fn replay_blocks(
    keeper: &mut Keeper<MemoryBank>,
    registry: &MsgRegistry,
    metrics: &Metrics,
    replay: Replay,
) -> Result<()> {
    for acct in &replay.accounts {
        keeper.bank_mut().mint_to(&acct.address, acct.amount);
    }
    for block in replay.blocks {
        keeper.begin_block(BlockInfo {
            height: block.height,
            time: block.time,
            ..Default::default()
        });

        for msg in &block.msgs {
            // Go through the wire form so replay exercises the same decoder as a node.
            let (type_url, bytes) = registry.encode(msg)?;
            let decoded = registry.decode(type_url, &bytes)?;
            if tally(metrics, type_url, keeper.handle(&decoded))?.is_some() {
                metrics.messages_total.inc();
            }
        }
        for s in &block.slashes {
            let burned = tally(
                metrics,
                "slash",
                keeper.execute(|k| k.slash(&s.cons_address, s.infraction_height, s.power, s.factor)),
            )?;
            if burned.unwrap_or(0) > 0 {
                metrics.slashes_total.inc();
            }
        }
        for cons in &block.jail {
            tally(metrics, "jail", keeper.execute(|k| k.jail(cons)))?;
        }
        for cons in &block.unjail {
            tally(metrics, "unjail", keeper.execute(|k| k.unjail(cons)))?;
        }

        let Some(report) = tally(metrics, "end block", keeper.execute(|k| k.end_block()))? else {
            bail!("end block rejected at height {}", block.height);
        };
        metrics.record_end_block(&report);
        keeper
            .assert_invariants()
            .map_err(|e| anyhow::anyhow!("height {}: {e}", block.height))?;
        metrics.observe(keeper);
        info!(
            height = block.height,
            updates = report.updates.len(),
            matured_unbondings = report.matured_unbondings,
            matured_redelegations = report.matured_redelegations,
            "block applied"
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let cfg_path = args.next().map(PathBuf::from);
    let replay_path = args.next().map(PathBuf::from);

    let cfg = match &cfg_path {
        Some(p) => LedgerConfig::load(p)?,
        None => LedgerConfig::default(),
    };
    init_tracing(&cfg);
    info!(node = %cfg.node.name, data_dir = %cfg.node.data_dir, "stakingd starting");

    let replay: Replay = match &replay_path {
        Some(p) => {
            let raw = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
            toml::from_str(&raw).with_context(|| format!("parse {}", p.display()))?
        }
        None => Replay::default(),
    };

    let store = PersistentState::open(Path::new(&cfg.node.data_dir).join("staking.db"))?;
    let mut keeper = Keeper::new(cfg.params.clone(), MemoryBank::new());
    keeper.set_work_costs(cfg.work.clone());
    let registry = MsgRegistry::standard();
    let metrics = Metrics::new()?;

    replay_blocks(&mut keeper, &registry, &metrics, replay)?;

    let root = keeper.state().commit(&store)?;
    let reloaded = StakingState::load(&store)?;
    if &reloaded != keeper.state() {
        bail!("reloaded snapshot differs from the in-memory ledger");
    }
    info!(root = %hex::encode(root), work = keeper.work_consumed(), "snapshot committed");

    println!("{}", hex::encode(root));
    print!("{}", metrics.render()?);
    Ok(())
}
