//! LH-Raft daemon: entry point for running a zone consensus simulation.

mod topology;

use clap::Parser;
use lhraft_consensus::LoopbackTransport;
use lhraft_node::{init_logging, ConsensusService, LogFormat, NodeConfig};
use lhraft_store::MemoryDeviceStore;
use std::path::PathBuf;
use std::sync::Arc;
use topology::Topology;

#[derive(Parser)]
#[command(name = "lhraft-daemon", about = "LH-Raft zone consensus daemon")]
struct Cli {
    /// Minimum reputation for leadership eligibility.
    #[arg(long, env = "LHRAFT_REPUTATION_THRESHOLD")]
    threshold: Option<f64>,

    /// Size of the bounded election worker pool.
    #[arg(long, env = "LHRAFT_ELECTION_WORKERS")]
    election_workers: Option<usize>,

    /// Local quorum deadline in milliseconds.
    #[arg(long, env = "LHRAFT_LOCAL_TIMEOUT_MS")]
    local_timeout_ms: Option<u64>,

    /// Global quorum deadline in milliseconds.
    #[arg(long, env = "LHRAFT_GLOBAL_TIMEOUT_MS")]
    global_timeout_ms: Option<u64>,

    /// Print Prometheus metrics after the run.
    #[arg(long, env = "LHRAFT_ENABLE_METRICS")]
    metrics: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "LHRAFT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LHRAFT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "LHRAFT_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Register a topology, elect every zone, run its workload and print
    /// the resulting consensus status as JSON.
    Simulate {
        /// TOML file listing devices, outcomes and transactions.
        #[arg(long)]
        topology: PathBuf,
    },
    /// Print the effective configuration as TOML.
    ShowConfig,
}

impl Cli {
    /// The file config (or defaults) with flags and env vars layered on top.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let base = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)?,
            None => NodeConfig::default(),
        };
        let config = NodeConfig {
            reputation_threshold: self.threshold.unwrap_or(base.reputation_threshold),
            election_workers: self.election_workers.unwrap_or(base.election_workers),
            local_quorum_timeout_ms: self.local_timeout_ms.unwrap_or(base.local_quorum_timeout_ms),
            global_quorum_timeout_ms: self.global_timeout_ms.unwrap_or(base.global_quorum_timeout_ms),
            enable_metrics: self.metrics || base.enable_metrics,
            log_format: self.log_format.clone().unwrap_or(base.log_format.clone()),
            log_level: self.log_level.clone().unwrap_or(base.log_level.clone()),
            ..base
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;
    init_logging(config.log_format().unwrap_or(LogFormat::Human), &config.log_level)?;

    match cli.command {
        Command::ShowConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Simulate { topology } => {
            let topology = Topology::from_toml_file(&topology)?;
            simulate(&config, &topology).await?;
        }
    }

    Ok(())
}

async fn simulate(config: &NodeConfig, topology: &Topology) -> anyhow::Result<()> {
    let service = ConsensusService::new(
        config,
        Arc::new(MemoryDeviceStore::new()),
        Arc::new(LoopbackTransport),
    )?;

    for device in &topology.devices {
        service.register_device(device.id.clone(), device.location.clone(), device.zone.clone())?;
        if let Some(reputation) = device.reputation {
            service.update_reputation(&device.id, reputation).await?;
        }
    }
    tracing::info!(devices = topology.devices.len(), "topology registered");

    for (zone, outcome) in service.elect_all().await {
        if let Err(e) = outcome {
            tracing::warn!(%zone, error = %e, "zone left without a leader");
        }
    }

    for outcome in &topology.outcomes {
        let update = service
            .report_outcome(&outcome.device, outcome.success, outcome.response_time())
            .await?;
        if let Some(reelection) = update.reelection {
            let zone = reelection.zone().clone();
            match reelection.wait().await {
                Ok(leader) => tracing::info!(%zone, %leader, "re-elected after demotion"),
                Err(e) => tracing::warn!(%zone, error = %e, "re-election found no leader"),
            }
        }
    }

    for tx in &topology.transactions {
        match service.submit_transaction(tx.zone.clone(), tx.payload.clone().into_bytes()).await {
            Ok(receipt) => tracing::info!(
                zone = %receipt.zone,
                leader = %receipt.leader,
                elapsed_ms = receipt.elapsed.as_millis() as u64,
                "transaction committed"
            ),
            Err(e) => tracing::warn!(zone = %tx.zone, kind = ?e.kind(), error = %e, "transaction failed"),
        }
    }

    println!("{}", service.consensus_status().to_json_pretty()?);
    if config.enable_metrics {
        print!("{}", service.metrics().encode()?);
    }
    Ok(())
}
