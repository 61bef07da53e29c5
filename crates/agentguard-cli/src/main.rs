//! AgentGuard command-line entry point.
//!
//! Loads the YAML configuration, bootstraps tracing and storage, and
//! either runs the monitoring loop, a single cycle, or a baseline
//! initialization. A malformed configuration file is the only fatal
//! startup surface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentguard_core::config::GuardConfig;
use agentguard_core::errors::ConfigError;
use agentguard_engine::GuardEngine;
use agentguard_storage::GuardStorageEngine;
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "agentguard", about = "Security monitoring for AI agent fleets")]
struct Cli {
    /// Config file path.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Run one monitoring cycle and exit.
    #[arg(short, long)]
    once: bool,

    /// Initialize integrity baselines and exit.
    #[arg(short, long)]
    init_baseline: bool,
}

/// Load the configuration. A missing file yields defaults; an unreadable
/// or malformed file is fatal.
fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    if !path.exists() {
        return Ok(GuardConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_yaml::from_str(&text).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("agentguard: {e}");
            std::process::exit(2);
        }
    };

    init_tracing(&config.logging.level);

    let storage = Arc::new(
        GuardStorageEngine::open(&config.database.path)
            .with_context(|| format!("cannot open database {}", config.database.path.display()))?,
    );
    let engine = GuardEngine::new(config, storage);

    if cli.init_baseline {
        let stats = engine.init_baselines();
        println!(
            "Baseline initialization complete: created={} failed={}",
            stats.created, stats.failed
        );
    } else if cli.once {
        engine.run_once();
    } else {
        // The receiver ends the loop on message or disconnect; keep the
        // sender alive so only process termination stops the engine.
        let (_stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        engine.start_monitoring(stop_rx);
    }

    Ok(())
}
