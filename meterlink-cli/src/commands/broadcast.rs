//! `meterlink broadcast`: run the change-triggered broadcaster.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use meterlink_broadcast::start_blocking;
use meterlink_core::{paths::default_broadcast_config, BroadcastConfig};

use super::{config_path, home_dir};

#[derive(Args, Debug)]
pub struct BroadcastArgs {
    /// Alternative configuration file. Default: ~/etc/broadcast.yaml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl BroadcastArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let path = config_path(&home, self.config.as_deref(), default_broadcast_config(&home));
        let config = BroadcastConfig::load_at(&home, &path)
            .context("failed to load broadcaster configuration")?;
        start_blocking(config).context("broadcaster exited with error")
    }
}
