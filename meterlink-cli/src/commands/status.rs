//! `meterlink status`: inspect a daemon's process lock.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::json;

use meterlink_core::{
    lock,
    paths::{default_broadcast_config, default_receiver_config},
    BroadcastConfig, ReceiverConfig,
};

use super::{config_path, home_dir};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Daemon {
    Broadcast,
    Receive,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Which daemon to inspect.
    #[arg(value_enum)]
    pub daemon: Daemon,

    /// Alternative configuration file for that daemon.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let lock_file = match self.daemon {
            Daemon::Broadcast => {
                let path =
                    config_path(&home, self.config.as_deref(), default_broadcast_config(&home));
                BroadcastConfig::load_at(&home, &path)
                    .context("failed to load broadcaster configuration")?
                    .lock_file
            }
            Daemon::Receive => {
                let path =
                    config_path(&home, self.config.as_deref(), default_receiver_config(&home));
                ReceiverConfig::load_at(&home, &path)
                    .context("failed to load receiver configuration")?
                    .lock_file
            }
        };

        let owner = lock::read_owner(&lock_file).context("failed to read lock file")?;
        let running = owner.as_ref().map(|o| o.is_alive()).unwrap_or(false);
        let payload = json!({
            "running": running,
            "stale": owner.is_some() && !running,
            "pid": owner.as_ref().map(|o| o.pid),
            "program": owner.as_ref().map(|o| o.program.clone()),
            "lock_file": lock_file.display().to_string(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to render status JSON")?
        );
        Ok(())
    }
}
