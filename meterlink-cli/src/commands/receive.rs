//! `meterlink receive`: run the frame receiver and logger.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use meterlink_core::{paths::default_receiver_config, ReceiverConfig};
use meterlink_receiver::start_blocking;

use super::{config_path, home_dir};

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Alternative configuration file. Default: ~/etc/recvmsg.yaml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ReceiveArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let path = config_path(&home, self.config.as_deref(), default_receiver_config(&home));
        let config = ReceiverConfig::load_at(&home, &path)
            .context("failed to load receiver configuration")?;
        start_blocking(config).context("receiver exited with error")
    }
}
