//! `meterlink addr`: print a sender's last recorded source address.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use meterlink_core::{paths::default_receiver_config, ReceiverConfig, SenderName};
use meterlink_receiver::address::read_address;

use super::{config_path, home_dir};

#[derive(Args, Debug)]
pub struct AddrArgs {
    /// Sender name as it appears in frames.
    pub sender: String,

    /// Alternative receiver configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl AddrArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let path = config_path(&home, self.config.as_deref(), default_receiver_config(&home));
        let config = ReceiverConfig::load_at(&home, &path)
            .context("failed to load receiver configuration")?;

        let sender = SenderName::from(self.sender);
        match read_address(&config.address_dir, &sender)
            .with_context(|| format!("failed to read address record for '{sender}'"))?
        {
            Some(addr) => println!("{addr}"),
            None => println!("no address recorded for {sender}"),
        }
        Ok(())
    }
}
