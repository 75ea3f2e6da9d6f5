//! Backup command implementation

use super::open_store;
use crate::config::Config;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Destination file (defaults to a timestamped file in storage.backup_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl BackupArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;
        let dest = match &self.output {
            Some(path) => path.clone(),
            None => config
                .storage
                .backup_dir
                .join(format!("market-{}.db", Utc::now().format("%Y%m%d-%H%M%S"))),
        };

        if dest.exists() {
            anyhow::bail!("backup target {} already exists", dest.display());
        }

        store.backup_to(&dest)?;
        tracing::info!(dest = %dest.display(), "Database backed up");
        println!("Backup written to {}", dest.display());
        Ok(())
    }
}
