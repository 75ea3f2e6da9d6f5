//! Status command implementation

use super::open_store;
use crate::ai::UsageTracker;
use crate::config::Config;
use chrono::Utc;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also show the latest bar per symbol
    #[arg(short, long)]
    pub verbose: bool,
}

impl StatusArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;
        let now = Utc::now();

        println!("market-dash status");
        println!("  Database: {}", config.storage.db_path.display());

        let summaries = store.symbol_summaries()?;
        if summaries.is_empty() {
            println!("  No bars stored");
        }
        for s in &summaries {
            let age = now - s.last;
            println!(
                "  {:<8} {:>7} bars  {} .. {}  (last {} min ago)",
                s.symbol,
                s.bars,
                s.first.format("%Y-%m-%d %H:%M"),
                s.last.format("%Y-%m-%d %H:%M"),
                age.num_minutes()
            );
            if self.verbose {
                if let Some(bar) = store.latest_bar(&s.symbol)? {
                    println!(
                        "           O {:.6} H {:.6} L {:.6} C {:.6} ({} ticks)",
                        bar.open, bar.high, bar.low, bar.close, bar.ticks
                    );
                }
            }
        }

        let usage = UsageTracker::new(
            config.ai.usage_file.clone(),
            config.ai.max_calls_per_day,
            config.ai.cooldown_secs,
        );
        let record = usage.load(now);
        println!(
            "  LLM usage: {}/{} calls today, next call {}",
            record.count,
            config.ai.max_calls_per_day,
            match usage.check(now) {
                crate::ai::UsageDecision::Allowed => "allowed".to_string(),
                crate::ai::UsageDecision::Limited { reason, wait_secs } =>
                    format!("in {}s ({})", wait_secs, reason),
            }
        );
        Ok(())
    }
}
