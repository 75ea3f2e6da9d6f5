use clap::Parser;
use market_dash::cli::{Cli, Commands};
use market_dash::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load_or_default(&cli.config)?;

    // Initialize telemetry
    market_dash::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting collector and API");
            args.execute(&config).await?;
        }
        Commands::Collect(args) => {
            tracing::info!("Starting collector");
            args.execute(&config).await?;
        }
        Commands::Serve(args) => {
            tracing::info!("Starting API");
            args.execute(&config).await?;
        }
        Commands::Fill(args) => args.execute(&config).await?,
        Commands::Risk(args) => args.execute(&config).await?,
        Commands::Summary(args) => args.execute(&config).await?,
        Commands::Status(args) => args.execute(&config).await?,
        Commands::Backup(args) => args.execute(&config).await?,
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Collector: {:?} every {}s, {}s bars",
                config.collector.symbols,
                config.collector.tick_interval_secs,
                config.collector.bar_interval_secs
            );
            println!("  Feed: {:?} {}", config.feed.provider, config.feed.base_url);
            println!("  Database: {}", config.storage.db_path.display());
            println!(
                "  Risk: window={}, anomaly Z>{}, high vol>{}",
                config.risk.volatility_window,
                config.risk.anomaly_threshold,
                config.risk.high_volatility_threshold
            );
            println!(
                "  AI: {} ({} calls/day, {}s cooldown, key {})",
                config.ai.model,
                config.ai.max_calls_per_day,
                config.ai.cooldown_secs,
                if config.ai.api_key().is_some() { "set" } else { "missing" }
            );
            println!("  API: {}:{}", config.api.host, config.api.port);
        }
    }

    Ok(())
}
