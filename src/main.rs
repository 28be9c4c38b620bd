use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use linuxdo_checkin::{AppConfig, CheckinRunner};

#[derive(Parser, Debug)]
#[command(name = "linuxdo-checkin", version, about = "Daily check-in automation for linux.do")]
struct Cli {
    /// Skip the human-like browsing phase
    #[arg(long)]
    no_browse: bool,

    /// Skip notification dispatch
    #[arg(long)]
    skip_notify: bool,

    /// Load environment variables from the given file instead of .env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("linuxdo_checkin=info".parse()?),
        )
        .init();

    info!("Starting linux.do check-in...");

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    if cli.no_browse {
        config.browse.enabled = false;
    }

    CheckinRunner::new(config)
        .skip_notifications(cli.skip_notify)
        .run()
        .await?;

    info!("Check-in run complete");
    Ok(())
}
