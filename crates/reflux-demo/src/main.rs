//! Reflux demo
//!
//! Runs the end-to-end property scenarios and prints what each stream emits.
//! Set `RUST_LOG=reflux_core=debug` to see the engine's own events.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use reflux_core::{PropertyFactory, PropertySettings, TokioScheduler};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

mod scenarios;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    FullName,
    Throttle,
    Cancel,
    Errors,
    All,
}

#[derive(Parser)]
#[command(name = "reflux-demo")]
#[command(about = "Reactive property scenarios", long_about = None)]
struct Cli {
    /// Scenario to run
    #[arg(value_enum, default_value = "all")]
    scenario: Scenario,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_settings(path: Option<&PathBuf>) -> Result<PropertySettings> {
    let mut settings = match path {
        Some(path) => PropertySettings::load_from_file(path)?,
        None => PropertySettings::default(),
    };
    settings.merge_with_env()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings(cli.config.as_ref())?;
    tracing::info!(?settings, "settings loaded");
    let handle = Handle::current();
    let config = settings.into_config(
        Arc::new(TokioScheduler::new(handle.clone())),
        Arc::new(TokioScheduler::long_running(handle)),
    )?;
    let factory = PropertyFactory::new(config);

    let all = cli.scenario == Scenario::All;
    if all || cli.scenario == Scenario::FullName {
        scenarios::full_name(&factory)?;
    }
    if all || cli.scenario == Scenario::Throttle {
        scenarios::throttle(&factory)?;
    }
    if all || cli.scenario == Scenario::Cancel {
        scenarios::cancel(&factory).await?;
    }
    if all || cli.scenario == Scenario::Errors {
        scenarios::errors(&factory)?;
    }
    Ok(())
}
