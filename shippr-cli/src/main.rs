//! shippr CLI - open a pull request for the current branch and clean up
//! after it merges

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use shippr_core::{Config, ConfigOverrides};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{CreateArgs, WatchArgs};

/// shippr: push, open a pull request, and delete the branch once it merges
#[derive(Parser, Debug)]
#[command(name = "shippr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.config/shippr/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base branch pull requests merge into
    #[arg(short, long, global = true)]
    base: Option<String>,

    /// Remote to push to
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Delay between status polls (e.g. "30s", "2m")
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,

    /// Delay between polls while the pull request is not visible yet
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    retry_interval: Option<Duration>,

    /// Path to git executable (overrides config and env)
    #[arg(long, global = true)]
    git_path: Option<String>,

    /// Path to gh executable (overrides config and env)
    #[arg(long, global = true)]
    gh_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Push the current branch and open a pull request (default)
    #[command(visible_alias = "c")]
    Create(CreateArgs),

    /// Watch the pull request of a branch and clean up after it merges
    #[command(visible_alias = "w")]
    Watch(WatchArgs),

    /// Show current configuration
    Config,

    /// Show version information
    Version,
}

impl Cli {
    fn overrides(&self, labels: Option<Vec<String>>) -> ConfigOverrides {
        ConfigOverrides {
            base_branch: self.base.clone(),
            remote: self.remote.clone(),
            labels,
            poll_interval: self.poll_interval,
            retry_interval: self.retry_interval,
            git_path: self.git_path.clone(),
            gh_path: self.gh_path.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let labels = match &cli.command {
        Some(Commands::Create(args)) => args.labels(),
        _ => None,
    };

    let config = Config::load_with_overrides(cli.config.as_deref(), cli.overrides(labels))?;

    if cli.verbose {
        tracing::info!(
            base = %config.repo.base_branch,
            remote = %config.repo.remote,
            poll_interval = ?config.monitor.poll_interval,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Create(args)) => args.execute(&config).await,
        None => CreateArgs::default().execute(&config).await,
        Some(Commands::Watch(args)) => args.execute(&config).await,
        Some(Commands::Config) => {
            print_config(&config, cli.config.as_deref());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Version) => {
            println!("shippr {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_config(config: &Config, explicit_path: Option<&std::path::Path>) {
    println!("shippr Configuration");
    println!("====================");
    println!();
    println!("Repository:");
    println!("  base_branch: {}", config.repo.base_branch);
    println!("  remote: {}", config.repo.remote);
    if config.repo.labels.is_empty() {
        println!("  labels: (none)");
    } else {
        println!("  labels: {}", config.repo.labels.join(", "));
    }
    println!();
    println!("Monitor:");
    println!(
        "  poll_interval: {}",
        humantime::format_duration(config.monitor.poll_interval)
    );
    println!(
        "  retry_interval: {}",
        humantime::format_duration(config.monitor.retry_interval)
    );
    println!();
    println!("Tools:");
    println!("  git_path: {}", config.tools.git_path);
    println!("  gh_path: {}", config.tools.gh_path);
    println!();

    let path = explicit_path
        .map(|p| p.to_path_buf())
        .or_else(Config::default_config_path);
    if let Some(path) = path {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
