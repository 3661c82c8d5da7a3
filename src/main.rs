//! ddns-watch - keeps dynamic DNS records pointed at this host.

use clap::{Parser, Subcommand};
use ddns_watch::config::Config;
use ddns_watch::resolver::{AddressResolver, HttpResolver};
use ddns_watch::supervisor::{build_watchers, http_client, Supervisor};
use ddns_watch::watcher::PassReport;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ddns-watch")]
#[command(about = "Dynamic DNS updater with built-in providers")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch and update records until interrupted
    Run,

    /// Show the public address and the address of every tracked name
    Status,

    /// Run a single reconcile pass for every watcher
    Update {
        /// Update even if the name already points at the public address
        #[arg(short, long)]
        force: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration
    Validate,

    /// Print an example configuration
    ExampleConfig,
}

fn get_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    // Default locations
    let candidates = [
        dirs::config_dir().map(|p| p.join("ddns-watch/config.toml")),
        Some(PathBuf::from("/etc/ddns-watch/config.toml")),
        Some(PathBuf::from("ddns-watch.toml")),
    ];

    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            return candidate;
        }
    }

    // Return default even if it doesn't exist
    Config::default_path().unwrap_or_else(|_| PathBuf::from("ddns-watch.toml"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => cmd_run(load_config(cli.config)?).await?,
        Commands::Status => cmd_status(load_config(cli.config)?).await?,
        Commands::Update { force, json } => {
            cmd_update(load_config(cli.config)?, force, json).await?
        }
        Commands::Validate => cmd_validate(load_config(cli.config)?)?,
        Commands::ExampleConfig => print!("{}", Config::example().to_toml()?),
    }

    Ok(())
}

fn load_config(cli_path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config_path = get_config_path(cli_path);
    let config = Config::load_from(&config_path)?;
    ddns_watch::logging::init(&config.logger)?;

    tracing::debug!(path = %config_path.display(), "configuration loaded");
    Ok(config)
}

async fn cmd_run(config: Config) -> anyhow::Result<()> {
    let supervisor = Supervisor::from_config(&config)?;
    supervisor.run_until(shutdown_signal()).await?;
    Ok(())
}

async fn cmd_status(config: Config) -> anyhow::Result<()> {
    let groups = config.provider_configs()?;
    let client = http_client(&config)?;
    let resolver = HttpResolver::new(client, config.web_ip.clone());

    println!("ddns-watch Status");
    println!("=================\n");

    let public = resolver.public_address().await;
    match &public {
        Ok(ip) => println!("Current Public IP: {} (from {})", ip, resolver.endpoint()),
        Err(e) => println!("Failed to detect IP: {}", e),
    }

    for group in groups {
        println!("\n{} ({}):", group.group, group.settings.name());

        for name in &group.names {
            print!("  {}: ", name);
            match resolver.resolve_name(name).await {
                Ok(ip) => match &public {
                    Ok(public) if *public == ip => println!("{} (up to date)", ip),
                    Ok(_) => println!("{} (outdated)", ip),
                    Err(_) => println!("{}", ip),
                },
                Err(e) => println!("error: {}", e),
            }
        }
    }

    Ok(())
}

async fn cmd_update(config: Config, force: bool, json: bool) -> anyhow::Result<()> {
    let client = http_client(&config)?;
    let resolver: Arc<dyn AddressResolver> =
        Arc::new(HttpResolver::new(client.clone(), config.web_ip.clone()));

    let mut reports = Vec::new();
    let mut failed = false;

    for mut watcher in build_watchers(&config, resolver, &client)? {
        let result = if force {
            watcher.force_pass().await
        } else {
            watcher.run_pass().await
        };

        match result {
            Ok(report) => {
                failed |= report.failed() > 0;
                reports.push(report);
            }
            Err(e) => {
                failed = true;
                eprintln!("{}: ERROR: {}", watcher.group(), e);
            }
        }
    }

    if json {
        let value: Vec<serde_json::Value> = reports.iter().map(report_json).collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    if failed {
        anyhow::bail!("some subdomains could not be updated");
    }

    Ok(())
}

fn print_report(report: &PassReport) {
    println!("{} (public IP {}):", report.group, report.public_address);

    for entry in &report.entries {
        let old = entry
            .old_address
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "?".to_string());

        match entry.outcome.error() {
            Some(e) => println!("  {}: FAILED - {}", entry.name, e),
            None => println!(
                "  {}: {} ({} -> {})",
                entry.name,
                entry.outcome.label(),
                old,
                entry.new_address
            ),
        }
    }

    for name in &report.pending {
        println!("  {}: pending", name);
    }
}

fn report_json(report: &PassReport) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = report
        .entries
        .iter()
        .map(|entry| {
            serde_json::json!({
                "name": entry.name,
                "old_address": entry.old_address,
                "new_address": entry.new_address,
                "outcome": entry.outcome.label(),
                "error": entry.outcome.error().map(|e| e.to_string()),
            })
        })
        .collect();

    serde_json::json!({
        "group": report.group,
        "public_address": report.public_address,
        "checked_at": report.checked_at,
        "entries": entries,
        "pending": report.pending,
    })
}

fn cmd_validate(config: Config) -> anyhow::Result<()> {
    println!("Validating configuration...\n");

    let groups = config.provider_configs()?;
    for group in &groups {
        println!(
            "  {} ({}): {} subdomain(s)",
            group.group,
            group.settings.name(),
            group.names.len()
        );
    }

    println!("\nConfiguration is valid.");
    Ok(())
}

/// Wait for SIGINT, SIGTERM or SIGQUIT.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigquit) =
        match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
            (Ok(term), Ok(quit)) => (term, quit),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "failed to install signal handlers, falling back to Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

    let received = tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };

    tracing::info!(signal = received, "shutdown signal received");
}

/// Wait for Ctrl-C.
#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(signal = "SIGINT", "shutdown signal received");
}
