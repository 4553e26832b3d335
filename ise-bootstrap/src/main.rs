// SPDX-License-Identifier: AGPL-3.0-or-later
//! ISE bootstrap: promotes identity-service nodes into a deployment

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use ise_bootstrap::{
    config::LoggingConfig,
    deployment::DeploymentClient,
    orchestrator::{self, PromotionExecutor, PromotionPlan, RunReport},
    settings::FileSettings,
    trigger::{HealthTrigger, TriggerOutcome, TriggerSettings},
    ClusterConfig, Config, RunOutcome,
};

/// ISE bootstrap controller
///
/// Orchestration of primary, secondary and PSN node promotion.
/// Probes node status over the management API and issues role assignments
/// once their preconditions hold.
#[derive(Parser, Debug)]
#[command(name = "ise-bootstrap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "ise-bootstrap.toml")]
    config: PathBuf,

    /// Settings store path (overrides settings_file from the configuration)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Dry run mode (probe and plan, issue no mutations)
    #[arg(long)]
    dry_run: bool,

    /// Print run results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one orchestration: probe, plan, promote, register
    #[command(alias = "exec")]
    Run,

    /// Probe and classify both admin slots
    Probe,

    /// Probe both admin slots and show the plan without issuing it
    Plan,

    /// Check the primary once and fire the callback if it is ready
    Trigger,

    /// Check the primary periodically until interrupted
    Watch {
        /// Seconds between checks (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Load the settings store and show the cluster it describes
    #[command(alias = "settings")]
    CheckSettings,

    /// Show configuration
    Config,

    /// Initialize a new configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config);
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_logging(&cli, &logging);

    let result = match cli.command {
        Commands::Version => {
            println!("ise-bootstrap v{}", env!("CARGO_PKG_VERSION"));
            println!("Deployment bootstrap controller for identity-service nodes");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { force } => init_config(&cli.config, force),
        Commands::Config => loaded.and_then(|config| show_config(&cli.config, &config)),
        Commands::CheckSettings => match loaded {
            Ok(config) => check_settings(&cli, &config),
            Err(e) => Err(e),
        },
        Commands::Probe => match loaded {
            Ok(config) => probe_nodes(&cli, &config, false).await,
            Err(e) => Err(e),
        },
        Commands::Plan => match loaded {
            Ok(config) => probe_nodes(&cli, &config, true).await,
            Err(e) => Err(e),
        },
        Commands::Run => run_orchestration(&cli, loaded).await,
        Commands::Trigger => match loaded {
            Ok(config) => trigger_once(&cli, &config).await,
            Err(e) => Err(e),
        },
        Commands::Watch { interval } => match loaded {
            Ok(config) => watch(&cli, &config, interval).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Initialize logging from the flags, falling back to the configured level
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the configuration file, or the defaults when there is none
fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    Config::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn load_settings(cli: &Cli, config: &Config) -> anyhow::Result<FileSettings> {
    let path = cli.settings.as_ref().unwrap_or(&config.settings_file);
    FileSettings::from_file(path)
        .with_context(|| format!("Failed to load settings store from {}", path.display()))
}

fn load_cluster(cli: &Cli, config: &Config) -> anyhow::Result<ClusterConfig> {
    let settings = load_settings(cli, config)?;
    Ok(orchestrator::prepare(config, &settings)?)
}

/// Initialize a new configuration file
fn init_config(config_path: &Path, force: bool) -> anyhow::Result<ExitCode> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let default_config = r#"# SPDX-License-Identifier: AGPL-3.0-or-later
# ISE bootstrap configuration

name = "ise-bootstrap"
version = "1.0"
settings_file = "settings.toml"

[transport]
scheme = "https"
request_timeout_secs = 30
accept_invalid_certs = true

[orchestration]
settle_delay_secs = 100
secondary_assignment_offset = 1
# run_ceiling_secs = 600

[trigger]
interval_secs = 300

[logging]
level = "info"
format = "text"
"#;

    std::fs::write(config_path, default_config)?;
    println!("Created configuration file: {}", config_path.display());
    Ok(ExitCode::SUCCESS)
}

/// Show the current configuration
fn show_config(config_path: &Path, config: &Config) -> anyhow::Result<ExitCode> {
    if !config_path.exists() {
        println!("No configuration file found. Using defaults:");
        println!();
    }

    println!("{}", toml::to_string_pretty(config)?);
    Ok(ExitCode::SUCCESS)
}

/// Show the cluster described by the settings store
fn check_settings(cli: &Cli, config: &Config) -> anyhow::Result<ExitCode> {
    let cluster = load_cluster(cli, config)?;

    println!("Settings are consistent");
    println!();
    println!("  Admin user: {}", cluster.credentials.username);
    println!("  Primary:    {} ({})", cluster.primary.fqdn, cluster.primary.ip);
    println!("  Secondary:  {} ({})", cluster.secondary.fqdn, cluster.secondary.ip);
    println!();
    println!("Secondary promotions: {}", cluster.secondaries.len());
    for node in &cluster.secondaries {
        println!("  - {} roles={} services={}", node.fqdn, node.roles, node.services);
    }
    println!("PSN registrations: {}", cluster.psns.len());
    for node in &cluster.psns {
        let note = if node.is_dedicated_monitoring() {
            " (dedicated monitoring, services dropped)"
        } else {
            ""
        };
        println!(
            "  - {} roles={} services={}{}",
            node.fqdn, node.roles, node.services, note
        );
    }
    println!();
    println!(
        "Worst-case run latency: {}s",
        config
            .worst_case_latency(cluster.secondaries.len(), cluster.psns.len())
            .as_secs()
    );

    Ok(ExitCode::SUCCESS)
}

/// Probe both admin slots, optionally showing the resulting plan
async fn probe_nodes(cli: &Cli, config: &Config, show_plan: bool) -> anyhow::Result<ExitCode> {
    let cluster = load_cluster(cli, config)?;
    let client = DeploymentClient::new(
        &config.transport,
        cluster.primary.ip.clone(),
        cluster.credentials.clone(),
    )?;

    let executor = PromotionExecutor::new(&client, config.orchestration.settle_delay());
    let (primary, secondary) = executor.probe_admin_slots(&cluster).await;

    println!("Primary   {} ({}): {}", cluster.primary.fqdn, cluster.primary.ip, primary);
    println!("Secondary {} ({}): {}", cluster.secondary.fqdn, cluster.secondary.ip, secondary);

    if show_plan {
        let plan = PromotionPlan::decide(primary, secondary, &cluster);
        println!();
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print_plan(&plan);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_plan(plan: &PromotionPlan) {
    if plan.is_empty() {
        println!("Plan: nothing to do");
        return;
    }

    println!("Plan:");
    if plan.promote_primary {
        println!("  - promote primary, then wait for it to settle");
    }
    for node in &plan.secondaries {
        println!("  - promote secondary {} roles={} services={}", node.fqdn, node.roles, node.services);
    }
    for node in &plan.psns {
        println!("  - register PSN {} roles={} services={}", node.fqdn, node.roles, node.services);
    }
}

fn print_report(report: &RunReport, dry_run: bool) {
    if dry_run {
        println!("[DRY RUN] No mutations were issued");
    }
    println!("Primary:   {}", report.primary);
    println!("Secondary: {}", report.secondary);

    if !report.mutations.is_empty() {
        println!();
        println!("Mutations:");
        for mutation in &report.mutations {
            println!(
                "  {:<18} {:<32} {}",
                mutation.operation.to_string(),
                mutation.target,
                mutation.status
            );
        }
    }

    println!();
    println!("Results:");
    println!("  Duration: {} ms", report.total_duration_ms);
    println!("  Mutations succeeded: {}", report.mutations_succeeded);
    println!("  Mutations failed: {}", report.mutations_failed);
}

/// Run one orchestration
///
/// Configuration and settings load failures are reported as a fatal outcome,
/// like every other failure before the first probe.
async fn run_orchestration(
    cli: &Cli,
    loaded: anyhow::Result<Config>,
) -> anyhow::Result<ExitCode> {
    let prepared = loaded.and_then(|config| {
        let settings = load_settings(cli, &config)?;
        Ok((config, settings))
    });

    let outcome = match prepared {
        Ok((config, settings)) => {
            if cli.dry_run && !cli.json {
                println!("[DRY RUN] Probing nodes and deciding the plan only");
            }
            orchestrator::run(&config, &settings, cli.dry_run).await
        }
        Err(e) => {
            let cause = format!("{:#}", e);
            error!(error = %cause, "Cannot start orchestration run");
            RunOutcome::Fatal { cause }
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        if let Some(report) = outcome.report() {
            print_report(report, cli.dry_run);
            println!();
        }
        if let RunOutcome::PartialFailure { failures, .. } = &outcome {
            println!("Failures:");
            for failure in failures {
                println!("  - {}", failure);
            }
            println!();
        }
        println!("{}", outcome.message());
    }

    Ok(ExitCode::from(outcome.exit_code()))
}

/// Check the primary once
async fn trigger_once(cli: &Cli, config: &Config) -> anyhow::Result<ExitCode> {
    let settings = load_settings(cli, config)?;
    let trigger_settings = TriggerSettings::load(&settings)?;
    let (client, callback) = trigger_settings.connect(config)?;

    let trigger = HealthTrigger::new(&client, &callback, trigger_settings.primary.clone());
    match trigger.check_once().await {
        TriggerOutcome::Fired(response) => {
            println!("Primary is ready: callback returned status {}", response.status);
            Ok(ExitCode::SUCCESS)
        }
        TriggerOutcome::NotEligible(classification) => {
            println!("Primary is {}: callback not invoked", classification);
            Ok(ExitCode::SUCCESS)
        }
        TriggerOutcome::Unreachable => {
            println!("Primary is unreachable: callback not invoked");
            Ok(ExitCode::SUCCESS)
        }
        TriggerOutcome::CallbackFailed(message) => {
            println!("Primary is ready but the callback failed: {}", message);
            Ok(ExitCode::from(1))
        }
    }
}

/// Check the primary periodically
async fn watch(cli: &Cli, config: &Config, interval: Option<u64>) -> anyhow::Result<ExitCode> {
    let interval = interval.unwrap_or(config.trigger.interval_secs);
    if interval == 0 {
        anyhow::bail!("Watch interval must be positive");
    }

    let settings = load_settings(cli, config)?;
    let trigger_settings = TriggerSettings::load(&settings)?;
    let (client, callback) = trigger_settings.connect(config)?;

    let trigger = HealthTrigger::new(&client, &callback, trigger_settings.primary.clone());
    trigger.watch(Duration::from_secs(interval)).await?;
    Ok(ExitCode::SUCCESS)
}
