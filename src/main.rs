//! Experiments CLI entry point.
//!
//! Provides `check` for validating a registry configuration and `simulate`
//! for replaying a module boot manifest against a fresh registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use experiments::audit::AuditLogger;
use experiments::config::{load_config, load_default_config, Config};
use experiments::logging::{self, LoggingGuard};
use experiments::manifest::{run_boot, BootManifest, BootReport, StepOutcome};
use experiments::registry::Registry;

/// Experiments — private API registry for trusted core modules.
#[derive(Parser)]
#[command(name = "experiments", version, about)]
struct Cli {
    /// Config file. Defaults to `$EXPERIMENTS_CONFIG_PATH` or `~/.experiments/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and print the effective allow list.
    Check,
    /// Replay a boot manifest against a fresh registry.
    Simulate {
        /// Boot manifest (TOML, one `[[module]]` per module in load order).
        manifest: PathBuf,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => load_config(path)?,
        None => load_default_config().context("failed to load configuration")?,
    };
    let _logging_guard = init_logging(&config)?;

    match cli.command {
        Command::Check => handle_check(&config),
        Command::Simulate { manifest, json } => handle_simulate(&config, &manifest, json),
    }
}

/// Console logging, plus rotated JSON files when `logging.logs_dir` is set.
fn init_logging(config: &Config) -> anyhow::Result<Option<LoggingGuard>> {
    match config.logging.logs_dir {
        Some(ref dir) => logging::init_production(dir, &config.logging.level).map(Some),
        None => {
            logging::init_cli(&config.logging.level);
            Ok(None)
        }
    }
}

fn handle_check(config: &Config) -> anyhow::Result<()> {
    let registry = Registry::from_config(&config.registry);
    info!(
        modules = registry.allow_list().len(),
        policy = %registry.policy(),
        "configuration valid"
    );

    println!("token policy: {}", registry.policy());
    println!("allow list ({} modules):", registry.allow_list().len());
    for module in registry.allow_list().iter() {
        println!("  {module}");
    }
    match config.audit.path {
        Some(ref path) => println!("audit trail: {}", path.display()),
        None => println!("audit trail: disabled"),
    }
    Ok(())
}

fn handle_simulate(config: &Config, manifest_path: &Path, json: bool) -> anyhow::Result<()> {
    let manifest = BootManifest::load(manifest_path)?;
    debug!(modules = manifest.modules.len(), "manifest loaded");

    let mut registry = Registry::from_config(&config.registry);
    if let Some(ref path) = config.audit.path {
        let audit = AuditLogger::new(path)
            .with_context(|| format!("failed to open audit trail {}", path.display()))?;
        registry = registry.with_audit(Arc::new(audit));
    }
    let registry = Arc::new(registry);

    let report = run_boot(&registry, &manifest);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        print_report(&report);
    }

    let failures = report.registration_failures();
    if failures > 0 {
        anyhow::bail!("{failures} module(s) failed to register");
    }
    Ok(())
}

fn print_report(report: &BootReport) {
    println!("token policy: {}", report.policy);
    for module in &report.modules {
        println!("{}", module.module);
        println!("  register: {}", describe(&module.registration));
        if let Some(ref publish) = module.publish {
            println!("  publish:  {}", describe(publish));
        }
        for read in &module.reads {
            println!("  read {}: {}", read.target, describe(&read.outcome));
        }
    }
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Ok { keys } if keys.is_empty() => "ok".to_owned(),
        StepOutcome::Ok { keys } => format!("ok [{}]", keys.join(", ")),
        StepOutcome::Failed { kind, message } => format!("FAILED {kind}: {message}"),
    }
}
