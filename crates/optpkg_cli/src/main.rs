//! Host probe for the optional capability registry.
//!
//! # Responsibility
//! - Act as the composition root: build the registry from config and package
//!   metadata, then query or invoke capabilities.
//! - Report results on stdout instead of a UI surface.

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::warn;
use optpkg_core::{
    default_log_level, init_logging, CapabilityError, CapabilityRegistry, ManifestPackageSource,
    PackageSource, RegistryConfig, StaticPackageSource,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Exit code when a capability is simply not installed.
const EXIT_UNAVAILABLE: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "optpkg",
    version,
    about = "Inspect and invoke optional extension packages"
)]
struct Args {
    /// Registry config JSON; built-in face-analysis capabilities when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dependency manifest JSON listing declared packages
    #[arg(long)]
    packages: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long)]
    log_dir: Option<String>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints core linkage info
    Ping,
    /// Lists capabilities and their installation state
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Calls a capability's entry point and prints its result
    Invoke { capability: String },
    /// Lists assets shipped in a capability's content directory
    Assets { capability: String },
    /// Prints the path of one asset shipped with a capability
    Asset { capability: String, name: String },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    if let Some(log_dir) = args.log_dir.as_deref() {
        let level = args.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    if let Command::Ping = args.command {
        println!("optpkg_core ping={}", optpkg_core::ping());
        println!("optpkg_core version={}", optpkg_core::core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let registry = build_registry(args.config.as_ref(), args.packages.as_ref())?;
    registry.refresh();

    match args.command {
        Command::Ping => Ok(ExitCode::SUCCESS),
        Command::Status { json } => {
            let snapshot = registry.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                for capability in snapshot {
                    println!(
                        "{:<20} {:<11} invocable={} location={}",
                        capability.id,
                        capability.state,
                        capability.invocable,
                        capability
                            .installed_location
                            .map(|path| path.display().to_string())
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Invoke { capability } => report(registry.invoke(&capability).map(|value| {
            println!("{capability}={value}");
        })),
        Command::Assets { capability } => report(registry.list_assets(&capability).map(|names| {
            for name in names {
                println!("{name}");
            }
        })),
        Command::Asset { capability, name } => {
            report(registry.asset_path(&capability, &name).map(|path| {
                println!("{}", path.display());
            }))
        }
    }
}

fn build_registry(
    config: Option<&PathBuf>,
    packages: Option<&PathBuf>,
) -> anyhow::Result<CapabilityRegistry> {
    let config = match config {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::builtin(),
    };
    let source: Arc<dyn PackageSource> = match packages {
        Some(path) => Arc::new(ManifestPackageSource::new(path)),
        None => Arc::new(StaticPackageSource::default()),
    };
    let registry =
        CapabilityRegistry::from_config(&config, source, Arc::new(config.native_loader()))?;
    Ok(registry)
}

/// Maps capability errors to host behavior: warnings for faults, a quiet
/// "unavailable" for missing features.
fn report(result: Result<(), CapabilityError>) -> anyhow::Result<ExitCode> {
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) if err.is_warning() => {
            warn!("event=cli_warning module=cli status=error error_code={}", err.code());
            eprintln!("warning: {err}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            eprintln!("unavailable: {err}");
            Ok(ExitCode::from(EXIT_UNAVAILABLE))
        }
    }
}
