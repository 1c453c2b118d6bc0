//! Relic - Development Tools

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use relic_core::data::ConfigKind;
use relic_tools::{loader, validate};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "relic-tools")]
#[command(about = "Development tools for Relic content authors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one config file
    Validate {
        /// Path to a .ron or .json file
        file: PathBuf,
    },
    /// Validate every config file in a directory tree
    ValidateAll {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        directory: PathBuf,
    },
    /// Print the schema for a config type
    Schema {
        /// EraConfig, UnitArchetype, WeaponStats or UpgradeDefinition
        kind: String,
    },
    /// Load a data directory into a content registry
    Load {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        directory: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            if !file.is_file() {
                eprintln!("Error: File not found: {}", file.display());
                return ExitCode::FAILURE;
            }
            let report = validate::validate_file(&file);
            print!("{}", validate::render_report(&report));
            exit_code(report.is_valid())
        }
        Commands::ValidateAll { directory } => {
            if !directory.is_dir() {
                eprintln!("Error: Directory not found: {}", directory.display());
                return ExitCode::FAILURE;
            }
            tracing::info!("Validating data files in: {}", directory.display());
            match validate::validate_directory(&directory) {
                Ok(reports) if reports.is_empty() => {
                    println!("No config files found");
                    ExitCode::SUCCESS
                }
                Ok(reports) => {
                    print!("{}", validate::render_directory(&reports));
                    exit_code(validate::Summary::from_reports(&reports).is_success())
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Schema { kind } => match ConfigKind::parse(&kind) {
            Some(kind) => {
                print!("{}", validate::render_schema(kind));
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("Unknown config type: {kind}");
                let names: Vec<_> = ConfigKind::ALL.iter().map(|k| k.name()).collect();
                eprintln!("Available types: {}", names.join(", "));
                ExitCode::FAILURE
            }
        },
        Commands::Load { directory } => match loader::load_directory(&directory) {
            Ok(registry) => {
                println!(
                    "Loaded {} eras, {} archetypes, {} weapons, {} upgrades",
                    registry.era_count(),
                    registry.archetype_count(),
                    registry.weapon_count(),
                    registry.upgrade_count()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("Load failed: {e}");
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
