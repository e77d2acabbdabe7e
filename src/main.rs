//! Stationeers Map Data.
//!
//! Kommandozeile: liest die Stock-Welten und schreibt JSON + Terrain.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use stationeers_map_data::options::{expand_home, DEFAULT_WORLDS_DIR};
use stationeers_map_data::{report_outcomes, run_worlds, BuilderOptions};

/// Erzeugt Web-Kartendaten aus Stationeers-Welten.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Worlds-Verzeichnis der Stationeers-Installation
    #[arg(default_value = DEFAULT_WORLDS_DIR)]
    base_dir: String,

    /// Optionen-Datei (TOML), Standard: neben der Binary
    #[arg(long)]
    config: Option<PathBuf>,

    /// Zielverzeichnis (überschreibt die Optionen-Datei)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Nur diese Welt(en) verarbeiten
    #[arg(long = "world")]
    worlds: Vec<String>,

    /// Keine Terrain-Bilder schreiben
    #[arg(long)]
    no_terrain: bool,

    /// JSON eingerückt schreiben
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    // Logger initialisieren
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    log::info!("Stationeers Map Data v{} startet...", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.clone().unwrap_or_else(BuilderOptions::config_path);
    let mut options = BuilderOptions::load_from_file(&config_path);
    if let Some(output) = cli.output {
        options.output_dir = output;
    }
    if cli.no_terrain {
        options.write_terrain = false;
    }

    let base_dir = expand_home(&cli.base_dir);
    let outcomes = run_worlds(&base_dir, &options, &cli.worlds, cli.pretty);
    let failed = report_outcomes(&outcomes);

    if failed > 0 {
        log::error!("{} von {} Welt(en) fehlgeschlagen", failed, outcomes.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
