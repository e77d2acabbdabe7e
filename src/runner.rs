//! Parallele Verarbeitung mehrerer Welten.

use anyhow::Result;
use rayon::prelude::*;
use std::path::Path;

use crate::options::BuilderOptions;
use crate::world::{build_world, WorldReport};

/// Ergebnis einer Welt; ein Fehler betrifft nur diese Welt.
#[derive(Debug)]
pub struct WorldOutcome {
    pub name: String,
    pub result: Result<WorldReport>,
}

/// Verarbeitet alle ausgewählten Welten parallel.
///
/// Jede Welt läuft bis zum Ende, auch wenn andere fehlschlagen.
/// Die Reihenfolge der Ergebnisse folgt der Konfiguration.
pub fn run_worlds(
    base_dir: &Path,
    options: &BuilderOptions,
    filter: &[String],
    pretty: bool,
) -> Vec<WorldOutcome> {
    let worlds = options.selected_worlds(filter);
    log::info!(
        "{} Welt(en) aus {}",
        worlds.len(),
        base_dir.display()
    );

    worlds
        .par_iter()
        .map(|entry| WorldOutcome {
            name: entry.name.clone(),
            result: build_world(entry, base_dir, options, pretty),
        })
        .collect()
}

/// Loggt alle Ergebnisse und gibt die Anzahl fehlgeschlagener Welten zurück.
pub fn report_outcomes(outcomes: &[WorldOutcome]) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                let [mining, poi, names] = report.feature_counts;
                log::info!(
                    "Welt '{}' fertig: {} ({} Startpunkte, mining {}, poi {}, names {})",
                    outcome.name,
                    report.json_path.display(),
                    report.start_location_count,
                    mining,
                    poi,
                    names
                );
            }
            Err(e) => {
                failed += 1;
                log::error!("Welt '{}' fehlgeschlagen: {:#}", outcome.name, e);
            }
        }
    }
    failed
}
