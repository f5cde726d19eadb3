use std::path::Path;

use anyhow::Result;
use isl_core::config::DetectorConfig;
use isl_core::traits::LandmarkSource;
use isl_source::{DetectorProcess, ReplaySource};

/// Ouvre la source de détections : fichier rejoué si fourni, sinon le
/// détecteur configuré.
///
/// # Errors
/// Fichier illisible, ou détecteur absent / impossible à lancer.
pub fn open_source(replay: Option<&Path>, detector: &DetectorConfig) -> Result<Box<dyn LandmarkSource>> {
    if let Some(path) = replay {
        log::info!("Source : rejeu de {}", path.display());
        Ok(Box::new(ReplaySource::open(path)?))
    } else {
        Ok(Box::new(DetectorProcess::spawn(&detector.command)?))
    }
}
