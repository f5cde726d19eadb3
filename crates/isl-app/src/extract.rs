//! Extraction hors ligne : fichier de détections JSON-lines → lignes du dataset.

use std::path::Path;

use anyhow::Result;
use rayon::prelude::*;

use isl_core::frame::FrameDetection;
use isl_dataset::schema::LabeledSample;
use isl_dataset::store::DatasetLog;
use isl_source::replay::read_lines;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub frames: usize,
    pub written: usize,
    pub no_hand: usize,
    pub invalid: usize,
}

/// Assemble les features de chaque ligne en parallèle, ordre conservé.
/// Les lignes invalides sont loguées avec leur numéro puis comptées.
#[must_use]
pub fn extract_samples(label: &str, lines: &[(usize, String)]) -> (Vec<LabeledSample>, usize) {
    let results: Vec<Option<LabeledSample>> = lines
        .par_iter()
        .map(|(line_no, line)| {
            let detection = match FrameDetection::from_json_line(line) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("Ligne {line_no} ignorée : {e}");
                    return None;
                }
            };
            match detection.features() {
                Ok(features) => {
                    let sample = LabeledSample::new(label, features);
                    Some(match &detection.image {
                        Some(img) => sample.with_image(img.to_string_lossy()),
                        None => sample,
                    })
                }
                Err(e) => {
                    log::warn!("Ligne {line_no} ignorée : {e}");
                    None
                }
            }
        })
        .collect();

    let invalid = results.iter().filter(|r| r.is_none()).count();
    (results.into_iter().flatten().collect(), invalid)
}

/// Ajoute au dataset les frames de `input` sous `label`.
///
/// # Errors
/// Fichier illisible ou écriture du dataset impossible.
pub fn run_extract(
    label: &str,
    input: &Path,
    log: &mut DatasetLog,
    replace: bool,
) -> Result<ExtractReport> {
    let lines = read_lines(input)?;
    let (samples, invalid) = extract_samples(label, &lines);

    if replace && log.count(label) > 0 {
        let removed = log.remove_label(label)?;
        log::info!("'{label}' : {removed} lignes existantes supprimées");
    }

    let mut report = ExtractReport {
        frames: lines.len(),
        invalid,
        ..ExtractReport::default()
    };
    for sample in &samples {
        if !sample.has_hand() {
            report.no_hand += 1;
        }
        log.append(sample)?;
        report.written += 1;
    }
    log::info!(
        "{} : {} frames, {} lignes écrites, {} invalides",
        input.display(),
        report.frames,
        report.written,
        report.invalid
    );
    Ok(report)
}
