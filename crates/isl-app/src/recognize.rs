//! Boucle de reconnaissance : une détection → au plus une lettre émise.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use isl_core::driver::{ClassificationDriver, Outcome, Prediction};
use isl_core::traits::{Classifier, LandmarkSource};
use isl_model::bundle::ArtifactBundle;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecognitionSummary {
    pub frames: usize,
    pub emitted: usize,
    pub no_hand: usize,
    pub below_threshold: usize,
    pub skipped: usize,
}

fn log_top(p: &Prediction) {
    if log::log_enabled!(log::Level::Debug) {
        let top: Vec<String> = p
            .top
            .iter()
            .map(|(label, s)| format!("{label} {s:.3}"))
            .collect();
        log::debug!("top-{} : {}", top.len(), top.join(", "));
    }
}

/// Classe chaque frame de `source` jusqu'à épuisement ou interruption.
/// Chaque lettre émise est écrite sur `out` : `label<TAB>confiance`.
///
/// # Errors
/// Erreur d'écriture sur `out`. Les erreurs de frame sont loguées et la
/// frame est ignorée.
pub fn recognize_stream<C: Classifier>(
    driver: &ClassificationDriver<C>,
    source: &mut dyn LandmarkSource,
    quit: &AtomicBool,
    out: &mut impl Write,
) -> Result<RecognitionSummary> {
    let mut summary = RecognitionSummary::default();

    while !quit.load(Ordering::Relaxed) {
        let detection = match source.next_frame() {
            Ok(Some(d)) => d,
            Ok(None) => break,
            Err(e) => {
                log::warn!("Frame ignorée : {e:#}");
                summary.skipped += 1;
                continue;
            }
        };
        summary.frames += 1;

        let outcome = detection
            .features()
            .and_then(|features| driver.classify(&features));
        match outcome {
            Ok(Outcome::NoHand) => summary.no_hand += 1,
            Ok(Outcome::BelowThreshold(p)) => {
                log::debug!("'{}' sous le seuil ({:.3})", p.label, p.confidence);
                log_top(&p);
                summary.below_threshold += 1;
            }
            Ok(Outcome::Label(p)) => {
                log_top(&p);
                writeln!(out, "{}\t{:.3}", p.label, p.confidence)?;
                out.flush()?;
                summary.emitted += 1;
            }
            Err(e) => {
                log::warn!("Frame {} ignorée : {e}", summary.frames);
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

/// Résumé d'un bundle chargé, pour `recognize --check`.
///
/// # Errors
/// Erreur d'écriture sur `out`.
pub fn print_check(out: &mut impl Write, bundle: &ArtifactBundle) -> Result<()> {
    writeln!(out, "Artefacts valides")?;
    writeln!(out, "  classes : {}", bundle.registry.size())?;
    writeln!(out, "  labels  : {}", bundle.registry.labels().join(" "))?;
    writeln!(out, "  modèle  : {} octets (int8)", bundle.model.param_bytes())?;
    if let Some(info) = &bundle.info {
        writeln!(
            out,
            "  exactitude test : {:.2}%{}",
            info.model_accuracy * 100.0,
            info.quantized_accuracy
                .map(|q| format!(" (int8 {:.2}%)", q * 100.0))
                .unwrap_or_default()
        )?;
        if !info.missing_labels.is_empty() {
            writeln!(out, "  lettres non entraînées : {}", info.missing_labels.len())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_core::features::FEATURE_LEN;
    use isl_core::labels::LabelRegistry;
    use isl_core::scaler::FeatureScaler;
    use isl_model::softmax::SoftmaxModel;
    use isl_source::replay::ReplaySource;
    use std::io::Cursor;

    /// Class 0 fires on a positive right-hand x of landmark 8, class 1 on a
    /// negative one.
    fn driver(min_confidence: Option<f32>) -> ClassificationDriver<SoftmaxModel> {
        let mut weights = vec![0.0; 2 * FEATURE_LEN];
        weights[63 + 8] = 20.0;
        weights[FEATURE_LEN + 63 + 8] = -20.0;
        let model = SoftmaxModel::from_parts(2, weights, vec![0.0; 2]).unwrap();
        let scaler =
            FeatureScaler::from_parts(vec![0.0; FEATURE_LEN], vec![1.0; FEATURE_LEN]).unwrap();
        ClassificationDriver::new(scaler, LabelRegistry::new(["അ", "ആ"]).unwrap(), model)
            .unwrap()
            .with_min_confidence(min_confidence)
            .with_top_k(2)
    }

    fn frame(tip_dx: f32) -> String {
        let wrist = r#"{"x":0.5,"y":0.5,"z":0.0}"#;
        let mut lms = vec![wrist.to_string(); 21];
        lms[8] = format!(r#"{{"x":{},"y":0.4,"z":0.0}}"#, 0.5 + tip_dx);
        format!(
            r#"{{"hands":[{{"side":"Right","landmarks":[{}]}}]}}"#,
            lms.join(",")
        )
    }

    fn run(lines: &[String], min_confidence: Option<f32>) -> (RecognitionSummary, String) {
        let mut src = ReplaySource::from_reader(Cursor::new(lines.join("\n")));
        let quit = AtomicBool::new(false);
        let mut out = Vec::new();
        let summary = recognize_stream(&driver(min_confidence), &mut src, &quit, &mut out).unwrap();
        (summary, String::from_utf8(out).unwrap())
    }

    #[test]
    fn emits_one_label_per_hand_frame() {
        let lines = vec![
            frame(0.1),
            r#"{"hands":[]}"#.to_string(),
            frame(-0.1),
        ];
        let (summary, text) = run(&lines, None);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.emitted, 2);
        assert_eq!(summary.no_hand, 1);
        let labels: Vec<&str> = text
            .lines()
            .filter_map(|l| l.split('\t').next())
            .collect();
        assert_eq!(labels, ["അ", "ആ"]);
    }

    #[test]
    fn low_confidence_is_counted_not_emitted() {
        // A tiny offset gives scores close to 0.5.
        let (summary, text) = run(&[frame(0.001)], Some(0.75));
        assert_eq!(summary.below_threshold, 1);
        assert_eq!(summary.emitted, 0);
        assert!(text.is_empty());
    }

    #[test]
    fn bad_frames_do_not_stop_the_loop() {
        let lines = vec!["garbage".to_string(), frame(0.1)];
        let (summary, _) = run(&lines, None);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.emitted, 1);
    }

    #[test]
    fn quit_flag_is_checked_between_frames() {
        let mut src = ReplaySource::from_reader(Cursor::new(frame(0.1)));
        let quit = AtomicBool::new(true);
        let mut out = Vec::new();
        let summary = recognize_stream(&driver(None), &mut src, &quit, &mut out).unwrap();
        assert_eq!(summary.frames, 0);
    }
}
