//! Pipeline d'entraînement : nettoyage → split → scaler → softmax → export.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use isl_core::alphabet::Alphabet;
use isl_core::config::TrainingConfig;
use isl_core::features::{FEATURE_LEN, FeatureVector, column_name, column_names};
use isl_core::scaler::FeatureScaler;
use isl_core::traits::TrainableClassifier;
use isl_dataset::clean::{CleanedDataset, CleaningReport, clean};
use isl_dataset::schema::load_samples;
use isl_dataset::split::stratified_split;
use isl_model::bundle::{ArtifactBundle, ModelInfo};
use isl_model::metrics::{Evaluation, evaluate};
use isl_model::softmax::SoftmaxTrainer;

/// Nombre de prédictions d'exemple affichées.
const SAMPLE_PREDICTIONS: usize = 5;

/// Tout ce qu'un entraînement produit.
pub struct TrainingRun {
    pub bundle: ArtifactBundle,
    pub report: CleaningReport,
    pub degenerate_columns: Vec<usize>,
    pub float_eval: Evaluation,
    pub quantized_eval: Evaluation,
    pub test_labels: Vec<usize>,
}

/// Entraîne sur un dataset nettoyé.
///
/// # Errors
/// Classe trop petite pour le split, ou échec d'entraînement.
pub fn train(
    cleaned: CleanedDataset,
    alphabet: &Alphabet,
    cfg: &TrainingConfig,
) -> Result<TrainingRun> {
    let split = stratified_split(&cleaned.labels, &cleaned.registry, cfg.test_ratio, cfg.seed)?;
    let (train_rows, test_rows) = split.partition(&cleaned.rows);
    let (train_labels, test_labels) = split.partition(&cleaned.labels);

    let fit = FeatureScaler::fit(&train_rows)?;
    let scaler = fit.scaler;
    let scale_all =
        |rows: &[FeatureVector]| rows.iter().map(|r| scaler.transform(r)).collect::<Vec<_>>();
    let train_scaled = scale_all(&train_rows);
    let test_scaled = scale_all(&test_rows);

    let k = cleaned.registry.size();
    let mut trainer = SoftmaxTrainer::from_config(cfg);
    let model = trainer.fit(&train_scaled, &train_labels, k)?;
    let quantized = model.quantize();

    let float_eval = evaluate(&model, &test_scaled, &test_labels)?;
    let quantized_eval = evaluate(&quantized, &test_scaled, &test_labels)?;

    let info = ModelInfo {
        total_malayalam_alphabets: alphabet.len(),
        trained_alphabets: k,
        complete_alphabet_list: alphabet.letters().to_vec(),
        trained_labels: cleaned.registry.labels().to_vec(),
        missing_labels: cleaned.report.missing_letters.clone(),
        model_accuracy: float_eval.accuracy,
        quantized_accuracy: Some(quantized_eval.accuracy),
        input_features: FEATURE_LEN,
        feature_order: column_names(),
        training_samples: train_rows.len(),
        test_samples: test_rows.len(),
    };

    Ok(TrainingRun {
        bundle: ArtifactBundle {
            scaler,
            registry: cleaned.registry,
            model: quantized,
            info: Some(info),
        },
        report: cleaned.report,
        degenerate_columns: fit.degenerate_columns,
        float_eval,
        quantized_eval,
        test_labels,
    })
}

/// Rapport qualité des données.
///
/// # Errors
/// Erreur d'écriture sur `out`.
pub fn print_data_report(
    out: &mut impl Write,
    report: &CleaningReport,
    min_samples_warning: usize,
) -> Result<()> {
    writeln!(out, "=== Données ===")?;
    writeln!(out, "Lignes lues          : {}", report.total_rows)?;
    writeln!(out, "Sans main (retirées) : {}", report.no_hand_rows)?;
    writeln!(
        out,
        "Hors alphabet        : {} ({} labels)",
        report.unknown_label_rows,
        report.unknown_labels.len()
    )?;
    for (label, n) in &report.unknown_labels {
        writeln!(out, "  - '{label}' : {n} lignes ignorées")?;
    }
    writeln!(out, "Lignes gardées       : {}", report.kept_rows())?;

    if !report.low_sample_labels.is_empty() {
        writeln!(out, "Classes sous {min_samples_warning} exemples :")?;
        for (label, n) in &report.low_sample_labels {
            writeln!(out, "  - {label} : {n}")?;
        }
    }
    if !report.missing_letters.is_empty() {
        writeln!(
            out,
            "Lettres sans données ({}) : {}",
            report.missing_letters.len(),
            report.missing_letters.join(" ")
        )?;
    }
    Ok(())
}

/// Table des labels, métriques et prédictions d'exemple.
///
/// # Errors
/// Erreur d'écriture sur `out`.
pub fn print_training_report(out: &mut impl Write, run: &TrainingRun) -> Result<()> {
    let registry = &run.bundle.registry;

    writeln!(out, "\n=== Labels ({}) ===", registry.size())?;
    for (i, (label, n)) in run.report.class_counts.iter().enumerate() {
        writeln!(out, "{i:>3}  {label}  {n}")?;
    }

    if !run.degenerate_columns.is_empty() {
        let names: Vec<String> = run
            .degenerate_columns
            .iter()
            .map(|&c| column_name(c))
            .collect();
        writeln!(
            out,
            "\nColonnes à variance nulle (diviseur 1.0) : {}",
            names.join(", ")
        )?;
    }

    writeln!(out, "\n=== Évaluation ({} lignes de test) ===", run.test_labels.len())?;
    writeln!(out, "Exactitude flottante : {:.2}%", run.float_eval.accuracy * 100.0)?;
    writeln!(out, "Exactitude int8      : {:.2}%", run.quantized_eval.accuracy * 100.0)?;

    writeln!(out, "\n{:<6} {:>9} {:>7} {:>7}", "label", "précision", "rappel", "n")?;
    for (i, m) in run.quantized_eval.per_class.iter().enumerate() {
        let label = registry.label_of(i)?;
        writeln!(
            out,
            "{label:<6} {:>9.3} {:>7.3} {:>7}",
            m.precision, m.recall, m.support
        )?;
    }

    writeln!(out, "\n=== Exemples ===")?;
    writeln!(out, "Réel | Prédit | Confiance")?;
    let eval = &run.quantized_eval;
    for ((&truth, &pred), &conf) in run
        .test_labels
        .iter()
        .zip(&eval.predictions)
        .zip(&eval.confidences)
        .take(SAMPLE_PREDICTIONS)
    {
        writeln!(
            out,
            "{} | {} | {:.3}",
            registry.label_of(truth)?,
            registry.label_of(pred)?,
            conf
        )?;
    }
    Ok(())
}

/// Commande `train` : charge le dataset, entraîne, écrit les artefacts.
///
/// # Errors
/// Dataset illisible, entraînement impossible ou écriture des artefacts.
pub fn run_train(
    dataset: &Path,
    artifacts: &Path,
    alphabet: &Alphabet,
    cfg: &TrainingConfig,
) -> Result<()> {
    let stdout = std::io::stdout();
    train_to(&mut stdout.lock(), dataset, artifacts, alphabet, cfg)
}

/// Corps de `train`, rapports écrits sur `out`. Le rapport de données est
/// écrit dès le nettoyage, avant le split qui peut échouer.
///
/// # Errors
/// Voir [`run_train`].
pub fn train_to(
    out: &mut impl Write,
    dataset: &Path,
    artifacts: &Path,
    alphabet: &Alphabet,
    cfg: &TrainingConfig,
) -> Result<()> {
    let samples = load_samples(dataset)?;
    log::info!("{} lignes chargées depuis {}", samples.len(), dataset.display());

    let cleaned = clean(&samples, alphabet, cfg.min_samples_warning)
        .with_context(|| format!("Nettoyage impossible sur {}", dataset.display()))?;
    print_data_report(out, &cleaned.report, cfg.min_samples_warning)?;

    let run = train(cleaned, alphabet, cfg)
        .with_context(|| format!("Entraînement impossible sur {}", dataset.display()))?;
    print_training_report(out, &run)?;

    run.bundle.save(artifacts)?;
    writeln!(out, "\nArtefacts écrits dans {}", artifacts.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_core::error::CoreError;
    use isl_core::features::FrameFeatures;
    use isl_dataset::schema::LabeledSample;
    use isl_dataset::store::DatasetLog;

    /// Deux lettres séparées sur une coordonnée de la main droite.
    fn samples(per_class: usize) -> Vec<LabeledSample> {
        let mut out = Vec::new();
        for (label, center) in [("അ", 0.3f32), ("ആ", -0.3)] {
            for i in 0..per_class {
                let mut f = FrameFeatures {
                    is_right: true,
                    ..FrameFeatures::default()
                };
                f.vector.0[63 + 8] = center + (i as f32 - per_class as f32 / 2.0) * 0.005;
                f.vector.0[84 + 8] = 0.1;
                out.push(LabeledSample::new(label, f));
            }
        }
        out.push(LabeledSample::new("അ", FrameFeatures::default()));
        let stray = FrameFeatures {
            is_left: true,
            ..FrameFeatures::default()
        };
        out.push(LabeledSample::new("xyz", stray));
        out
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            epochs: 40,
            ..TrainingConfig::default()
        }
    }

    fn fit(rows: &[LabeledSample]) -> Result<TrainingRun> {
        let alphabet = Alphabet::malayalam();
        let cfg = config();
        let cleaned = clean(rows, &alphabet, cfg.min_samples_warning)?;
        train(cleaned, &alphabet, &cfg)
    }

    #[test]
    fn trains_a_separable_dataset() {
        let run = fit(&samples(20)).unwrap();
        assert_eq!(run.bundle.registry.labels(), ["അ", "ആ"]);
        assert_eq!(run.report.no_hand_rows, 1);
        assert_eq!(run.report.unknown_label_rows, 1);
        assert!(run.quantized_eval.accuracy > 0.9);
        assert_eq!(run.test_labels.len(), 8);
        // Constant column 84 + 8 is degenerate.
        assert!(run.degenerate_columns.contains(&(84 + 8)));

        let info = run.bundle.info.as_ref().unwrap();
        assert_eq!(info.trained_alphabets, 2);
        assert_eq!(info.total_malayalam_alphabets, 67);
        assert_eq!(info.missing_labels.len(), 65);
        assert_eq!(info.training_samples + info.test_samples, 40);
    }

    #[test]
    fn artifacts_reload_into_a_driver() {
        let run = fit(&samples(20)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        run.bundle.save(dir.path()).unwrap();

        let bundle = ArtifactBundle::load(dir.path()).unwrap();
        let driver = bundle
            .into_driver(&isl_core::config::RecognitionConfig::default())
            .unwrap();
        let mut f = FrameFeatures {
            is_right: true,
            ..FrameFeatures::default()
        };
        f.vector.0[63 + 8] = -0.3;
        f.vector.0[84 + 8] = 0.1;
        assert_eq!(driver.classify(&f).unwrap().label(), Some("ആ"));
    }

    #[test]
    fn singleton_class_cannot_be_split() {
        let mut rows = samples(10);
        let mut f = FrameFeatures {
            is_left: true,
            ..FrameFeatures::default()
        };
        f.vector.0[5] = 1.0;
        rows.push(LabeledSample::new("ഇ", f));

        let err = fit(&rows).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InsufficientSamplesForStratification { .. })
        ));
    }

    #[test]
    fn reports_render() {
        let run = fit(&samples(20)).unwrap();
        let mut buf = Vec::new();
        print_data_report(&mut buf, &run.report, 50).unwrap();
        print_training_report(&mut buf, &run).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("'xyz' : 1"));
        assert!(text.contains("Réel | Prédit | Confiance"));
        assert!(text.contains("R_x8") || text.contains("R_y8"));
    }

    #[test]
    fn data_report_survives_a_failed_split() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("d.csv");
        let mut log = DatasetLog::open(&dataset).unwrap();
        for row in samples(10) {
            log.append(&row).unwrap();
        }
        // A single ഇ row cannot be stratified.
        let lone = FrameFeatures {
            is_left: true,
            ..FrameFeatures::default()
        };
        log.append(&LabeledSample::new("ഇ", lone)).unwrap();

        let artifacts = dir.path().join("artifacts");
        let mut buf = Vec::new();
        let err = train_to(&mut buf, &dataset, &artifacts, &Alphabet::malayalam(), &config())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InsufficientSamplesForStratification { .. })
        ));

        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("=== Données ==="));
        assert!(text.contains("Sans main (retirées) : 1"));
        assert!(text.contains("'xyz' : 1"));
        assert!(!text.contains("=== Labels"));
        assert!(!artifacts.exists());
    }
}
