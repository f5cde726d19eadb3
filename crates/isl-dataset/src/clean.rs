use std::collections::BTreeMap;

use isl_core::alphabet::Alphabet;
use isl_core::error::CoreError;
use isl_core::features::FeatureVector;
use isl_core::labels::LabelRegistry;

use crate::schema::LabeledSample;

/// Ce que le nettoyage a gardé et jeté.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub total_rows: usize,
    /// Lignes sans aucune main détectée.
    pub no_hand_rows: usize,
    /// Lignes dont le label n'est pas dans l'alphabet.
    pub unknown_label_rows: usize,
    /// Labels rejetés et leur nombre de lignes.
    pub unknown_labels: BTreeMap<String, usize>,
    /// Lignes gardées par classe, ordre du registre.
    pub class_counts: Vec<(String, usize)>,
    /// Lettres de l'alphabet absentes des données nettoyées.
    pub missing_letters: Vec<String>,
    /// Classes sous le seuil d'alerte.
    pub low_sample_labels: Vec<(String, usize)>,
}

impl CleaningReport {
    #[must_use]
    pub fn kept_rows(&self) -> usize {
        self.class_counts.iter().map(|(_, c)| c).sum()
    }
}

/// Matrice d'entraînement : lignes, index de label parallèles, registre.
#[derive(Clone, Debug)]
pub struct CleanedDataset {
    pub rows: Vec<FeatureVector>,
    pub labels: Vec<usize>,
    pub registry: LabelRegistry,
    pub report: CleaningReport,
}

/// Filtre les lignes capturées et construit le registre.
///
/// Filtre 1 : au moins une main. Filtre 2 : label dans l'alphabet. Le
/// registre suit l'ordre canonique de l'alphabet, restreint aux lettres
/// qui survivent aux deux filtres.
///
/// # Errors
/// `CoreError::EmptyDataset` si aucune ligne ne survit.
///
/// # Example
/// ```
/// use isl_core::alphabet::Alphabet;
/// use isl_core::features::FrameFeatures;
/// use isl_dataset::clean::clean;
/// use isl_dataset::schema::LabeledSample;
///
/// let hand = FrameFeatures { is_left: true, ..FrameFeatures::default() };
/// let rows = vec![
///     LabeledSample::new("ആ", hand),
///     LabeledSample::new("അ", hand),
///     LabeledSample::new("അ", FrameFeatures::default()),
/// ];
/// let alphabet = Alphabet::new(["അ", "ആ", "ഇ"]).unwrap();
/// let ds = clean(&rows, &alphabet, 50).unwrap();
/// assert_eq!(ds.registry.labels(), ["അ", "ആ"]);
/// assert_eq!(ds.labels, vec![1, 0]);
/// assert_eq!(ds.report.no_hand_rows, 1);
/// ```
pub fn clean(
    samples: &[LabeledSample],
    alphabet: &Alphabet,
    min_samples_warning: usize,
) -> Result<CleanedDataset, CoreError> {
    let mut report = CleaningReport {
        total_rows: samples.len(),
        ..CleaningReport::default()
    };

    let mut kept: Vec<&LabeledSample> = Vec::with_capacity(samples.len());
    for s in samples {
        if !s.has_hand() {
            report.no_hand_rows += 1;
        } else if !alphabet.contains(&s.label) {
            report.unknown_label_rows += 1;
            *report.unknown_labels.entry(s.label.clone()).or_insert(0) += 1;
        } else {
            kept.push(s);
        }
    }

    if kept.is_empty() {
        return Err(CoreError::EmptyDataset("aucune ligne après nettoyage"));
    }

    let registry = LabelRegistry::from_present(alphabet, kept.iter().map(|s| s.label.as_str()))?;

    let mut per_class = vec![0usize; registry.size()];
    let mut rows = Vec::with_capacity(kept.len());
    let mut labels = Vec::with_capacity(kept.len());
    for s in kept {
        let idx = registry.index_of(&s.label)?;
        per_class[idx] += 1;
        rows.push(s.features.vector);
        labels.push(idx);
    }

    report.class_counts = registry
        .labels()
        .iter()
        .cloned()
        .zip(per_class)
        .collect();
    report.low_sample_labels = report
        .class_counts
        .iter()
        .filter(|(_, c)| *c < min_samples_warning)
        .cloned()
        .collect();
    report.missing_letters = alphabet
        .filter(|l| !registry.contains(l))
        .map(str::to_string)
        .collect();

    log::info!(
        "Nettoyage : {} → {} lignes ({} sans main, {} hors alphabet), {} classes",
        report.total_rows,
        rows.len(),
        report.no_hand_rows,
        report.unknown_label_rows,
        registry.size()
    );

    Ok(CleanedDataset {
        rows,
        labels,
        registry,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_core::features::FrameFeatures;

    fn with_hand(label: &str, marker: f32) -> LabeledSample {
        let mut f = FrameFeatures {
            is_right: true,
            ..FrameFeatures::default()
        };
        f.vector.0[70] = marker;
        LabeledSample::new(label, f)
    }

    fn no_hand(label: &str) -> LabeledSample {
        LabeledSample::new(label, FrameFeatures::default())
    }

    #[test]
    fn registry_follows_canonical_order() {
        let alphabet = Alphabet::new(["അ", "ആ", "ഇ"]).unwrap();
        let rows = [with_hand("അ", 1.0), with_hand("അ", 2.0), with_hand("ആ", 3.0)];
        let ds = clean(&rows, &alphabet, 50).unwrap();
        assert_eq!(ds.registry.index_of("അ").unwrap(), 0);
        assert_eq!(ds.registry.index_of("ആ").unwrap(), 1);
        assert_eq!(ds.registry.size(), 2);
        assert_eq!(ds.report.missing_letters, vec!["ഇ".to_string()]);
    }

    #[test]
    fn handless_rows_never_reach_the_matrix() {
        let alphabet = Alphabet::new(["അ", "ആ"]).unwrap();
        let rows = [with_hand("അ", 1.0), no_hand("അ"), no_hand("ആ"), with_hand("ആ", 4.0)];
        let ds = clean(&rows, &alphabet, 1).unwrap();
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.report.no_hand_rows, 2);
        assert!(ds.rows.iter().all(|r| r.0[70] != 0.0));
    }

    #[test]
    fn labels_outside_alphabet_are_dropped_and_reported() {
        let alphabet = Alphabet::new(["അ"]).unwrap();
        let rows = [with_hand("അ", 1.0), with_hand("x", 1.0), with_hand("x", 1.0)];
        let ds = clean(&rows, &alphabet, 1).unwrap();
        assert_eq!(ds.labels, vec![0]);
        assert_eq!(ds.report.unknown_label_rows, 2);
        assert_eq!(ds.report.unknown_labels.get("x"), Some(&2));
    }

    #[test]
    fn low_sample_classes_are_flagged() {
        let alphabet = Alphabet::new(["അ", "ആ"]).unwrap();
        let mut rows: Vec<_> = (0..5).map(|i| with_hand("അ", i as f32)).collect();
        rows.push(with_hand("ആ", 1.0));
        let ds = clean(&rows, &alphabet, 3).unwrap();
        assert_eq!(ds.report.low_sample_labels, vec![("ആ".to_string(), 1)]);
        assert_eq!(ds.report.kept_rows(), 6);
    }

    #[test]
    fn nothing_left_is_an_error() {
        let alphabet = Alphabet::new(["അ"]).unwrap();
        assert!(matches!(
            clean(&[no_hand("അ")], &alphabet, 1),
            Err(CoreError::EmptyDataset(_))
        ));
    }
}
