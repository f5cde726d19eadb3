use isl_core::driver::argmax;
use isl_core::error::CoreError;
use isl_core::features::FeatureVector;
use isl_core::traits::Classifier;

/// Précision / rappel d'une classe.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    /// Lignes de test de cette classe.
    pub support: usize,
}

/// Évaluation d'un modèle sur un jeu étiqueté.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    /// `confusion[vrai][prédit]`.
    pub confusion: Vec<Vec<usize>>,
    pub per_class: Vec<ClassMetrics>,
    /// Classe prédite pour chaque ligne, dans l'ordre d'entrée.
    pub predictions: Vec<usize>,
    /// Confiance (score max) de chaque prédiction.
    pub confidences: Vec<f32>,
}

/// Classe chaque ligne et compare à la vérité.
///
/// # Errors
/// Propage les erreurs du classifieur ; `CoreError::ArtifactMismatch` si le
/// modèle renvoie un nombre de scores incorrect, `CoreError::IndexOutOfRange`
/// pour un label hors de `0..K`.
pub fn evaluate<C: Classifier + ?Sized>(
    model: &C,
    rows: &[FeatureVector],
    labels: &[usize],
) -> Result<Evaluation, CoreError> {
    let k = model.num_classes();
    let mut confusion = vec![vec![0usize; k]; k];
    let mut predictions = Vec::with_capacity(rows.len());
    let mut confidences = Vec::with_capacity(rows.len());

    for (row, &truth) in rows.iter().zip(labels) {
        if truth >= k {
            return Err(CoreError::IndexOutOfRange {
                index: truth,
                size: k,
            });
        }
        let scores = model.scores(row)?;
        if scores.len() != k {
            return Err(CoreError::ArtifactMismatch(format!(
                "{} scores reçus pour {k} classes",
                scores.len()
            )));
        }
        let Some(pred) = argmax(&scores) else {
            return Err(CoreError::ArtifactMismatch("aucun score".into()));
        };
        confusion[truth][pred] += 1;
        predictions.push(pred);
        confidences.push(scores[pred]);
    }

    let total = predictions.len();
    let correct: usize = (0..k).map(|c| confusion[c][c]).sum();
    let per_class = (0..k)
        .map(|c| {
            let tp = confusion[c][c];
            let support: usize = confusion[c].iter().sum();
            let predicted: usize = confusion.iter().map(|r| r[c]).sum();
            ClassMetrics {
                precision: ratio(tp, predicted),
                recall: ratio(tp, support),
                support,
            }
        })
        .collect();

    Ok(Evaluation {
        accuracy: ratio(correct, total),
        confusion,
        per_class,
        predictions,
        confidences,
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Predicts class `round(x[0])`, clamped to 0..K.
    struct ByFirstFeature(usize);

    impl Classifier for ByFirstFeature {
        fn num_classes(&self) -> usize {
            self.0
        }
        fn scores(&self, input: &FeatureVector) -> Result<Vec<f32>, CoreError> {
            let c = (input.0[0].round().max(0.0) as usize).min(self.0 - 1);
            let mut s = vec![0.0; self.0];
            s[c] = 1.0;
            Ok(s)
        }
    }

    fn row(v: f32) -> FeatureVector {
        let mut r = FeatureVector::default();
        r.0[0] = v;
        r
    }

    #[test]
    fn counts_confusion_and_per_class_scores() {
        let rows = [row(0.0), row(0.0), row(1.0), row(1.0), row(0.0)];
        let labels = [0, 0, 1, 0, 1];
        let eval = evaluate(&ByFirstFeature(2), &rows, &labels).unwrap();

        assert!((eval.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(eval.confusion, vec![vec![2, 1], vec![1, 1]]);
        assert_eq!(eval.predictions, vec![0, 0, 1, 1, 0]);
        // class 0: tp 2, predicted 3, support 3
        assert!((eval.per_class[0].precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((eval.per_class[0].recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(eval.per_class[1].support, 2);
    }

    #[test]
    fn never_predicted_class_has_zero_precision() {
        let eval = evaluate(&ByFirstFeature(3), &[row(0.0)], &[2]).unwrap();
        assert_eq!(eval.per_class[2].precision, 0.0);
        assert_eq!(eval.per_class[2].recall, 0.0);
        assert_eq!(eval.accuracy, 0.0);
    }

    #[test]
    fn label_out_of_range_is_an_error() {
        assert!(evaluate(&ByFirstFeature(2), &[row(0.0)], &[5]).is_err());
    }
}
