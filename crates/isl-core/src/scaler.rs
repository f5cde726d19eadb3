use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::features::{FEATURE_LEN, FeatureVector};

/// En dessous de ce seuil, un écart-type est considéré nul.
const ZERO_SCALE: f64 = 10.0 * f64::EPSILON;

/// Standardisation affine par colonne : `(x - mean) / scale`.
///
/// Fit une fois sur la matrice d'entraînement, rejoué à l'identique à
/// l'inférence. Ce n'est pas un accumulateur : `transform` est pur.
///
/// # Example
/// ```
/// use isl_core::features::FeatureVector;
/// use isl_core::scaler::FeatureScaler;
/// let rows = vec![FeatureVector([1.0; 126]), FeatureVector([3.0; 126])];
/// let fit = FeatureScaler::fit(&rows).unwrap();
/// let scaled = fit.scaler.transform(&FeatureVector([3.0; 126]));
/// assert!((scaled.0[0] - 1.0).abs() < 1e-6);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Résultat d'un fit : le scaler et les colonnes à variance nulle.
#[derive(Clone, Debug)]
pub struct ScalerFit {
    pub scaler: FeatureScaler,
    /// Colonnes dont l'écart-type était nul ; leur diviseur vaut 1.0.
    pub degenerate_columns: Vec<usize>,
}

impl FeatureScaler {
    /// Construit depuis des paramètres persistés.
    ///
    /// # Errors
    /// `CoreError::FeatureLength` si un vecteur n'a pas 126 entrées,
    /// `CoreError::DegenerateFeatureColumn` si un diviseur est nul ou non fini.
    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, CoreError> {
        for (what, v) in [("scaler mean", &mean), ("scaler scale", &scale)] {
            if v.len() != FEATURE_LEN {
                return Err(CoreError::FeatureLength {
                    what,
                    expected: FEATURE_LEN,
                    actual: v.len(),
                });
            }
        }
        if let Some((column, &s)) = scale
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || s.abs() < ZERO_SCALE)
        {
            return Err(CoreError::DegenerateFeatureColumn { column, scale: s });
        }
        if let Some(column) = mean.iter().position(|m| !m.is_finite()) {
            return Err(CoreError::ArtifactMismatch(format!(
                "moyenne non finie en colonne {column}"
            )));
        }
        Ok(Self { mean, scale })
    }

    /// Moyenne et écart-type (population, ddof = 0) par colonne.
    ///
    /// # Errors
    /// `CoreError::EmptyDataset` si `rows` est vide.
    pub fn fit(rows: &[FeatureVector]) -> Result<ScalerFit, CoreError> {
        if rows.is_empty() {
            return Err(CoreError::EmptyDataset("scaler fit"));
        }
        let n = rows.len() as f64;

        let mut mean = vec![0.0f64; FEATURE_LEN];
        for row in rows {
            for (m, &v) in mean.iter_mut().zip(row.0.iter()) {
                *m += f64::from(v);
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0f64; FEATURE_LEN];
        for row in rows {
            for ((acc, &v), m) in var.iter_mut().zip(row.0.iter()).zip(&mean) {
                let d = f64::from(v) - m;
                *acc += d * d;
            }
        }

        let mut degenerate_columns = Vec::new();
        let scale = var
            .into_iter()
            .enumerate()
            .map(|(j, acc)| {
                let std = (acc / n).sqrt();
                if std < ZERO_SCALE {
                    degenerate_columns.push(j);
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(ScalerFit {
            scaler: Self { mean, scale },
            degenerate_columns,
        })
    }

    /// Applique la standardisation. Calcul en f64, résultat en f32.
    #[must_use]
    pub fn transform(&self, raw: &FeatureVector) -> FeatureVector {
        let mut out = FeatureVector::default();
        for (j, dst) in out.0.iter_mut().enumerate() {
            *dst = ((f64::from(raw.0[j]) - self.mean[j]) / self.scale[j]) as f32;
        }
        out
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).context("Sérialisation du scaler")?;
        std::fs::write(path, json)
            .with_context(|| format!("Impossible d'écrire {}", path.display()))
    }

    /// Charge `scaler_params.json` et valide ses paramètres.
    ///
    /// # Errors
    /// Returns an error if the file is unreadable, malformed, or its
    /// parameters are invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let raw: Self = serde_json::from_str(&content)
            .with_context(|| format!("Paramètres du scaler invalides : {}", path.display()))?;
        Ok(Self::from_parts(raw.mean, raw.scale)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<FeatureVector> {
        (0..4)
            .map(|i| {
                let mut v = FeatureVector::default();
                for (j, x) in v.0.iter_mut().enumerate() {
                    *x = (i * (j % 7)) as f32 * 0.1;
                }
                v
            })
            .collect()
    }

    #[test]
    fn fit_uses_population_std() {
        let rows = vec![
            FeatureVector([0.0; FEATURE_LEN]),
            FeatureVector([2.0; FEATURE_LEN]),
        ];
        let fit = FeatureScaler::fit(&rows).unwrap();
        assert!((fit.scaler.mean()[5] - 1.0).abs() < 1e-12);
        assert!((fit.scaler.scale()[5] - 1.0).abs() < 1e-12);
        assert!(fit.degenerate_columns.is_empty());
    }

    #[test]
    fn zero_variance_columns_are_guarded_and_reported() {
        let fit = FeatureScaler::fit(&rows()).unwrap();
        // j % 7 == 0 → column constant at 0.
        assert!(fit.degenerate_columns.contains(&0));
        assert!(fit.degenerate_columns.contains(&7));
        assert!(!fit.degenerate_columns.contains(&1));
        assert_eq!(fit.scaler.scale()[0], 1.0);

        let out = fit.scaler.transform(&rows()[2]);
        assert!(out.0.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn transform_is_pure() {
        let fit = FeatureScaler::fit(&rows()).unwrap();
        let raw = rows()[3];
        let once = fit.scaler.transform(&raw);
        let twice = fit.scaler.transform(&raw);
        assert_eq!(once, twice);
    }

    #[test]
    fn scaled_training_columns_are_centered() {
        let data = rows();
        let fit = FeatureScaler::fit(&data).unwrap();
        let sum: f32 = data.iter().map(|r| fit.scaler.transform(r).0[3]).sum();
        assert!(sum.abs() < 1e-5);
    }

    #[test]
    fn empty_fit_is_an_error() {
        assert_eq!(
            FeatureScaler::fit(&[]).unwrap_err(),
            CoreError::EmptyDataset("scaler fit")
        );
    }

    #[test]
    fn from_parts_rejects_bad_params() {
        assert!(matches!(
            FeatureScaler::from_parts(vec![0.0; 10], vec![1.0; FEATURE_LEN]),
            Err(CoreError::FeatureLength { actual: 10, .. })
        ));
        let mut scale = vec![1.0; FEATURE_LEN];
        scale[42] = 0.0;
        assert_eq!(
            FeatureScaler::from_parts(vec![0.0; FEATURE_LEN], scale).unwrap_err(),
            CoreError::DegenerateFeatureColumn {
                column: 42,
                scale: 0.0
            }
        );
    }

    #[test]
    fn params_file_matches_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler_params.json");
        let fit = FeatureScaler::fit(&rows()).unwrap();
        fit.scaler.save(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["mean"].as_array().unwrap().len(), FEATURE_LEN);
        assert_eq!(json["scale"].as_array().unwrap().len(), FEATURE_LEN);

        assert_eq!(FeatureScaler::load(&path).unwrap(), fit.scaler);
    }
}
