//! Régression softmax multinomiale entraînée par SGD mini-batch.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use isl_core::config::TrainingConfig;
use isl_core::error::CoreError;
use isl_core::features::{FEATURE_LEN, FeatureVector};
use isl_core::traits::{Classifier, TrainableClassifier};

use crate::error::ModelError;
use crate::quantized::QuantizedModel;

/// Softmax stable : soustrait le max avant l'exponentielle.
pub(crate) fn softmax_in_place(v: &mut [f32]) {
    let max = v.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for x in v.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    if sum > 0.0 {
        for x in v.iter_mut() {
            *x /= sum;
        }
    }
}

/// Modèle linéaire flottant : `softmax(W·x + b)`, `W` en K × 126 row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftmaxModel {
    num_classes: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl SoftmaxModel {
    #[must_use]
    pub fn zeros(num_classes: usize) -> Self {
        Self {
            num_classes,
            weights: vec![0.0; num_classes * FEATURE_LEN],
            bias: vec![0.0; num_classes],
        }
    }

    /// # Errors
    /// `ModelError::Shape` si les longueurs ne correspondent pas à K × 126.
    pub fn from_parts(
        num_classes: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
    ) -> Result<Self, ModelError> {
        if weights.len() != num_classes * FEATURE_LEN || bias.len() != num_classes {
            return Err(ModelError::Shape(format!(
                "{} poids / {} biais pour K = {num_classes}",
                weights.len(),
                bias.len()
            )));
        }
        Ok(Self {
            num_classes,
            weights,
            bias,
        })
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[must_use]
    pub fn bias(&self) -> &[f32] {
        &self.bias
    }

    /// Ligne de poids de la classe `k`.
    #[must_use]
    pub fn row(&self, k: usize) -> &[f32] {
        &self.weights[k * FEATURE_LEN..(k + 1) * FEATURE_LEN]
    }

    fn logits_into(&self, x: &[f32], out: &mut [f32]) {
        for (k, (o, b)) in out.iter_mut().zip(&self.bias).enumerate() {
            *o = b + self.row(k).iter().zip(x).map(|(w, v)| w * v).sum::<f32>();
        }
    }

    /// Export int8 (échelle par classe).
    #[must_use]
    pub fn quantize(&self) -> QuantizedModel {
        QuantizedModel::from_float(self)
    }

    fn is_finite(&self) -> bool {
        self.weights.iter().chain(&self.bias).all(|v| v.is_finite())
    }
}

impl Classifier for SoftmaxModel {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn scores(&self, input: &FeatureVector) -> Result<Vec<f32>, CoreError> {
        let mut out = vec![0.0; self.num_classes];
        self.logits_into(input.as_slice(), &mut out);
        softmax_in_place(&mut out);
        Ok(out)
    }
}

/// Entraîneur SGD pour [`SoftmaxModel`].
///
/// L'ordre des lignes est remélangé à chaque epoch avec une graine dérivée de
/// `seed + epoch` : deux entraînements identiques donnent les mêmes poids.
///
/// # Example
/// ```
/// use isl_core::features::FeatureVector;
/// use isl_core::traits::{Classifier, TrainableClassifier};
/// use isl_model::softmax::SoftmaxTrainer;
///
/// let mut a = FeatureVector::default();
/// a.0[0] = 1.0;
/// let mut b = FeatureVector::default();
/// b.0[0] = -1.0;
/// let mut trainer = SoftmaxTrainer { epochs: 50, ..SoftmaxTrainer::default() };
/// let model = trainer.fit(&[a, b], &[0, 1], 2).unwrap();
/// let s = model.scores(&a).unwrap();
/// assert!(s[0] > s[1]);
/// ```
#[derive(Clone, Debug)]
pub struct SoftmaxTrainer {
    pub learning_rate: f32,
    pub epochs: usize,
    pub batch_size: usize,
    pub l2: f32,
    pub seed: u64,
}

impl Default for SoftmaxTrainer {
    fn default() -> Self {
        Self::from_config(&TrainingConfig::default())
    }
}

impl SoftmaxTrainer {
    #[must_use]
    pub fn from_config(cfg: &TrainingConfig) -> Self {
        Self {
            learning_rate: cfg.learning_rate,
            epochs: cfg.epochs,
            batch_size: cfg.batch_size.max(1),
            l2: cfg.l2,
            seed: cfg.seed,
        }
    }

    fn check_inputs(
        rows: &[FeatureVector],
        labels: &[usize],
        num_classes: usize,
    ) -> Result<(), ModelError> {
        if rows.is_empty() {
            return Err(ModelError::InvalidTrainingData("aucune ligne".into()));
        }
        if rows.len() != labels.len() {
            return Err(ModelError::InvalidTrainingData(format!(
                "{} lignes pour {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if num_classes == 0 {
            return Err(ModelError::InvalidTrainingData("K = 0".into()));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(ModelError::InvalidTrainingData(format!(
                "label {bad} hors de 0..{num_classes}"
            )));
        }
        Ok(())
    }
}

impl TrainableClassifier for SoftmaxTrainer {
    type Model = SoftmaxModel;

    fn fit(
        &mut self,
        rows: &[FeatureVector],
        labels: &[usize],
        num_classes: usize,
    ) -> anyhow::Result<SoftmaxModel> {
        Self::check_inputs(rows, labels, num_classes)?;

        let k = num_classes;
        let d = FEATURE_LEN;
        let lr = self.learning_rate;
        let batch_size = self.batch_size.max(1);

        let mut model = SoftmaxModel::zeros(k);
        let mut order: Vec<usize> = (0..rows.len()).collect();
        let mut grad_w = vec![0.0f32; k * d];
        let mut grad_b = vec![0.0f32; k];
        let mut probs = vec![0.0f32; k];

        log::info!(
            "Entraînement softmax : {} lignes, K = {k}, {} epochs, batch {batch_size}",
            rows.len(),
            self.epochs
        );

        for epoch in 0..self.epochs {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
            let mut loss = 0.0f64;

            for batch in order.chunks(batch_size) {
                grad_w.fill(0.0);
                grad_b.fill(0.0);

                for &i in batch {
                    let x = rows[i].as_slice();
                    let y = labels[i];
                    model.logits_into(x, &mut probs);
                    softmax_in_place(&mut probs);
                    loss -= f64::from(probs[y].max(1e-12).ln());

                    for (c, &p) in probs.iter().enumerate() {
                        let g = if c == y { p - 1.0 } else { p };
                        grad_b[c] += g;
                        let gw = &mut grad_w[c * d..(c + 1) * d];
                        for (acc, &xj) in gw.iter_mut().zip(x) {
                            *acc += g * xj;
                        }
                    }
                }

                let step = lr / batch.len() as f32;
                for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                    let decay = lr * self.l2 * *w;
                    *w -= step * g + decay;
                }
                for (b, g) in model.bias.iter_mut().zip(&grad_b) {
                    *b -= step * g;
                }
            }

            if epoch % 25 == 0 || epoch + 1 == self.epochs {
                log::debug!(
                    "epoch {epoch:>4} : perte moyenne {:.4}",
                    loss / rows.len() as f64
                );
            }
        }

        if !model.is_finite() {
            return Err(ModelError::NonFinite.into());
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well-separated clusters on features 0 and 64.
    fn clusters() -> (Vec<FeatureVector>, Vec<usize>) {
        let centers = [(2.0, 0.0), (-2.0, 1.5), (0.0, -2.0)];
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (c, &(a, b)) in centers.iter().enumerate() {
            for i in 0..10 {
                let jitter = (i as f32 - 4.5) * 0.05;
                let mut v = FeatureVector::default();
                v.0[0] = a + jitter;
                v.0[64] = b - jitter;
                v.0[100] = jitter;
                rows.push(v);
                labels.push(c);
            }
        }
        (rows, labels)
    }

    fn trainer() -> SoftmaxTrainer {
        SoftmaxTrainer {
            learning_rate: 0.5,
            epochs: 60,
            batch_size: 8,
            l2: 0.0,
            seed: 42,
        }
    }

    #[test]
    fn softmax_sums_to_one() {
        let mut v = vec![1.0, 2.0, 3.0, 1000.0];
        softmax_in_place(&mut v);
        let sum: f32 = v.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn fits_separable_clusters() {
        let (rows, labels) = clusters();
        let model = trainer().fit(&rows, &labels, 3).unwrap();
        for (row, &y) in rows.iter().zip(&labels) {
            let s = model.scores(row).unwrap();
            assert_eq!(isl_core::driver::argmax(&s), Some(y));
        }
    }

    #[test]
    fn training_is_reproducible() {
        let (rows, labels) = clusters();
        let a = trainer().fit(&rows, &labels, 3).unwrap();
        let b = trainer().fit(&rows, &labels, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn untouched_features_keep_zero_weight() {
        let (rows, labels) = clusters();
        let model = trainer().fit(&rows, &labels, 3).unwrap();
        // Feature 10 is zero in every row.
        for k in 0..3 {
            assert_eq!(model.row(k)[10], 0.0);
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        let (rows, labels) = clusters();
        let mut t = trainer();
        assert!(t.fit(&[], &[], 3).is_err());
        assert!(t.fit(&rows, &labels[..5], 3).is_err());
        assert!(t.fit(&rows, &labels, 2).is_err());
    }

    #[test]
    fn from_parts_checks_shape() {
        assert!(SoftmaxModel::from_parts(2, vec![0.0; 10], vec![0.0; 2]).is_err());
        assert!(SoftmaxModel::from_parts(2, vec![0.0; 2 * FEATURE_LEN], vec![0.0; 2]).is_ok());
    }
}
