//! Modèle exporté : poids int8 avec une échelle f32 par classe.
//!
//! Format de fichier :
//!
//! ```text
//! "MISL" | version u32 LE | payload bincode (QuantizedModel)
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use isl_core::error::CoreError;
use isl_core::features::{FEATURE_LEN, FeatureVector};
use isl_core::traits::Classifier;

use crate::error::ModelError;
use crate::softmax::{SoftmaxModel, softmax_in_place};

const MAGIC: &[u8; 4] = b"MISL";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

/// Modèle linéaire quantifié, entrée (1, `input_len`), sortie (1, K).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantizedModel {
    input_len: usize,
    num_classes: usize,
    /// Échelle de déquantification de chaque ligne de poids.
    row_scales: Vec<f32>,
    weights: Vec<i8>,
    bias: Vec<f32>,
}

impl QuantizedModel {
    /// Quantification symétrique par ligne : `q = round(w / s)`,
    /// `s = max|w| / 127`.
    #[must_use]
    pub fn from_float(model: &SoftmaxModel) -> Self {
        let k = model.bias().len();
        let mut row_scales = Vec::with_capacity(k);
        let mut weights = Vec::with_capacity(k * FEATURE_LEN);
        for c in 0..k {
            let row = model.row(c);
            let max = row.iter().fold(0.0f32, |m, w| m.max(w.abs()));
            let scale = if max > 0.0 { max / 127.0 } else { 1.0 };
            row_scales.push(scale);
            weights.extend(
                row.iter()
                    .map(|w| (w / scale).round().clamp(-127.0, 127.0) as i8),
            );
        }
        Self {
            input_len: FEATURE_LEN,
            num_classes: k,
            row_scales,
            weights,
            bias: model.bias().to_vec(),
        }
    }

    #[must_use]
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Taille des paramètres en octets.
    #[must_use]
    pub fn param_bytes(&self) -> usize {
        self.weights.len() + 4 * (self.row_scales.len() + self.bias.len())
    }

    /// Cohérence interne des dimensions et finitude des paramètres.
    ///
    /// # Errors
    /// `ModelError::Shape` ou `ModelError::NonFinite`.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_classes == 0 {
            return Err(ModelError::Shape("K = 0".into()));
        }
        if self.weights.len() != self.num_classes * self.input_len
            || self.row_scales.len() != self.num_classes
            || self.bias.len() != self.num_classes
        {
            return Err(ModelError::Shape(format!(
                "{} poids, {} échelles, {} biais pour {} × {}",
                self.weights.len(),
                self.row_scales.len(),
                self.bias.len(),
                self.num_classes,
                self.input_len
            )));
        }
        if !self
            .row_scales
            .iter()
            .chain(&self.bias)
            .all(|v| v.is_finite())
        {
            return Err(ModelError::NonFinite);
        }
        Ok(())
    }

    /// # Errors
    /// Échec d'encodage bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let payload = bincode::serialize(self)?;
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// # Errors
    /// Signature, version, encodage ou dimensions invalides.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
            return Err(ModelError::BadMagic);
        }
        let mut v = [0u8; 4];
        v.copy_from_slice(&bytes[4..HEADER_LEN]);
        let version = u32::from_le_bytes(v);
        if version != VERSION {
            return Err(ModelError::UnsupportedVersion(version));
        }
        let model: Self = bincode::deserialize(&bytes[HEADER_LEN..])?;
        model.validate()?;
        Ok(model)
    }

    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_bytes()?)
            .with_context(|| format!("Impossible d'écrire {}", path.display()))
    }

    /// # Errors
    /// Returns an error if the file is unreadable or not a valid model.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Impossible de lire {}", path.display()))?;
        Self::from_bytes(&bytes).with_context(|| format!("Modèle invalide : {}", path.display()))
    }
}

impl Classifier for QuantizedModel {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn input_len(&self) -> usize {
        self.input_len
    }

    fn scores(&self, input: &FeatureVector) -> Result<Vec<f32>, CoreError> {
        if self.input_len != FEATURE_LEN {
            return Err(CoreError::ArtifactMismatch(format!(
                "modèle à {} entrées",
                self.input_len
            )));
        }
        let x = input.as_slice();
        let mut out: Vec<f32> = self
            .weights
            .chunks_exact(self.input_len)
            .zip(&self.row_scales)
            .zip(&self.bias)
            .map(|((row, s), b)| {
                let dot: f32 = row.iter().zip(x).map(|(&q, v)| f32::from(q) * v).sum();
                b + s * dot
            })
            .collect();
        softmax_in_place(&mut out);
        Ok(out)
    }
}
