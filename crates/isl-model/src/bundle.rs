use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use isl_core::config::RecognitionConfig;
use isl_core::driver::ClassificationDriver;
use isl_core::error::CoreError;
use isl_core::features::FEATURE_LEN;
use isl_core::labels::LabelRegistry;
use isl_core::scaler::FeatureScaler;
use isl_core::traits::Classifier;

use crate::quantized::QuantizedModel;

pub const SCALER_FILE: &str = "scaler_params.json";
pub const LABEL_MAP_FILE: &str = "label_map.json";
pub const MODEL_FILE: &str = "model.bin";
pub const INFO_FILE: &str = "malayalam_isl_info.json";

/// Chemins des artefacts dans un répertoire.
#[derive(Clone, Debug)]
pub struct ArtifactPaths {
    pub scaler: PathBuf,
    pub label_map: PathBuf,
    pub model: PathBuf,
    pub info: PathBuf,
}

impl ArtifactPaths {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            scaler: dir.join(SCALER_FILE),
            label_map: dir.join(LABEL_MAP_FILE),
            model: dir.join(MODEL_FILE),
            info: dir.join(INFO_FILE),
        }
    }
}

/// Manifeste d'entraînement, écrit à côté du modèle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub total_malayalam_alphabets: usize,
    pub trained_alphabets: usize,
    pub complete_alphabet_list: Vec<String>,
    pub trained_labels: Vec<String>,
    pub missing_labels: Vec<String>,
    /// Exactitude du modèle flottant sur le jeu de test.
    pub model_accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantized_accuracy: Option<f64>,
    pub input_features: usize,
    pub feature_order: Vec<String>,
    pub training_samples: usize,
    pub test_samples: usize,
}

/// Le triplet scaler / label map / modèle, chargé et vérifié ensemble.
///
/// # Example
/// ```no_run
/// use isl_model::bundle::ArtifactBundle;
/// use std::path::Path;
/// let bundle = ArtifactBundle::load(Path::new("artifacts")).unwrap();
/// println!("{} classes", bundle.registry.size());
/// ```
#[derive(Clone, Debug)]
pub struct ArtifactBundle {
    pub scaler: FeatureScaler,
    pub registry: LabelRegistry,
    pub model: QuantizedModel,
    pub info: Option<ModelInfo>,
}

impl ArtifactBundle {
    /// Vérifie la cohérence du triplet.
    ///
    /// # Errors
    /// `CoreError::ArtifactMismatch` si le modèle n'a pas 126 entrées ou si
    /// son nombre de classes diffère de la taille de la label map.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.model.input_len() != FEATURE_LEN {
            return Err(CoreError::ArtifactMismatch(format!(
                "le modèle attend {} features (attendu {FEATURE_LEN})",
                self.model.input_len()
            )));
        }
        if self.model.num_classes() != self.registry.size() {
            return Err(CoreError::ArtifactMismatch(format!(
                "modèle à {} classes, label map à {}",
                self.model.num_classes(),
                self.registry.size()
            )));
        }
        if let Some(info) = &self.info
            && info.trained_labels.as_slice() != self.registry.labels()
        {
            log::warn!("Le manifeste ne liste pas les mêmes labels que la label map");
        }
        Ok(())
    }

    /// Charge et valide les artefacts d'un répertoire. Le manifeste est
    /// facultatif.
    ///
    /// # Errors
    /// Fichier manquant, illisible, ou triplet incohérent.
    pub fn load(dir: &Path) -> Result<Self> {
        let paths = ArtifactPaths::in_dir(dir);
        let scaler = FeatureScaler::load(&paths.scaler)?;
        let registry = LabelRegistry::load(&paths.label_map)?;
        let model = QuantizedModel::load(&paths.model)?;

        let info = if paths.info.exists() {
            let text = std::fs::read_to_string(&paths.info)
                .with_context(|| format!("Impossible de lire {}", paths.info.display()))?;
            match serde_json::from_str(&text) {
                Ok(info) => Some(info),
                Err(e) => {
                    log::warn!("Manifeste ignoré ({}) : {e}", paths.info.display());
                    None
                }
            }
        } else {
            log::warn!("Manifeste absent : {}", paths.info.display());
            None
        };

        let bundle = Self {
            scaler,
            registry,
            model,
            info,
        };
        bundle
            .validate()
            .with_context(|| format!("Artefacts incohérents dans {}", dir.display()))?;
        log::info!(
            "Artefacts chargés : {} classes, modèle {} octets",
            bundle.registry.size(),
            bundle.model.param_bytes()
        );
        Ok(bundle)
    }

    /// Écrit les quatre fichiers dans `dir` (créé au besoin).
    ///
    /// # Errors
    /// Triplet incohérent ou écriture impossible.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Impossible de créer {}", dir.display()))?;
        let paths = ArtifactPaths::in_dir(dir);
        self.scaler.save(&paths.scaler)?;
        self.registry.save(&paths.label_map)?;
        self.model.save(&paths.model)?;
        if let Some(info) = &self.info {
            let json = serde_json::to_string_pretty(info).context("Sérialisation du manifeste")?;
            std::fs::write(&paths.info, json)
                .with_context(|| format!("Impossible d'écrire {}", paths.info.display()))?;
        }
        Ok(())
    }

    /// Driver de classification prêt pour la reconnaissance.
    ///
    /// # Errors
    /// `CoreError::ArtifactMismatch` si le triplet est incohérent.
    pub fn into_driver(
        self,
        recognition: &RecognitionConfig,
    ) -> Result<ClassificationDriver<QuantizedModel>, CoreError> {
        Ok(
            ClassificationDriver::new(self.scaler, self.registry, self.model)?
                .with_min_confidence(recognition.min_confidence)
                .with_top_k(recognition.top_k),
        )
    }
}
