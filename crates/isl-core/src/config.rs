use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::alphabet::Alphabet;
use crate::error::CoreError;

/// Configuration complète du pipeline (capture, entraînement, reconnaissance).
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use isl_core::config::PipelineConfig;
/// let config = PipelineConfig::default();
/// assert_eq!(config.capture.frames_per_label, 100);
/// assert_eq!(config.training.seed, 42);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub capture: CaptureConfig,
    pub training: TrainingConfig,
    pub recognition: RecognitionConfig,
    pub artifacts: ArtifactsConfig,
    pub detector: DetectorConfig,
    /// Remplace l'alphabet malayalam intégré si présent.
    pub alphabet: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Lignes enregistrées par label et par session.
    pub frames_per_label: usize,
    /// Cadence de capture pour les sources temps réel.
    pub capture_fps: u32,
    /// Compte à rebours avant chaque label (sources temps réel seulement).
    pub countdown_secs: u32,
    /// Pause entre deux labels en mode continu.
    pub break_secs: u32,
    /// Fichier CSV du dataset.
    pub dataset: PathBuf,
    /// Racine de l'archive d'images (`<dir>/<label>/<label>_<n>.jpg`).
    pub image_dir: PathBuf,
    /// Archiver les images transmises par le détecteur.
    pub save_images: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames_per_label: 100,
            capture_fps: 10,
            countdown_secs: 3,
            break_secs: 5,
            dataset: PathBuf::from("data_both_hands.csv"),
            image_dir: PathBuf::from("malayalam_isl_images"),
            save_images: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TrainingConfig {
    /// Part du jeu de test dans le split stratifié.
    pub test_ratio: f64,
    pub seed: u64,
    /// Seuil du rapport qualité : labels sous ce nombre de lignes signalés.
    pub min_samples_warning: usize,
    pub learning_rate: f32,
    pub epochs: usize,
    pub batch_size: usize,
    /// Pénalité L2 sur les poids.
    pub l2: f32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            min_samples_warning: 50,
            learning_rate: 0.1,
            epochs: 200,
            batch_size: 32,
            l2: 1e-4,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecognitionConfig {
    /// Seuil de confiance. `None` = toujours émettre l'argmax.
    pub min_confidence: Option<f32>,
    /// Candidats journalisés par prédiction.
    pub top_k: usize,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            min_confidence: None,
            top_k: 3,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ArtifactsConfig {
    /// Répertoire contenant scaler, label map, modèle et manifeste.
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
        }
    }
}

/// Commande du détecteur externe : programme puis arguments.
///
/// Le processus doit écrire une détection JSON par ligne sur stdout.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DetectorConfig {
    pub command: Vec<String>,
}

impl PipelineConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.capture.frames_per_label = self.capture.frames_per_label.clamp(1, 10_000);
        self.capture.capture_fps = self.capture.capture_fps.clamp(1, 60);
        self.capture.countdown_secs = self.capture.countdown_secs.min(30);
        self.capture.break_secs = self.capture.break_secs.min(120);
        self.training.test_ratio = self.training.test_ratio.clamp(0.05, 0.5);
        self.training.learning_rate = self.training.learning_rate.clamp(1e-5, 10.0);
        self.training.epochs = self.training.epochs.clamp(1, 100_000);
        self.training.batch_size = self.training.batch_size.max(1);
        self.training.l2 = self.training.l2.clamp(0.0, 1.0);
        self.recognition.min_confidence = self
            .recognition
            .min_confidence
            .map(|v| v.clamp(0.0, 1.0));
        self.recognition.top_k = self.recognition.top_k.clamp(1, 16);
    }

    /// Alphabet effectif : surcharge `[alphabet]` ou alphabet malayalam.
    ///
    /// # Errors
    /// `CoreError` si la surcharge est vide ou contient des doublons.
    pub fn alphabet(&self) -> Result<Alphabet, CoreError> {
        match &self.alphabet {
            Some(letters) => Alphabet::new(letters.iter().cloned()),
            None => Ok(Alphabet::malayalam()),
        }
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    capture: Option<CaptureSection>,
    training: Option<TrainingSection>,
    recognition: Option<RecognitionSection>,
    artifacts: Option<ArtifactsSection>,
    detector: Option<DetectorSection>,
    alphabet: Option<AlphabetSection>,
}

#[derive(Deserialize)]
struct CaptureSection {
    frames_per_label: Option<usize>,
    capture_fps: Option<u32>,
    countdown_secs: Option<u32>,
    break_secs: Option<u32>,
    dataset: Option<PathBuf>,
    image_dir: Option<PathBuf>,
    save_images: Option<bool>,
}

#[derive(Deserialize)]
struct TrainingSection {
    test_ratio: Option<f64>,
    seed: Option<u64>,
    min_samples_warning: Option<usize>,
    learning_rate: Option<f32>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    l2: Option<f32>,
}

#[derive(Deserialize)]
struct RecognitionSection {
    min_confidence: Option<f32>,
    top_k: Option<usize>,
}

#[derive(Deserialize)]
struct ArtifactsSection {
    dir: Option<PathBuf>,
}

#[derive(Deserialize)]
struct DetectorSection {
    command: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct AlphabetSection {
    letters: Option<Vec<String>>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use isl_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))
}

/// Parse le contenu TOML (voir [`load_config`]).
///
/// # Errors
/// Returns an error if the TOML is malformed.
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let mut config = PipelineConfig::default();

    if let Some(c) = file.capture {
        let dst = &mut config.capture;
        if let Some(v) = c.frames_per_label {
            dst.frames_per_label = v;
        }
        if let Some(v) = c.capture_fps {
            dst.capture_fps = v;
        }
        if let Some(v) = c.countdown_secs {
            dst.countdown_secs = v;
        }
        if let Some(v) = c.break_secs {
            dst.break_secs = v;
        }
        if let Some(v) = c.dataset {
            dst.dataset = v;
        }
        if let Some(v) = c.image_dir {
            dst.image_dir = v;
        }
        if let Some(v) = c.save_images {
            dst.save_images = v;
        }
    }

    if let Some(t) = file.training {
        let dst = &mut config.training;
        if let Some(v) = t.test_ratio {
            dst.test_ratio = v;
        }
        if let Some(v) = t.seed {
            dst.seed = v;
        }
        if let Some(v) = t.min_samples_warning {
            dst.min_samples_warning = v;
        }
        if let Some(v) = t.learning_rate {
            dst.learning_rate = v;
        }
        if let Some(v) = t.epochs {
            dst.epochs = v;
        }
        if let Some(v) = t.batch_size {
            dst.batch_size = v;
        }
        if let Some(v) = t.l2 {
            dst.l2 = v;
        }
    }

    if let Some(r) = file.recognition {
        if r.min_confidence.is_some() {
            config.recognition.min_confidence = r.min_confidence;
        }
        if let Some(v) = r.top_k {
            config.recognition.top_k = v;
        }
    }

    if let Some(v) = file.artifacts.and_then(|a| a.dir) {
        config.artifacts.dir = v;
    }
    if let Some(v) = file.detector.and_then(|d| d.command) {
        config.detector.command = v;
    }
    config.alphabet = file.alphabet.and_then(|a| a.letters);

    config.clamp_all();
    Ok(config)
}
