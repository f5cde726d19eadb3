use crate::error::CoreError;
use crate::features::{FEATURE_LEN, FeatureVector};
use crate::frame::FrameDetection;

/// Fournit les détections de landmarks au pipeline, une frame à la fois.
///
/// Implémenté par : `ReplaySource`, `DetectorProcess`.
///
/// # Example
/// ```
/// use isl_core::traits::LandmarkSource;
/// use isl_core::frame::FrameDetection;
///
/// struct Empty;
/// impl LandmarkSource for Empty {
///     fn next_frame(&mut self) -> anyhow::Result<Option<FrameDetection>> { Ok(None) }
///     fn is_live(&self) -> bool { false }
/// }
/// ```
pub trait LandmarkSource: Send {
    /// Prochaine détection.
    ///
    /// `Ok(None)` quand la source est épuisée. Une frame sans main est
    /// `Ok(Some(..))` avec `hands` vide.
    ///
    /// # Errors
    /// I/O ou ligne illisible. L'appelant décide s'il saute la frame.
    fn next_frame(&mut self) -> anyhow::Result<Option<FrameDetection>>;

    /// Source temps réel (caméra via détecteur) ou fichier rejoué.
    fn is_live(&self) -> bool;
}

/// Modèle entraîné : vecteur de 126 features standardisées → K scores.
///
/// Les scores sont des probabilités (somme 1), l'argmax donne la classe.
pub trait Classifier {
    /// Nombre de classes K.
    fn num_classes(&self) -> usize;

    /// Dimension d'entrée attendue.
    fn input_len(&self) -> usize {
        FEATURE_LEN
    }

    /// # Errors
    /// `CoreError::ArtifactMismatch` si le modèle ne peut pas évaluer l'entrée.
    fn scores(&self, input: &FeatureVector) -> Result<Vec<f32>, CoreError>;
}

/// Capacité d'entraînement : (matrice, labels, K) → modèle.
pub trait TrainableClassifier {
    type Model: Classifier;

    /// Entraîne sur des lignes déjà standardisées.
    ///
    /// # Errors
    /// Données vides, labels hors de `0..num_classes`, ou longueurs incohérentes.
    fn fit(
        &mut self,
        rows: &[FeatureVector],
        labels: &[usize],
        num_classes: usize,
    ) -> anyhow::Result<Self::Model>;
}
