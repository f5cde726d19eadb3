use thiserror::Error;

/// Errors originating from model training and the model artifact.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Training inputs are unusable.
    #[error("Données d'entraînement invalides : {0}")]
    InvalidTrainingData(String),

    /// The model file does not start with the expected magic bytes.
    #[error("Fichier modèle non reconnu (signature invalide)")]
    BadMagic,

    /// The model file was written by an incompatible version.
    #[error("Version de modèle non supportée : {0}")]
    UnsupportedVersion(u32),

    /// Tensor dimensions do not agree.
    #[error("Forme incohérente : {0}")]
    Shape(String),

    /// Weight or scale is NaN or infinite.
    #[error("Paramètre non fini dans le modèle")]
    NonFinite,

    /// Binary encoding/decoding failure.
    #[error("Erreur d'encodage : {0}")]
    Encoding(#[from] bincode::Error),

    /// Filesystem error.
    #[error("Erreur d'E/S : {0}")]
    Io(#[from] std::io::Error),
}
