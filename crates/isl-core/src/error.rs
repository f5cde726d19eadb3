use thiserror::Error;

/// Errors originating from the core feature pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The detector returned a hand whose landmark count is not 21.
    #[error("Observation invalide : {side} a {count} landmarks (21 attendus)")]
    InvalidObservation {
        /// Side tag of the offending hand ("Left" / "Right").
        side: String,
        /// Number of landmarks actually received.
        count: usize,
    },

    /// Label absent from the registry.
    #[error("Label inconnu : '{0}'")]
    UnknownLabel(String),

    /// Index outside `0..K`. Usually signals a registry/model version skew.
    #[error("Index {index} hors limites (K = {size})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Registry size.
        size: usize,
    },

    /// A scale entry that cannot be used as a divisor.
    #[error("Colonne de features dégénérée : {column} (scale = {scale})")]
    DegenerateFeatureColumn {
        /// Feature column index.
        column: usize,
        /// Offending scale value.
        scale: f64,
    },

    /// One or more classes have too few rows for a stratified split.
    #[error("Échantillons insuffisants pour la stratification : {}", format_classes(.classes))]
    InsufficientSamplesForStratification {
        /// `(label, count)` for every class below the minimum.
        classes: Vec<(String, usize)>,
    },

    /// Same label listed twice when building a registry or alphabet.
    #[error("Label dupliqué : '{0}'")]
    DuplicateLabel(String),

    /// Serialized label map does not cover `0..K` contiguously.
    #[error("Label map incomplète : index {missing} manquant (K = {size})")]
    LabelMapGap {
        /// First missing index.
        missing: usize,
        /// Number of entries found.
        size: usize,
    },

    /// A vector does not have the expected length.
    #[error("Longueur invalide pour {what} : {actual} (attendu {expected})")]
    FeatureLength {
        /// Which vector was checked.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The scaler / label map / model triple is inconsistent.
    #[error("Artefacts incohérents : {0}")]
    ArtifactMismatch(String),

    /// Nothing to fit on.
    #[error("Jeu de données vide : {0}")]
    EmptyDataset(&'static str),
}

fn format_classes(classes: &[(String, usize)]) -> String {
    classes
        .iter()
        .map(|(label, count)| format!("'{label}' ({count})"))
        .collect::<Vec<_>>()
        .join(", ")
}
