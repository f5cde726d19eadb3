use thiserror::Error;

/// Errors originating from the dataset file.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A mandatory column is absent from the CSV header.
    #[error("Colonne manquante dans l'en-tête : {0}")]
    MissingColumn(&'static str),

    /// A cell could not be parsed.
    #[error("Valeur invalide ligne {line}, colonne {column} : '{value}'")]
    InvalidCell {
        /// 1-based line in the file (header = 1).
        line: u64,
        /// Column name.
        column: String,
        /// Raw cell content.
        value: String,
    },

    /// Underlying CSV reader/writer error.
    #[error("Erreur CSV : {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error.
    #[error("Erreur d'E/S : {0}")]
    Io(#[from] std::io::Error),
}
