//! Format CSV du dataset de capture.
//!
//! ```text
//! label,image_path,is_left,is_right,L_x0..L_x20,L_y0..L_y20,L_z0..L_z20,R_x0..R_z20
//! ```
//!
//! Les colonnes de features sont localisées par nom, pas par position. Une
//! colonne de feature absente ou une cellule vide vaut 0.0.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use isl_core::features::{FEATURE_LEN, FeatureVector, FrameFeatures, column_name};

use crate::error::DatasetError;

pub const LABEL: &str = "label";
pub const IMAGE_PATH: &str = "image_path";
pub const IS_LEFT: &str = "is_left";
pub const IS_RIGHT: &str = "is_right";

const META_COLUMNS: [&str; 4] = [LABEL, IMAGE_PATH, IS_LEFT, IS_RIGHT];

/// En-tête complet : 4 colonnes méta puis les 126 features.
#[must_use]
pub fn header() -> Vec<String> {
    META_COLUMNS
        .iter()
        .map(|s| (*s).to_string())
        .chain((0..FEATURE_LEN).map(column_name))
        .collect()
}

/// Une ligne capturée. Immuable une fois écrite.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledSample {
    pub label: String,
    pub image_path: Option<String>,
    pub features: FrameFeatures,
}

impl LabeledSample {
    #[must_use]
    pub fn new(label: impl Into<String>, features: FrameFeatures) -> Self {
        Self {
            label: label.into(),
            image_path: None,
            features,
        }
    }

    #[must_use]
    pub fn with_image(mut self, path: impl Into<String>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn has_hand(&self) -> bool {
        self.features.has_hand()
    }

    /// Cellules de la ligne, dans l'ordre de [`header`].
    #[must_use]
    pub fn to_record(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(META_COLUMNS.len() + FEATURE_LEN);
        out.push(self.label.clone());
        out.push(self.image_path.clone().unwrap_or_default());
        out.push(u8::from(self.features.is_left).to_string());
        out.push(u8::from(self.features.is_right).to_string());
        out.extend(self.features.vector.0.iter().map(ToString::to_string));
        out
    }
}

/// Position de chaque colonne utile dans un fichier donné.
pub(crate) struct ColumnMap {
    label: usize,
    image_path: Option<usize>,
    is_left: usize,
    is_right: usize,
    features: Vec<Option<usize>>,
}

impl ColumnMap {
    pub(crate) fn from_header(header: &StringRecord) -> Result<Self, DatasetError> {
        let find = |name: &str| header.iter().position(|h| h.trim() == name);
        let required =
            |name: &'static str| find(name).ok_or(DatasetError::MissingColumn(name));

        let features: Vec<Option<usize>> = (0..FEATURE_LEN)
            .map(|i| find(&column_name(i)))
            .collect();
        let missing = features.iter().filter(|f| f.is_none()).count();
        if missing > 0 {
            log::warn!("{missing} colonnes de features absentes, lues comme 0.0");
        }

        Ok(Self {
            label: required(LABEL)?,
            image_path: find(IMAGE_PATH),
            is_left: required(IS_LEFT)?,
            is_right: required(IS_RIGHT)?,
            features,
        })
    }

    pub(crate) fn label_index(&self) -> usize {
        self.label
    }

    pub(crate) fn parse(&self, record: &StringRecord) -> Result<LabeledSample, DatasetError> {
        let line = record.position().map_or(0, csv::Position::line);
        let cell = |i: usize| record.get(i).unwrap_or("");
        let invalid = |column: String, value: &str| DatasetError::InvalidCell {
            line,
            column,
            value: value.to_string(),
        };

        let mut vector = FeatureVector::default();
        for (j, col) in self.features.iter().enumerate() {
            let Some(col) = *col else { continue };
            let raw = cell(col).trim();
            if raw.is_empty() {
                continue;
            }
            vector.0[j] = raw
                .parse::<f32>()
                .map_err(|_| invalid(column_name(j), raw))?;
        }

        let flag = |col: usize, name: &str| {
            let raw = cell(col).trim();
            parse_flag(raw).ok_or_else(|| invalid(name.to_string(), raw))
        };

        let image_path = self
            .image_path
            .map(cell)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(LabeledSample {
            label: cell(self.label).to_string(),
            image_path,
            features: FrameFeatures {
                vector,
                is_left: flag(self.is_left, IS_LEFT)?,
                is_right: flag(self.is_right, IS_RIGHT)?,
            },
        })
    }
}

/// Drapeau de présence : `0`/`1`, `0.0`/`1.0` ou `True`/`False`.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "" | "0" | "False" | "false" => Some(false),
        "1" | "True" | "true" => Some(true),
        other => other.parse::<f64>().ok().map(|v| v != 0.0),
    }
}

/// Lit toutes les lignes d'un flux CSV avec en-tête.
///
/// # Errors
/// En-tête incomplet, cellule illisible, ou erreur CSV.
pub fn read_samples<R: Read>(reader: R) -> Result<Vec<LabeledSample>, DatasetError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let map = ColumnMap::from_header(rdr.headers()?)?;
    let mut out = Vec::new();
    for record in rdr.records() {
        out.push(map.parse(&record?)?);
    }
    Ok(out)
}

/// Charge un fichier de dataset complet.
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed.
pub fn load_samples(path: &Path) -> anyhow::Result<Vec<LabeledSample>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
    read_samples(std::io::BufReader::new(file))
        .with_context(|| format!("Dataset illisible : {}", path.display()))
}

/// Écrit des lignes, précédées de l'en-tête si `with_header`.
///
/// # Errors
/// Erreur d'écriture.
pub fn write_samples<W: Write>(
    writer: W,
    samples: &[LabeledSample],
    with_header: bool,
) -> Result<(), DatasetError> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    if with_header {
        wtr.write_record(header())?;
    }
    for s in samples {
        wtr.write_record(s.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}
