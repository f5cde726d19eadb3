use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer, WriterBuilder};
use isl_core::alphabet::Alphabet;

use crate::schema::{ColumnMap, LabeledSample, header};

/// Avancement de la capture au regard de l'alphabet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureStatus {
    pub captured: usize,
    pub total: usize,
    /// Lettres sans aucune ligne, ordre canonique.
    pub remaining: Vec<String>,
    /// Lignes par label, ordre canonique puis labels hors alphabet.
    pub counts: Vec<(String, usize)>,
}

/// Fichier de dataset en ajout seul, avec index des labels en mémoire.
///
/// Le fichier est un journal write-through : chaque ligne est écrite et
/// flushée avant que l'index ne soit mis à jour. L'index n'est reconstruit
/// depuis le disque qu'à l'ouverture.
///
/// # Example
/// ```no_run
/// use isl_dataset::store::DatasetLog;
/// use std::path::Path;
/// let log = DatasetLog::open(Path::new("data_both_hands.csv")).unwrap();
/// println!("{} lignes", log.total_rows());
/// ```
pub struct DatasetLog {
    path: PathBuf,
    counts: BTreeMap<String, usize>,
    writer: Option<Writer<File>>,
}

impl DatasetLog {
    /// Ouvre (ou crée avec en-tête) le fichier et indexe ses labels.
    ///
    /// # Errors
    /// Fichier illisible ou en-tête sans colonnes obligatoires.
    pub fn open(path: &Path) -> Result<Self> {
        let mut counts = BTreeMap::new();

        if path.exists() && std::fs::metadata(path)?.len() > 0 {
            let file = File::open(path)
                .with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
            let mut rdr = ReaderBuilder::new().from_reader(BufReader::new(file));
            let map = ColumnMap::from_header(rdr.headers()?)
                .with_context(|| format!("En-tête invalide : {}", path.display()))?;
            let label_col = map.label_index();
            let mut record = StringRecord::new();
            while rdr.read_record(&mut record)? {
                let label = record.get(label_col).unwrap_or_default();
                *counts.entry(label.to_string()).or_insert(0) += 1;
            }
            log::info!(
                "Dataset {} : {} lignes, {} labels",
                path.display(),
                counts.values().sum::<usize>(),
                counts.len()
            );
        } else {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let mut wtr = Writer::from_path(path)
                .with_context(|| format!("Impossible de créer {}", path.display()))?;
            wtr.write_record(header())?;
            wtr.flush()?;
            log::info!("Nouveau dataset : {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            counts,
            writer: None,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut Writer<File>> {
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .append(true)
                .open(&self.path)
                .with_context(|| format!("Impossible d'ouvrir {} en ajout", self.path.display()))?;
            self.writer = Some(WriterBuilder::new().has_headers(false).from_writer(file));
        }
        self.writer
            .as_mut()
            .context("writer du dataset indisponible")
    }

    /// Ajoute une ligne et la flushe avant de mettre l'index à jour.
    ///
    /// # Errors
    /// Erreur d'écriture. L'index n'est pas modifié dans ce cas.
    pub fn append(&mut self, sample: &LabeledSample) -> Result<()> {
        let wtr = self.writer()?;
        wtr.write_record(sample.to_record())?;
        wtr.flush()?;
        *self.counts.entry(sample.label.clone()).or_insert(0) += 1;
        Ok(())
    }

    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_captured(&self, label: &str) -> bool {
        self.count(label) > 0
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.counts.values().sum()
    }

    /// Première lettre de l'alphabet encore sans ligne.
    #[must_use]
    pub fn next_missing<'a>(&self, alphabet: &'a Alphabet) -> Option<&'a str> {
        alphabet
            .letters()
            .iter()
            .map(String::as_str)
            .find(|l| !self.is_captured(l))
    }

    #[must_use]
    pub fn status(&self, alphabet: &Alphabet) -> CaptureStatus {
        let mut counts: Vec<(String, usize)> = alphabet
            .letters()
            .iter()
            .filter(|l| self.is_captured(l))
            .map(|l| (l.clone(), self.count(l)))
            .collect();
        let captured = counts.len();
        counts.extend(
            self.counts
                .iter()
                .filter(|(l, _)| !alphabet.contains(l))
                .map(|(l, c)| (l.clone(), *c)),
        );
        CaptureStatus {
            captured,
            total: alphabet.len(),
            remaining: alphabet
                .filter(|l| !self.is_captured(l))
                .map(str::to_string)
                .collect(),
            counts,
        }
    }

    /// Supprime toutes les lignes d'un label. Réécrit le fichier dans un
    /// temporaire du même dossier puis le renomme par-dessus l'original.
    ///
    /// Retourne le nombre de lignes supprimées.
    ///
    /// # Errors
    /// Erreur de lecture/écriture ; le fichier d'origine reste intact.
    pub fn remove_label(&mut self, label: &str) -> Result<usize> {
        if !self.is_captured(label) {
            return Ok(0);
        }
        // Le writer en ajout pointerait sur l'ancien inode après le rename.
        if let Some(mut wtr) = self.writer.take() {
            wtr.flush()?;
        }

        let dir = self
            .path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Impossible de créer un temporaire dans {}", dir.display()))?;

        let mut removed = 0;
        {
            let file = File::open(&self.path)?;
            let mut rdr = ReaderBuilder::new().from_reader(BufReader::new(file));
            let headers = rdr.headers()?.clone();
            let label_col = ColumnMap::from_header(&headers)?.label_index();

            let mut wtr = WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file());
            wtr.write_record(&headers)?;
            let mut record = StringRecord::new();
            while rdr.read_record(&mut record)? {
                if record.get(label_col) == Some(label) {
                    removed += 1;
                } else {
                    wtr.write_record(&record)?;
                }
            }
            wtr.flush()?;
        }

        tmp.persist(&self.path)
            .with_context(|| format!("Impossible de remplacer {}", self.path.display()))?;
        self.counts.remove(label);
        log::info!("{removed} lignes supprimées pour '{label}'");
        Ok(removed)
    }
}
