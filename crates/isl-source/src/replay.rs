use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use isl_core::frame::FrameDetection;
use isl_core::traits::LandmarkSource;

/// Lit la prochaine détection non vide d'un flux JSON-lines.
///
/// `line_no` est incrémenté pour chaque ligne consommée, vide ou non.
///
/// # Errors
/// Erreur I/O, ou ligne qui n'est pas un objet de détection valide.
pub(crate) fn next_detection<R: BufRead>(
    reader: &mut R,
    line_no: &mut usize,
    buf: &mut String,
) -> Result<Option<FrameDetection>> {
    loop {
        buf.clear();
        let n = reader.read_line(buf).context("Lecture du flux de détections")?;
        if n == 0 {
            return Ok(None);
        }
        *line_no += 1;
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }
        let det = FrameDetection::from_json_line(line)
            .with_context(|| format!("Détection invalide ligne {line_no}"))?;
        return Ok(Some(det));
    }
}

/// Rejoue un fichier de détections enregistré (une ligne JSON par frame).
///
/// Les chemins d'image relatifs sont résolus par rapport au dossier du
/// fichier.
///
/// # Example
/// ```no_run
/// use isl_source::replay::ReplaySource;
/// use isl_core::traits::LandmarkSource;
/// use std::path::Path;
/// let mut src = ReplaySource::open(Path::new("session.jsonl")).unwrap();
/// while let Some(frame) = src.next_frame().unwrap() {
///     println!("{} main(s)", frame.hands.len());
/// }
/// ```
pub struct ReplaySource {
    reader: Box<dyn BufRead + Send>,
    base_dir: Option<PathBuf>,
    line_no: usize,
    buf: String,
}

impl ReplaySource {
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
        log::info!("Replay : {}", path.display());
        Ok(Self {
            reader: Box::new(BufReader::new(file)),
            base_dir: path.parent().map(Path::to_path_buf),
            line_no: 0,
            buf: String::new(),
        })
    }

    /// Source depuis un lecteur quelconque (tests, stdin).
    #[must_use]
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
            base_dir: None,
            line_no: 0,
            buf: String::new(),
        }
    }

    /// Dernière ligne lue (1-based).
    #[must_use]
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl LandmarkSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<FrameDetection>> {
        let Some(mut det) = next_detection(&mut self.reader, &mut self.line_no, &mut self.buf)?
        else {
            return Ok(None);
        };
        if let (Some(base), Some(img)) = (&self.base_dir, &det.image)
            && img.is_relative()
        {
            det.image = Some(base.join(img));
        }
        Ok(Some(det))
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Lit toutes les lignes non vides d'un fichier de détections, avec leur
/// numéro. Le parsing est laissé à l'appelant (extraction parallèle).
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l.to_string()))
        .collect())
}
