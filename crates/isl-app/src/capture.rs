//! Sessions de capture : une lettre, ou toutes les lettres manquantes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use isl_core::alphabet::Alphabet;
use isl_core::clock::FramePacer;
use isl_core::config::CaptureConfig;
use isl_core::frame::FrameDetection;
use isl_core::traits::LandmarkSource;
use isl_dataset::schema::LabeledSample;
use isl_dataset::store::DatasetLog;
use isl_source::archive::ImageArchive;

/// Bilan d'une session sur une lettre.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub written: usize,
    /// Lignes écrites sans main détectée.
    pub no_hand: usize,
    /// Frames ignorées (détection invalide).
    pub skipped: usize,
    /// La source n'a plus de frames.
    pub exhausted: bool,
    pub interrupted: bool,
}

/// État partagé par les sessions d'une même invocation.
pub struct Capture<'a> {
    pub log: &'a mut DatasetLog,
    pub archive: Option<ImageArchive>,
    pub config: &'a CaptureConfig,
    pub quit: &'a AtomicBool,
}

impl Capture<'_> {
    fn quitting(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }

    /// Attend `secs` secondes par pas d'une seconde, interruptible.
    fn wait(&self, secs: u32, what: &str) -> bool {
        for remaining in (1..=secs).rev() {
            if self.quitting() {
                return false;
            }
            log::info!("{what} : {remaining}…");
            std::thread::sleep(Duration::from_secs(1));
        }
        !self.quitting()
    }

    /// Capture une lettre : ses lignes et images existantes sont d'abord
    /// supprimées, puis jusqu'à `frames_per_label` lignes sont écrites.
    ///
    /// Source live : compte à rebours, puis cadence `capture_fps` (les frames
    /// reçues entre deux échéances sont ignorées). Source rejouée : chaque
    /// frame est prise.
    ///
    /// # Errors
    /// Erreur d'écriture du dataset. Les erreurs de frame sont loguées et la
    /// frame est ignorée.
    pub fn capture_label(
        &mut self,
        label: &str,
        source: &mut dyn LandmarkSource,
    ) -> Result<SessionReport> {
        let mut report = SessionReport::default();

        if self.log.count(label) > 0 {
            let removed = self.log.remove_label(label)?;
            log::info!("'{label}' : {removed} lignes existantes supprimées");
        }
        if let Some(archive) = &self.archive
            && archive.remove_label(label)?
        {
            log::info!("'{label}' : images existantes supprimées");
        }

        let live = source.is_live();
        if live && !self.wait(self.config.countdown_secs, &format!("Capture de '{label}'")) {
            report.interrupted = true;
            return Ok(report);
        }
        log::info!(
            "Capture de '{label}' : {} frames{}",
            self.config.frames_per_label,
            if live {
                format!(" à {} fps", self.config.capture_fps)
            } else {
                String::new()
            }
        );

        let mut pacer = FramePacer::new(self.config.capture_fps);
        while report.written < self.config.frames_per_label {
            if self.quitting() {
                report.interrupted = true;
                break;
            }

            let detection = match source.next_frame() {
                Ok(Some(d)) => d,
                Ok(None) => {
                    report.exhausted = true;
                    break;
                }
                Err(e) => {
                    log::warn!("Frame ignorée : {e:#}");
                    report.skipped += 1;
                    continue;
                }
            };

            if live && !pacer.is_due(Instant::now()) {
                continue;
            }

            let Some(sample) = self.record(label, report.written, &detection) else {
                report.skipped += 1;
                continue;
            };
            if !sample.has_hand() {
                report.no_hand += 1;
            }
            self.log.append(&sample)?;
            report.written += 1;
            pacer.mark_emitted();
        }

        log::info!(
            "'{label}' : {} lignes écrites ({} sans main, {} ignorées)",
            report.written,
            report.no_hand,
            report.skipped
        );
        Ok(report)
    }

    /// Construit la ligne d'une frame. `None` si la détection est invalide ;
    /// l'image n'est archivée qu'une fois les features assemblées.
    fn record(&self, label: &str, n: usize, detection: &FrameDetection) -> Option<LabeledSample> {
        let features = match detection.features() {
            Ok(f) => f,
            Err(e) => {
                log::warn!("Détection invalide ignorée : {e}");
                return None;
            }
        };
        let mut sample = LabeledSample::new(label, features);

        if let (Some(archive), Some(image)) = (&self.archive, &detection.image) {
            match archive.store(label, n, image) {
                Ok(path) => sample = sample.with_image(path.to_string_lossy()),
                Err(e) => log::warn!("Image non archivée : {e:#}"),
            }
        }
        Some(sample)
    }

    /// Capture chaque lettre non encore capturée, dans l'ordre canonique,
    /// avec une pause entre deux lettres. S'arrête sur interruption ou quand
    /// la source est épuisée.
    ///
    /// # Errors
    /// Erreur d'écriture du dataset.
    pub fn capture_continuous(
        &mut self,
        alphabet: &Alphabet,
        source: &mut dyn LandmarkSource,
    ) -> Result<Vec<(String, SessionReport)>> {
        let mut sessions = Vec::new();
        let mut first = true;

        while let Some(label) = self.log.next_missing(alphabet).map(str::to_string) {
            if self.quitting() {
                break;
            }
            if !first
                && source.is_live()
                && !self.wait(self.config.break_secs, "Pause avant la lettre suivante")
            {
                break;
            }
            first = false;

            let report = self.capture_label(&label, source)?;
            let stop = report.exhausted || report.interrupted || report.written == 0;
            sessions.push((label, report));
            if stop {
                break;
            }
        }

        if self.log.next_missing(alphabet).is_none() {
            log::info!("Toutes les lettres sont capturées");
        }
        Ok(sessions)
    }
}
