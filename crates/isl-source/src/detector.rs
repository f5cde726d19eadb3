// Le détecteur de landmarks tourne hors processus : il lit la caméra et écrit
// une détection JSON par ligne sur stdout. Ce module ne fait que le lancer et
// lire son flux ; il n'impose aucune implémentation.

use std::io::BufReader;
use std::process::{Child, ChildStdout, Command, Stdio};

use anyhow::{Context, Result, bail};
use isl_core::frame::FrameDetection;
use isl_core::traits::LandmarkSource;

use crate::replay::next_detection;

/// Détecteur externe lancé en sous-processus.
///
/// Le processus est tué à la destruction.
///
/// # Example
/// ```no_run
/// use isl_source::detector::DetectorProcess;
/// let cmd = vec!["python3".to_string(), "hand_detector.py".to_string()];
/// let src = DetectorProcess::spawn(&cmd).unwrap();
/// ```
pub struct DetectorProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
    line_no: usize,
    buf: String,
}

impl DetectorProcess {
    /// Lance `command[0]` avec `command[1..]` comme arguments.
    ///
    /// # Errors
    /// Commande vide ou processus impossible à lancer.
    pub fn spawn(command: &[String]) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("Aucune commande de détecteur configurée ([detector] command)");
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Impossible de lancer le détecteur '{program}'"))?;

        let stdout = child
            .stdout
            .take()
            .context("stdout du détecteur indisponible")?;

        log::info!("Détecteur lancé : {} (pid {})", command.join(" "), child.id());
        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            line_no: 0,
            buf: String::new(),
        })
    }
}

impl LandmarkSource for DetectorProcess {
    fn next_frame(&mut self) -> Result<Option<FrameDetection>> {
        let det = next_detection(&mut self.stdout, &mut self.line_no, &mut self.buf)?;
        if det.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) if !status.success() => {
                    log::warn!("Le détecteur s'est terminé : {status}");
                }
                Ok(_) => log::info!("Flux du détecteur terminé"),
                Err(e) => log::warn!("État du détecteur inconnu : {e}"),
            }
        }
        Ok(det)
    }

    fn is_live(&self) -> bool {
        true
    }
}

impl Drop for DetectorProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
