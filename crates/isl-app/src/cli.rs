use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// malisl : capture, entraînement et reconnaissance des lettres ISL malayalam.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    /// Fichier CSV du dataset (remplace [capture] dataset).
    #[arg(long, global = true)]
    pub dataset: Option<PathBuf>,

    /// Répertoire des artefacts (remplace [artifacts] dir).
    #[arg(long, global = true)]
    pub artifacts: Option<PathBuf>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enregistre des frames étiquetées dans le dataset.
    Capture {
        /// Lettre à capturer (remplace ses lignes existantes).
        label: Option<String>,

        /// Capturer toutes les lettres manquantes, dans l'ordre de l'alphabet.
        #[arg(long, default_value_t = false)]
        continuous: bool,

        /// Rejouer un fichier de détections JSON-lines au lieu du détecteur.
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Frames par lettre (remplace [capture] frames_per_label).
        #[arg(long)]
        frames: Option<usize>,

        /// Ne pas archiver les images.
        #[arg(long, default_value_t = false)]
        no_images: bool,
    },

    /// Affiche l'avancement de la capture.
    Status,

    /// Supprime toutes les lignes et images d'une lettre.
    Delete { label: String },

    /// Convertit un fichier de détections JSON-lines en lignes du dataset.
    Extract {
        label: String,
        input: PathBuf,

        /// Supprimer d'abord les lignes existantes de la lettre.
        #[arg(long, default_value_t = false)]
        replace: bool,
    },

    /// Nettoie le dataset, entraîne le modèle et écrit les artefacts.
    Train,

    /// Reconnaissance en direct à partir des artefacts.
    Recognize {
        /// Rejouer un fichier de détections JSON-lines au lieu du détecteur.
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Vérifier les artefacts puis quitter.
        #[arg(long, default_value_t = false)]
        check: bool,

        /// Seuil de confiance (remplace [recognition] min_confidence).
        #[arg(long)]
        min_confidence: Option<f32>,
    },
}

impl Cli {
    /// Validate subcommand arguments that clap cannot express.
    ///
    /// # Errors
    /// Returns an error if `capture` gets both or neither of a label and
    /// `--continuous`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Command::Capture {
            label, continuous, ..
        } = &self.command
        {
            match (label.is_some(), *continuous) {
                (false, false) => anyhow::bail!(
                    "Aucune lettre spécifiée. Utilisez `capture <LETTRE>` ou `capture --continuous`."
                ),
                (true, true) => anyhow::bail!(
                    "Une lettre OU --continuous, pas les deux."
                ),
                _ => {}
            }
        }
        if let Command::Recognize {
            min_confidence: Some(c),
            ..
        } = &self.command
            && !(0.0..=1.0).contains(c)
        {
            anyhow::bail!("--min-confidence doit être dans [0, 1] (reçu {c})");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("malisl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn capture_needs_exactly_one_target() {
        assert!(parse(&["capture", "അ"]).validate().is_ok());
        assert!(parse(&["capture", "--continuous"]).validate().is_ok());
        assert!(parse(&["capture"]).validate().is_err());
        assert!(parse(&["capture", "അ", "--continuous"]).validate().is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = parse(&["status", "--dataset", "d.csv", "--log-level", "info"]);
        assert_eq!(cli.dataset, Some(PathBuf::from("d.csv")));
        assert_eq!(cli.log_level, "info");
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn confidence_floor_is_range_checked() {
        assert!(
            parse(&["recognize", "--min-confidence", "0.75"])
                .validate()
                .is_ok()
        );
        assert!(
            parse(&["recognize", "--min-confidence", "1.5"])
                .validate()
                .is_err()
        );
    }
}
