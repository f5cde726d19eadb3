use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;

use isl_core::alphabet::Alphabet;
use isl_core::config::PipelineConfig;
use isl_dataset::store::{CaptureStatus, DatasetLog};
use isl_model::bundle::ArtifactBundle;
use isl_source::archive::ImageArchive;

pub mod capture;
pub mod cli;
pub mod extract;
pub mod recognize;
pub mod source;
pub mod train;

use cli::Command;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider les arguments
    cli.validate()?;

    // 4. Charger la config, puis les overrides CLI
    let mut config = resolve_config(&cli.config)?;
    if let Some(ref path) = cli.dataset {
        config.capture.dataset.clone_from(path);
    }
    if let Some(ref dir) = cli.artifacts {
        config.artifacts.dir.clone_from(dir);
    }
    let alphabet = config.alphabet()?;

    // 5. Ctrl-C : arrêt propre entre deux frames
    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = Arc::clone(&quit);
        ctrlc::set_handler(move || quit.store(true, Ordering::Relaxed))
            .context("Impossible d'installer le handler Ctrl-C")?;
    }

    match cli.command {
        Command::Capture {
            label,
            replay,
            frames,
            no_images,
            ..
        } => {
            if let Some(n) = frames {
                config.capture.frames_per_label = n.max(1);
            }
            if no_images {
                config.capture.save_images = false;
            }
            run_capture(
                &config,
                &alphabet,
                label.as_deref(),
                replay.as_deref(),
                &quit,
            )
        }
        Command::Status => {
            let log = DatasetLog::open(&config.capture.dataset)?;
            print_status(&log.status(&alphabet));
            Ok(())
        }
        Command::Delete { label } => run_delete(&config, &label),
        Command::Extract {
            label,
            input,
            replace,
        } => {
            check_label(&alphabet, &label)?;
            let mut log = DatasetLog::open(&config.capture.dataset)?;
            let report = extract::run_extract(&label, &input, &mut log, replace)?;
            println!(
                "'{label}' : {} lignes écrites ({} sans main), {} frames invalides",
                report.written, report.no_hand, report.invalid
            );
            Ok(())
        }
        Command::Train => train::run_train(
            &config.capture.dataset,
            &config.artifacts.dir,
            &alphabet,
            &config.training,
        ),
        Command::Recognize {
            replay,
            check,
            min_confidence,
        } => {
            if min_confidence.is_some() {
                config.recognition.min_confidence = min_confidence;
            }
            run_recognize(&config, check, replay.as_deref(), &quit)
        }
    }
}

/// Config absente : avertissement et valeurs par défaut.
fn resolve_config(path: &Path) -> Result<PipelineConfig> {
    if path.exists() {
        isl_core::config::load_config(path)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            path.display()
        );
        Ok(PipelineConfig::default())
    }
}

fn check_label(alphabet: &Alphabet, label: &str) -> Result<()> {
    if !alphabet.contains(label) {
        anyhow::bail!("'{label}' n'est pas une lettre de l'alphabet configuré");
    }
    Ok(())
}

fn archive_for(config: &PipelineConfig) -> Option<ImageArchive> {
    config
        .capture
        .save_images
        .then(|| ImageArchive::new(&config.capture.image_dir))
}

fn run_capture(
    config: &PipelineConfig,
    alphabet: &Alphabet,
    label: Option<&str>,
    replay: Option<&Path>,
    quit: &AtomicBool,
) -> Result<()> {
    if let Some(label) = label {
        check_label(alphabet, label)?;
    }
    let mut log = DatasetLog::open(&config.capture.dataset)?;
    let mut source = source::open_source(replay, &config.detector)?;
    let mut session = capture::Capture {
        log: &mut log,
        archive: archive_for(config),
        config: &config.capture,
        quit,
    };

    match label {
        Some(label) => {
            let report = session.capture_label(label, source.as_mut())?;
            println!(
                "'{label}' : {} lignes ({} sans main)",
                report.written, report.no_hand
            );
        }
        None => {
            let sessions = session.capture_continuous(alphabet, source.as_mut())?;
            for (label, report) in &sessions {
                println!(
                    "'{label}' : {} lignes ({} sans main)",
                    report.written, report.no_hand
                );
            }
        }
    }

    print_status(&log.status(alphabet));
    Ok(())
}

fn run_delete(config: &PipelineConfig, label: &str) -> Result<()> {
    let archive = ImageArchive::new(&config.capture.image_dir);
    // Label refusé avant toute modification du dataset.
    archive.label_dir(label)?;
    let mut log = DatasetLog::open(&config.capture.dataset)?;
    let removed = log.remove_label(label)?;
    let images = archive.remove_label(label)?;
    println!(
        "'{label}' : {removed} lignes supprimées{}",
        if images { ", images supprimées" } else { "" }
    );
    Ok(())
}

fn run_recognize(
    config: &PipelineConfig,
    check: bool,
    replay: Option<&Path>,
    quit: &AtomicBool,
) -> Result<()> {
    // Erreur d'artefact : fatale au démarrage.
    let bundle = ArtifactBundle::load(&config.artifacts.dir)?;
    if check {
        return recognize::print_check(&mut std::io::stdout().lock(), &bundle);
    }

    let driver = bundle.into_driver(&config.recognition)?;
    let mut source = source::open_source(replay, &config.detector)?;
    let summary = recognize::recognize_stream(
        &driver,
        source.as_mut(),
        quit,
        &mut std::io::stdout().lock(),
    )?;
    log::info!(
        "{} frames : {} lettres, {} sans main, {} sous le seuil, {} ignorées",
        summary.frames,
        summary.emitted,
        summary.no_hand,
        summary.below_threshold,
        summary.skipped
    );
    Ok(())
}

fn print_status(status: &CaptureStatus) {
    println!("Capturées : {}/{}", status.captured, status.total);
    if !status.remaining.is_empty() {
        println!("Restantes : {}", status.remaining.join(" "));
    }
    for (label, n) in &status.counts {
        println!("  {label}  {n}");
    }
}
