//! Ingest and profile commands.

use super::load_config;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mimeo_ingest::{BackgroundIngest, BatchReport, IngestResult, Pipeline, Stage};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

/// What to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Documents,
    Transcripts,
    Captions,
    Profiles { force: bool },
    All { force: bool },
}

impl Target {
    fn describe(&self) -> &'static str {
        match self {
            Target::Documents => "Ingesting documents",
            Target::Transcripts => "Transcribing recordings",
            Target::Captions => "Fetching captions",
            Target::Profiles { .. } => "Building creator profiles",
            Target::All { .. } => "Running full ingestion",
        }
    }
}

pub fn run(explicit: Option<&Path>, target: Target) -> Result<()> {
    let config = load_config(explicit)?;
    let pipeline = Pipeline::from_config(&config).context("Failed to set up the pipeline")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(target.describe());
    pb.enable_steady_tick(Duration::from_millis(100));

    info!("{} ({:?})", target.describe(), target);
    let started = Instant::now();

    // The pipeline blocks on external tools; keep the spinner alive meanwhile
    let worker = BackgroundIngest::new();
    let handle = worker.spawn(move || -> IngestResult<Vec<(Stage, BatchReport)>> {
        match target {
            Target::Documents => Ok(vec![(Stage::Documents, pipeline.run_documents()?)]),
            Target::Transcripts => Ok(vec![(Stage::Transcripts, pipeline.run_transcripts()?)]),
            Target::Captions => Ok(vec![(Stage::Captions, pipeline.run_captions()?)]),
            Target::Profiles { force } => Ok(vec![(Stage::Profiles, pipeline.run_profiles(force)?)]),
            Target::All { force } => pipeline.run_all(force),
        }
    })?;

    let reports = handle
        .join()
        .map_err(|_| anyhow!("Ingestion worker panicked"))??;
    pb.finish_and_clear();
    info!("Ingestion finished in {:.1}s", started.elapsed().as_secs_f64());

    let mut failed = 0;
    for (stage, report) in &reports {
        print_report(*stage, report);
        failed += report.failed.len();
    }

    if failed > 0 {
        anyhow::bail!("{} item(s) failed", failed);
    }
    Ok(())
}

fn print_report(stage: Stage, report: &BatchReport) {
    println!(
        "{} {} committed, {} unchanged, {} skipped, {} failed",
        format!("{}:", stage).cyan().bold(),
        report.committed.len().to_string().green(),
        report.unchanged.len(),
        report.skipped.len().to_string().yellow(),
        report.failed.len().to_string().red()
    );

    for name in &report.committed {
        println!("  {} {}", "✓".green(), name);
    }
    for (name, reason) in &report.skipped {
        println!("  {} {} {}", "○".yellow(), name, format!("({})", reason).dimmed());
    }
    for (name, error) in &report.failed {
        println!("  {} {}", "✗".red(), name);
        println!("    {}", error.dimmed());
    }
}
