//! Initialize Mimeo.

use super::config_path;
use anyhow::{Context, Result};
use colored::Colorize;
use mimeo_config::Config;
use mimeo_db::Database;
use std::path::Path;

const URLS_FILE_HEADER: &str = "# One video URL per line. Lines starting with '#' are ignored.\n";

pub fn run(explicit: Option<&Path>) -> Result<()> {
    let config_file = config_path(explicit)?;

    println!("{}", "Initializing Mimeo...".cyan().bold());

    if config_file.exists() {
        println!("  {} Using existing config: {}", "Note:".yellow(), config_file.display());
    } else {
        Config::create_default_file(&config_file).context("Failed to create config file")?;
        println!("  {} Created config: {}", "✓".green(), config_file.display());
    }

    let config = Config::load_from(&config_file).context("Failed to load config")?;
    let paths = config.library_paths();

    paths.ensure_dirs().context("Failed to create data directories")?;
    for dir in [&paths.documents_dir, &paths.videos_dir] {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    println!("  {} Created library directories", "✓".green());

    if !paths.urls_file.exists() {
        std::fs::write(&paths.urls_file, URLS_FILE_HEADER)
            .with_context(|| format!("Failed to create {}", paths.urls_file.display()))?;
        println!("  {} Created URL list: {}", "✓".green(), paths.urls_file.display());
    }

    let _db = Database::open(&paths.database_file).context("Failed to initialize knowledge store")?;
    println!(
        "  {} Knowledge store: {}",
        "✓".green(),
        paths.database_file.display()
    );

    println!();
    println!("{}", "Mimeo initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Put documents under {}", paths.documents_dir.display());
    println!("  2. Put recordings under {}", format!("{}/<creator>/", paths.videos_dir.display()));
    println!("  3. Run {}", "mimeo ingest all".cyan());

    Ok(())
}
