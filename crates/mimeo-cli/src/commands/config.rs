//! Configuration commands.

use super::config_path;
use anyhow::{Context, Result};
use colored::Colorize;
use mimeo_config::Config;
use std::path::Path;

pub fn show(explicit: Option<&Path>) -> Result<()> {
    let path = config_path(explicit)?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));

    if path.exists() {
        let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;
        // Surface parse errors instead of printing a file that will not load
        let config = Config::load_from(&path).context("Config file is invalid")?;
        println!("{}", contents);
        print_resolved(&config);
    } else {
        println!(
            "{}",
            format!("No config at {}, showing defaults. Run 'mimeo init' to create it.", path.display()).dimmed()
        );
        println!("{}", Config::default_config_string());
        print_resolved(&Config::default());
    }

    Ok(())
}

pub fn path(explicit: Option<&Path>) -> Result<()> {
    println!("{}", config_path(explicit)?.display());
    Ok(())
}

fn print_resolved(config: &Config) {
    let paths = config.library_paths();
    println!("{}", "Resolved paths".white().bold());
    println!("  Documents:  {}", paths.documents_dir.display());
    println!("  Recordings: {}", paths.videos_dir.display());
    println!("  URL list:   {}", paths.urls_file.display());
    println!("  Captions:   {}", paths.captions_dir.display());
    println!("  Profiles:   {}", paths.profiles_dir.display());
    println!("  Store:      {}", paths.database_file.display());
}
