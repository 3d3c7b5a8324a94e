//! Status command - knowledge store contents and service availability.

use super::{format_size, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use mimeo_core::{keys, ItemKind};
use mimeo_db::Database;
use mimeo_ollama::OllamaClient;
use std::path::Path;
use tokio::runtime::Runtime;

pub fn run(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    let paths = config.library_paths();

    println!("{}", "Mimeo Status".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Knowledge Store".white().bold());
    if paths.database_file.exists() {
        let db = Database::open(&paths.database_file).context("Failed to open knowledge store")?;
        let stats = db.get_stats()?;

        for kind in ItemKind::all() {
            let count = stats.items_by_kind.get(kind.as_str()).copied().unwrap_or(0);
            println!("  {:<12} {}", format!("{}:", kind), count);
        }
        println!("  {:<12} {}", "Chunks:", stats.total_chunks);
        println!("  {:<12} {}", "Embedded:", stats.embedded_chunks);
        println!("  {:<12} {}", "Size:", format_size(stats.database_size_bytes));
        if !db.integrity_check()? {
            println!("  {} integrity check failed", "✗".red());
        }

        let profiles = db.list_items(Some(ItemKind::Profile), None)?;
        if !profiles.is_empty() {
            println!();
            println!("{}", "Profiled Creators".white().bold());
            for item in &profiles {
                let author = item.metadata[keys::AUTHOR].as_str().unwrap_or(&item.name);
                println!("  {} {} ({})", "●".green(), author, item.created_at.format("%Y-%m-%d %H:%M"));
            }
        }
    } else {
        println!("  {}", "Not created yet. Run 'mimeo init'.".dimmed());
    }

    if paths.lock_file.exists() {
        println!();
        println!(
            "  {} A run holds {}",
            "◐".blue(),
            paths.lock_file.display()
        );
    }

    println!();
    println!("{}", "External Tools".white().bold());
    for (tool, available) in mimeo_process::check_dependencies() {
        if available {
            println!("  {} {}", "●".green(), tool);
        } else {
            println!("  {} {} (not found on PATH)", "✗".red(), tool);
        }
    }

    println!();
    println!("{}", "Ollama".white().bold());
    let client = OllamaClient::from_config(&config.ollama)?;
    let rt = Runtime::new().context("Failed to create async runtime")?;
    if rt.block_on(client.is_available()) {
        println!("  {} {}", "●".green(), client.host());
        let models = rt.block_on(client.list_models()).unwrap_or_default();
        for wanted in [&config.ollama.model, &config.ollama.profile_model, &config.ollama.embedding_model] {
            let present = models
                .iter()
                .any(|m| m.name == *wanted || m.name.starts_with(&format!("{}:", wanted)));
            if present {
                println!("  {} {}", "●".green(), wanted);
            } else {
                println!("  {} {} (run 'ollama pull {}')", "○".yellow(), wanted, wanted);
            }
        }
    } else {
        println!(
            "  {} not reachable at {} (items will be tagged unclassified)",
            "✗".red(),
            client.host()
        );
    }

    Ok(())
}
