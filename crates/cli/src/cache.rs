use clap::Subcommand;
use manscope_core::runtime::ProvisionOrchestrator;
use std::time::{SystemTime, UNIX_EPOCH};
use tabled::{Table, Tabled};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show store statistics
    Stats,
    /// List stored man pages
    List {
        /// Sort by size or date
        #[arg(long, value_parser = ["size", "date"])]
        sort: Option<String>,
        /// Only show commands whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Remove every stored man page
    Clear,
}

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Command")]
    command: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Age")]
    age: String,
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    }
}

fn format_age(now: u64, modified_at: u64) -> String {
    let age = now.saturating_sub(modified_at);
    if age < 60 {
        format!("{}s ago", age)
    } else if age < 3600 {
        format!("{}m ago", age / 60)
    } else if age < 86400 {
        format!("{}h ago", age / 3600)
    } else {
        format!("{}d ago", age / 86400)
    }
}

pub fn run(
    orchestrator: ProvisionOrchestrator,
    cmd: CacheCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = orchestrator.context().store();

    match cmd {
        CacheCommands::Stats => {
            let stats = store.stats()?;
            println!("Store Directory: {}", stats.root.display());
            println!("Man Pages:       {}", stats.total_artifacts);
            println!("Total Size:      {}", format_size(stats.total_bytes));
        }
        CacheCommands::List { sort, filter } => {
            let mut artifacts = store.summaries()?;

            if let Some(pattern) = filter {
                artifacts.retain(|a| a.key.contains(&pattern));
            }

            match sort.as_deref() {
                Some("size") => artifacts.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
                Some("date") => artifacts.sort_by(|a, b| b.modified_at.cmp(&a.modified_at)),
                _ => {}
            }

            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let rows: Vec<ArtifactRow> = artifacts
                .into_iter()
                .map(|a| ArtifactRow {
                    command: a.key,
                    size: format_size(a.size_bytes),
                    age: format_age(now, a.modified_at),
                })
                .collect();

            if rows.is_empty() {
                println!("No stored man pages found.");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        CacheCommands::Clear => {
            let removed = store.clear()?;
            println!("Removed {} stored man pages.", removed);
        }
    }

    Ok(())
}
