use manscope_core::runtime::{IndexRefresh, ProvisionOrchestrator};
use tabled::{Table, Tabled};
use tracing::info;

#[derive(Tabled)]
struct DirectoryRow {
    #[tabled(rename = "Directory")]
    directory: String,
    #[tabled(rename = "Commands")]
    commands: usize,
}

pub async fn run(
    orchestrator: ProvisionOrchestrator,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = orchestrator.context().refresh_index().await?;
    info!(
        "Scanned {} directories, {} commands",
        index.directories().count(),
        index.len()
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&*index)?);
        return Ok(());
    }

    let rows: Vec<DirectoryRow> = index
        .directories()
        .map(|(dir, names)| DirectoryRow {
            directory: dir.display().to_string(),
            commands: names.len(),
        })
        .collect();

    if rows.is_empty() {
        println!("No executables found on the search path.");
    } else {
        println!("{}", Table::new(rows));
        println!("Total commands: {}", index.len());
    }
    Ok(())
}

/// Each CLI invocation starts with an empty index, so this always rescans.
pub async fn available(
    orchestrator: ProvisionOrchestrator,
    command: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = orchestrator.context();
    let available = ctx
        .is_command_available(&command, IndexRefresh::ForceRescan)
        .await?;

    match ctx.index().find(&command) {
        Some(found) if available => {
            println!("{} is available in {}", command, found.source_dir.display())
        }
        _ => println!("{} is not on the search path", command),
    }
    Ok(())
}
