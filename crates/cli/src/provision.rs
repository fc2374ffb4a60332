use manscope_core::model::ProvisionSummary;
use manscope_core::runtime::ProvisionOrchestrator;
use tabled::{Table, Tabled};
use tracing::warn;

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Command")]
    command: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn outcome_rows(summary: &ProvisionSummary, include_successes: bool) -> Vec<OutcomeRow> {
    let mut rows = Vec::new();
    if include_successes {
        rows.extend(summary.provisioned.iter().map(|c| OutcomeRow {
            command: c.clone(),
            status: "provisioned",
            detail: String::new(),
        }));
        rows.extend(summary.already_cached.iter().map(|c| OutcomeRow {
            command: c.clone(),
            status: "cached",
            detail: String::new(),
        }));
    }
    rows.extend(summary.failed.iter().map(|(c, detail)| OutcomeRow {
        command: c.clone(),
        status: "failed",
        detail: detail.clone(),
    }));
    rows.extend(summary.cancelled.iter().map(|c| OutcomeRow {
        command: c.clone(),
        status: "cancelled",
        detail: String::new(),
    }));
    rows.sort_by(|a, b| a.command.cmp(&b.command));
    rows
}

fn print_counts(summary: &ProvisionSummary) {
    println!(
        "Provisioned: {}  Cached: {}  Failed: {}  Cancelled: {}  ({:.2}s)",
        summary.provisioned.len(),
        summary.already_cached.len(),
        summary.failed.len(),
        summary.cancelled.len(),
        summary.elapsed.as_secs_f64()
    );
}

/// Stops dispatching new commands on Ctrl-C.
fn cancel_on_ctrl_c(orchestrator: &ProvisionOrchestrator) {
    let token = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining commands");
            token.cancel();
        }
    });
}

pub async fn run(
    orchestrator: ProvisionOrchestrator,
    commands: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    cancel_on_ctrl_c(&orchestrator);
    let summary = orchestrator.provision_all(commands, 0).await;

    println!("{}", Table::new(outcome_rows(&summary, true)));
    print_counts(&summary);
    Ok(())
}

pub async fn run_all(
    orchestrator: ProvisionOrchestrator,
    concurrency: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    cancel_on_ctrl_c(&orchestrator);
    let summary = orchestrator
        .provision_path(concurrency.unwrap_or(0))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let problems = outcome_rows(&summary, false);
    if !problems.is_empty() {
        println!("{}", Table::new(problems));
    }
    print_counts(&summary);
    Ok(())
}
