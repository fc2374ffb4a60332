use manscope_core::registry::{resolve_uri, ALL_COMMANDS_URI, DOC_SCHEME};
use manscope_core::runtime::ProvisionOrchestrator;

pub async fn run(
    orchestrator: ProvisionOrchestrator,
    identifier: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let uri = resolve_uri(&identifier);
    let ctx = orchestrator.context();

    // A fresh process has an empty registry; load what the URI points at first.
    if uri == ALL_COMMANDS_URI {
        ctx.refresh_index().await?;
    } else {
        let command = uri.trim_start_matches(DOC_SCHEME);
        if let Err(e) = orchestrator.register_cached(command).await {
            if e.is_not_found() {
                println!(
                    "No stored man page for {command}. Run `manscope provision {command}` first."
                );
                return Ok(());
            }
            return Err(e.into());
        }
    }

    println!("{}", ctx.registry().read(&uri)?);
    Ok(())
}
