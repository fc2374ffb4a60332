use crate::McpServer;
use manscope_core::runtime::ProvisionOrchestrator;
use rmcp::{transport::stdio, ServiceExt};

pub async fn run_stdio_server(
    orchestrator: ProvisionOrchestrator,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting MCP server on stdio");
    let service = McpServer::new(orchestrator).serve(stdio()).await?;
    service.waiting().await?;
    tracing::info!("MCP server stopped");
    Ok(())
}
