use manscope_core::registry::{document_uri, resolve_uri, ALL_COMMANDS_URI};
use manscope_core::runtime::{IndexRefresh, ProvisionOrchestrator};
use manscope_core::{ManscopeError, model::ProvisionStatus};
use rmcp::{
    ErrorData as McpError,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, InitializeResult, ServerCapabilities},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod stdio;

fn internal_error(e: impl ToString) -> McpError {
    McpError::new(rmcp::model::ErrorCode(-32000), e.to_string(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json_str = serde_json::to_string_pretty(value).map_err(internal_error)?;
    Ok(CallToolResult::success(vec![Content::text(json_str)]))
}

#[derive(Clone)]
pub struct McpServer {
    pub(crate) tool_router: ToolRouter<Self>,
    pub(crate) orchestrator: ProvisionOrchestrator,
}

#[derive(Deserialize, JsonSchema)]
pub struct GetGuideArgs {}

/// Arguments of tools that take none.
#[derive(Deserialize, JsonSchema)]
pub struct NoArgs {}

#[derive(Deserialize, JsonSchema)]
pub struct AvailabilityArgs {
    /// Name of the command to look for (e.g. "grep")
    pub command_name: String,
    /// Rescan the search path before answering (default: true).
    /// Set to false to answer from the last scan.
    pub force_rescan: Option<bool>,
}

#[derive(Deserialize, JsonSchema)]
pub struct CommandArgs {
    /// Name of the command (e.g. "grep")
    pub command_name: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct ProvisionAllArgs {
    /// Maximum number of man pages extracted at the same time.
    /// Omit to use the configured default.
    pub concurrency: Option<usize>,
}

#[derive(Deserialize, JsonSchema)]
pub struct ReadManpageArgs {
    /// A command name ("grep") or a full resource URI ("doc://grep")
    pub command_identifier: String,
}

#[tool_router]
impl McpServer {
    pub fn new(orchestrator: ProvisionOrchestrator) -> Self {
        Self {
            tool_router: Self::tool_router(),
            orchestrator,
        }
    }

    #[tool(
        description = "Returns a usage guide for manscope. Call this first to learn how to discover commands and turn their man pages into readable resources."
    )]
    pub async fn get_guide(
        &self,
        _params: Parameters<GetGuideArgs>,
    ) -> Result<CallToolResult, McpError> {
        let guide = r#"
# manscope Guide

manscope finds the executables on the search path (PATH), extracts their man
pages as plain text, keeps them on disk, and serves them as resources.

## Workflow

1. **Discover**: `register_command_resource()` scans PATH and returns the
   commands grouped by directory. It also (re)registers `doc://all-commands`.
2. **Check**: `is_command_available(command_name="rg")`. Pass
   `force_rescan=false` to answer from the last scan without rescanning.
3. **Provision one**: `create_manpage_file(command_name="grep")` extracts,
   stores and registers `doc://grep`. Pages already on disk are reused.
4. **Provision all**: `create_all_manpage_files()` does the same for every
   command on PATH in parallel and returns a summary of provisioned, cached,
   failed and cancelled commands.
5. **Read**: `read_manpage_resource(command_identifier="grep")` or
   `read_all_commands_resource()`.

## Tips
- `register_manpage_resource(command_name=...)` registers a page that is
  already stored without running `man`.
- Commands without a manual entry show up under `failed`; they never leave
  a file behind.
"#;
        Ok(CallToolResult::success(vec![Content::text(guide)]))
    }

    #[tool(
        description = "Rescan PATH and register the list of all commands as the doc://all-commands resource. Returns the commands grouped by the directory that provides them."
    )]
    pub async fn register_command_resource(
        &self,
        _params: Parameters<NoArgs>,
    ) -> Result<CallToolResult, McpError> {
        let index = self
            .orchestrator
            .context()
            .refresh_index()
            .await
            .map_err(internal_error)?;
        json_result(&*index)
    }

    #[tool(description = "Check whether a command exists on PATH. Returns true or false.")]
    pub async fn is_command_available(
        &self,
        params: Parameters<AvailabilityArgs>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0;
        let refresh = if args.force_rescan.unwrap_or(true) {
            IndexRefresh::ForceRescan
        } else {
            IndexRefresh::UseCached
        };
        let available = self
            .orchestrator
            .context()
            .is_command_available(&args.command_name, refresh)
            .await
            .map_err(internal_error)?;
        json_result(&available)
    }

    #[tool(
        description = "Extract the man page of a command, store it and register it as doc://{command_name}. A page that is already stored is reused."
    )]
    pub async fn create_manpage_file(
        &self,
        params: Parameters<CommandArgs>,
    ) -> Result<CallToolResult, McpError> {
        let name = params.0.command_name;
        let outcome = self.orchestrator.provision_one(&name).await;
        let uri = document_uri(&name);
        let message = match outcome.status {
            ProvisionStatus::Provisioned => {
                format!("Man page for {name} saved and registered as {uri}.")
            }
            ProvisionStatus::AlreadyCached => {
                format!("Man page for {name} was already stored; registered as {uri}.")
            }
            ProvisionStatus::Failed => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Failed to extract man page for {name}: {}",
                    outcome.detail
                ))]));
            }
        };
        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    #[tool(
        description = "Register a man page that is already stored, without extracting it again."
    )]
    pub async fn register_manpage_resource(
        &self,
        params: Parameters<CommandArgs>,
    ) -> Result<CallToolResult, McpError> {
        let name = params.0.command_name;
        match self.orchestrator.register_cached(&name).await {
            Ok(info) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Man page for {name} loaded and registered as {}.",
                info.uri
            ))])),
            Err(e) if e.is_not_found() => Ok(CallToolResult::error(vec![Content::text(format!(
                "No stored man page for {name}. Run create_manpage_file first."
            ))])),
            Err(e @ ManscopeError::InvalidKey(_)) => {
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
            Err(e) => Err(internal_error(e)),
        }
    }

    #[tool(
        description = "Rescan PATH, then extract, store and register the man page of every command in parallel. Returns the provisioned, cached, failed and cancelled commands."
    )]
    pub async fn create_all_manpage_files(
        &self,
        params: Parameters<ProvisionAllArgs>,
    ) -> Result<CallToolResult, McpError> {
        let concurrency = params.0.concurrency.unwrap_or(0);
        let summary = self
            .orchestrator
            .provision_path(concurrency)
            .await
            .map_err(internal_error)?;
        json_result(&summary)
    }

    #[tool(
        description = "Read a registered man page by command name (\"grep\") or URI (\"doc://grep\")."
    )]
    pub async fn read_manpage_resource(
        &self,
        params: Parameters<ReadManpageArgs>,
    ) -> Result<CallToolResult, McpError> {
        let uri = resolve_uri(&params.0.command_identifier);
        self.read_resource(&uri)
    }

    #[tool(description = "Read the list of all commands found on PATH, one per line.")]
    pub async fn read_all_commands_resource(
        &self,
        _params: Parameters<NoArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.read_resource(ALL_COMMANDS_URI)
    }

    #[tool(description = "List every registered resource with its URI, name and tags.")]
    pub async fn list_registered_resources(
        &self,
        _params: Parameters<NoArgs>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.orchestrator.context().registry().list())
    }

    fn read_resource(&self, uri: &str) -> Result<CallToolResult, McpError> {
        match self.orchestrator.context().registry().read(uri) {
            Ok(content) => Ok(CallToolResult::success(vec![Content::text(content)])),
            Err(e) if e.is_not_found() => Ok(CallToolResult::error(vec![Content::text(format!(
                "Resource '{uri}' is not registered."
            ))])),
            Err(e) => Err(internal_error(e)),
        }
    }
}

#[tool_handler]
impl rmcp::ServerHandler for McpServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: Implementation {
                name: "manscope".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
