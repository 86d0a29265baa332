use std::sync::Arc;

use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    client::ClientRecord,
    error,
    fleet_db::FleetDb,
    search::{self, SearchReport, SearchService},
};

struct FleetState {
    db: Arc<FleetDb>,
    service: SearchService,
}

#[derive(Clone)]
pub struct FleetMcpServer {
    state: Arc<FleetState>,
    tool_router: ToolRouter<Self>,
}

impl FleetMcpServer {
    fn new(state: FleetState) -> Self {
        Self {
            state: Arc::new(state),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl FleetMcpServer {
    /// Search clients by keyword, or resolve a hunt id.
    #[tool(
        name = "fleet_search",
        description = "Search managed clients. Supports host:, label:, ip:, user: prefixes; bare words match client ids and MAC addresses. A hunt id such as H:1A2B3C4D resolves to the hunt instead."
    )]
    pub async fn fleet_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let query = params.0.query;

        let outcome = self
            .state
            .service
            .search(&query)
            .map_err(|e| mcp_error("search failed", e))?;
        let report = search::build_report(&query, outcome, &self.state.db)
            .map_err(|e| mcp_error("failed to load client details", e))?;

        let summary = format_search_summary(&report);
        let structured = serde_json::to_value(&report)
            .map_err(|e| mcp_error("failed to serialize search results", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }

    /// Complete a label for the search box.
    #[tool(
        name = "fleet_complete_label",
        description = "List known labels starting with the last word of the input, rendered as label:<name>."
    )]
    pub async fn fleet_complete_label(
        &self,
        params: Parameters<CompleteParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let prefix = params.0.prefix;
        let completions = self
            .state
            .service
            .complete_label(&prefix)
            .map_err(|e| mcp_error("completion failed", e))?;

        let summary = if completions.is_empty() {
            format!("No labels match \"{prefix}\"")
        } else {
            completions.join("\n")
        };
        let structured = serde_json::to_value(CompleteResponse {
            prefix,
            completions,
        })
        .map_err(|e| mcp_error("failed to serialize completions", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }

    /// Store a client record and re-index it in place.
    #[tool(
        name = "fleet_upsert_client",
        description = "Add or replace one client record. The record fully replaces any earlier record with the same client_id and is searchable immediately."
    )]
    pub async fn fleet_upsert_client(
        &self,
        params: Parameters<UpsertParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let record = params.0.client;
        record
            .validate()
            .map_err(|e| rmcp::ErrorData::invalid_params(e.to_string(), None))?;

        self.state
            .db
            .put_client(&record)
            .map_err(|e| mcp_error("failed to store client", e))?;
        self.state
            .service
            .add_client(&record)
            .map_err(|e| mcp_error("failed to index client", e))?;
        let tokens = self
            .state
            .service
            .index()
            .tokens_for(&record.client_id)
            .map_err(|e| mcp_error("failed to read index", e))?
            .len();

        let mut result = CallToolResult::success(vec![Content::text(format!(
            "Indexed {} ({tokens} tokens)",
            record.client_id
        ))]);
        result.structured_content = Some(json!({
            "clientId": record.client_id,
            "tokens": tokens,
        }));
        Ok(result)
    }

    /// Drop a client from the store and the index.
    #[tool(
        name = "fleet_remove_client",
        description = "Remove one client by id. Its labels stay available for completion until the next restart."
    )]
    pub async fn fleet_remove_client(
        &self,
        params: Parameters<RemoveParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let client_id = params.0.client_id;

        let stored = self
            .state
            .db
            .remove_client(&client_id)
            .map_err(|e| mcp_error("failed to remove client", e))?;
        let indexed = self
            .state
            .service
            .remove_client(&client_id)
            .map_err(|e| mcp_error("failed to update index", e))?;
        let removed = stored || indexed;

        let summary = if removed {
            format!("Removed {client_id}")
        } else {
            format!("No client {client_id}")
        };
        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(json!({
            "clientId": client_id,
            "removed": removed,
        }));
        Ok(result)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for FleetMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info =
            Implementation::new("fleetseek", env!("CARGO_PKG_VERSION")).with_title("fleetseek MCP");
        info.instructions = Some(
            "Use fleet_search to find clients by hostname, label, IP, user, MAC or id, or to open a hunt by id. Use fleet_complete_label to discover label names. fleet_upsert_client and fleet_remove_client keep the store and the live index in step."
                .to_string(),
        );
        info
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Search query string. Empty lists every client.
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteParams {
    /// Partial search box input.
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertParams {
    /// Full client record; `client_id` is required.
    pub client: ClientRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveParams {
    pub client_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteResponse {
    prefix: String,
    completions: Vec<String>,
}

fn format_search_summary(report: &SearchReport) -> String {
    if let Some(job_id) = &report.job_id {
        return format!("\"{}\" is hunt {job_id}", report.query);
    }
    if report.clients.is_empty() {
        return format!("No clients found for \"{}\"", report.query);
    }

    let mut lines = Vec::with_capacity(report.clients.len() + 1);
    let suffix = if report.clients.len() == 1 { "" } else { "s" };
    lines.push(format!(
        "Found {} client{} for \"{}\":",
        report.clients.len(),
        suffix,
        report.query
    ));
    for c in &report.clients {
        lines.push(format!("{} {}", c.client_id, c.hostname));
    }
    lines.join("\n")
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

pub fn run_mcp(db: FleetDb) -> error::Result<()> {
    let db = Arc::new(db);
    let service = search::open_service(&db)?;

    let server = FleetMcpServer::new(FleetState { db, service });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| error::Error::Config(format!("failed to start tokio runtime: {e}")))?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server
            .serve(transport)
            .await
            .map_err(|e| error::Error::Config(format!("MCP server initialization failed: {e}")))?;
        running
            .waiting()
            .await
            .map_err(|e| error::Error::Config(format!("MCP server error: {e}")))?;
        Ok(())
    })
}
