//! MCP server for lorelink. Exposes note tagging and graph lookups via
//! the Model Context Protocol.

pub mod params;

use params::*;
use crate::pipeline::{TagRequest, TagService};
use crate::storage::GraphStore;
use crate::taxonomy::MentionType;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ok_text(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

fn ok_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => ok_text(json),
        Err(e) => err_text(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// LorelinkMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct LorelinkMcpServer {
    service: Arc<TagService>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl LorelinkMcpServer {
    pub fn new(service: Arc<TagService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    // ── Tagging tools ───────────────────────────────────────────────────

    #[tool(description = "Tag a campaign note: find mentions, create or reuse nodes, link them")]
    fn tag_note(
        &self,
        Parameters(p): Parameters<TagNoteParams>,
    ) -> Result<CallToolResult, McpError> {
        if p.owner_id <= 0 {
            return err_text("owner_id must be positive".to_string());
        }
        let request = TagRequest::new(p.text, p.note_id, p.owner_id);
        match self.service.tag(&request) {
            Ok(tagged) => ok_json(&tagged),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Report whether the vocabulary is built, with phrase counts per label")]
    fn vocabulary_status(&self) -> Result<CallToolResult, McpError> {
        match self.service.status() {
            Ok(status) => ok_json(&status),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Rebuild the vocabulary from catalog tables and previously tagged nodes")]
    fn rebuild_vocabulary(&self) -> Result<CallToolResult, McpError> {
        match self.service.rebuild() {
            Ok(status) => ok_json(&status),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Node tools ──────────────────────────────────────────────────────

    #[tool(description = "Get a node by id")]
    fn get_node(
        &self,
        Parameters(p): Parameters<NodeIdParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.service.store().get_node(p.node_id) {
            Ok(Some(node)) => ok_json(&node),
            Ok(None) => err_text(format!("node {} not found", p.node_id)),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Find an owner's nodes by name, optionally restricted to one type")]
    fn find_node(
        &self,
        Parameters(p): Parameters<FindNodeParams>,
    ) -> Result<CallToolResult, McpError> {
        let node_type = p.r#type.as_deref().map(MentionType::parse);
        match self
            .service
            .store()
            .find_nodes_by_name(&p.name, p.owner_id, node_type.as_ref())
        {
            Ok(nodes) => ok_json(&nodes),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "List the note mentions of a node, newest note first")]
    fn node_mentions(
        &self,
        Parameters(p): Parameters<NodeIdParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.service.store().mentions_for_node(p.node_id) {
            Ok(mentions) => ok_json(&mentions),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "List a node's co-mention links and containment relationships")]
    fn node_links(
        &self,
        Parameters(p): Parameters<NodeIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.service.store();
        let links = match store.links_from(p.node_id) {
            Ok(links) => links,
            Err(e) => return err_text(e.to_string()),
        };
        match store.relationships_for(p.node_id) {
            Ok(relationships) => ok_json(&serde_json::json!({
                "links": links,
                "relationships": relationships,
            })),
            Err(e) => err_text(e.to_string()),
        }
    }
}

#[tool_handler]
impl ServerHandler for LorelinkMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "lorelink MCP server: tags campaign notes into a graph of \
                 people, items, spells, monsters, and locations"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run_mcp_server(service: Arc<TagService>) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let server = LorelinkMcpServer::new(service);

        info!("lorelink mcp server starting on stdio...");

        let running = match server.serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                error!("failed to start MCP server: {}", e);
                return 1;
            }
        };

        if let Err(e) = running.waiting().await {
            error!("MCP server error: {}", e);
            return 1;
        }

        0
    })
}
