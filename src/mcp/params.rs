//! MCP tool parameter structs with schemars-derived JSON schemas.

use schemars::JsonSchema;
use serde::Deserialize;

// ── Tagging params ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TagNoteParams {
    #[schemars(description = "Full text of the note")]
    pub text: String,
    #[schemars(description = "Id of the note the text belongs to")]
    pub note_id: i64,
    #[schemars(description = "Owner (tenant) id; must be positive")]
    pub owner_id: i64,
}

// ── Node params ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NodeIdParams {
    #[schemars(description = "The node ID")]
    pub node_id: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindNodeParams {
    #[schemars(description = "Node name, matched case-insensitively")]
    pub name: String,
    #[schemars(description = "Owner (tenant) id")]
    pub owner_id: i64,
    #[schemars(description = "Restrict to one type, e.g. PERSON or LOCATION")]
    pub r#type: Option<String>,
}
