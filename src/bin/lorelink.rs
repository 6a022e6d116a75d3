//! lorelink CLI: campaign-note tagger with HTTP and MCP servers.
//!
//! Usage:
//!   lorelink serve [--host h] [--port p]
//!   lorelink mcp [--transport stdio]
//!   lorelink tag <text> --note-id N --owner-id N [--document file.json]
//!   lorelink vocab status|rebuild
//!   lorelink catalog add <table> <names...>
//!   lorelink node show <id> | find <name> --owner-id N [--type T]
//!
//! Every command accepts --config and --db.

use clap::{Parser, Subcommand};
use lorelink::{
    Config, Document, GraphStore, HeuristicAnalyzer, MentionType, OpenStore, SqliteStore,
    TagRequest, TagService,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lorelink",
    version,
    about = "Tags campaign notes into a graph of people, items, spells, monsters, and locations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to SQLite database file (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Start the MCP (Model Context Protocol) server
    Mcp {
        /// Transport type (currently only stdio)
        #[arg(long, default_value = "stdio")]
        transport: String,
    },
    /// Tag one note and print the tagged nodes
    Tag {
        /// Note text
        text: String,
        #[arg(long)]
        note_id: i64,
        #[arg(long)]
        owner_id: i64,
        /// Pre-analyzed document (JSON) to use instead of the built-in analyzer
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Inspect or rebuild the vocabulary index
    Vocab {
        #[command(subcommand)]
        action: VocabAction,
    },
    /// Manage catalog tables
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Query tagged nodes
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(Subcommand)]
enum VocabAction {
    /// Show phrase counts per label
    Status,
    /// Rebuild the index and report whether it succeeded
    Rebuild,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Add names to a catalog table
    Add {
        /// Table name, e.g. core_spells or bestiary
        table: String,
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
enum NodeAction {
    /// Show a node with its mentions, links, and relationships
    Show { id: i64 },
    /// Find an owner's nodes by name
    Find {
        name: String,
        #[arg(long)]
        owner_id: i64,
        #[arg(long = "type")]
        node_type: Option<String>,
    },
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn load_config(path: Option<&PathBuf>, db: Option<PathBuf>) -> Result<Config, String> {
    let mut config = Config::load(path.map(|p| p.as_path())).map_err(|e| e.to_string())?;
    if let Some(db) = db {
        config.database = db;
    }
    Ok(config)
}

fn open_store(config: &Config) -> Result<Arc<SqliteStore>, String> {
    let path = config.database_path();
    SqliteStore::open(&path)
        .map(Arc::new)
        .map_err(|e| format!("Failed to open database at {}: {}", path.display(), e))
}

fn open_service(config: &Config) -> Result<Arc<TagService>, String> {
    let store = open_store(config)?;
    Ok(Arc::new(TagService::new(
        store,
        Arc::new(HeuristicAnalyzer::new()),
        config.vocabulary.sources.clone(),
    )))
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_serve(config: &Config, service: Arc<TagService>) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            return 1;
        }
    };
    match rt.block_on(lorelink::http::serve(service, &config.server.bind_address())) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_tag(
    service: &TagService,
    text: String,
    note_id: i64,
    owner_id: i64,
    document: Option<PathBuf>,
) -> i32 {
    let mut request = TagRequest::new(text, note_id, owner_id);
    if let Some(path) = document {
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| Document::from_json(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(doc) => request = request.with_document(doc),
            Err(e) => {
                eprintln!("Error: failed to read document {}: {}", path.display(), e);
                return 1;
            }
        }
    }
    if owner_id <= 0 {
        eprintln!("Error: --owner-id must be positive");
        return 1;
    }

    match service.tag(&request) {
        Ok(tagged) => print_json(&tagged),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_vocab(service: &TagService, action: VocabAction) -> i32 {
    let status = match action {
        VocabAction::Status => service.status(),
        VocabAction::Rebuild => service.rebuild(),
    };
    match status {
        Ok(status) => {
            let code = print_json(&status);
            if status.ready {
                code
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_catalog_add(store: &SqliteStore, table: &str, names: &[String]) -> i32 {
    match store.add_catalog_terms(table, names) {
        Ok(added) => {
            println!("Added {} name(s) to {}", added, table);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[derive(Serialize)]
struct NodeDetail {
    node: lorelink::NodeRecord,
    mentions: Vec<lorelink::MentionRecord>,
    links: Vec<lorelink::CoMention>,
    relationships: Vec<lorelink::Containment>,
}

fn cmd_node(store: &SqliteStore, action: NodeAction) -> i32 {
    let result = match action {
        NodeAction::Show { id } => store.get_node(id).and_then(|node| {
            let Some(node) = node else {
                return Ok(None);
            };
            Ok(Some(NodeDetail {
                mentions: store.mentions_for_node(id)?,
                links: store.links_from(id)?,
                relationships: store.relationships_for(id)?,
                node,
            }))
        }),
        NodeAction::Find { name, owner_id, node_type } => {
            let node_type = node_type.as_deref().map(MentionType::parse);
            return match store.find_nodes_by_name(&name, owner_id, node_type.as_ref()) {
                Ok(nodes) => print_json(&nodes),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            };
        }
    };

    match result {
        Ok(Some(detail)) => print_json(&detail),
        Ok(None) => {
            eprintln!("Error: node not found");
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let mut config = match load_config(cli.config.as_ref(), cli.db) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config);

    let code = match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            match open_service(&config) {
                Ok(service) => cmd_serve(&config, service),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
        Commands::Mcp { transport } => {
            if transport != "stdio" {
                eprintln!("error: only 'stdio' transport is currently supported");
                std::process::exit(1);
            }
            match open_service(&config) {
                Ok(service) => lorelink::mcp::run_mcp_server(service),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
        Commands::Tag { text, note_id, owner_id, document } => match open_service(&config) {
            Ok(service) => cmd_tag(&service, text, note_id, owner_id, document),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Vocab { action } => match open_service(&config) {
            Ok(service) => cmd_vocab(&service, action),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Catalog {
            action: CatalogAction::Add { table, names },
        } => match open_store(&config) {
            Ok(store) => cmd_catalog_add(&store, &table, &names),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Node { action } => match open_store(&config) {
            Ok(store) => cmd_node(&store, action),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    std::process::exit(code);
}
