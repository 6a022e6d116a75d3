//! SQLite storage backend for lorelink

use super::traits::{
    GraphCursor, GraphStats, GraphStore, NodeInsert, OpenStore, StorageError, StorageResult,
    VocabularyStore,
};
use crate::graph::{name_key, CoMention, Containment, MentionRecord, NodeId, NodeRecord, OwnerId};
use crate::taxonomy::{MentionType, Provenance};
use crate::vocabulary::{is_plain_identifier, VocabularySource};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Catalog tables the default vocabulary reads from.
pub const CATALOG_TABLES: [&str; 5] = [
    "core_names",
    "core_items",
    "core_tools",
    "core_spells",
    "bestiary",
];

const NODE_COLUMNS: &str = "id, name, type, owner, created_at";
const MENTION_COLUMNS: &str =
    "node_id, note_id, start_pos, end_pos, mention_type, source, confidence";

type NodeColumns = (NodeId, String, String, OwnerId, String);
type MentionColumns = (NodeId, i64, i64, i64, String, String, f64);

/// SQLite-backed graph store
///
/// One database file holds the tagged graph and the catalog tables.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                name_key TEXT NOT NULL,
                type TEXT NOT NULL,
                owner INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Node identity; concurrent creators of one node collide here
            CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_identity
                ON nodes(name_key, type, owner);
            CREATE INDEX IF NOT EXISTS idx_nodes_type
                ON nodes(type);

            CREATE TABLE IF NOT EXISTS note_mentions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                node_id INTEGER NOT NULL REFERENCES nodes(id),
                note_id INTEGER NOT NULL,
                start_pos INTEGER NOT NULL,
                end_pos INTEGER NOT NULL,
                mention_type TEXT NOT NULL,
                source TEXT NOT NULL,
                confidence REAL NOT NULL,
                UNIQUE (node_id, note_id, start_pos, end_pos)
            );

            CREATE TABLE IF NOT EXISTS node_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_node_id INTEGER NOT NULL REFERENCES nodes(id),
                target_node_id INTEGER NOT NULL REFERENCES nodes(id),
                note_id INTEGER NOT NULL,
                UNIQUE (source_node_id, target_node_id, note_id)
            );

            CREATE TABLE IF NOT EXISTS node_relationships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_node_id INTEGER NOT NULL REFERENCES nodes(id),
                child_node_id INTEGER NOT NULL REFERENCES nodes(id),
                relationship_type TEXT NOT NULL,
                note_id INTEGER NOT NULL,
                UNIQUE (parent_node_id, child_node_id, relationship_type, note_id)
            );
            CREATE INDEX IF NOT EXISTS idx_relationships_child
                ON node_relationships(child_node_id);

            CREATE TABLE IF NOT EXISTS core_names (name TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS core_items (name TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS core_tools (name TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS core_spells (name TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS bestiary (name TEXT NOT NULL);

            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Run `f` inside one transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// This is the only place graph writes are committed. The transaction
    /// takes the write lock when it begins, so another connection's
    /// transaction waits (up to the busy timeout) and then sees every node
    /// this one created.
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&mut SqliteCursor<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        let mut cursor = SqliteCursor { conn: &tx };
        match f(&mut cursor) {
            Ok(value) => {
                tx.commit().map_err(StorageError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Append names to a catalog table, skipping blanks and names already present.
    ///
    /// Returns the number of rows added.
    pub fn add_catalog_terms<S: AsRef<str>>(
        &self,
        table: &str,
        names: &[S],
    ) -> StorageResult<usize> {
        if !is_plain_identifier(table) {
            return Err(StorageError::InvalidIdentifier(table.to_string()));
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut added = 0;
        {
            let sql = format!(
                "INSERT INTO \"{t}\" (name) SELECT ?1
                 WHERE NOT EXISTS (SELECT 1 FROM \"{t}\" WHERE name = ?1)",
                t = table
            );
            let mut stmt = tx.prepare(&sql)?;
            for name in names {
                let name = name.as_ref().trim();
                if name.is_empty() {
                    continue;
                }
                added += stmt.execute(params![name])?;
            }
        }
        tx.commit()?;
        debug!(table, added, "catalog terms added");
        Ok(added)
    }

    fn row_to_node(row: &Row<'_>) -> rusqlite::Result<NodeColumns> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    fn node_from_columns(columns: NodeColumns) -> StorageResult<NodeRecord> {
        let (id, name, node_type, owner, created_at) = columns;
        Ok(NodeRecord {
            id,
            name,
            node_type: MentionType::parse(&node_type),
            owner,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_mention(row: &Row<'_>) -> rusqlite::Result<MentionColumns> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn mention_from_columns(columns: MentionColumns) -> StorageResult<MentionRecord> {
        let (node_id, note_id, start_pos, end_pos, mention_type, source, confidence) = columns;
        let source = Provenance::parse(&source)
            .ok_or_else(|| StorageError::Schema(format!("unknown mention source '{}'", source)))?;
        Ok(MentionRecord {
            node_id,
            note_id,
            start_pos: start_pos as usize,
            end_pos: end_pos as usize,
            mention_type: MentionType::parse(&mention_type),
            source,
            confidence,
        })
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Schema(format!("bad created_at '{}': {}", value, e)))
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl VocabularyStore for SqliteStore {
    fn fetch_terms(&self, source: &VocabularySource) -> StorageResult<Vec<String>> {
        if let Some(bad) = source.invalid_identifier() {
            return Err(StorageError::InvalidIdentifier(bad.to_string()));
        }

        let mut sql = format!(
            "SELECT DISTINCT CAST(\"{col}\" AS TEXT) FROM \"{table}\" WHERE \"{col}\" IS NOT NULL",
            col = source.column,
            table = source.table
        );
        if let Some(filter) = &source.filter {
            sql.push_str(&format!(" AND \"{}\" = ?1", filter.column));
        }

        let filter_value: Vec<&dyn rusqlite::ToSql> = match &source.filter {
            Some(filter) => vec![&filter.value],
            None => Vec::new(),
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(filter_value.as_slice(), |row| row.get::<_, String>(0))?;

        let mut terms = Vec::new();
        for term in rows {
            let term = term?;
            if !term.trim().is_empty() {
                terms.push(term);
            }
        }
        Ok(terms)
    }
}

/// Graph writes against an open transaction.
pub struct SqliteCursor<'a> {
    conn: &'a Connection,
}

const FIND_NODE_SQL: &str = "SELECT id FROM nodes WHERE name_key = ?1 AND type = ?2 AND owner = ?3";

impl GraphCursor for SqliteCursor<'_> {
    fn find_node(
        &mut self,
        name: &str,
        node_type: &MentionType,
        owner: OwnerId,
    ) -> StorageResult<Option<NodeId>> {
        let id = self
            .conn
            .query_row(
                FIND_NODE_SQL,
                params![name_key(name), node_type.as_str(), owner],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_node(
        &mut self,
        name: &str,
        node_type: &MentionType,
        owner: OwnerId,
    ) -> StorageResult<NodeInsert> {
        let key = name_key(name);
        let inserted = self.conn.execute(
            "INSERT INTO nodes (name, name_key, type, owner, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT DO NOTHING",
            params![
                name.trim(),
                key,
                node_type.as_str(),
                owner,
                Utc::now().to_rfc3339()
            ],
        )?;

        if inserted > 0 {
            return Ok(NodeInsert::Created(self.conn.last_insert_rowid()));
        }

        // Another writer committed this identity first; its row is the node
        let id = self.conn.query_row(
            FIND_NODE_SQL,
            params![key, node_type.as_str(), owner],
            |row| row.get(0),
        )?;
        Ok(NodeInsert::Existing(id))
    }

    fn insert_mention(&mut self, mention: &MentionRecord) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO note_mentions
             (node_id, note_id, start_pos, end_pos, mention_type, source, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (node_id, note_id, start_pos, end_pos) DO NOTHING",
            params![
                mention.node_id,
                mention.note_id,
                mention.start_pos as i64,
                mention.end_pos as i64,
                mention.mention_type.as_str(),
                mention.source.as_str(),
                mention.confidence,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn insert_link(&mut self, link: &CoMention) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO node_links (source_node_id, target_node_id, note_id) VALUES (?1, ?2, ?3)
             ON CONFLICT (source_node_id, target_node_id, note_id) DO NOTHING",
            params![link.source_node_id, link.target_node_id, link.note_id],
        )?;
        Ok(inserted > 0)
    }

    fn insert_relationship(&mut self, relationship: &Containment) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO node_relationships
             (parent_node_id, child_node_id, relationship_type, note_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (parent_node_id, child_node_id, relationship_type, note_id) DO NOTHING",
            params![
                relationship.parent_node_id,
                relationship.child_node_id,
                relationship.relationship_type,
                relationship.note_id,
            ],
        )?;
        Ok(inserted > 0)
    }
}

impl GraphStore for SqliteStore {
    fn get_node(&self, id: NodeId) -> StorageResult<Option<NodeRecord>> {
        let conn = self.lock()?;
        let columns = conn
            .query_row(
                &format!("SELECT {} FROM nodes WHERE id = ?1", NODE_COLUMNS),
                params![id],
                Self::row_to_node,
            )
            .optional()?;

        columns.map(Self::node_from_columns).transpose()
    }

    fn find_nodes_by_name(
        &self,
        name: &str,
        owner: OwnerId,
        node_type: Option<&MentionType>,
    ) -> StorageResult<Vec<NodeRecord>> {
        let conn = self.lock()?;
        let mut sql = format!(
            "SELECT {} FROM nodes WHERE name_key = ?1 AND owner = ?2",
            NODE_COLUMNS
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(name_key(name)), Box::new(owner)];

        if let Some(node_type) = node_type {
            sql.push_str(" AND type = ?3");
            params_vec.push(Box::new(node_type.as_str().to_string()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), Self::row_to_node)?;

        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(Self::node_from_columns(row?)?);
        }
        Ok(nodes)
    }

    fn mentions_for_node(&self, id: NodeId) -> StorageResult<Vec<MentionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM note_mentions WHERE node_id = ?1 ORDER BY note_id DESC, start_pos",
            MENTION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![id], Self::row_to_mention)?;

        let mut mentions = Vec::new();
        for row in rows {
            mentions.push(Self::mention_from_columns(row?)?);
        }
        Ok(mentions)
    }

    fn links_from(&self, id: NodeId) -> StorageResult<Vec<CoMention>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT source_node_id, target_node_id, note_id FROM node_links
             WHERE source_node_id = ?1 ORDER BY note_id, target_node_id",
        )?;
        let links = stmt
            .query_map(params![id], |row| {
                Ok(CoMention {
                    source_node_id: row.get(0)?,
                    target_node_id: row.get(1)?,
                    note_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    fn relationships_for(&self, id: NodeId) -> StorageResult<Vec<Containment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT parent_node_id, child_node_id, relationship_type, note_id
             FROM node_relationships
             WHERE parent_node_id = ?1 OR child_node_id = ?1
             ORDER BY note_id, parent_node_id, child_node_id",
        )?;
        let relationships = stmt
            .query_map(params![id], |row| {
                Ok(Containment {
                    parent_node_id: row.get(0)?,
                    child_node_id: row.get(1)?,
                    relationship_type: row.get(2)?,
                    note_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relationships)
    }

    fn stats(&self, owner: Option<OwnerId>) -> StorageResult<GraphStats> {
        let conn = self.lock()?;
        // NULL owner counts every tenant
        let count = |sql: &str| -> StorageResult<u64> {
            let n: i64 = conn.query_row(sql, params![owner], |row| row.get(0))?;
            Ok(n as u64)
        };

        Ok(GraphStats {
            nodes: count("SELECT COUNT(*) FROM nodes WHERE ?1 IS NULL OR owner = ?1")?,
            mentions: count(
                "SELECT COUNT(*) FROM note_mentions m JOIN nodes n ON n.id = m.node_id
                 WHERE ?1 IS NULL OR n.owner = ?1",
            )?,
            links: count(
                "SELECT COUNT(*) FROM node_links l JOIN nodes n ON n.id = l.source_node_id
                 WHERE ?1 IS NULL OR n.owner = ?1",
            )?,
            relationships: count(
                "SELECT COUNT(*) FROM node_relationships r JOIN nodes n ON n.id = r.parent_node_id
                 WHERE ?1 IS NULL OR n.owner = ?1",
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Label;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn spell() -> MentionType {
        Label::Spell.into()
    }

    fn mention(node_id: NodeId, note_id: i64, start: usize, end: usize) -> MentionRecord {
        MentionRecord {
            node_id,
            note_id,
            start_pos: start,
            end_pos: end,
            mention_type: spell(),
            source: Provenance::Exact,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_insert_node_is_idempotent_per_identity() {
        let store = create_test_store();
        let (first, second) = store
            .with_transaction(|cursor| -> StorageResult<_> {
                let first = cursor.insert_node("Fireball", &spell(), 1)?;
                let second = cursor.insert_node("FIREBALL", &spell(), 1)?;
                Ok((first, second))
            })
            .unwrap();

        assert!(first.is_created());
        assert_eq!(second, NodeInsert::Existing(first.id()));
        assert_eq!(store.stats(None).unwrap().nodes, 1);
    }

    #[test]
    fn test_find_node_is_case_insensitive_and_scoped() {
        let store = create_test_store();
        store
            .with_transaction(|cursor| -> StorageResult<()> {
                let id = cursor.insert_node("Sunken Keep", &Label::Location.into(), 1)?.id();
                assert_eq!(cursor.find_node("sunken keep", &Label::Location.into(), 1)?, Some(id));
                assert_eq!(cursor.find_node("sunken keep", &Label::Location.into(), 2)?, None);
                assert_eq!(cursor.find_node("sunken keep", &Label::Person.into(), 1)?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_node_identity_folds_non_ascii_case() {
        let store = create_test_store();
        let first = store
            .with_transaction(|cursor| cursor.insert_node("Zoë", &Label::Person.into(), 1))
            .unwrap();
        let (found, second) = store
            .with_transaction(|cursor| -> StorageResult<_> {
                let found = cursor.find_node("ZOË", &Label::Person.into(), 1)?;
                let second = cursor.insert_node("ZOË", &Label::Person.into(), 1)?;
                Ok((found, second))
            })
            .unwrap();

        assert_eq!(found, Some(first.id()));
        assert_eq!(second, NodeInsert::Existing(first.id()));

        let by_name = store.find_nodes_by_name("zoë", 1, None).unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Zoë");
    }

    #[test]
    fn test_duplicate_mentions_links_and_relationships_are_noops() {
        let store = create_test_store();
        store
            .with_transaction(|cursor| -> StorageResult<()> {
                let a = cursor.insert_node("Aria", &Label::Person.into(), 1)?.id();
                let keep = cursor.insert_node("Keep", &Label::Location.into(), 1)?.id();

                assert!(cursor.insert_mention(&mention(a, 10, 0, 4))?);
                assert!(!cursor.insert_mention(&mention(a, 10, 0, 4))?);

                let link = CoMention {
                    source_node_id: a,
                    target_node_id: keep,
                    note_id: 10,
                };
                assert!(cursor.insert_link(&link)?);
                assert!(!cursor.insert_link(&link)?);
                assert!(cursor.insert_link(&link.reversed())?);

                let rel = Containment::located_in(keep, a, 10);
                assert!(cursor.insert_relationship(&rel)?);
                assert!(!cursor.insert_relationship(&rel)?);
                Ok(())
            })
            .unwrap();

        let stats = store.stats(Some(1)).unwrap();
        assert_eq!(
            stats,
            GraphStats {
                nodes: 2,
                mentions: 1,
                links: 2,
                relationships: 1
            }
        );
    }

    #[test]
    fn test_failed_transaction_rolls_back_every_write() {
        let store = create_test_store();
        let result = store.with_transaction(|cursor| -> StorageResult<()> {
            let id = cursor.insert_node("Owlbear", &Label::Monster.into(), 1)?.id();
            cursor.insert_mention(&mention(id, 5, 0, 7))?;
            Err(StorageError::Schema("simulated failure".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.stats(None).unwrap(), GraphStats::default());
    }

    #[test]
    fn test_read_queries() {
        let store = create_test_store();
        let (aria, keep) = store
            .with_transaction(|cursor| -> StorageResult<_> {
                let aria = cursor.insert_node("Aria", &Label::Person.into(), 1)?.id();
                let keep = cursor.insert_node("Sunken Keep", &Label::Location.into(), 1)?.id();
                cursor.insert_node("Aria", &Label::Person.into(), 2)?;
                cursor.insert_mention(&mention(aria, 3, 0, 4))?;
                cursor.insert_mention(&mention(aria, 9, 12, 16))?;
                cursor.insert_link(&CoMention {
                    source_node_id: aria,
                    target_node_id: keep,
                    note_id: 3,
                })?;
                cursor.insert_relationship(&Containment::located_in(keep, aria, 3))?;
                Ok((aria, keep))
            })
            .unwrap();

        let node = store.get_node(aria).unwrap().unwrap();
        assert_eq!(node.name, "Aria");
        assert_eq!(node.node_type, MentionType::from(Label::Person));
        assert!(store.get_node(9999).unwrap().is_none());

        let found = store.find_nodes_by_name("ARIA", 1, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, aria);
        assert!(store
            .find_nodes_by_name("aria", 1, Some(&Label::Location.into()))
            .unwrap()
            .is_empty());

        let mentions = store.mentions_for_node(aria).unwrap();
        assert_eq!(mentions.iter().map(|m| m.note_id).collect::<Vec<_>>(), vec![9, 3]);
        assert_eq!(mentions[0].source, Provenance::Exact);

        assert_eq!(store.links_from(aria).unwrap().len(), 1);
        assert!(store.links_from(keep).unwrap().is_empty());
        assert_eq!(store.relationships_for(aria).unwrap(), store.relationships_for(keep).unwrap());

        assert_eq!(store.stats(Some(2)).unwrap().nodes, 1);
        assert_eq!(store.stats(None).unwrap().nodes, 3);
    }

    #[test]
    fn test_fetch_terms_distinct_non_blank() {
        let store = create_test_store();
        store
            .add_catalog_terms("core_spells", &["Fireball", "Shield", "  ", "Fireball"])
            .unwrap();

        let mut terms = store
            .fetch_terms(&VocabularySource::new("core_spells", "name"))
            .unwrap();
        terms.sort();
        assert_eq!(terms, vec!["Fireball", "Shield"]);
    }

    #[test]
    fn test_fetch_terms_applies_filter() {
        let store = create_test_store();
        store
            .with_transaction(|cursor| -> StorageResult<()> {
                cursor.insert_node("Waterdeep", &Label::Location.into(), 1)?;
                cursor.insert_node("Aria", &Label::Person.into(), 1)?;
                Ok(())
            })
            .unwrap();

        let source = VocabularySource::new("nodes", "name").with_filter("type", "LOCATION");
        assert_eq!(store.fetch_terms(&source).unwrap(), vec!["Waterdeep"]);
    }

    #[test]
    fn test_fetch_terms_missing_table_fails() {
        let store = create_test_store();
        let err = store
            .fetch_terms(&VocabularySource::new("no_such_table", "name"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
    }

    #[test]
    fn test_fetch_terms_rejects_injected_identifier() {
        let store = create_test_store();
        let err = store
            .fetch_terms(&VocabularySource::new("nodes\"; DROP TABLE nodes; --", "name"))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_add_catalog_terms_rejects_bad_table() {
        let store = create_test_store();
        assert!(matches!(
            store.add_catalog_terms("bad table", &["x"]),
            Err(StorageError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_catalog_tables_exist_on_open() {
        let store = create_test_store();
        for table in CATALOG_TABLES {
            assert!(store.fetch_terms(&VocabularySource::new(table, "name")).unwrap().is_empty());
        }
    }

    #[test]
    fn test_wal_mode_enabled_at_connection() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test-wal.db");
        let store = SqliteStore::open(&db_path).unwrap();

        let journal_mode: String = store
            .conn
            .lock()
            .unwrap()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();

        assert_eq!(journal_mode, "wal");
    }

    #[test]
    fn test_concurrent_creator_waits_and_reuses_the_node() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("race.db");
        let store_a = SqliteStore::open(&db_path).unwrap();
        let store_b = SqliteStore::open(&db_path).unwrap();
        let monster = MentionType::from(Label::Monster);

        let (a, racer) = store_a
            .with_transaction(|cursor| -> StorageResult<_> {
                assert_eq!(cursor.find_node("Tiamat", &monster, 1)?, None);

                // B starts its own lookup-then-insert while A holds the write lock
                let racer = std::thread::spawn(move || {
                    store_b.with_transaction(|cursor| -> StorageResult<_> {
                        let seen = cursor.find_node("tiamat", &Label::Monster.into(), 1)?;
                        let insert = cursor.insert_node("tiamat", &Label::Monster.into(), 1)?;
                        Ok((seen, insert))
                    })
                });
                std::thread::sleep(Duration::from_millis(100));

                let a = cursor.insert_node("Tiamat", &monster, 1)?;
                Ok((a, racer))
            })
            .unwrap();
        let (seen, b) = racer.join().unwrap().unwrap();

        assert!(a.is_created());
        assert_eq!(seen, Some(a.id()));
        assert_eq!(b, NodeInsert::Existing(a.id()));
        assert_eq!(store_a.stats(None).unwrap().nodes, 1);
    }
}
