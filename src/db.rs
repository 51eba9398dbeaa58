use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::warn;

use crate::types::{Edge, FileRecord, Node, NodeKind};

/// Per-project storage directory at the project root.
pub const STORE_DIR: &str = ".codexray";
/// Database filename inside [`STORE_DIR`].
pub const DB_FILE: &str = "codexray.db";

/// Cap for fuzzy qualified-name lookups.
const FUZZY_LOOKUP_CAP: u32 = 20;

const SQL_UPSERT_NODE: &str = "INSERT INTO nodes
     (id, kind, name, qualified_name, file_path, start_line, end_line,
      language, signature, docstring, exported, complexity, metadata)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
     ON CONFLICT(id) DO UPDATE SET
       kind = excluded.kind,
       name = excluded.name,
       qualified_name = excluded.qualified_name,
       file_path = excluded.file_path,
       start_line = excluded.start_line,
       end_line = excluded.end_line,
       language = excluded.language,
       signature = excluded.signature,
       docstring = excluded.docstring,
       exported = excluded.exported,
       complexity = excluded.complexity,
       metadata = excluded.metadata";

const SQL_UPSERT_EDGE: &str = "INSERT OR REPLACE INTO edges
     (id, source_id, target_id, kind, metadata)
     VALUES (?1, ?2, ?3, ?4, ?5)";

pub(crate) const NODE_COLUMNS: &str = "id, kind, name, qualified_name, file_path, start_line, \
     end_line, language, signature, docstring, exported, complexity, metadata";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    hash TEXT NOT NULL,
    language TEXT NOT NULL,
    indexed_at INTEGER NOT NULL,
    symbol_count INTEGER NOT NULL DEFAULT 0,
    line_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    language TEXT NOT NULL,
    signature TEXT,
    docstring TEXT,
    exported INTEGER NOT NULL DEFAULT 0,
    complexity INTEGER NOT NULL DEFAULT 1,
    metadata TEXT
);

CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    metadata TEXT
);

CREATE TABLE IF NOT EXISTS node_tokens (
    node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    token TEXT NOT NULL,
    tf REAL NOT NULL,
    source TEXT NOT NULL,
    PRIMARY KEY (node_id, token, source)
);

CREATE TABLE IF NOT EXISTS token_idf (
    token TEXT PRIMARY KEY,
    idf REAL NOT NULL,
    df INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name);
CREATE INDEX IF NOT EXISTS idx_nodes_qualified ON nodes(qualified_name);
CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);
CREATE INDEX IF NOT EXISTS idx_nodes_file ON nodes(file_path);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_kind ON edges(kind);
CREATE INDEX IF NOT EXISTS idx_tokens_token ON node_tokens(token);

CREATE VIRTUAL TABLE IF NOT EXISTS node_fts USING fts5(
    name, qualified_name, signature, docstring,
    content='nodes',
    tokenize='unicode61 remove_diacritics 2'
);

CREATE TRIGGER IF NOT EXISTS nodes_fts_ai AFTER INSERT ON nodes BEGIN
    INSERT INTO node_fts(rowid, name, qualified_name, signature, docstring)
    VALUES (new.rowid, new.name, new.qualified_name, new.signature, new.docstring);
END;

CREATE TRIGGER IF NOT EXISTS nodes_fts_ad AFTER DELETE ON nodes BEGIN
    INSERT INTO node_fts(node_fts, rowid, name, qualified_name, signature, docstring)
    VALUES ('delete', old.rowid, old.name, old.qualified_name, old.signature, old.docstring);
END;

CREATE TRIGGER IF NOT EXISTS nodes_fts_au AFTER UPDATE ON nodes BEGIN
    INSERT INTO node_fts(node_fts, rowid, name, qualified_name, signature, docstring)
    VALUES ('delete', old.rowid, old.name, old.qualified_name, old.signature, old.docstring);
    INSERT INTO node_fts(rowid, name, qualified_name, signature, docstring)
    VALUES (new.rowid, new.name, new.qualified_name, new.signature, new.docstring);
END;
"#;

/// Persistent graph store: nodes, edges, file records, the FTS5 keyword
/// index (kept in sync by triggers) and the TF-IDF tables.
pub struct Store {
    pub(crate) conn: Connection,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open or create the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open store")?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA synchronous=NORMAL;
             PRAGMA cache_size=-65536;
             PRAGMA temp_store=MEMORY;
             PRAGMA mmap_size=268435456;",
        )
        .context("Failed to set pragmas")?;
        conn.execute_batch(SCHEMA).context("Failed to create schema")?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (for tests and benchmarks).
    #[doc(hidden)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Database path for a project root.
    pub fn db_path(root: &Path) -> std::path::PathBuf {
        root.join(STORE_DIR).join(DB_FILE)
    }

    /// Open the store for a project root, failing with guidance when the
    /// storage directory has not been initialized.
    pub fn open_project(root: &Path) -> Result<Self> {
        let path = Self::db_path(root);
        if !path.exists() {
            anyhow::bail!(
                "no {STORE_DIR}/ found in {} — run `codexray init` first",
                root.display()
            );
        }
        Self::open(path)
    }

    // ── Nodes ──

    /// Insert or update a single node (idempotent on id). The rowid is kept
    /// stable on conflict so the keyword index mapping survives.
    pub fn upsert_node(&self, node: &Node) -> Result<()> {
        self.conn.prepare_cached(SQL_UPSERT_NODE)?.execute(params![
            node.id,
            node.kind.as_str(),
            node.name,
            node.qualified_name,
            node.file_path,
            node.start_line,
            node.end_line,
            node.language,
            node.signature,
            node.docstring,
            node.exported,
            node.complexity,
            node.metadata.as_ref().map(|m| m.to_string()),
        ])?;
        Ok(())
    }

    /// Upsert multiple nodes in a single transaction.
    pub fn upsert_nodes(&self, nodes: &[Node]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = self.conn.prepare_cached(SQL_UPSERT_NODE)?;
            for node in nodes {
                stmt.execute(params![
                    node.id,
                    node.kind.as_str(),
                    node.name,
                    node.qualified_name,
                    node.file_path,
                    node.start_line,
                    node.end_line,
                    node.language,
                    node.signature,
                    node.docstring,
                    node.exported,
                    node.complexity,
                    node.metadata.as_ref().map(|m| m.to_string()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_node(&self, id: &str) -> Result<Option<Node>> {
        self.conn
            .prepare_cached(&format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1"))?
            .query_row(params![id], row_to_node)
            .optional()
            .context("Failed to query node")
    }

    /// Tiered name lookup: exact `name`, then exact `qualified_name`, then
    /// `qualified_name LIKE %name%` capped at 20. Each tier is ordered
    /// `exported DESC, file_path ASC` for deterministic disambiguation.
    pub fn get_nodes_by_name(&self, name: &str, kind: Option<NodeKind>) -> Result<Vec<Node>> {
        let kind_str = kind.map(|k| k.as_str());

        let exact = self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE name = ?1 AND (?2 IS NULL OR kind = ?2)
                 ORDER BY exported DESC, file_path ASC"
            ),
            params![name, kind_str],
        )?;
        if !exact.is_empty() {
            return Ok(exact);
        }

        let qualified = self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE qualified_name = ?1 AND (?2 IS NULL OR kind = ?2)
                 ORDER BY exported DESC, file_path ASC"
            ),
            params![name, kind_str],
        )?;
        if !qualified.is_empty() {
            return Ok(qualified);
        }

        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE qualified_name LIKE '%' || ?1 || '%' AND (?2 IS NULL OR kind = ?2)
                 ORDER BY exported DESC, file_path ASC
                 LIMIT {FUZZY_LOOKUP_CAP}"
            ),
            params![name, kind_str],
        )
    }

    pub fn get_nodes_by_file(&self, file_path: &str) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes WHERE file_path = ?1 ORDER BY start_line"
            ),
            params![file_path],
        )
    }

    pub fn delete_nodes_by_file(&self, file_path: &str) -> Result<()> {
        // Edge and token rows cascade; the FTS delete trigger fires per node.
        self.conn
            .execute("DELETE FROM nodes WHERE file_path = ?1", params![file_path])?;
        Ok(())
    }

    /// Remove every edge with either endpoint in the file.
    pub fn delete_edges_by_file(&self, file_path: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM edges WHERE source_id IN (SELECT id FROM nodes WHERE file_path = ?1)
                OR target_id IN (SELECT id FROM nodes WHERE file_path = ?1)",
            params![file_path],
        )?;
        Ok(())
    }

    // ── Edges ──

    pub fn upsert_edge(&self, edge: &Edge) -> Result<()> {
        self.conn.prepare_cached(SQL_UPSERT_EDGE)?.execute(params![
            edge.id,
            edge.source_id,
            edge.target_id,
            edge.kind.as_str(),
            edge.metadata.as_ref().map(|m| m.to_string()),
        ])?;
        Ok(())
    }

    pub fn upsert_edges(&self, edges: &[Edge]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = self.conn.prepare_cached(SQL_UPSERT_EDGE)?;
            for edge in edges {
                stmt.execute(params![
                    edge.id,
                    edge.source_id,
                    edge.target_id,
                    edge.kind.as_str(),
                    edge.metadata.as_ref().map(|m| m.to_string()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace everything derived from one file under a single transaction:
    /// prior nodes and any edge touching them go away, the fresh extraction
    /// and the file record land atomically.
    pub fn replace_file_data(
        &self,
        record: &FileRecord,
        nodes: &[Node],
        edges: &[Edge],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        self.conn.execute(
            "DELETE FROM edges WHERE source_id IN (SELECT id FROM nodes WHERE file_path = ?1)
                OR target_id IN (SELECT id FROM nodes WHERE file_path = ?1)",
            params![record.path],
        )?;
        self.conn.execute(
            "DELETE FROM nodes WHERE file_path = ?1",
            params![record.path],
        )?;

        {
            let mut node_stmt = self.conn.prepare_cached(SQL_UPSERT_NODE)?;
            for node in nodes {
                node_stmt.execute(params![
                    node.id,
                    node.kind.as_str(),
                    node.name,
                    node.qualified_name,
                    node.file_path,
                    node.start_line,
                    node.end_line,
                    node.language,
                    node.signature,
                    node.docstring,
                    node.exported,
                    node.complexity,
                    node.metadata.as_ref().map(|m| m.to_string()),
                ])?;
            }
            let mut edge_stmt = self.conn.prepare_cached(SQL_UPSERT_EDGE)?;
            for edge in edges {
                edge_stmt.execute(params![
                    edge.id,
                    edge.source_id,
                    edge.target_id,
                    edge.kind.as_str(),
                    edge.metadata.as_ref().map(|m| m.to_string()),
                ])?;
            }
        }

        self.conn.execute(
            "INSERT OR REPLACE INTO files (path, hash, language, indexed_at, symbol_count, line_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.path,
                record.hash,
                record.language,
                record.indexed_at,
                record.symbol_count,
                record.line_count,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ── Keyword search ──

    /// Keyword search over name, qualified name, signature and docstring.
    ///
    /// The query is sanitized to word characters plus spaces, matched against
    /// the FTS5 index with per-term prefix queries and ranked by bm25. When
    /// the full-text engine rejects the query anyway, falls back to a plain
    /// `LIKE` scan — that path is never surfaced as an error.
    pub fn search_nodes(
        &self,
        query: &str,
        kind: Option<NodeKind>,
        limit: u32,
    ) -> Result<Vec<Node>> {
        let sanitized: String = query
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
            .collect();
        let terms: Vec<&str> = sanitized.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let match_expr = terms
            .iter()
            .map(|t| format!("\"{t}\"*"))
            .collect::<Vec<_>>()
            .join(" ");
        let kind_str = kind.map(|k| k.as_str());

        let fts = self.query_nodes(
            &format!(
                "SELECT {} FROM node_fts
                 JOIN nodes n ON n.rowid = node_fts.rowid
                 WHERE node_fts MATCH ?1 AND (?2 IS NULL OR n.kind = ?2)
                 ORDER BY node_fts.rank, n.id
                 LIMIT ?3",
                prefixed_columns("n")
            ),
            params![match_expr, kind_str, limit],
        );

        match fts {
            Ok(nodes) => Ok(nodes),
            Err(e) => {
                warn!(error = %e, query = %query, "keyword index rejected query, using LIKE fallback");
                let like = format!("%{}%", sanitized.trim());
                self.query_nodes(
                    &format!(
                        "SELECT {NODE_COLUMNS} FROM nodes
                         WHERE (name LIKE ?1 OR qualified_name LIKE ?1)
                           AND (?2 IS NULL OR kind = ?2)
                         ORDER BY exported DESC, file_path ASC
                         LIMIT ?3"
                    ),
                    params![like, kind_str, limit],
                )
            }
        }
    }

    // ── Files ──

    pub fn upsert_file(&self, file: &FileRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO files (path, hash, language, indexed_at, symbol_count, line_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                file.path,
                file.hash,
                file.language,
                file.indexed_at,
                file.symbol_count,
                file.line_count,
            ],
        )?;
        Ok(())
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        self.conn
            .query_row(
                "SELECT path, hash, language, indexed_at, symbol_count, line_count
                 FROM files WHERE path = ?1",
                params![path],
                row_to_file,
            )
            .optional()
            .context("Failed to query file")
    }

    /// Remove a file record along with all its nodes and any edge touching
    /// them.
    pub fn remove_file(&self, path: &str) -> Result<()> {
        self.delete_edges_by_file(path)?;
        self.delete_nodes_by_file(path)?;
        self.conn
            .execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(())
    }

    /// All indexed file paths, sorted.
    pub fn all_files(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM files ORDER BY path")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Returns `true` if at least one file has been indexed.
    pub fn has_indexed_files(&self) -> Result<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM files LIMIT 1", [], |_| Ok(()))
            .optional()?
            .is_some())
    }

    pub fn get_file_tree(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, hash, language, indexed_at, symbol_count, line_count
             FROM files ORDER BY path",
        )?;
        let rows = stmt
            .query_map([], row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Aggregations ──

    pub fn get_stats(&self) -> Result<StoreStats> {
        let num_files: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        let num_nodes: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        let num_edges: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        let num_tokens: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM token_idf",
            [],
            |row| row.get(0),
        )?;
        let total_lines: u64 = self.conn.query_row(
            "SELECT COALESCE(SUM(line_count), 0) FROM files",
            [],
            |row| row.get(0),
        )?;

        let mut lang_stmt = self.conn.prepare(
            "SELECT language, COUNT(*) FROM files GROUP BY language ORDER BY COUNT(*) DESC, language",
        )?;
        let languages: Vec<(String, u32)> = lang_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut kind_stmt = self.conn.prepare(
            "SELECT kind, COUNT(*) FROM nodes GROUP BY kind ORDER BY COUNT(*) DESC, kind",
        )?;
        let node_kinds: Vec<(String, u32)> = kind_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(StoreStats {
            num_files,
            num_nodes,
            num_edges,
            num_tokens,
            total_lines,
            languages,
            node_kinds,
        })
    }

    // ── Maintenance ──

    /// Drop all indexed data, keeping the schema.
    pub fn reset(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute("DELETE FROM edges", [])?;
        self.conn.execute("DELETE FROM node_tokens", [])?;
        self.conn.execute("DELETE FROM token_idf", [])?;
        self.conn.execute("DELETE FROM nodes", [])?;
        self.conn.execute("DELETE FROM files", [])?;
        tx.commit()?;
        Ok(())
    }

    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute("VACUUM", [])?;
        Ok(())
    }

    /// Close the underlying connection, flushing WAL state.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| anyhow::Error::from(e).context("Failed to close store"))
    }

    // ── Internal ──

    pub(crate) fn query_nodes(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, row_to_node)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Index-wide statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub num_files: u32,
    pub num_nodes: u32,
    pub num_edges: u32,
    pub num_tokens: u32,
    pub total_lines: u64,
    pub languages: Vec<(String, u32)>,
    pub node_kinds: Vec<(String, u32)>,
}

fn prefixed_columns(alias: &str) -> String {
    NODE_COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Row mapping helpers ──

pub(crate) fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    let kind_str = row.get::<_, String>(1)?;
    let kind = kind_str.parse().unwrap_or_else(|_| {
        warn!(kind = %kind_str, "unknown node kind, defaulting to variable");
        NodeKind::Variable
    });

    let metadata = row
        .get::<_, Option<String>>(12)?
        .and_then(|m| serde_json::from_str(&m).ok());

    Ok(Node {
        id: row.get(0)?,
        kind,
        name: row.get(2)?,
        qualified_name: row.get(3)?,
        file_path: row.get(4)?,
        start_line: row.get(5)?,
        end_line: row.get(6)?,
        language: row.get(7)?,
        signature: row.get(8)?,
        docstring: row.get(9)?,
        exported: row.get(10)?,
        complexity: row.get(11)?,
        metadata,
    })
}

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        path: row.get(0)?,
        hash: row.get(1)?,
        language: row.get(2)?,
        indexed_at: row.get(3)?,
        symbol_count: row.get(4)?,
        line_count: row.get(5)?,
    })
}

#[cfg(test)]
pub(crate) fn test_node(name: &str, kind: NodeKind, file: &str, line: u32) -> Node {
    Node::new(name, kind, file, line, line + 5, "typescript")
}
