//! TF-IDF semantic index.
//!
//! Two tables: `node_tokens` holds per-(node, token, source-field) term
//! frequencies, `token_idf` the corpus-wide rarity of each token. The tables
//! are rebuilt wholesale after every index/sync pass inside one transaction;
//! scoring happens in memory at query time.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use rusqlite::params;
use serde::Serialize;

use crate::db::Store;
use crate::tokenize::tokenize;
use crate::types::Node;

/// Source fields indexed per node, in storage order.
const SOURCES: &[&str] = &["name", "qualified_name", "signature", "docstring"];

/// A ranked semantic search hit.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredNode {
    pub node: Node,
    pub score: f64,
}

fn source_weight(source: &str) -> f64 {
    match source {
        "name" => 4.0,
        "signature" => 2.0,
        "docstring" => 1.5,
        _ => 1.0,
    }
}

impl Store {
    /// Rebuild both TF-IDF tables from the current node set.
    ///
    /// Per node and source field: `tf = count / max_count_in_field`. Per
    /// token: `df` = number of distinct nodes containing it in any field,
    /// `idf = ln((N + 1) / (df + 1)) + 1`. Returns the distinct token count.
    pub fn rebuild_semantic_index(&self) -> Result<u32> {
        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute("DELETE FROM node_tokens", [])?;
        self.conn.execute("DELETE FROM token_idf", [])?;

        let rows: Vec<(String, String, String, Option<String>, Option<String>)> = {
            let mut stmt = self.conn.prepare(
                "SELECT id, name, qualified_name, signature, docstring FROM nodes ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let total_nodes = rows.len() as f64;
        let mut document_freq: HashMap<String, u32> = HashMap::new();

        {
            let mut insert = self.conn.prepare_cached(
                "INSERT OR REPLACE INTO node_tokens (node_id, token, tf, source)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for (id, name, qualified, signature, docstring) in &rows {
                let mut seen: HashSet<String> = HashSet::new();
                let fields = [
                    name.as_str(),
                    qualified.as_str(),
                    signature.as_deref().unwrap_or(""),
                    docstring.as_deref().unwrap_or(""),
                ];
                for (source, text) in SOURCES.iter().zip(fields) {
                    let tokens = tokenize(text);
                    if tokens.is_empty() {
                        continue;
                    }
                    let mut counts: HashMap<&str, u32> = HashMap::new();
                    for token in &tokens {
                        *counts.entry(token).or_insert(0) += 1;
                    }
                    let max_count = counts.values().copied().max().unwrap_or(1) as f64;
                    for (token, count) in &counts {
                        insert.execute(params![
                            id,
                            token,
                            *count as f64 / max_count,
                            source
                        ])?;
                        if seen.insert((*token).to_string()) {
                            *document_freq.entry((*token).to_string()).or_insert(0) += 1;
                        }
                    }
                }
            }
        }

        let token_count = document_freq.len() as u32;
        {
            let mut insert = self
                .conn
                .prepare_cached("INSERT INTO token_idf (token, idf, df) VALUES (?1, ?2, ?3)")?;
            for (token, df) in &document_freq {
                let idf = ((total_nodes + 1.0) / (*df as f64 + 1.0)).ln() + 1.0;
                insert.execute(params![token, idf, df])?;
            }
        }

        tx.commit()?;
        Ok(token_count)
    }

    /// Ranked meaning-based search: sum of `tf · idf · source_weight` over
    /// the query tokens. Tokens absent from the corpus score with the
    /// maximum-rarity idf `ln(N + 1)`. An empty query is an empty result.
    pub fn semantic_search(&self, query: &str, limit: u32) -> Result<Vec<ScoredNode>> {
        let tokens = tokenize(query);
        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let total_nodes: f64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get::<_, u32>(0))?
            as f64;
        let default_idf = (total_nodes + 1.0).ln();

        let mut idf_stmt = self
            .conn
            .prepare_cached("SELECT idf FROM token_idf WHERE token = ?1")?;
        let mut rows_stmt = self
            .conn
            .prepare_cached("SELECT node_id, tf, source FROM node_tokens WHERE token = ?1")?;

        let mut scores: HashMap<String, f64> = HashMap::new();
        for token in &tokens {
            let idf: f64 = {
                use rusqlite::OptionalExtension;
                idf_stmt
                    .query_row(params![token], |row| row.get(0))
                    .optional()?
                    .unwrap_or(default_idf)
            };

            let matches = rows_stmt
                .query_map(params![token], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for (node_id, tf, source) in matches {
                *scores.entry(node_id).or_insert(0.0) += tf * idf * source_weight(&source);
            }
        }

        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(limit as usize);

        let mut results = Vec::with_capacity(ranked.len());
        for (id, score) in ranked {
            if let Some(node) = self.get_node(&id)? {
                results.push(ScoredNode { node, score });
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_node;
    use crate::types::NodeKind;

    fn seed_corpus(db: &Store) {
        let auth = test_node("authenticateUser", NodeKind::Function, "auth/login.ts", 1)
            .with_signature(Some("function authenticateUser(password: string)".to_string()));
        let validate = test_node("validateToken", NodeKind::Function, "auth/tokens.ts", 1)
            .with_signature(Some("function validateToken(token: string)".to_string()));
        let render = test_node("renderDashboard", NodeKind::Function, "ui/dash.ts", 1)
            .with_signature(Some("function renderDashboard(props: Props)".to_string()));
        db.upsert_nodes(&[auth, validate, render]).unwrap();
        db.rebuild_semantic_index().unwrap();
    }

    #[test]
    fn test_semantic_ranking_scenario() {
        let db = Store::open_memory().unwrap();
        seed_corpus(&db);

        let hits = db.semantic_search("authenticate user password", 10).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].node.name, "authenticateUser");
        // Unrelated symbol must not outrank the match.
        assert!(hits.iter().all(|h| h.score <= hits[0].score));
    }

    #[test]
    fn test_empty_query_is_empty_result() {
        let db = Store::open_memory().unwrap();
        seed_corpus(&db);
        assert!(db.semantic_search("", 10).unwrap().is_empty());
        // Pure stop-words tokenize to nothing as well.
        assert!(db.semantic_search("the of and", 10).unwrap().is_empty());
    }

    #[test]
    fn test_no_match_is_empty_result() {
        let db = Store::open_memory().unwrap();
        seed_corpus(&db);
        assert!(db
            .semantic_search("zzz completely unrelated quantum", 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_name_weight_beats_docstring() {
        let db = Store::open_memory().unwrap();
        let named = test_node("session", NodeKind::Function, "a.ts", 1);
        let documented = test_node("other", NodeKind::Function, "b.ts", 1)
            .with_docstring(Some("manages the session".to_string()));
        db.upsert_nodes(&[named, documented]).unwrap();
        db.rebuild_semantic_index().unwrap();

        let hits = db.semantic_search("session", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node.name, "session");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_idf_df_consistency() {
        let db = Store::open_memory().unwrap();
        seed_corpus(&db);

        // For every token in node_tokens there must be an idf row, and df
        // must equal the number of distinct nodes holding the token.
        let mut stmt = db
            .conn
            .prepare("SELECT DISTINCT token FROM node_tokens")
            .unwrap();
        let tokens: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert!(!tokens.is_empty());

        for token in tokens {
            let df: u32 = db
                .conn
                .query_row(
                    "SELECT df FROM token_idf WHERE token = ?1",
                    params![token],
                    |row| row.get(0),
                )
                .unwrap_or_else(|_| panic!("token '{token}' missing from idf cache"));
            let distinct: u32 = db
                .conn
                .query_row(
                    "SELECT COUNT(DISTINCT node_id) FROM node_tokens WHERE token = ?1",
                    params![token],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(df, distinct, "df mismatch for token '{token}'");
        }
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let db = Store::open_memory().unwrap();
        seed_corpus(&db);
        let first: u32 = db
            .conn
            .query_row("SELECT COUNT(*) FROM node_tokens", [], |r| r.get(0))
            .unwrap();
        db.rebuild_semantic_index().unwrap();
        let second: u32 = db
            .conn
            .query_row("SELECT COUNT(*) FROM node_tokens", [], |r| r.get(0))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rebuild_drops_stale_tokens() {
        let db = Store::open_memory().unwrap();
        seed_corpus(&db);
        assert!(!db.semantic_search("dashboard", 10).unwrap().is_empty());

        db.delete_nodes_by_file("ui/dash.ts").unwrap();
        db.rebuild_semantic_index().unwrap();
        assert!(db.semantic_search("dashboard", 10).unwrap().is_empty());
    }

    #[test]
    fn test_limit_and_tiebreak_determinism() {
        let db = Store::open_memory().unwrap();
        // Two identical-scoring nodes; tie broken by node id ascending.
        let a = test_node("widget", NodeKind::Function, "a.ts", 1);
        let b = test_node("widget", NodeKind::Function, "b.ts", 1);
        let (low, high) = if a.id < b.id { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
        db.upsert_nodes(&[a, b]).unwrap();
        db.rebuild_semantic_index().unwrap();

        let hits = db.semantic_search("widget", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node.id, low.id);
        assert_eq!(hits[1].node.id, high.id);

        let capped = db.semantic_search("widget", 1).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].node.id, low.id);
    }
}
