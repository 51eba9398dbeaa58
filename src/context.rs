//! Context assembly for natural-language task queries.
//!
//! Tokenizes the task, fans out over keyword search, scores candidates with
//! name/signature/docstring heuristics, pulls in one hop of graph neighbors,
//! and enriches the survivors with source slices and call lists. Three output
//! shapes: a markdown document grouped by file, a compact one-line-per-symbol
//! listing (parseable back), and the serialized structure itself.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::db::Store;
use crate::tokenize::tokenize_query;
use crate::types::{Node, NodeKind};

/// Per-keyword candidate pool size.
const KEYWORD_SEARCH_LIMIT: u32 = 50;
/// How many top seeds get graph expansion.
const EXPANSION_SEEDS: usize = 10;
/// Caller/callee names attached per entry.
const MAX_CALL_NAMES: u32 = 5;

/// Names that suggest an entry point or routing hub.
const ENTRY_POINT_PREFIXES: &[&str] = &[
    "main",
    "index",
    "app",
    "server",
    "handler",
    "controller",
    "route",
    "api",
];

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub max_nodes: usize,
    pub max_code_length: usize,
    pub include_code: bool,
    pub kind: Option<NodeKind>,
    /// Substring filter on file paths.
    pub file_filter: Option<String>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_nodes: 25,
            max_code_length: 500,
            include_code: true,
            kind: None,
            file_filter: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    pub node: Node,
    pub score: f64,
    pub code: Option<String>,
    pub callers: Vec<String>,
    pub callees: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextResult {
    pub query: String,
    pub keywords: Vec<String>,
    pub entries: Vec<ContextEntry>,
}

/// Assemble a ranked multi-symbol answer for a task query.
pub fn build_context(
    store: &Store,
    root: &Path,
    query: &str,
    opts: &ContextOptions,
) -> Result<ContextResult> {
    let keywords = tokenize_query(query);

    let mut scored: HashMap<String, (Node, f64)> = HashMap::new();
    for keyword in &keywords {
        let candidates = store.search_nodes(keyword, opts.kind, KEYWORD_SEARCH_LIMIT)?;
        for node in candidates {
            if let Some(ref filter) = opts.file_filter {
                if !node.file_path.contains(filter.as_str()) {
                    continue;
                }
            }
            let score = score_node(&node, keyword);
            let entry = scored.entry(node.id.clone()).or_insert((node, 0.0));
            // Keep the best score per node across keywords.
            if score > entry.1 {
                entry.1 = score;
            }
        }
    }

    // Graph expansion: one hop out from the strongest seeds.
    let mut seeds: Vec<(String, f64)> = scored
        .iter()
        .map(|(id, (_, score))| (id.clone(), *score))
        .collect();
    seeds.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    seeds.truncate(EXPANSION_SEEDS);

    for (seed_id, _) in &seeds {
        for group in store.get_dependencies(seed_id)? {
            for node in group.nodes {
                scored.entry(node.id.clone()).or_insert((node, 0.5));
            }
        }
        for group in store.get_dependents(seed_id)? {
            for node in group.nodes {
                scored.entry(node.id.clone()).or_insert((node, 0.4));
            }
        }
    }

    let mut ranked: Vec<(Node, f64)> = scored.into_values().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    ranked.truncate(opts.max_nodes);

    let mut entries = Vec::with_capacity(ranked.len());
    for (node, score) in ranked {
        let code = if opts.include_code {
            read_code_slice(root, &node, opts.max_code_length)
        } else {
            None
        };
        let callers = store
            .get_callers(&node.id, MAX_CALL_NAMES)?
            .into_iter()
            .map(|n| n.qualified_name)
            .collect();
        let callees = store
            .get_callees(&node.id, MAX_CALL_NAMES)?
            .into_iter()
            .map(|n| n.qualified_name)
            .collect();
        entries.push(ContextEntry {
            node,
            score,
            code,
            callers,
            callees,
        });
    }

    Ok(ContextResult {
        query: query.to_string(),
        keywords,
        entries,
    })
}

/// Additive relevance heuristics for one candidate against one keyword.
fn score_node(node: &Node, keyword: &str) -> f64 {
    let mut score = 0.0;
    let name_lower = node.name.to_lowercase();
    let keyword_lower = keyword.to_lowercase();

    if name_lower == keyword_lower {
        score += 10.0;
    }
    if name_lower.contains(&keyword_lower) {
        score += 5.0;
    }
    if node.qualified_name.to_lowercase().contains(&keyword_lower) {
        score += 3.0;
    }
    if node
        .signature
        .as_deref()
        .is_some_and(|s| s.to_lowercase().contains(&keyword_lower))
    {
        score += 2.0;
    }
    if node
        .docstring
        .as_deref()
        .is_some_and(|d| d.to_lowercase().contains(&keyword_lower))
    {
        score += 2.0;
    }
    if node.exported {
        score += 2.0;
    }
    if matches!(
        node.kind,
        NodeKind::Class | NodeKind::Interface | NodeKind::Component
    ) {
        score += 1.0;
    }
    if ENTRY_POINT_PREFIXES
        .iter()
        .any(|p| name_lower.starts_with(p))
    {
        score += 1.0;
    }

    score
}

/// Slice `[start_line - 1, end_line)` out of the file on disk and truncate
/// to the character budget with an ellipsis marker.
fn read_code_slice(root: &Path, node: &Node, max_len: usize) -> Option<String> {
    let source = std::fs::read_to_string(root.join(&node.file_path)).ok()?;
    let start = node.start_line.saturating_sub(1) as usize;
    let end = (node.end_line as usize).min(source.lines().count());
    if start >= end {
        return None;
    }
    let slice = source
        .lines()
        .skip(start)
        .take(end - start)
        .collect::<Vec<_>>()
        .join("\n");

    if slice.chars().count() <= max_len {
        Some(slice)
    } else {
        let mut truncated: String = slice.chars().take(max_len).collect();
        truncated.push('…');
        Some(truncated)
    }
}

// ── Output shapes ──

/// Structured markdown document, grouped by file path.
pub fn format_markdown(result: &ContextResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Context: {}", result.query);
    if result.entries.is_empty() {
        out.push_str("\nNo matching symbols.\n");
        return out;
    }

    let mut by_file: Vec<(&str, Vec<&ContextEntry>)> = Vec::new();
    for entry in &result.entries {
        match by_file.iter_mut().find(|(f, _)| *f == entry.node.file_path) {
            Some((_, list)) => list.push(entry),
            None => by_file.push((&entry.node.file_path, vec![entry])),
        }
    }

    for (file, entries) in by_file {
        let _ = writeln!(out, "\n## {file}");
        for entry in entries {
            let node = &entry.node;
            let _ = writeln!(
                out,
                "\n### {} `{}` (L{}-{})",
                node.kind, node.name, node.start_line, node.end_line
            );
            if let Some(sig) = &node.signature {
                let _ = writeln!(out, "`{sig}`");
            }
            if let Some(doc) = &node.docstring {
                let _ = writeln!(out, "> {doc}");
            }
            if !entry.callers.is_empty() {
                let _ = writeln!(out, "- called by: {}", entry.callers.join(", "));
            }
            if !entry.callees.is_empty() {
                let _ = writeln!(out, "- calls: {}", entry.callees.join(", "));
            }
            if let Some(code) = &entry.code {
                let _ = writeln!(out, "```{}\n{code}\n```", node.language);
            }
        }
    }
    out
}

/// Compact one-line-per-symbol listing: `kind qualified_name file:start-end`.
pub fn format_compact(result: &ContextResult) -> String {
    let mut out = String::new();
    for entry in &result.entries {
        let node = &entry.node;
        let _ = writeln!(
            out,
            "{} {} {}:{}-{}",
            node.kind, node.qualified_name, node.file_path, node.start_line, node.end_line
        );
    }
    out
}

/// A symbol row parsed back out of the compact listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactEntry {
    pub kind: NodeKind,
    pub qualified_name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// Parse the compact listing back into its symbol rows. Lines that do not
/// match the shape are skipped.
pub fn parse_compact(text: &str) -> Vec<CompactEntry> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let mut parts = line.splitn(3, ' ');
        let (Some(kind), Some(qualified), Some(location)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let Ok(kind) = kind.parse::<NodeKind>() else {
            continue;
        };
        let Some((file, range)) = location.rsplit_once(':') else {
            continue;
        };
        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start_line), Ok(end_line)) = (start.parse(), end.parse()) else {
            continue;
        };
        entries.push(CompactEntry {
            kind,
            qualified_name: qualified.to_string(),
            file_path: file.to_string(),
            start_line,
            end_line,
        });
    }
    entries
}
