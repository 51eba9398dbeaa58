//! File discovery and the index/sync pipeline.
//!
//! Full index: enumerate registered files, hash, skip unchanged, re-extract
//! the rest one transaction per file, then resolve the batch's references
//! and rebuild the TF-IDF tables. Sync is the same pass without `force`,
//! which also removes records for files that vanished. Per-file failures
//! are collected in the report and never abort the batch.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::db::{Store, STORE_DIR};
use crate::extractor;
use crate::languages::{detect_language, parse};
use crate::resolver::resolve_references;
use crate::types::{short_sha, FileRecord, UnresolvedRef};

/// Summary of an index or sync pass.
#[derive(Debug, Default, Serialize)]
pub struct IndexReport {
    pub files_indexed: u32,
    pub files_skipped: u32,
    pub files_removed: u32,
    pub nodes_added: u32,
    pub edges_added: u32,
    pub refs_resolved: u32,
    pub tokens_indexed: u32,
    pub parse_errors: Vec<ParseError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseError {
    pub file: String,
    pub message: String,
}

/// Index a directory tree into the store.
///
/// With `force` the stored hash check is bypassed and every file is
/// re-extracted; otherwise files whose content hash is unchanged are
/// skipped without touching their nodes or edges.
pub fn index_directory(
    store: &Store,
    root: &Path,
    config: &Config,
    force: bool,
) -> Result<IndexReport> {
    let root = root.canonicalize().context("Failed to resolve root path")?;
    let mut report = IndexReport::default();
    let mut current_files = std::collections::HashSet::new();
    let mut pending_refs: Vec<UnresolvedRef> = Vec::new();

    // The root itself is exempt from the ignore predicate — projects are
    // indexable from hidden directories.
    for entry in WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e, config))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "directory walk error");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Ok(rel) = path.strip_prefix(&root) else {
            continue;
        };
        let rel_path = rel.to_string_lossy().replace('\\', "/");

        let Some(lang) = detect_language(Path::new(&rel_path)) else {
            continue;
        };
        if is_excluded(&rel_path, config) {
            continue;
        }

        // Oversized files are silently excluded from discovery.
        if entry
            .metadata()
            .map(|m| m.len() > config.max_file_size)
            .unwrap_or(false)
        {
            continue;
        }

        current_files.insert(rel_path.clone());

        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => continue, // binary file
            Err(e) => {
                warn!(file = %rel_path, error = %e, "cannot read file");
                report.parse_errors.push(ParseError {
                    file: rel_path,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let hash = short_sha(&source);
        if !force {
            if let Ok(Some(existing)) = store.get_file(&rel_path) {
                if existing.hash == hash {
                    report.files_skipped += 1;
                    continue;
                }
            }
        }

        let extraction = match parse(&source, &lang) {
            Some(tree) => extractor::extract(tree.root_node(), &source, &rel_path, &lang),
            None => {
                warn!(file = %rel_path, "parser produced no tree");
                report.parse_errors.push(ParseError {
                    file: rel_path.clone(),
                    message: "parser produced no tree".to_string(),
                });
                extractor::Extraction::default()
            }
        };

        let record = FileRecord {
            path: rel_path.clone(),
            hash,
            language: lang.name.to_string(),
            indexed_at: unix_now(),
            symbol_count: extraction.nodes.len() as u32,
            line_count: source.lines().count() as u32,
        };
        store.replace_file_data(&record, &extraction.nodes, &extraction.edges)?;

        report.files_indexed += 1;
        report.nodes_added += extraction.nodes.len() as u32;
        report.edges_added += extraction.edges.len() as u32;
        pending_refs.extend(extraction.refs);
    }

    // Drop records for files that no longer exist on disk.
    for stored in store.all_files()? {
        if !current_files.contains(&stored) {
            store.remove_file(&stored)?;
            report.files_removed += 1;
        }
    }

    // Cross-file edges only make sense once every file in the batch is in.
    report.refs_resolved = resolve_references(store, &pending_refs)?;
    report.tokens_indexed = store.rebuild_semantic_index()?;

    debug!(
        indexed = report.files_indexed,
        skipped = report.files_skipped,
        removed = report.files_removed,
        "index pass complete"
    );
    Ok(report)
}

/// Incremental sync: hash-compare against the stored file set and re-extract
/// only what changed.
pub fn sync_directory(store: &Store, root: &Path, config: &Config) -> Result<IndexReport> {
    index_directory(store, root, config, false)
}

/// Re-extract a single file and immediately resolve just its references.
/// Used by watch mode; the caller rebuilds the TF-IDF tables per batch.
pub fn reindex_file(
    store: &Store,
    root: &Path,
    rel_path: &str,
    config: &Config,
) -> Result<()> {
    let abs = root.join(rel_path);
    if !abs.exists() {
        store.remove_file(rel_path)?;
        return Ok(());
    }

    let Some(lang) = detect_language(Path::new(rel_path)) else {
        return Ok(());
    };
    if is_excluded(rel_path, config) {
        return Ok(());
    }
    if abs
        .metadata()
        .map(|m| m.len() > config.max_file_size)
        .unwrap_or(false)
    {
        return Ok(());
    }

    let source = std::fs::read_to_string(&abs)
        .with_context(|| format!("cannot read {rel_path}"))?;
    let hash = short_sha(&source);
    if let Ok(Some(existing)) = store.get_file(rel_path) {
        if existing.hash == hash {
            return Ok(());
        }
    }

    let extraction = match parse(&source, &lang) {
        Some(tree) => extractor::extract(tree.root_node(), &source, rel_path, &lang),
        None => {
            warn!(file = %rel_path, "parser produced no tree");
            extractor::Extraction::default()
        }
    };

    let record = FileRecord {
        path: rel_path.to_string(),
        hash,
        language: lang.name.to_string(),
        indexed_at: unix_now(),
        symbol_count: extraction.nodes.len() as u32,
        line_count: source.lines().count() as u32,
    };
    store.replace_file_data(&record, &extraction.nodes, &extraction.edges)?;
    resolve_references(store, &extraction.refs)?;
    Ok(())
}

/// Default ignore predicate for discovery: build output, dependency and VCS
/// directories, hidden directories, and the engine's own storage directory.
pub fn is_ignored_dirname(name: &str) -> bool {
    matches!(
        name,
        ".git"
            | ".hg"
            | ".svn"
            | "node_modules"
            | "__pycache__"
            | ".mypy_cache"
            | ".pytest_cache"
            | ".tox"
            | ".venv"
            | "venv"
            | ".env"
            | "env"
            | "target"
            | "dist"
            | "build"
            | "out"
            | ".next"
            | ".nuxt"
            | "vendor"
    ) || name == STORE_DIR
        || name.starts_with('.')
}

fn is_ignored(entry: &walkdir::DirEntry, config: &Config) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if is_ignored_dirname(&name) {
        return true;
    }
    config.exclude.iter().any(|pat| {
        let pat = pat.trim_end_matches('/');
        !pat.is_empty() && name == pat
    })
}

/// User-supplied exclude patterns, matched as path substrings.
pub(crate) fn is_excluded(rel_path: &str, config: &Config) -> bool {
    config.exclude.iter().any(|pat| {
        let pat = pat.trim_end_matches('/');
        !pat.is_empty() && rel_path.contains(pat)
    })
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
