use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use codexray::config::{init_project, Config};
use codexray::context::{self, ContextOptions};
use codexray::db::Store;
use codexray::hooks;
use codexray::indexer;
use codexray::types::NodeKind;
use codexray::watch::{run_watch, WatchConfig};

fn project_root() -> Result<PathBuf> {
    std::env::current_dir().context("cannot determine working directory")
}

fn open_store(root: &Path) -> Result<Store> {
    Store::open_project(root)
}

/// Print `data` as pretty JSON if `json` is true, otherwise call `human_fmt`.
fn output<T: Serialize>(data: &T, json: bool, human_fmt: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        human_fmt(data);
    }
    Ok(())
}

fn print_node_line(node: &codexray::types::Node) {
    println!(
        "{kind}  {name}  {file}:{start}-{end}",
        kind = node.kind,
        name = node.qualified_name,
        file = node.file_path,
        start = node.start_line,
        end = node.end_line,
    );
}

/// Create the storage directory and config; optionally index right away.
pub fn cmd_init(index: bool, json: bool) -> Result<()> {
    let root = project_root()?;
    let config = init_project(&root)?;
    // Touch the database so `status` works before the first index.
    let store = Store::open(Store::db_path(&root))?;

    if index {
        let report = indexer::index_directory(&store, &root, &config, false)?;
        return output(&report, json, print_index_report);
    }

    if !json {
        println!("Initialized .codexray/ for '{}'", config.project_name);
    }
    Ok(())
}

fn print_index_report(report: &indexer::IndexReport) {
    println!(
        "Indexed {} files ({} skipped, {} removed)",
        report.files_indexed, report.files_skipped, report.files_removed
    );
    println!(
        "  {} symbols, {} edges ({} resolved), {} tokens",
        report.nodes_added, report.edges_added, report.refs_resolved, report.tokens_indexed
    );
    for err in &report.parse_errors {
        println!("  parse error: {}: {}", err.file, err.message);
    }
}

/// Build or rebuild the code graph index.
pub fn cmd_index(force: bool, quiet: bool, json: bool) -> Result<()> {
    let root = project_root()?;
    let config = Config::load(&root)?;
    let store = open_store(&root)?;

    let report = indexer::index_directory(&store, &root, &config, force)?;
    if quiet && !json {
        return Ok(());
    }
    output(&report, json, print_index_report)
}

/// Incremental sync with the working tree.
pub fn cmd_sync(quiet: bool, json: bool) -> Result<()> {
    let root = project_root()?;
    let config = Config::load(&root)?;
    let store = open_store(&root)?;

    let report = indexer::sync_directory(&store, &root, &config)?;
    if quiet && !json {
        return Ok(());
    }
    output(&report, json, print_index_report)
}

/// Watch the tree and re-index on change. Blocks until Ctrl+C.
pub fn cmd_watch() -> Result<()> {
    let root = project_root()?;
    // Fails with guidance when uninitialized.
    open_store(&root)?;
    run_watch(WatchConfig::new(root.clone()), &Store::db_path(&root))
}

/// Show index status.
pub fn cmd_status(json: bool) -> Result<()> {
    let root = project_root()?;
    let store = open_store(&root)?;
    let stats = store.get_stats()?;

    output(&stats, json, |stats| {
        println!("Files:    {}", stats.num_files);
        println!("Symbols:  {}", stats.num_nodes);
        println!("Edges:    {}", stats.num_edges);
        println!("Tokens:   {}", stats.num_tokens);
        println!("Lines:    {}", stats.total_lines);
        if !stats.languages.is_empty() {
            println!("Languages:");
            for (lang, count) in &stats.languages {
                println!("  {lang}: {count} files");
            }
        }
        if !stats.node_kinds.is_empty() {
            println!("Symbols by kind:");
            for (kind, count) in &stats.node_kinds {
                println!("  {kind}: {count}");
            }
        }
    })
}

/// Keyword search.
pub fn cmd_query(query: &str, kind: Option<NodeKind>, limit: u32, json: bool) -> Result<()> {
    let root = project_root()?;
    let store = open_store(&root)?;
    let nodes = store.search_nodes(query, kind, limit)?;

    output(&nodes, json, |nodes| {
        if nodes.is_empty() {
            println!("No symbols found for '{query}'");
            return;
        }
        for node in nodes {
            print_node_line(node);
        }
    })
}

/// TF-IDF semantic search.
pub fn cmd_semantic(query: &str, limit: u32, json: bool) -> Result<()> {
    let root = project_root()?;
    let store = open_store(&root)?;
    let hits = store.semantic_search(query, limit)?;

    output(&hits, json, |hits| {
        if hits.is_empty() {
            println!("No semantic matches for '{query}'");
            return;
        }
        for hit in hits {
            println!(
                "{score:>6.2}  {kind}  {name}  {file}:{line}",
                score = hit.score,
                kind = hit.node.kind,
                name = hit.node.qualified_name,
                file = hit.node.file_path,
                line = hit.node.start_line,
            );
        }
    })
}

/// Assemble ranked context for a task query.
pub fn cmd_context(query: &str, max_nodes: usize, compact: bool, json: bool) -> Result<()> {
    let root = project_root()?;
    let store = open_store(&root)?;

    let opts = ContextOptions {
        max_nodes,
        ..Default::default()
    };
    let result = context::build_context(&store, &root, query, &opts)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if compact {
        print!("{}", context::format_compact(&result));
    } else {
        print!("{}", context::format_markdown(&result));
    }
    Ok(())
}

/// Project overview: stats plus the busiest symbols.
pub fn cmd_overview(json: bool) -> Result<()> {
    let root = project_root()?;
    let store = open_store(&root)?;

    #[derive(Serialize)]
    struct Overview {
        stats: codexray::db::StoreStats,
        hotspots: Vec<codexray::graph::Hotspot>,
    }

    let overview = Overview {
        stats: store.get_stats()?,
        hotspots: store.find_hotspots(10)?,
    };

    output(&overview, json, |o| {
        println!(
            "{} files, {} symbols, {} edges across {} languages",
            o.stats.num_files,
            o.stats.num_nodes,
            o.stats.num_edges,
            o.stats.languages.len()
        );
        if !o.hotspots.is_empty() {
            println!("Hotspots:");
            for h in &o.hotspots {
                println!(
                    "  {name}  in:{in_d} out:{out_d}  {file}:{line}",
                    name = h.node.qualified_name,
                    in_d = h.in_degree,
                    out_d = h.out_degree,
                    file = h.node.file_path,
                    line = h.node.start_line,
                );
            }
        }
    })
}

/// Manage the git post-commit hook.
pub fn cmd_hooks(action: &crate::cli::HookAction, json: bool) -> Result<()> {
    let root = project_root()?;
    match action {
        crate::cli::HookAction::Install => {
            hooks::install(&root)?;
            if !json {
                println!("post-commit hook installed");
            }
        }
        crate::cli::HookAction::Remove => {
            hooks::remove(&root)?;
            if !json {
                println!("post-commit hook removed");
            }
        }
        crate::cli::HookAction::Status => {
            let installed = hooks::status(&root);
            if json {
                println!("{}", serde_json::json!({ "installed": installed }));
            } else {
                println!(
                    "post-commit hook: {}",
                    if installed { "installed" } else { "not installed" }
                );
            }
        }
    }
    Ok(())
}

/// Drop all indexed data, keeping config and schema.
pub fn cmd_reset(json: bool) -> Result<()> {
    let root = project_root()?;
    let store = open_store(&root)?;
    store.reset()?;
    store.vacuum()?;
    if !json {
        println!("Index reset");
    }
    Ok(())
}
