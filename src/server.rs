use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rmcp::schemars;
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info};

use codexray::context::{self, ContextOptions};
use codexray::db::Store;
use codexray::types::{Node, NodeKind};

const MAX_IMPACT_DEPTH: u32 = 10;
const MAX_PATH_DEPTH: u32 = 15;
const MAX_SEARCH_LIMIT: u32 = 100;

// ── Parameter types ──

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Query string (word characters; operators are stripped)
    pub query: String,
    /// Filter by node kind, e.g. function, class, method, component
    pub kind: Option<String>,
    /// Maximum results (default 20, max 100)
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContextParams {
    /// Natural-language task description
    pub query: String,
    /// Maximum symbols in the answer (default 25)
    pub max_nodes: Option<usize>,
    /// Attach source slices (default true)
    pub include_code: Option<bool>,
    /// Emit the compact one-line-per-symbol listing instead of markdown
    pub compact: Option<bool>,
    /// Filter by node kind
    pub kind: Option<String>,
    /// Restrict to file paths containing this substring
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SemanticParams {
    /// Query string
    pub query: String,
    /// Maximum results (default 10)
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SymbolParams {
    /// Symbol name or qualified name
    pub name: String,
    /// Disambiguator: substring of the defining file's path
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CallListParams {
    /// Symbol name or qualified name
    pub name: String,
    /// Disambiguator: substring of the defining file's path
    pub file: Option<String>,
    /// Maximum results (default 20)
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImpactParams {
    /// Symbol name or qualified name
    pub name: String,
    /// Disambiguator: substring of the defining file's path
    pub file: Option<String>,
    /// Maximum traversal depth (default 3, max 10)
    pub depth: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeadCodeParams {
    /// Node kinds to consider (default: function, method, class)
    pub kinds: Option<Vec<String>>,
    /// Also report exported symbols (default false)
    pub include_exported: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HotspotsParams {
    /// Maximum results (default 10)
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PathParams {
    /// Starting symbol name
    pub from: String,
    /// Target symbol name
    pub to: String,
    /// Disambiguator for the starting symbol
    pub from_file: Option<String>,
    /// Disambiguator for the target symbol
    pub to_file: Option<String>,
    /// Maximum traversal depth (default 10, max 15)
    pub depth: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ComplexityParams {
    /// Minimum complexity to report (default 10)
    pub threshold: Option<u32>,
}

// ── Helpers ──

fn mcp_err(msg: impl std::fmt::Display) -> McpError {
    McpError::internal_error(msg.to_string(), None)
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| mcp_err(format!("serialization failed: {e}")))?;
    Ok(text_result(json))
}

fn parse_kind(kind: Option<&str>) -> Result<Option<NodeKind>, McpError> {
    kind.map(|s| {
        s.parse::<NodeKind>()
            .map_err(|_| mcp_err(format!("invalid node kind '{s}'")))
    })
    .transpose()
}

/// Outcome of a name lookup: either a single node, or a message the caller
/// should read (not found, or ambiguous with the candidate list).
enum Lookup {
    Found(Node),
    Message(String),
}

fn resolve_symbol(store: &Store, name: &str, file: Option<&str>) -> Result<Lookup, McpError> {
    let mut candidates = store
        .get_nodes_by_name(name, None)
        .map_err(|e| mcp_err(format!("lookup failed: {e}")))?;
    if let Some(filter) = file {
        candidates.retain(|n| n.file_path.contains(filter));
    }

    if candidates.is_empty() {
        return Ok(Lookup::Message(format!("No symbol named '{name}' found.")));
    }

    let distinct_files: std::collections::HashSet<&str> =
        candidates.iter().map(|n| n.file_path.as_str()).collect();
    if distinct_files.len() > 1 {
        let mut msg = format!(
            "Ambiguous symbol '{name}' — pass a `file` substring to disambiguate:\n"
        );
        for node in &candidates {
            msg.push_str(&format!(
                "- {} {} {}:{}\n",
                node.kind, node.qualified_name, node.file_path, node.start_line
            ));
        }
        return Ok(Lookup::Message(msg));
    }

    Ok(Lookup::Found(candidates.remove(0)))
}

/// Lazily open the project store; `None` means the project has not been
/// initialized, and tools answer with guidance rather than an error.
fn ensure_open<'a>(slot: &'a mut Option<Store>, root: &Path) -> Option<&'a Store> {
    if slot.is_none() {
        match Store::open_project(root) {
            Ok(store) => *slot = Some(store),
            Err(_) => return None,
        }
    }
    slot.as_ref()
}

fn not_initialized(root: &Path) -> CallToolResult {
    text_result(format!(
        "No codexray index found in {}. Run `codexray init --index` there first.",
        root.display()
    ))
}

/// Run `f` against the (lazily opened) store on a blocking thread.
macro_rules! with_store {
    ($self:ident, $store:ident, $body:expr) => {
        with_store!($self, $store, root, $body)
    };
    ($self:ident, $store:ident, $root:ident, $body:expr) => {{
        let db = Arc::clone(&$self.db);
        let $root = Arc::clone(&$self.root);
        tokio::task::spawn_blocking(move || {
            let mut guard = db.lock().map_err(|_| mcp_err("store lock poisoned"))?;
            let Some($store) = ensure_open(&mut guard, &$root) else {
                return Ok(not_initialized(&$root));
            };
            let $root: &Path = &$root;
            let _ = $root;
            $body
        })
        .await
        .map_err(|e| mcp_err(format!("task join failed: {e}")))?
    }};
}

// ── Server ──

#[derive(Clone)]
pub struct CodexrayServer {
    tool_router: ToolRouter<Self>,
    /// Shared store, opened lazily on first use so `serve` can start before
    /// `init` has run.
    db: Arc<Mutex<Option<Store>>>,
    /// Project root captured at server start.
    root: Arc<PathBuf>,
}

#[tool_router]
impl CodexrayServer {
    pub fn new() -> anyhow::Result<Self> {
        let root = std::env::current_dir()
            .and_then(|p| p.canonicalize())
            .map_err(|e| anyhow::anyhow!("cannot determine project root: {e}"))?;
        Ok(Self {
            tool_router: Self::tool_router(),
            db: Arc::new(Mutex::new(None)),
            root: Arc::new(root),
        })
    }

    /// Keyword symbol search.
    #[tool(
        description = "Search symbols by keyword over names, qualified names, signatures and docstrings (prefix-matched, ranked). Use to discover exact names before calling the graph tools."
    )]
    async fn codexray_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(20).min(MAX_SEARCH_LIMIT);
        with_store!(self, store, {
            let kind = parse_kind(params.kind.as_deref())?;
            debug!(query = %params.query, "search");
            let nodes = store
                .search_nodes(&params.query, kind, limit)
                .map_err(|e| mcp_err(format!("search failed: {e}")))?;
            json_result(&nodes)
        })
    }

    /// Ranked context assembly for a task query.
    #[tool(
        description = "Assemble ranked multi-symbol context for a natural-language task: relevant symbols with code slices, callers and callees, grouped by file. The single best starting point for 'where do I change X?'."
    )]
    async fn codexray_context(
        &self,
        Parameters(params): Parameters<ContextParams>,
    ) -> Result<CallToolResult, McpError> {
        with_store!(self, store, root, {
            let kind = parse_kind(params.kind.as_deref())?;
            let opts = ContextOptions {
                max_nodes: params.max_nodes.unwrap_or(25),
                include_code: params.include_code.unwrap_or(true),
                kind,
                file_filter: params.file.clone(),
                ..Default::default()
            };
            let result = context::build_context(store, root, &params.query, &opts)
                .map_err(|e| mcp_err(format!("context build failed: {e}")))?;
            if params.compact.unwrap_or(false) {
                Ok(text_result(context::format_compact(&result)))
            } else {
                Ok(text_result(context::format_markdown(&result)))
            }
        })
    }

    /// TF-IDF semantic search.
    #[tool(
        description = "Meaning-based symbol search using the TF-IDF index. Better than keyword search for descriptive queries like 'user session expiry handling'."
    )]
    async fn codexray_semantic(
        &self,
        Parameters(params): Parameters<SemanticParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(10).min(MAX_SEARCH_LIMIT);
        with_store!(self, store, {
            let hits = store
                .semantic_search(&params.query, limit)
                .map_err(|e| mcp_err(format!("semantic search failed: {e}")))?;
            json_result(&hits)
        })
    }

    /// Inspect one symbol: definition, children, relationships.
    #[tool(
        description = "Inspect a symbol: kind, location, signature, docstring, complexity, structural children, dependencies and dependents. Pass `file` to disambiguate same-named symbols."
    )]
    async fn codexray_symbol(
        &self,
        Parameters(params): Parameters<SymbolParams>,
    ) -> Result<CallToolResult, McpError> {
        with_store!(self, store, {
            let node = match resolve_symbol(store, &params.name, params.file.as_deref())? {
                Lookup::Found(node) => node,
                Lookup::Message(msg) => return Ok(text_result(msg)),
            };
            let children = store
                .get_children(&node.id)
                .map_err(|e| mcp_err(format!("children query failed: {e}")))?;
            let dependencies = store
                .get_dependencies(&node.id)
                .map_err(|e| mcp_err(format!("dependency query failed: {e}")))?;
            let dependents = store
                .get_dependents(&node.id)
                .map_err(|e| mcp_err(format!("dependent query failed: {e}")))?;
            json_result(&serde_json::json!({
                "node": node,
                "children": children,
                "dependencies": dependencies,
                "dependents": dependents,
            }))
        })
    }

    /// Who calls this symbol?
    #[tool(description = "List the symbols that call the given one.")]
    async fn codexray_callers(
        &self,
        Parameters(params): Parameters<CallListParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(20).min(MAX_SEARCH_LIMIT);
        with_store!(self, store, {
            let node = match resolve_symbol(store, &params.name, params.file.as_deref())? {
                Lookup::Found(node) => node,
                Lookup::Message(msg) => return Ok(text_result(msg)),
            };
            let callers = store
                .get_callers(&node.id, limit)
                .map_err(|e| mcp_err(format!("callers query failed: {e}")))?;
            json_result(&callers)
        })
    }

    /// What does this symbol call?
    #[tool(description = "List the symbols the given one calls.")]
    async fn codexray_callees(
        &self,
        Parameters(params): Parameters<CallListParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(20).min(MAX_SEARCH_LIMIT);
        with_store!(self, store, {
            let node = match resolve_symbol(store, &params.name, params.file.as_deref())? {
                Lookup::Found(node) => node,
                Lookup::Message(msg) => return Ok(text_result(msg)),
            };
            let callees = store
                .get_callees(&node.id, limit)
                .map_err(|e| mcp_err(format!("callees query failed: {e}")))?;
            json_result(&callees)
        })
    }

    /// Blast-radius analysis.
    #[tool(
        description = "Transitive impact analysis: everything that depends on a symbol up to N hops, with distance and path. Use before refactoring to assess blast radius."
    )]
    async fn codexray_impact(
        &self,
        Parameters(params): Parameters<ImpactParams>,
    ) -> Result<CallToolResult, McpError> {
        let depth = params.depth.unwrap_or(3).min(MAX_IMPACT_DEPTH);
        with_store!(self, store, {
            let node = match resolve_symbol(store, &params.name, params.file.as_deref())? {
                Lookup::Found(node) => node,
                Lookup::Message(msg) => return Ok(text_result(msg)),
            };
            let impact = store
                .get_impact_radius(&node.id, depth)
                .map_err(|e| mcp_err(format!("impact query failed: {e}")))?;
            json_result(&impact)
        })
    }

    /// Dependencies and dependents of a symbol.
    #[tool(
        description = "List a symbol's dependencies and dependents across all relationship kinds (calls, imports, inheritance, type usage, containment), grouped by kind."
    )]
    async fn codexray_deps(
        &self,
        Parameters(params): Parameters<SymbolParams>,
    ) -> Result<CallToolResult, McpError> {
        with_store!(self, store, {
            let node = match resolve_symbol(store, &params.name, params.file.as_deref())? {
                Lookup::Found(node) => node,
                Lookup::Message(msg) => return Ok(text_result(msg)),
            };
            let dependencies = store
                .get_dependencies(&node.id)
                .map_err(|e| mcp_err(format!("dependency query failed: {e}")))?;
            let dependents = store
                .get_dependents(&node.id)
                .map_err(|e| mcp_err(format!("dependent query failed: {e}")))?;
            json_result(&serde_json::json!({
                "dependencies": dependencies,
                "dependents": dependents,
            }))
        })
    }

    /// Project overview.
    #[tool(
        description = "Project overview: file/symbol/edge counts, language and kind breakdowns, and the highest-degree symbols."
    )]
    async fn codexray_overview(&self) -> Result<CallToolResult, McpError> {
        with_store!(self, store, {
            let stats = store
                .get_stats()
                .map_err(|e| mcp_err(format!("stats query failed: {e}")))?;
            let hotspots = store
                .find_hotspots(10)
                .map_err(|e| mcp_err(format!("hotspot query failed: {e}")))?;
            json_result(&serde_json::json!({
                "stats": stats,
                "hotspots": hotspots,
            }))
        })
    }

    /// Dead-code report.
    #[tool(
        description = "Report symbols with zero incoming dependency edges (likely dead code). By default only non-exported functions, methods and classes are considered."
    )]
    async fn codexray_dead_code(
        &self,
        Parameters(params): Parameters<DeadCodeParams>,
    ) -> Result<CallToolResult, McpError> {
        with_store!(self, store, {
            let kinds: Vec<NodeKind> = match params.kinds {
                Some(ref names) => names
                    .iter()
                    .map(|s| {
                        s.parse::<NodeKind>()
                            .map_err(|_| mcp_err(format!("invalid node kind '{s}'")))
                    })
                    .collect::<Result<_, _>>()?,
                None => vec![NodeKind::Function, NodeKind::Method, NodeKind::Class],
            };
            let dead = store
                .find_dead_code(&kinds, params.include_exported.unwrap_or(false))
                .map_err(|e| mcp_err(format!("dead-code query failed: {e}")))?;
            json_result(&dead)
        })
    }

    /// Hotspot report.
    #[tool(
        description = "Top symbols by combined in/out edge degree — the code most connected to everything else."
    )]
    async fn codexray_hotspots(
        &self,
        Parameters(params): Parameters<HotspotsParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(10).min(MAX_SEARCH_LIMIT);
        with_store!(self, store, {
            let hotspots = store
                .find_hotspots(limit)
                .map_err(|e| mcp_err(format!("hotspot query failed: {e}")))?;
            json_result(&hotspots)
        })
    }

    /// Indexed file listing.
    #[tool(
        description = "List every indexed file with its language, symbol count and line count."
    )]
    async fn codexray_file_tree(&self) -> Result<CallToolResult, McpError> {
        with_store!(self, store, {
            let tree = store
                .get_file_tree()
                .map_err(|e| mcp_err(format!("file tree query failed: {e}")))?;
            json_result(&tree)
        })
    }

    /// Index status.
    #[tool(description = "Index status: counts and breakdowns for this project.")]
    async fn codexray_status(&self) -> Result<CallToolResult, McpError> {
        with_store!(self, store, {
            let stats = store
                .get_stats()
                .map_err(|e| mcp_err(format!("stats query failed: {e}")))?;
            json_result(&stats)
        })
    }

    /// Shortest connection between two symbols.
    #[tool(
        description = "Find the shortest relationship path between two symbols (treating edges as undirected). Returns null when unreachable within the depth bound."
    )]
    async fn codexray_path(
        &self,
        Parameters(params): Parameters<PathParams>,
    ) -> Result<CallToolResult, McpError> {
        let depth = params.depth.unwrap_or(10).min(MAX_PATH_DEPTH);
        with_store!(self, store, {
            let from = match resolve_symbol(store, &params.from, params.from_file.as_deref())? {
                Lookup::Found(node) => node,
                Lookup::Message(msg) => return Ok(text_result(msg)),
            };
            let to = match resolve_symbol(store, &params.to, params.to_file.as_deref())? {
                Lookup::Found(node) => node,
                Lookup::Message(msg) => return Ok(text_result(msg)),
            };
            let path = store
                .find_path(&from.id, &to.id, depth)
                .map_err(|e| mcp_err(format!("path query failed: {e}")))?;
            json_result(&path)
        })
    }

    /// Circular dependency report.
    #[tool(
        description = "Detect circular dependencies over import, call and inheritance edges. Reports up to 20 cycles."
    )]
    async fn codexray_cycles(&self) -> Result<CallToolResult, McpError> {
        with_store!(self, store, {
            let cycles = store
                .find_circular_deps()
                .map_err(|e| mcp_err(format!("cycle query failed: {e}")))?;
            json_result(&cycles)
        })
    }

    /// Complexity report.
    #[tool(
        description = "List symbols at or above a complexity threshold, most complex first."
    )]
    async fn codexray_complexity(
        &self,
        Parameters(params): Parameters<ComplexityParams>,
    ) -> Result<CallToolResult, McpError> {
        let threshold = params.threshold.unwrap_or(10);
        with_store!(self, store, {
            let report = store
                .get_complexity_report(threshold)
                .map_err(|e| mcp_err(format!("complexity query failed: {e}")))?;
            json_result(&report)
        })
    }
}

#[tool_handler]
impl ServerHandler for CodexrayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "codexray".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(
                "codexray is a local code-intelligence engine. It pre-computes a graph of \
                 symbols (functions, classes, methods, components, …) and relationships \
                 (calls, imports, inheritance, type usage, containment) with tree-sitter, \
                 plus a keyword index and a TF-IDF semantic index, stored in SQLite.\n\n\
                 Workflow:\n\
                 1. Run `codexray init --index` in the project once, and `codexray sync` \
                 (or the git hook / watch mode) after changes.\n\
                 2. Use codexray_context for 'where do I change X?' questions.\n\
                 3. Use codexray_search / codexray_semantic to discover exact symbol names.\n\
                 4. Use codexray_symbol, codexray_callers, codexray_callees, codexray_deps \
                 to inspect a symbol's neighborhood.\n\
                 5. Use codexray_impact before refactoring, codexray_dead_code, \
                 codexray_hotspots, codexray_cycles and codexray_complexity for health \
                 reports.\n\
                 6. Only fall back to reading files for implementation detail the graph \
                 does not carry."
                    .into(),
            ),
        }
    }
}

/// Start the stdio serve loop.
pub async fn run_server() -> anyhow::Result<()> {
    info!("starting codexray server v{}", env!("CARGO_PKG_VERSION"));

    let server = CodexrayServer::new()?;
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    info!("codexray server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codexray::db::STORE_DIR;
    use codexray::types::{Edge, EdgeKind};

    fn store_with(nodes: &[Node]) -> Store {
        let store = Store::open_memory().unwrap();
        store.upsert_nodes(nodes).unwrap();
        store
    }

    fn named(name: &str, file: &str) -> Node {
        Node::new(name, NodeKind::Function, file, 1, 5, "typescript")
    }

    #[test]
    fn test_resolve_symbol_not_found() {
        let store = store_with(&[]);
        match resolve_symbol(&store, "missing", None).unwrap() {
            Lookup::Message(msg) => assert!(msg.contains("No symbol named")),
            Lookup::Found(_) => panic!("expected not-found message"),
        }
    }

    #[test]
    fn test_resolve_symbol_single_hit() {
        let store = store_with(&[named("handler", "src/h.ts")]);
        match resolve_symbol(&store, "handler", None).unwrap() {
            Lookup::Found(node) => assert_eq!(node.name, "handler"),
            Lookup::Message(msg) => panic!("unexpected message: {msg}"),
        }
    }

    #[test]
    fn test_resolve_symbol_ambiguous_lists_candidates() {
        let store = store_with(&[named("handler", "a/h.ts"), named("handler", "b/h.ts")]);
        match resolve_symbol(&store, "handler", None).unwrap() {
            Lookup::Message(msg) => {
                assert!(msg.contains("Ambiguous"));
                assert!(msg.contains("a/h.ts:1"));
                assert!(msg.contains("b/h.ts:1"));
            }
            Lookup::Found(_) => panic!("expected ambiguity message"),
        }
    }

    #[test]
    fn test_resolve_symbol_file_disambiguates() {
        let store = store_with(&[named("handler", "a/h.ts"), named("handler", "b/h.ts")]);
        match resolve_symbol(&store, "handler", Some("b/")).unwrap() {
            Lookup::Found(node) => assert_eq!(node.file_path, "b/h.ts"),
            Lookup::Message(msg) => panic!("unexpected message: {msg}"),
        }
    }

    #[test]
    fn test_resolve_symbol_same_file_duplicates_pick_first() {
        // Two overloads in one file are not "ambiguous" across files.
        let a = Node::new("handler", NodeKind::Function, "a/h.ts", 1, 5, "typescript");
        let b = Node::new("handler", NodeKind::Function, "a/h.ts", 20, 25, "typescript");
        let store = store_with(&[a, b]);
        assert!(matches!(
            resolve_symbol(&store, "handler", None).unwrap(),
            Lookup::Found(_)
        ));
    }

    #[test]
    fn test_parse_kind_validation() {
        assert!(parse_kind(None).unwrap().is_none());
        assert_eq!(
            parse_kind(Some("function")).unwrap(),
            Some(NodeKind::Function)
        );
        assert!(parse_kind(Some("bogus")).is_err());
    }

    #[test]
    fn test_ensure_open_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        let mut slot = None;
        assert!(ensure_open(&mut slot, tmp.path()).is_none());

        std::fs::create_dir_all(tmp.path().join(STORE_DIR)).unwrap();
        Store::open(Store::db_path(tmp.path())).unwrap();
        assert!(ensure_open(&mut slot, tmp.path()).is_some());
    }

    #[test]
    fn test_depth_caps() {
        assert_eq!(999u32.min(MAX_IMPACT_DEPTH), MAX_IMPACT_DEPTH);
        assert_eq!(2u32.min(MAX_IMPACT_DEPTH), 2);
        assert_eq!(999u32.min(MAX_PATH_DEPTH), MAX_PATH_DEPTH);
    }

    #[test]
    fn test_not_initialized_message_mentions_init() {
        let result = not_initialized(Path::new("/tmp/project"));
        let text = format!("{result:?}");
        assert!(text.contains("codexray init"));
    }

    #[test]
    fn test_tools_read_seeded_store() {
        // The handlers delegate to the same store queries; exercise the
        // pattern the closures use.
        let store = store_with(&[named("caller", "a.ts"), named("callee", "b.ts")]);
        let caller = store.get_nodes_by_name("caller", None).unwrap()[0].clone();
        let callee = store.get_nodes_by_name("callee", None).unwrap()[0].clone();
        store
            .upsert_edge(&Edge::new(&caller.id, &callee.id, EdgeKind::Calls))
            .unwrap();

        let callers = store.get_callers(&callee.id, 20).unwrap();
        assert_eq!(callers.len(), 1);
        let path = store.find_path(&caller.id, &callee.id, 10).unwrap();
        assert_eq!(path.unwrap().len(), 2);
    }
}
