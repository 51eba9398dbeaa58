use serde::Serialize;
use sha2::{Digest, Sha256};

/// A named symbol extracted from source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub qualified_name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub exported: bool,
    pub complexity: u32,
    pub metadata: Option<serde_json::Value>,
}

impl Node {
    /// Create a new node, computing the ID from `(kind, file_path, name, start_line)`
    /// and the qualified name from the file path.
    ///
    /// Optional fields default to `None`, `exported` to `false` and `complexity`
    /// to `1`. Use the builder-style setters to override.
    pub fn new(
        name: impl Into<String>,
        kind: NodeKind,
        file_path: &str,
        start_line: u32,
        end_line: u32,
        language: &str,
    ) -> Self {
        let name = name.into();
        let id = node_id(kind, file_path, &name, start_line);
        let qualified_name = qualified_name(file_path, &name);
        Self {
            id,
            kind,
            name,
            qualified_name,
            file_path: file_path.to_string(),
            start_line,
            end_line,
            language: language.to_string(),
            signature: None,
            docstring: None,
            exported: false,
            complexity: 1,
            metadata: None,
        }
    }

    /// Set the signature (capped to 300 chars at extraction).
    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature;
        self
    }

    /// Set the docstring (capped to 500 chars at extraction).
    pub fn with_docstring(mut self, docstring: Option<String>) -> Self {
        self.docstring = docstring;
        self
    }

    /// Mark as exported.
    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    /// Set the cyclomatic-complexity estimate, clamped to `[1, 100]`.
    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = complexity.clamp(1, 100);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Enum,
    Variable,
    Constant,
    Module,
    Namespace,
    Struct,
    Trait,
    Component,
    Hook,
    Decorator,
    Property,
    Route,
    Middleware,
    Test,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Struct => "struct",
            Self::Trait => "trait",
            Self::Component => "component",
            Self::Hook => "hook",
            Self::Decorator => "decorator",
            Self::Property => "property",
            Self::Route => "route",
            Self::Middleware => "middleware",
            Self::Test => "test",
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "function" => Ok(Self::Function),
            "method" => Ok(Self::Method),
            "class" => Ok(Self::Class),
            "interface" => Ok(Self::Interface),
            "type" => Ok(Self::Type),
            "enum" => Ok(Self::Enum),
            "variable" => Ok(Self::Variable),
            "constant" => Ok(Self::Constant),
            "module" => Ok(Self::Module),
            "namespace" => Ok(Self::Namespace),
            "struct" => Ok(Self::Struct),
            "trait" => Ok(Self::Trait),
            "component" => Ok(Self::Component),
            "hook" => Ok(Self::Hook),
            "decorator" => Ok(Self::Decorator),
            "property" => Ok(Self::Property),
            "route" => Ok(Self::Route),
            "middleware" => Ok(Self::Middleware),
            "test" => Ok(Self::Test),
            _ => Err(anyhow::anyhow!("unknown node kind: '{s}'")),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
    pub metadata: Option<serde_json::Value>,
}

impl Edge {
    /// Create a new edge, computing the ID from `(source_id, target_id, kind)`.
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, kind: EdgeKind) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        let id = edge_id(&source_id, &target_id, kind);
        Self {
            id,
            source_id,
            target_id,
            kind,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    Imports,
    Extends,
    Implements,
    ReturnsType,
    UsesType,
    HasMethod,
    HasProperty,
    Contains,
    Exports,
    Renders,
    Decorates,
    Overrides,
    Tests,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Imports => "imports",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::ReturnsType => "returns_type",
            Self::UsesType => "uses_type",
            Self::HasMethod => "has_method",
            Self::HasProperty => "has_property",
            Self::Contains => "contains",
            Self::Exports => "exports",
            Self::Renders => "renders",
            Self::Decorates => "decorates",
            Self::Overrides => "overrides",
            Self::Tests => "tests",
        }
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "calls" => Ok(Self::Calls),
            "imports" => Ok(Self::Imports),
            "extends" => Ok(Self::Extends),
            "implements" => Ok(Self::Implements),
            "returns_type" => Ok(Self::ReturnsType),
            "uses_type" => Ok(Self::UsesType),
            "has_method" => Ok(Self::HasMethod),
            "has_property" => Ok(Self::HasProperty),
            "contains" => Ok(Self::Contains),
            "exports" => Ok(Self::Exports),
            "renders" => Ok(Self::Renders),
            "decorates" => Ok(Self::Decorates),
            "overrides" => Ok(Self::Overrides),
            "tests" => Ok(Self::Tests),
            _ => Err(anyhow::anyhow!("unknown edge kind: '{s}'")),
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping record for an indexed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub hash: String,
    pub language: String,
    pub indexed_at: i64,
    pub symbol_count: u32,
    pub line_count: u32,
}

/// An edge-to-be whose target is only known by textual name at extraction time.
/// Materialized into real edges by the resolver after the whole batch is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedRef {
    pub source_id: String,
    pub name: String,
    pub kind: EdgeKind,
    pub file_path: String,
}

/// Node ID: first 16 hex chars of SHA-256 over `kind:file_path:name:start_line`.
/// Collisions within that tuple are the same symbol and overwrite on upsert.
pub fn node_id(kind: NodeKind, file_path: &str, name: &str, start_line: u32) -> String {
    short_sha(&format!("{}:{file_path}:{name}:{start_line}", kind.as_str()))
}

/// Edge ID: first 16 hex chars of SHA-256 over `source->target:kind`.
pub fn edge_id(source_id: &str, target_id: &str, kind: EdgeKind) -> String {
    short_sha(&format!("{source_id}->{target_id}:{}", kind.as_str()))
}

/// First 16 hex chars of the SHA-256 of `input`.
pub fn short_sha(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Dotted qualified name: the last three path segments (extension stripped,
/// a final `index`/`main`/`mod` stem dropped) joined with the symbol name.
pub fn qualified_name(file_path: &str, name: &str) -> String {
    let segments: Vec<&str> = file_path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();
    let tail_start = segments.len().saturating_sub(3);
    let tail = &segments[tail_start..];

    let mut parts: Vec<&str> = Vec::with_capacity(4);
    let last = tail.len().saturating_sub(1);
    for (i, seg) in tail.iter().enumerate() {
        if i == last {
            let stem = seg.rsplit_once('.').map(|(s, _)| s).unwrap_or(seg);
            if !matches!(stem, "index" | "main" | "mod") {
                parts.push(stem);
            }
        } else {
            parts.push(seg);
        }
    }
    parts.push(name);
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_deterministic() {
        let a = node_id(NodeKind::Function, "src/a.ts", "foo", 10);
        let b = node_id(NodeKind::Function, "src/a.ts", "foo", 10);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_node_id_distinguishes_tuple_fields() {
        let base = node_id(NodeKind::Function, "src/a.ts", "foo", 10);
        assert_ne!(base, node_id(NodeKind::Method, "src/a.ts", "foo", 10));
        assert_ne!(base, node_id(NodeKind::Function, "src/b.ts", "foo", 10));
        assert_ne!(base, node_id(NodeKind::Function, "src/a.ts", "bar", 10));
        assert_ne!(base, node_id(NodeKind::Function, "src/a.ts", "foo", 11));
    }

    #[test]
    fn test_edge_id_deterministic() {
        let a = edge_id("aaaa", "bbbb", EdgeKind::Calls);
        let b = edge_id("aaaa", "bbbb", EdgeKind::Calls);
        assert_eq!(a, b);
        assert_ne!(a, edge_id("bbbb", "aaaa", EdgeKind::Calls));
        assert_ne!(a, edge_id("aaaa", "bbbb", EdgeKind::Imports));
    }

    #[test]
    fn test_qualified_name_three_segments() {
        assert_eq!(
            qualified_name("src/auth/tokens.ts", "validate"),
            "src.auth.tokens.validate"
        );
        assert_eq!(
            qualified_name("app/src/auth/tokens.ts", "validate"),
            "src.auth.tokens.validate"
        );
    }

    #[test]
    fn test_qualified_name_drops_entry_stems() {
        assert_eq!(qualified_name("src/utils/index.ts", "foo"), "src.utils.foo");
        assert_eq!(qualified_name("src/app/main.py", "run"), "src.app.run");
        assert_eq!(qualified_name("src/db/mod.rs", "open"), "src.db.open");
        // Entry stems are dropped only when they are the final segment
        assert_eq!(
            qualified_name("main/db/open.rs", "go"),
            "main.db.open.go"
        );
    }

    #[test]
    fn test_qualified_name_short_paths() {
        assert_eq!(qualified_name("a.ts", "foo"), "a.foo");
        assert_eq!(qualified_name("index.ts", "foo"), "foo");
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            NodeKind::Function,
            NodeKind::Method,
            NodeKind::Class,
            NodeKind::Interface,
            NodeKind::Type,
            NodeKind::Enum,
            NodeKind::Variable,
            NodeKind::Constant,
            NodeKind::Module,
            NodeKind::Namespace,
            NodeKind::Struct,
            NodeKind::Trait,
            NodeKind::Component,
            NodeKind::Hook,
            NodeKind::Decorator,
            NodeKind::Property,
            NodeKind::Route,
            NodeKind::Middleware,
            NodeKind::Test,
        ] {
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
        }
        for kind in [
            EdgeKind::Calls,
            EdgeKind::Imports,
            EdgeKind::Extends,
            EdgeKind::Implements,
            EdgeKind::ReturnsType,
            EdgeKind::UsesType,
            EdgeKind::HasMethod,
            EdgeKind::HasProperty,
            EdgeKind::Contains,
            EdgeKind::Exports,
            EdgeKind::Renders,
            EdgeKind::Decorates,
            EdgeKind::Overrides,
            EdgeKind::Tests,
        ] {
            assert_eq!(kind.as_str().parse::<EdgeKind>().unwrap(), kind);
        }
        assert!("unknown".parse::<NodeKind>().is_err());
        assert!("unknown".parse::<EdgeKind>().is_err());
    }

    #[test]
    fn test_node_complexity_clamped() {
        let node =
            Node::new("f", NodeKind::Function, "a.ts", 1, 2, "typescript").with_complexity(500);
        assert_eq!(node.complexity, 100);
        let node =
            Node::new("f", NodeKind::Function, "a.ts", 1, 2, "typescript").with_complexity(0);
        assert_eq!(node.complexity, 1);
    }
}
