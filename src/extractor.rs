//! Generic symbol/edge extractor.
//!
//! One pre-order walker serves every supported grammar: syntax node kinds are
//! classified against fixed sets, then refined by a handful of name-based
//! heuristics (methods inside class bodies, React components and hooks, test
//! functions). Cross-file relationships are emitted as unresolved references
//! and materialized later by the resolver, once the whole batch is in the
//! store.

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node as SyntaxNode;

use crate::languages::LanguageSpec;
use crate::types::{Edge, EdgeKind, Node, NodeKind, UnresolvedRef};

const MAX_SIGNATURE_LEN: usize = 300;
const MAX_DOCSTRING_LEN: usize = 500;
const MAX_COMPLEXITY: u32 = 100;

/// Everything extracted from one file.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub nodes: Vec<Node>,
    /// Containment edges only; cross-file edges come from the resolver.
    pub edges: Vec<Edge>,
    pub refs: Vec<UnresolvedRef>,
}

// ── Classification sets ──

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_definition",
    "function_item",
    "generator_function_declaration",
    "arrow_function",
    "function_expression",
    "local_function_statement",
];

const METHOD_KINDS: &[&str] = &[
    "method_definition",
    "method_declaration",
    "constructor_declaration",
    "singleton_method",
    "method",
];

const CLASS_KINDS: &[&str] = &[
    "class_declaration",
    "class_definition",
    "class_specifier",
    "class",
];

const STRUCT_KINDS: &[&str] = &["struct_item", "struct_specifier", "struct_declaration"];

const INTERFACE_KINDS: &[&str] = &["interface_declaration"];

const ENUM_KINDS: &[&str] = &["enum_declaration", "enum_item", "enum_specifier"];

const NAMESPACE_KINDS: &[&str] = &[
    "module",
    "internal_module",
    "mod_item",
    "namespace_declaration",
    "namespace_definition",
];

const TRAIT_KINDS: &[&str] = &["trait_item", "trait_declaration"];

const TYPE_KINDS: &[&str] = &[
    "type_alias_declaration",
    "type_item",
    "type_spec",
    "type_definition",
];

const VARIABLE_KINDS: &[&str] = &["variable_declarator", "const_item", "static_item"];

/// Call-like node kinds scanned for `calls` references.
const CALL_KINDS: &[&str] = &[
    "call_expression",
    "call",
    "method_invocation",
    "invocation_expression",
    "new_expression",
    "object_creation_expression",
    "function_call_expression",
];

/// Import-like statement kinds scanned with the import-path regexes.
const IMPORT_KINDS: &[&str] = &[
    "import_statement",
    "import_declaration",
    "import_from_statement",
    "use_declaration",
    "using_directive",
];

/// Heritage clause kinds; those whose kind name contains "implement" become
/// `implements` references, the rest `extends`.
const HERITAGE_KINDS: &[&str] = &[
    "extends_clause",
    "implements_clause",
    "extends_type_clause",
    "class_heritage",
    "superclass",
    "base_list",
    "base_clause",
    "class_interface_clause",
    "super_interfaces",
];

/// Wrapper kinds that mark their inner declaration as exported.
const EXPORT_WRAPPER_KINDS: &[&str] =
    &["export_statement", "export_declaration", "ambient_declaration"];

// ── Regexes ──

static COMPLEXITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(if|else|for|while|switch|case|catch|match)\b").expect("valid regex")
});

static IMPORT_FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"from\s+["']([^"']+)["']"#).expect("valid regex"));
static IMPORT_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s+["']([^"']+)["']"#).expect("valid regex"));
static IMPORT_REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*["']([^"']+)["']\s*\)"#).expect("valid regex"));
static IMPORT_USE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"use\s+([A-Za-z0-9_:]+)").expect("valid regex"));

/// Extract all symbols, containment edges, and unresolved references from a
/// parsed file. The root node itself is never classified (several grammars
/// name it `module` or `program`).
pub fn extract(
    root: SyntaxNode,
    source: &str,
    file_path: &str,
    lang: &LanguageSpec,
) -> Extraction {
    let mut out = Extraction::default();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        walk(child, source, file_path, lang, None, &mut out);
    }
    out
}

fn walk(
    node: SyntaxNode,
    source: &str,
    file_path: &str,
    lang: &LanguageSpec,
    parent_id: Option<&str>,
    out: &mut Extraction,
) {
    let kind_name = node.kind();

    // Heritage clauses: emit extends/implements refs for the enclosing symbol
    // and stop descending so nested clauses are not double-counted.
    if HERITAGE_KINDS.contains(&kind_name) {
        if let Some(origin) = parent_id {
            collect_heritage(node, source, file_path, origin, &mut out.refs);
        }
        return;
    }

    // Import statements: path-or-module string via regexes.
    if IMPORT_KINDS.contains(&kind_name) {
        if let Some(origin) = parent_id {
            if let Some(module) = import_target(node_text(node, source)) {
                out.refs.push(UnresolvedRef {
                    source_id: origin.to_string(),
                    name: module,
                    kind: EdgeKind::Imports,
                    file_path: file_path.to_string(),
                });
            }
        }
        return;
    }

    // Call sites (including constructor calls). `require("…")` counts as an
    // import, not a call. Descend afterwards: arguments may contain further
    // calls and nested function definitions.
    if CALL_KINDS.contains(&kind_name) {
        if let Some(origin) = parent_id {
            record_call(node, source, file_path, origin, &mut out.refs);
        }
    }

    let classified = classify(node, lang, source);
    let symbol_id = match classified {
        Some((kind, name)) => {
            let node_rec = build_node(node, source, file_path, lang, kind, &name);
            let id = node_rec.id.clone();
            if let Some(pid) = parent_id {
                out.edges.push(Edge::new(pid, id.clone(), EdgeKind::Contains));
            }
            out.nodes.push(node_rec);
            Some(id)
        }
        None => None,
    };

    // Python classes carry their bases in a named field rather than a clause
    // node kind.
    if let (Some(ref id), true) = (&symbol_id, CLASS_KINDS.contains(&kind_name)) {
        if let Some(bases) = node.child_by_field_name("superclasses") {
            collect_heritage(bases, source, file_path, id, &mut out.refs);
        }
    }

    let next_parent = symbol_id.as_deref().or(parent_id);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, source, file_path, lang, next_parent, out);
    }
}

// ── Classification ──

/// Map a syntax node to a symbol kind and name, applying the post-
/// classification refinements in order. Nodes without a discoverable name are
/// not symbols.
fn classify(node: SyntaxNode, lang: &LanguageSpec, source: &str) -> Option<(NodeKind, String)> {
    let kind_name = node.kind();

    let mut kind = if FUNCTION_KINDS.contains(&kind_name) {
        NodeKind::Function
    } else if METHOD_KINDS.contains(&kind_name) {
        NodeKind::Method
    } else if CLASS_KINDS.contains(&kind_name) {
        NodeKind::Class
    } else if STRUCT_KINDS.contains(&kind_name) {
        NodeKind::Struct
    } else if INTERFACE_KINDS.contains(&kind_name) {
        NodeKind::Interface
    } else if ENUM_KINDS.contains(&kind_name) {
        NodeKind::Enum
    } else if NAMESPACE_KINDS.contains(&kind_name) {
        NodeKind::Namespace
    } else if TRAIT_KINDS.contains(&kind_name) {
        NodeKind::Trait
    } else if TYPE_KINDS.contains(&kind_name) {
        NodeKind::Type
    } else if VARIABLE_KINDS.contains(&kind_name) {
        NodeKind::Variable
    } else {
        return None;
    };

    // Anonymous function expressions are handled through their enclosing
    // declarator; only a field-supplied name makes them symbols.
    let name = if matches!(kind_name, "arrow_function" | "function_expression") {
        field_name(node, source)?
    } else {
        discover_name(node, source)?
    };

    // Refinements, applied in order.
    if kind == NodeKind::Function && in_class_body(node) {
        kind = NodeKind::Method;
    }
    if kind == NodeKind::Function
        && matches!(lang.name, "typescript" | "javascript")
        && name.chars().next().is_some_and(char::is_uppercase)
    {
        kind = NodeKind::Component;
    }
    if kind == NodeKind::Function && is_hook_name(&name) {
        kind = NodeKind::Hook;
    }
    if kind == NodeKind::Function && is_test_name(&name) {
        kind = NodeKind::Test;
    }

    Some((kind, name))
}

fn field_name(node: SyntaxNode, source: &str) -> Option<String> {
    for field in ["name", "identifier", "type_identifier", "property_name"] {
        if let Some(child) = node.child_by_field_name(field) {
            let text = node_text(child, source);
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Name discovery: named fields first, then a direct named child of an
/// identifier kind, then one more level down for a bare `identifier`.
fn discover_name(node: SyntaxNode, source: &str) -> Option<String> {
    if let Some(name) = field_name(node, source) {
        return Some(name);
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if matches!(
            child.kind(),
            "identifier" | "type_identifier" | "property_identifier"
        ) {
            return Some(node_text(child, source).to_string());
        }
    }

    for child in node.named_children(&mut cursor) {
        let mut inner = child.walk();
        for grandchild in child.named_children(&mut inner) {
            if grandchild.kind() == "identifier" {
                return Some(node_text(grandchild, source).to_string());
            }
        }
    }

    None
}

fn in_class_body(node: SyntaxNode) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if parent.kind() == "class_body" {
        return true;
    }
    // Shared body kinds need a class-like grandparent: a Rust
    // declaration_list serves mod, trait and impl blocks alike, and a
    // function directly inside a mod is not a method.
    if matches!(parent.kind(), "declaration_list" | "field_declaration_list") {
        if let Some(grandparent) = parent.parent() {
            let kind = grandparent.kind();
            return CLASS_KINDS.contains(&kind)
                || STRUCT_KINDS.contains(&kind)
                || INTERFACE_KINDS.contains(&kind)
                || TRAIT_KINDS.contains(&kind)
                || kind == "impl_item";
        }
        return false;
    }
    // Python/Ruby bodies are generic blocks; require a class-like grandparent.
    if matches!(parent.kind(), "block" | "body_statement") {
        if let Some(grandparent) = parent.parent() {
            return CLASS_KINDS.contains(&grandparent.kind());
        }
    }
    false
}

fn is_hook_name(name: &str) -> bool {
    name.len() > 3 && name.starts_with("use") && name.as_bytes()[3].is_ascii_uppercase()
}

fn is_test_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["test", "it", "describe", "spec"]
        .iter()
        .any(|p| lower.starts_with(p))
}

// ── Node construction ──

fn build_node(
    node: SyntaxNode,
    source: &str,
    file_path: &str,
    lang: &LanguageSpec,
    kind: NodeKind,
    name: &str,
) -> Node {
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;
    let slice = node_text(node, source);

    Node::new(name, kind, file_path, start_line, end_line, lang.name)
        .with_signature(extract_signature(slice))
        .with_docstring(extract_docstring(node, source))
        .with_exported(is_exported(node, slice))
        .with_complexity(complexity(slice))
}

/// Signature: symbol start to the first `{`; else to the first `:` when it
/// occurs within 200 chars; else the first line. Capped at 300 chars.
fn extract_signature(slice: &str) -> Option<String> {
    let sig = if let Some(pos) = slice.find('{') {
        slice[..pos].trim()
    } else if let Some(pos) = slice.find(':').filter(|&p| p < 200) {
        slice[..pos].trim()
    } else {
        slice.lines().next().unwrap_or("").trim()
    };
    if sig.is_empty() {
        return None;
    }
    Some(truncate_chars(sig, MAX_SIGNATURE_LEN))
}

/// Docstring: preceding comment-like named sibling, else a leading
/// string-expression child (Python idiom). Capped at 500 chars.
fn extract_docstring(node: SyntaxNode, source: &str) -> Option<String> {
    if let Some(prev) = node.prev_named_sibling() {
        if matches!(prev.kind(), "comment" | "doc_comment" | "block_comment") {
            return Some(truncate_chars(node_text(prev, source).trim(), MAX_DOCSTRING_LEN));
        }
    }

    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() == "expression_statement" {
        let inner = first.named_child(0)?;
        if inner.kind() == "string" {
            return Some(truncate_chars(node_text(inner, source).trim(), MAX_DOCSTRING_LEN));
        }
    }
    None
}

/// Exported when wrapped in an export/declaration statement, or when the
/// source slice leads with a visibility keyword.
fn is_exported(node: SyntaxNode, slice: &str) -> bool {
    let mut ancestor = node.parent();
    for _ in 0..2 {
        match ancestor {
            Some(a) if EXPORT_WRAPPER_KINDS.contains(&a.kind()) => return true,
            Some(a) => ancestor = a.parent(),
            None => break,
        }
    }

    slice.starts_with("pub ") || slice.starts_with("public ") || slice.starts_with("export ")
}

/// `1 + branch keywords + short-circuit/ternary operators`, capped at 100.
fn complexity(slice: &str) -> u32 {
    let keywords = COMPLEXITY_RE.find_iter(slice).count();
    let operators = slice.matches("&&").count() + slice.matches("||").count()
        + slice.matches('?').count();
    (1 + keywords as u32 + operators as u32).min(MAX_COMPLEXITY)
}

// ── References ──

fn record_call(
    node: SyntaxNode,
    source: &str,
    file_path: &str,
    origin: &str,
    refs: &mut Vec<UnresolvedRef>,
) {
    let callee = node
        .child_by_field_name("function")
        .or_else(|| node.child_by_field_name("name"))
        .or_else(|| node.child_by_field_name("constructor"))
        .or_else(|| node.child_by_field_name("type"))
        .or_else(|| node.child_by_field_name("method"));
    let Some(callee) = callee else { return };

    let text = node_text(callee, source);
    if text.is_empty() {
        return;
    }

    // CommonJS `require("…")` is module plumbing, not a call edge.
    if text == "require" {
        if let Some(module) = import_target(node_text(node, source)) {
            refs.push(UnresolvedRef {
                source_id: origin.to_string(),
                name: module,
                kind: EdgeKind::Imports,
                file_path: file_path.to_string(),
            });
        }
        return;
    }

    let simple = simple_name(text);
    if simple.is_empty() {
        return;
    }
    refs.push(UnresolvedRef {
        source_id: origin.to_string(),
        name: simple.to_string(),
        kind: EdgeKind::Calls,
        file_path: file_path.to_string(),
    });
}

/// Extract the module string from an import-like statement and reduce it to
/// the final path segment (extension stripped), the name the resolver will
/// look up.
fn import_target(text: &str) -> Option<String> {
    let module = IMPORT_FROM_RE
        .captures(text)
        .or_else(|| IMPORT_BARE_RE.captures(text))
        .or_else(|| IMPORT_REQUIRE_RE.captures(text))
        .or_else(|| IMPORT_USE_RE.captures(text))
        .map(|c| c[1].to_string())?;

    let segment = module
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(&module)
        .rsplit("::")
        .next()
        .unwrap_or(&module)
        .trim();
    let segment = segment.rsplit_once('.').map(|(s, _)| s).unwrap_or(segment);
    if segment.is_empty() {
        return None;
    }
    Some(segment.to_string())
}

fn collect_heritage(
    node: SyntaxNode,
    source: &str,
    file_path: &str,
    origin: &str,
    refs: &mut Vec<UnresolvedRef>,
) {
    // Composite clauses (TS class_heritage) recurse into their parts so each
    // part keeps its own extends/implements labeling.
    let mut cursor = node.walk();
    let nested: Vec<SyntaxNode> = node
        .named_children(&mut cursor)
        .filter(|c| HERITAGE_KINDS.contains(&c.kind()))
        .collect();
    if !nested.is_empty() {
        for clause in nested {
            collect_heritage(clause, source, file_path, origin, refs);
        }
        return;
    }

    let kind = if node.kind().contains("implement") {
        EdgeKind::Implements
    } else {
        EdgeKind::Extends
    };

    collect_identifiers(node, source, &mut |name| {
        refs.push(UnresolvedRef {
            source_id: origin.to_string(),
            name: name.to_string(),
            kind,
            file_path: file_path.to_string(),
        });
    });
}

fn collect_identifiers(node: SyntaxNode, source: &str, emit: &mut impl FnMut(&str)) {
    if matches!(node.kind(), "identifier" | "type_identifier" | "constant") {
        emit(node_text(node, source));
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        // Generic arguments name types being used, not inherited.
        if child.kind() == "type_arguments" {
            continue;
        }
        collect_identifiers(child, source, emit);
    }
}

// ── Helpers ──

/// Extract the text of a syntax node from the source. Returns an empty
/// string if byte offsets fall outside the source or on a char boundary.
pub(crate) fn node_text<'a>(node: SyntaxNode, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Reduce `a.b.c` / `a::b::c` / `a->b` to the final segment.
fn simple_name(text: &str) -> &str {
    text.rsplit(['.', ':'])
        .next()
        .unwrap_or(text)
        .rsplit("->")
        .next()
        .unwrap_or(text)
        .trim()
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
