//! Language registry and parser adapter.
//!
//! A static table maps file extensions to language descriptors. Grammar
//! objects are constructed lazily on first use and cached process-wide, so
//! indexing a TypeScript-only repository never pays for the other grammars.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{LazyLock, Mutex};

use tree_sitter::{Language, Parser, Tree};
use tree_sitter_language::LanguageFn;

/// Descriptor for a supported language: registry name plus grammar handle.
///
/// `.ts` and `.tsx` share the registry name `typescript` but carry different
/// grammar functions, so extractor heuristics keyed on the language name
/// (component detection) treat them uniformly.
#[derive(Clone, Copy)]
pub struct LanguageSpec {
    pub name: &'static str,
    /// Cache key distinguishing grammar variants that share a registry name.
    key: &'static str,
    grammar: LanguageFn,
}

impl std::fmt::Debug for LanguageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageSpec").field("name", &self.name).finish()
    }
}

/// Extension → descriptor table. Unknown extensions yield `None` and the
/// file is silently skipped by discovery.
pub fn detect_language(path: &Path) -> Option<LanguageSpec> {
    let ext = path.extension()?.to_str()?;
    let (name, key, grammar): (&'static str, &'static str, LanguageFn) = match ext {
        "ts" => (
            "typescript",
            "typescript",
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
        ),
        "tsx" => ("typescript", "tsx", tree_sitter_typescript::LANGUAGE_TSX),
        "js" | "jsx" | "mjs" | "cjs" => {
            ("javascript", "javascript", tree_sitter_javascript::LANGUAGE)
        }
        "py" | "pyi" => ("python", "python", tree_sitter_python::LANGUAGE),
        "rs" => ("rust", "rust", tree_sitter_rust::LANGUAGE),
        "go" => ("go", "go", tree_sitter_go::LANGUAGE),
        "rb" => ("ruby", "ruby", tree_sitter_ruby::LANGUAGE),
        "java" => ("java", "java", tree_sitter_java::LANGUAGE),
        "c" | "h" => ("c", "c", tree_sitter_c::LANGUAGE),
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => ("cpp", "cpp", tree_sitter_cpp::LANGUAGE),
        "cs" => ("c_sharp", "c_sharp", tree_sitter_c_sharp::LANGUAGE),
        "php" => ("php", "php", tree_sitter_php::LANGUAGE_PHP),
        _ => return None,
    };
    Some(LanguageSpec { name, key, grammar })
}

/// Registry names of all supported languages, for config and status output.
pub fn supported_languages() -> Vec<&'static str> {
    vec![
        "typescript",
        "javascript",
        "python",
        "rust",
        "go",
        "ruby",
        "java",
        "c",
        "cpp",
        "c_sharp",
        "php",
    ]
}

/// Process-wide grammar cache, keyed by the grammar function pointer so the
/// `typescript`/`tsx` pair caches both variants. Grammars hold no file
/// handles and are safe to reuse for the lifetime of the process.
static GRAMMAR_CACHE: LazyLock<Mutex<HashMap<&'static str, Language>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn grammar_for(spec: &LanguageSpec) -> Language {
    let mut cache = GRAMMAR_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    cache
        .entry(spec.key)
        .or_insert_with(|| Language::new(spec.grammar))
        .clone()
}

/// Parse source into a concrete syntax tree.
///
/// Returns `None` when the underlying parser fails or the grammar cannot be
/// loaded; callers record that as a parse error against the file and move on.
pub fn parse(source: &str, spec: &LanguageSpec) -> Option<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&grammar_for(spec)).ok()?;
    parser.parse(source, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(Path::new("src/app.ts")).unwrap().name, "typescript");
        assert_eq!(detect_language(Path::new("App.tsx")).unwrap().name, "typescript");
        assert_eq!(detect_language(Path::new("index.js")).unwrap().name, "javascript");
        assert_eq!(detect_language(Path::new("util.mjs")).unwrap().name, "javascript");
        assert_eq!(detect_language(Path::new("main.py")).unwrap().name, "python");
        assert_eq!(detect_language(Path::new("lib.rs")).unwrap().name, "rust");
        assert_eq!(detect_language(Path::new("server.go")).unwrap().name, "go");
        assert_eq!(detect_language(Path::new("app.rb")).unwrap().name, "ruby");
        assert_eq!(detect_language(Path::new("Main.java")).unwrap().name, "java");
        assert_eq!(detect_language(Path::new("io.c")).unwrap().name, "c");
        assert_eq!(detect_language(Path::new("io.hpp")).unwrap().name, "cpp");
        assert_eq!(detect_language(Path::new("App.cs")).unwrap().name, "c_sharp");
        assert_eq!(detect_language(Path::new("index.php")).unwrap().name, "php");
        assert!(detect_language(Path::new("README.md")).is_none());
        assert!(detect_language(Path::new("Makefile")).is_none());
    }

    #[test]
    fn test_parse_typescript() {
        let spec = detect_language(Path::new("a.ts")).unwrap();
        let tree = parse("function foo() {}", &spec).unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn test_parse_python() {
        let spec = detect_language(Path::new("a.py")).unwrap();
        let tree = parse("def foo():\n    pass\n", &spec).unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_grammar_cache_reuse() {
        let spec = detect_language(Path::new("a.rs")).unwrap();
        // Two parses through the same cached grammar must both succeed.
        assert!(parse("fn a() {}", &spec).is_some());
        assert!(parse("fn b() {}", &spec).is_some());
    }
}
