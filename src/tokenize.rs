//! Identifier/prose tokenizer shared by the TF-IDF index, the keyword index
//! query path, and the context builder. Indexing and querying must run the
//! same pipeline or scores drift.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Stop-words filtered from every tokenization: English articles, pronouns
/// and auxiliaries, programming-noise keywords, and the action verbs that
/// dominate task queries ("fix the login bug", "add a handler").
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // Articles, pronouns, auxiliaries, connectives
        "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "do", "does", "did",
        "has", "have", "had", "will", "would", "can", "could", "should", "may", "might", "must",
        "shall", "i", "you", "he", "she", "it", "we", "they", "this", "that", "these", "those",
        "my", "your", "its", "our", "their", "of", "in", "on", "at", "to", "for", "with", "by",
        "as", "and", "or", "not", "but", "if", "then", "than", "so", "all", "any", "some", "no",
        "what", "which", "who", "how", "when", "where", "why",
        // Programming noise
        "get", "set", "let", "var", "const", "return", "void", "null", "true", "false",
        "undefined", "import", "export", "from", "require", "function", "class", "interface",
        "type", "enum", "struct",
        // Task-query action verbs
        "fix", "add", "create", "make", "build", "implement", "change", "update", "modify",
        "write", "code", "file", "files", "method",
    ]
    .into_iter()
    .collect()
});

/// Extra filler filtered only when tokenizing natural-language context
/// queries ("please show me where the auth token is checked").
static CONTEXT_STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "please", "help", "show", "find", "look", "need", "want", "know", "like", "me", "use",
        "used", "using", "new", "into", "about",
    ]
    .into_iter()
    .collect()
});

/// Tokenize identifiers and prose into normalized tokens.
///
/// Pipeline: camelCase split → separator replacement → lowercase →
/// whitespace split → length filter (2..40) → stop-word filter.
/// Applying it twice yields the same token list.
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_with(text, false)
}

/// Tokenize a natural-language task query: the standard pipeline plus the
/// extended context stop-word set.
pub fn tokenize_query(text: &str) -> Vec<String> {
    tokenize_with(text, true)
}

fn tokenize_with(text: &str, context: bool) -> Vec<String> {
    let mut spaced = String::with_capacity(text.len() + 16);
    let mut prev_lower = false;
    for ch in text.chars() {
        match ch {
            '_' | '-' | '.' | '/' | '\\' | ':' => {
                spaced.push(' ');
                prev_lower = false;
            }
            c if c.is_uppercase() => {
                if prev_lower {
                    spaced.push(' ');
                }
                spaced.push(c);
                prev_lower = false;
            }
            c => {
                spaced.push(c);
                prev_lower = c.is_lowercase();
            }
        }
    }

    spaced
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.len() > 1 && t.len() < 40)
        .filter(|t| !STOP_WORDS.contains(t))
        .filter(|t| !context || !CONTEXT_STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}
