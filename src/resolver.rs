//! Best-effort reference resolver.
//!
//! Runs strictly after every file in a batch has been parsed, so cross-file
//! targets are present. Each textual reference is scored against up to ten
//! name-lookup candidates with locality and export heuristics; the winner
//! becomes a real edge. References with no candidates are silently dropped.

use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use crate::db::Store;
use crate::types::{Edge, EdgeKind, Node, NodeKind, UnresolvedRef};

/// Candidates considered per reference.
const MAX_CANDIDATES: usize = 10;

/// Resolve a batch of references into edges. Returns the number of edges
/// upserted after in-batch deduplication by edge id.
pub fn resolve_references(store: &Store, refs: &[UnresolvedRef]) -> Result<u32> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut edges: Vec<Edge> = Vec::new();

    for reference in refs {
        let candidates = store.get_nodes_by_name(&reference.name, None)?;
        if candidates.is_empty() {
            continue;
        }

        let best = candidates
            .iter()
            .take(MAX_CANDIDATES)
            .max_by(|a, b| {
                score(a, reference)
                    .cmp(&score(b, reference))
                    // Ties prefer the shorter file path (closer to the root).
                    .then_with(|| b.file_path.len().cmp(&a.file_path.len()))
                    .then_with(|| b.id.cmp(&a.id))
            })
            .expect("non-empty candidate list");

        if best.id == reference.source_id {
            continue;
        }

        let edge = Edge::new(&reference.source_id, &best.id, reference.kind);
        if seen.insert(edge.id.clone()) {
            edges.push(edge);
        }
    }

    debug!(
        refs = refs.len(),
        edges = edges.len(),
        "resolved references"
    );
    store.upsert_edges(&edges)?;
    Ok(edges.len() as u32)
}

/// Locality + export scoring. Exact name +10; same file +8, else same
/// directory +5, else up to +3 for shared leading path segments; exported
/// +3; import targets that are containers (class/interface/namespace) +2.
fn score(candidate: &Node, reference: &UnresolvedRef) -> i32 {
    let mut total = 0;

    if candidate.name == reference.name {
        total += 10;
    }

    if candidate.file_path == reference.file_path {
        total += 8;
    } else if parent_dir(&candidate.file_path) == parent_dir(&reference.file_path) {
        total += 5;
    } else {
        total += shared_prefix_segments(&candidate.file_path, &reference.file_path).min(3);
    }

    if candidate.exported {
        total += 3;
    }

    if reference.kind == EdgeKind::Imports
        && matches!(
            candidate.kind,
            NodeKind::Class | NodeKind::Interface | NodeKind::Namespace
        )
    {
        total += 2;
    }

    total
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn shared_prefix_segments(a: &str, b: &str) -> i32 {
    a.split('/')
        .zip(b.split('/'))
        .take_while(|(x, y)| x == y)
        .count() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_node;

    fn make_ref(source: &Node, name: &str, kind: EdgeKind) -> UnresolvedRef {
        UnresolvedRef {
            source_id: source.id.clone(),
            name: name.to_string(),
            kind,
            file_path: source.file_path.clone(),
        }
    }

    fn call_targets(db: &Store, source: &Node) -> Vec<String> {
        db.get_callees(&source.id, 50)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect()
    }

    #[test]
    fn test_resolves_same_file_first() {
        let db = Store::open_memory().unwrap();
        let caller = test_node("process", NodeKind::Function, "src/main.ts", 1);
        let same_file = test_node("helper", NodeKind::Function, "src/main.ts", 20);
        let other_file = test_node("helper", NodeKind::Function, "lib/util.ts", 1);
        db.upsert_nodes(&[caller.clone(), same_file.clone(), other_file])
            .unwrap();

        let resolved = resolve_references(
            &db,
            &[make_ref(&caller, "helper", EdgeKind::Calls)],
        )
        .unwrap();
        assert_eq!(resolved, 1);

        let callees = db.get_callees(&caller.id, 10).unwrap();
        assert_eq!(callees.len(), 1);
        assert_eq!(callees[0].id, same_file.id);
    }

    #[test]
    fn test_same_directory_beats_elsewhere() {
        let db = Store::open_memory().unwrap();
        let caller = test_node("process", NodeKind::Function, "src/auth/main.ts", 1);
        let same_dir = test_node("helper", NodeKind::Function, "src/auth/util.ts", 1);
        let far = test_node("helper", NodeKind::Function, "lib/util.ts", 1);
        db.upsert_nodes(&[caller.clone(), same_dir.clone(), far]).unwrap();

        resolve_references(&db, &[make_ref(&caller, "helper", EdgeKind::Calls)]).unwrap();

        let callees = db.get_callees(&caller.id, 10).unwrap();
        assert_eq!(callees[0].id, same_dir.id);
    }

    #[test]
    fn test_exported_breaks_distance_tie() {
        let db = Store::open_memory().unwrap();
        let caller = test_node("process", NodeKind::Function, "app/main.ts", 1);
        let private = test_node("helper", NodeKind::Function, "pkg_a/util.ts", 1);
        let public = test_node("helper", NodeKind::Function, "pkg_b/util.ts", 1)
            .with_exported(true);
        db.upsert_nodes(&[caller.clone(), private, public.clone()]).unwrap();

        resolve_references(&db, &[make_ref(&caller, "helper", EdgeKind::Calls)]).unwrap();

        let callees = db.get_callees(&caller.id, 10).unwrap();
        assert_eq!(callees[0].id, public.id);
    }

    #[test]
    fn test_import_prefers_container_kinds() {
        let db = Store::open_memory().unwrap();
        let importer = test_node("setup", NodeKind::Function, "app/setup.ts", 1);
        let func = test_node("tokens", NodeKind::Function, "x/tokens.ts", 1);
        let namespace = test_node("tokens", NodeKind::Namespace, "y/tokens.ts", 1);
        db.upsert_nodes(&[importer.clone(), func, namespace.clone()])
            .unwrap();

        resolve_references(&db, &[make_ref(&importer, "tokens", EdgeKind::Imports)]).unwrap();

        let groups = db.get_dependencies(&importer.id).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].kind, EdgeKind::Imports);
        assert_eq!(groups[0].nodes[0].id, namespace.id);
    }

    #[test]
    fn test_tie_prefers_shorter_path() {
        let db = Store::open_memory().unwrap();
        let caller = test_node("process", NodeKind::Function, "app/main.ts", 1);
        let shallow = test_node("helper", NodeKind::Function, "a/h.ts", 1);
        let deep = test_node("helper", NodeKind::Function, "deep/nested/dir/h.ts", 1);
        db.upsert_nodes(&[caller.clone(), shallow.clone(), deep]).unwrap();

        resolve_references(&db, &[make_ref(&caller, "helper", EdgeKind::Calls)]).unwrap();

        let callees = db.get_callees(&caller.id, 10).unwrap();
        assert_eq!(callees[0].id, shallow.id);
    }

    #[test]
    fn test_unknown_reference_is_dropped() {
        let db = Store::open_memory().unwrap();
        let caller = test_node("process", NodeKind::Function, "a.ts", 1);
        db.upsert_node(&caller).unwrap();

        let resolved = resolve_references(
            &db,
            &[make_ref(&caller, "doesNotExist", EdgeKind::Calls)],
        )
        .unwrap();
        assert_eq!(resolved, 0);
        assert!(call_targets(&db, &caller).is_empty());
    }

    #[test]
    fn test_self_reference_not_emitted() {
        let db = Store::open_memory().unwrap();
        let recursive = test_node("fib", NodeKind::Function, "a.ts", 1);
        db.upsert_node(&recursive).unwrap();

        let resolved =
            resolve_references(&db, &[make_ref(&recursive, "fib", EdgeKind::Calls)]).unwrap();
        assert_eq!(resolved, 0);
    }

    #[test]
    fn test_duplicate_refs_dedupe_to_one_edge() {
        let db = Store::open_memory().unwrap();
        let caller = test_node("process", NodeKind::Function, "a.ts", 1);
        let callee = test_node("save", NodeKind::Function, "a.ts", 20);
        db.upsert_nodes(&[caller.clone(), callee]).unwrap();

        // Two call sites for the same target inside one function.
        let refs = vec![
            make_ref(&caller, "save", EdgeKind::Calls),
            make_ref(&caller, "save", EdgeKind::Calls),
        ];
        let resolved = resolve_references(&db, &refs).unwrap();
        assert_eq!(resolved, 1);
        assert_eq!(db.get_stats().unwrap().num_edges, 1);
    }

    #[test]
    fn test_basic_call_edge_scenario() {
        let db = Store::open_memory().unwrap();
        let caller = test_node("caller", NodeKind::Function, "a.ts", 1);
        let callee = test_node("callee", NodeKind::Function, "a.ts", 2);
        db.upsert_nodes(&[caller.clone(), callee.clone()]).unwrap();

        resolve_references(&db, &[make_ref(&caller, "callee", EdgeKind::Calls)]).unwrap();

        let callers = db.get_callers(&callee.id, 10).unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].name, "caller");
        assert_eq!(call_targets(&db, &caller), vec!["callee".to_string()]);
    }
}
