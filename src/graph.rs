//! Graph queries over the store: neighborhood lookups, reverse-BFS impact
//! analysis, undirected shortest paths, cycle detection, dead code and
//! hotspot reports.
//!
//! Neighbor iteration is ordered by node id everywhere so traversal output
//! is stable across runs.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::Result;
use rusqlite::params;
use serde::Serialize;

use crate::db::{row_to_node, Store, NODE_COLUMNS};
use crate::types::{EdgeKind, Node, NodeKind};

/// Edge kinds that express "source depends on target".
pub const DEPENDENCY_KINDS: &[EdgeKind] = &[
    EdgeKind::Calls,
    EdgeKind::Imports,
    EdgeKind::Extends,
    EdgeKind::Implements,
    EdgeKind::UsesType,
];

/// Edge kinds traversed by cycle detection.
const CYCLE_KINDS: &[EdgeKind] = &[
    EdgeKind::Imports,
    EdgeKind::Calls,
    EdgeKind::Extends,
    EdgeKind::Implements,
];

/// Edge kinds that define structural children.
const CHILD_KINDS: &[EdgeKind] = &[
    EdgeKind::HasMethod,
    EdgeKind::HasProperty,
    EdgeKind::Contains,
];

/// Node kinds eligible for the hotspot report.
const HOTSPOT_KINDS: &[NodeKind] = &[
    NodeKind::Function,
    NodeKind::Method,
    NodeKind::Class,
    NodeKind::Interface,
    NodeKind::Component,
    NodeKind::Hook,
];

/// Upper bound on reported cycles.
const MAX_CYCLES: usize = 20;

/// A node reached by impact analysis, with the BFS distance at which it was
/// first seen and the id path back to the origin.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactEntry {
    pub node: Node,
    pub depth: u32,
    pub path: Vec<String>,
}

/// Dependencies or dependents of a node, grouped by edge kind.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborGroup {
    pub kind: EdgeKind,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hotspot {
    pub node: Node,
    pub in_degree: u32,
    pub out_degree: u32,
    pub total_degree: u32,
}

fn kind_list(kinds: &[EdgeKind]) -> String {
    kinds
        .iter()
        .map(|k| format!("'{}'", k.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Store {
    // ── Neighborhoods ──

    /// Nodes that call `id`.
    pub fn get_callers(&self, id: &str, limit: u32) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE id IN (SELECT source_id FROM edges WHERE target_id = ?1 AND kind = 'calls')
                 ORDER BY id LIMIT ?2"
            ),
            params![id, limit],
        )
    }

    /// Nodes that `id` calls.
    pub fn get_callees(&self, id: &str, limit: u32) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE id IN (SELECT target_id FROM edges WHERE source_id = ?1 AND kind = 'calls')
                 ORDER BY id LIMIT ?2"
            ),
            params![id, limit],
        )
    }

    /// Everything `id` points at, across all edge kinds, grouped by kind.
    pub fn get_dependencies(&self, id: &str) -> Result<Vec<NeighborGroup>> {
        self.neighbor_groups(id, true)
    }

    /// Everything pointing at `id`, across all edge kinds, grouped by kind.
    pub fn get_dependents(&self, id: &str) -> Result<Vec<NeighborGroup>> {
        self.neighbor_groups(id, false)
    }

    fn neighbor_groups(&self, id: &str, outgoing: bool) -> Result<Vec<NeighborGroup>> {
        let (own, other) = if outgoing {
            ("source_id", "target_id")
        } else {
            ("target_id", "source_id")
        };
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT e.kind, {} FROM edges e
             JOIN nodes n ON n.id = e.{other}
             WHERE e.{own} = ?1
             ORDER BY e.kind, n.id",
            NODE_COLUMNS
                .split(", ")
                .map(|c| format!("n.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;

        let rows = stmt
            .query_map(params![id], |row| {
                let kind: String = row.get(0)?;
                let node = row_to_node_offset(row, 1)?;
                Ok((kind, node))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut groups: Vec<NeighborGroup> = Vec::new();
        for (kind_str, node) in rows {
            let kind: EdgeKind = kind_str.parse().unwrap_or(EdgeKind::Calls);
            match groups.last_mut() {
                Some(g) if g.kind == kind => g.nodes.push(node),
                _ => groups.push(NeighborGroup {
                    kind,
                    nodes: vec![node],
                }),
            }
        }
        Ok(groups)
    }

    /// Structural children (`has_method`, `has_property`, `contains`),
    /// ordered by their position in the file.
    pub fn get_children(&self, id: &str) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE id IN (SELECT target_id FROM edges
                              WHERE source_id = ?1 AND kind IN ({}))
                 ORDER BY start_line",
                kind_list(CHILD_KINDS)
            ),
            params![id],
        )
    }

    // ── Impact radius ──

    /// Reverse BFS along dependency edges: everything that transitively
    /// depends on `id`, up to `max_depth` hops. The starting node itself is
    /// excluded.
    pub fn get_impact_radius(&self, id: &str, max_depth: u32) -> Result<Vec<ImpactEntry>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT source_id FROM edges
             WHERE target_id = ?1 AND kind IN ({})
             ORDER BY source_id",
            kind_list(DEPENDENCY_KINDS)
        ))?;

        let mut entries: Vec<ImpactEntry> = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([id.to_string()]);
        let mut queue: VecDeque<(String, u32, Vec<String>)> =
            VecDeque::from([(id.to_string(), 0, vec![id.to_string()])]);

        while let Some((current, depth, path)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let dependents: Vec<String> = stmt
                .query_map(params![current], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for dep in dependents {
                if !visited.insert(dep.clone()) {
                    continue;
                }
                let mut dep_path = path.clone();
                dep_path.push(dep.clone());
                if let Some(node) = self.get_node(&dep)? {
                    entries.push(ImpactEntry {
                        node,
                        depth: depth + 1,
                        path: dep_path.clone(),
                    });
                }
                queue.push_back((dep, depth + 1, dep_path));
            }
        }

        Ok(entries)
    }

    // ── Shortest path ──

    /// BFS over the undirected union of all edges. Returns the node sequence
    /// from `from` to `to`, `None` when unreachable within `max_depth`.
    /// `from == to` yields a single-element path.
    pub fn find_path(&self, from: &str, to: &str, max_depth: u32) -> Result<Option<Vec<Node>>> {
        if from == to {
            return Ok(self.get_node(from)?.map(|n| vec![n]));
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT target_id AS other FROM edges WHERE source_id = ?1
             UNION
             SELECT source_id AS other FROM edges WHERE target_id = ?1
             ORDER BY other",
        )?;

        let mut parent: HashMap<String, String> = HashMap::new();
        let mut queue: VecDeque<(String, u32)> = VecDeque::from([(from.to_string(), 0)]);
        let mut visited: HashSet<String> = HashSet::from([from.to_string()]);
        let mut found = false;

        'bfs: while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let neighbors: Vec<String> = stmt
                .query_map(params![current], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for neighbor in neighbors {
                if !visited.insert(neighbor.clone()) {
                    continue;
                }
                parent.insert(neighbor.clone(), current.clone());
                if neighbor == to {
                    found = true;
                    break 'bfs;
                }
                queue.push_back((neighbor, depth + 1));
            }
        }

        if !found {
            return Ok(None);
        }

        // Reconstruct target → source through parent pointers.
        let mut ids = vec![to.to_string()];
        let mut cursor = to.to_string();
        while let Some(prev) = parent.get(&cursor) {
            ids.push(prev.clone());
            cursor = prev.clone();
        }
        ids.reverse();

        let mut nodes = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.get_node(id)? {
                Some(node) => nodes.push(node),
                None => return Ok(None),
            }
        }
        Ok(Some(nodes))
    }

    // ── Cycle detection ──

    /// Three-color DFS over import/call/inheritance edges. At most 20 cycles
    /// are reported; each starts and ends at the same node. The parent map is
    /// shared across branches, so a cycle reconstructed through a branching
    /// discovery path may be approximate.
    pub fn find_circular_deps(&self) -> Result<Vec<Vec<Node>>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT source_id, target_id FROM edges WHERE kind IN ({})
             ORDER BY source_id, target_id",
            kind_list(CYCLE_KINDS)
        ))?;
        let edges: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for (src, dst) in &edges {
            adjacency.entry(src).or_default().push(dst);
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color: HashMap<&str, Color> = HashMap::new();
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut cycles: Vec<Vec<String>> = Vec::new();

        let mut roots: Vec<&str> = adjacency.keys().copied().collect();
        roots.sort_unstable();

        for root in roots {
            if cycles.len() >= MAX_CYCLES {
                break;
            }
            if *color.get(root).unwrap_or(&Color::White) != Color::White {
                continue;
            }

            // Iterative DFS: (node, next-neighbor index).
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            color.insert(root, Color::Gray);

            while let Some(frame) = stack.last_mut() {
                let current = frame.0;
                let neighbors = adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]);
                if frame.1 >= neighbors.len() {
                    color.insert(current, Color::Black);
                    stack.pop();
                    continue;
                }
                let target = neighbors[frame.1];
                frame.1 += 1;

                match *color.get(target).unwrap_or(&Color::White) {
                    Color::White => {
                        parent.insert(target, current);
                        color.insert(target, Color::Gray);
                        stack.push((target, 0));
                    }
                    Color::Gray => {
                        if cycles.len() < MAX_CYCLES {
                            cycles.push(reconstruct_cycle(&parent, current, target));
                        }
                    }
                    Color::Black => {}
                }
            }
        }

        let mut hydrated = Vec::with_capacity(cycles.len());
        for cycle in cycles {
            let mut nodes = Vec::with_capacity(cycle.len());
            for id in &cycle {
                if let Some(node) = self.get_node(id)? {
                    nodes.push(node);
                }
            }
            if nodes.len() >= 3 {
                hydrated.push(nodes);
            }
        }
        Ok(hydrated)
    }

    // ── Reports ──

    /// Nodes of the requested kinds with zero incoming dependency edges.
    /// Unless `include_exported` is set, only non-exported symbols are
    /// candidates (a public API with no internal callers is not dead).
    /// Entry-point names (`main`, `index`, `app`) are never reported.
    pub fn find_dead_code(
        &self,
        kinds: &[NodeKind],
        include_exported: bool,
    ) -> Result<Vec<Node>> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }
        let node_kinds = kinds
            .iter()
            .map(|k| format!("'{}'", k.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let exported_clause = if include_exported { "" } else { "AND exported = 0" };

        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE kind IN ({node_kinds}) {exported_clause}
                   AND LOWER(name) NOT IN ('main', 'index', 'app')
                   AND id NOT IN (SELECT target_id FROM edges WHERE kind IN ({}))
                 ORDER BY file_path, start_line",
                kind_list(DEPENDENCY_KINDS)
            ),
            [],
        )
    }

    /// Top-N nodes by combined in/out degree across all edge kinds.
    pub fn find_hotspots(&self, limit: u32) -> Result<Vec<Hotspot>> {
        let node_kinds = HOTSPOT_KINDS
            .iter()
            .map(|k| format!("'{}'", k.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {NODE_COLUMNS},
                    (SELECT COUNT(*) FROM edges WHERE target_id = nodes.id) AS in_degree,
                    (SELECT COUNT(*) FROM edges WHERE source_id = nodes.id) AS out_degree
             FROM nodes
             WHERE kind IN ({node_kinds})
             ORDER BY in_degree + out_degree DESC, id
             LIMIT ?1"
        ))?;

        let rows = stmt
            .query_map(params![limit], |row| {
                let node = row_to_node(row)?;
                let in_degree: u32 = row.get(13)?;
                let out_degree: u32 = row.get(14)?;
                Ok(Hotspot {
                    node,
                    in_degree,
                    out_degree,
                    total_degree: in_degree + out_degree,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All nodes at or above the complexity threshold, most complex first.
    pub fn get_complexity_report(&self, threshold: u32) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE complexity >= ?1
                 ORDER BY complexity DESC, id"
            ),
            params![threshold],
        )
    }
}

/// Walk the parent chain from `current` back to `target`, then close the
/// loop: `[target, …, current, target]` reversed into discovery order.
fn reconstruct_cycle(
    parent: &HashMap<&str, &str>,
    current: &str,
    target: &str,
) -> Vec<String> {
    let mut chain = vec![current.to_string()];
    let mut cursor = current;
    while cursor != target {
        match parent.get(cursor) {
            Some(&prev) => {
                chain.push(prev.to_string());
                cursor = prev;
            }
            None => break,
        }
    }
    chain.reverse();
    chain.push(target.to_string());
    chain
}

fn row_to_node_offset(row: &rusqlite::Row<'_>, off: usize) -> rusqlite::Result<Node> {
    let kind_str = row.get::<_, String>(off + 1)?;
    let kind = kind_str.parse().unwrap_or(NodeKind::Variable);
    let metadata = row
        .get::<_, Option<String>>(off + 12)?
        .and_then(|m| serde_json::from_str(&m).ok());
    Ok(Node {
        id: row.get(off)?,
        kind,
        name: row.get(off + 2)?,
        qualified_name: row.get(off + 3)?,
        file_path: row.get(off + 4)?,
        start_line: row.get(off + 5)?,
        end_line: row.get(off + 6)?,
        language: row.get(off + 7)?,
        signature: row.get(off + 8)?,
        docstring: row.get(off + 9)?,
        exported: row.get(off + 10)?,
        complexity: row.get(off + 11)?,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_node;
    use crate::types::Edge;

    fn seed(db: &Store, names: &[&str]) -> Vec<Node> {
        let nodes: Vec<Node> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                test_node(name, NodeKind::Function, &format!("{name}.ts"), i as u32 + 1)
            })
            .collect();
        db.upsert_nodes(&nodes).unwrap();
        nodes
    }

    fn link(db: &Store, from: &Node, to: &Node, kind: EdgeKind) {
        db.upsert_edge(&Edge::new(&from.id, &to.id, kind)).unwrap();
    }

    #[test]
    fn test_callers_and_callees() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["caller", "callee"]);
        link(&db, &nodes[0], &nodes[1], EdgeKind::Calls);

        let callers = db.get_callers(&nodes[1].id, 10).unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].name, "caller");

        let callees = db.get_callees(&nodes[0].id, 10).unwrap();
        assert_eq!(callees.len(), 1);
        assert_eq!(callees[0].name, "callee");

        assert!(db.get_callers(&nodes[0].id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_dependencies_grouped_by_kind() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["a", "b", "c"]);
        link(&db, &nodes[0], &nodes[1], EdgeKind::Calls);
        link(&db, &nodes[0], &nodes[2], EdgeKind::Imports);

        let groups = db.get_dependencies(&nodes[0].id).unwrap();
        assert_eq!(groups.len(), 2);
        // Grouped and ordered by kind string: calls < imports
        assert_eq!(groups[0].kind, EdgeKind::Calls);
        assert_eq!(groups[0].nodes[0].name, "b");
        assert_eq!(groups[1].kind, EdgeKind::Imports);

        let dependents = db.get_dependents(&nodes[1].id).unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].nodes[0].name, "a");
    }

    #[test]
    fn test_children_ordered_by_line() {
        let db = Store::open_memory().unwrap();
        let class = test_node("Svc", NodeKind::Class, "svc.ts", 1);
        let late = test_node("late", NodeKind::Method, "svc.ts", 30);
        let early = test_node("early", NodeKind::Method, "svc.ts", 5);
        db.upsert_nodes(&[class.clone(), late.clone(), early.clone()])
            .unwrap();
        link(&db, &class, &late, EdgeKind::Contains);
        link(&db, &class, &early, EdgeKind::Contains);

        let children = db.get_children(&class.id).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "early");
        assert_eq!(children[1].name, "late");
    }

    #[test]
    fn test_impact_radius_chain() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["base", "middle", "top"]);
        // top depends on middle depends on base
        link(&db, &nodes[1], &nodes[0], EdgeKind::Calls);
        link(&db, &nodes[2], &nodes[1], EdgeKind::Calls);

        let impact = db.get_impact_radius(&nodes[0].id, 3).unwrap();
        assert_eq!(impact.len(), 2);
        let middle = impact.iter().find(|e| e.node.name == "middle").unwrap();
        assert_eq!(middle.depth, 1);
        let top = impact.iter().find(|e| e.node.name == "top").unwrap();
        assert_eq!(top.depth, 2);
        // Path runs origin → dependent
        assert_eq!(top.path.len(), 3);
        assert_eq!(top.path[0], nodes[0].id);
        assert_eq!(top.path[2], nodes[2].id);
    }

    #[test]
    fn test_impact_radius_respects_depth() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["base", "middle", "top"]);
        link(&db, &nodes[1], &nodes[0], EdgeKind::Calls);
        link(&db, &nodes[2], &nodes[1], EdgeKind::Calls);

        let impact = db.get_impact_radius(&nodes[0].id, 1).unwrap();
        assert_eq!(impact.len(), 1);
        assert_eq!(impact[0].node.name, "middle");
    }

    #[test]
    fn test_impact_radius_leaf_is_empty() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["leaf", "other"]);
        // leaf depends on other; nothing depends on leaf
        link(&db, &nodes[0], &nodes[1], EdgeKind::Calls);
        assert!(db.get_impact_radius(&nodes[0].id, 5).unwrap().is_empty());
    }

    #[test]
    fn test_impact_radius_excludes_contains_edges() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["inner", "outer"]);
        link(&db, &nodes[1], &nodes[0], EdgeKind::Contains);
        assert!(db.get_impact_radius(&nodes[0].id, 5).unwrap().is_empty());
    }

    #[test]
    fn test_find_path_chain() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["start", "middle", "end"]);
        link(&db, &nodes[0], &nodes[1], EdgeKind::Calls);
        link(&db, &nodes[1], &nodes[2], EdgeKind::Calls);

        let path = db.find_path(&nodes[0].id, &nodes[2].id, 10).unwrap().unwrap();
        let names: Vec<&str> = path.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["start", "middle", "end"]);
    }

    #[test]
    fn test_find_path_is_undirected() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["start", "end"]);
        // Edge points end → start; path start → end still exists.
        link(&db, &nodes[1], &nodes[0], EdgeKind::Calls);
        let path = db.find_path(&nodes[0].id, &nodes[1].id, 10).unwrap();
        assert_eq!(path.unwrap().len(), 2);
    }

    #[test]
    fn test_find_path_self_is_single_element() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["only"]);
        let path = db.find_path(&nodes[0].id, &nodes[0].id, 10).unwrap().unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].name, "only");
    }

    #[test]
    fn test_find_path_unreachable_is_none() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["isolated1", "isolated2"]);
        assert!(db
            .find_path(&nodes[0].id, &nodes[1].id, 10)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_path_depth_bound() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["a", "b", "c", "d"]);
        link(&db, &nodes[0], &nodes[1], EdgeKind::Calls);
        link(&db, &nodes[1], &nodes[2], EdgeKind::Calls);
        link(&db, &nodes[2], &nodes[3], EdgeKind::Calls);

        assert!(db.find_path(&nodes[0].id, &nodes[3].id, 2).unwrap().is_none());
        assert!(db.find_path(&nodes[0].id, &nodes[3].id, 3).unwrap().is_some());
    }

    #[test]
    fn test_cycles_on_dag_is_empty() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["a", "b", "c"]);
        link(&db, &nodes[0], &nodes[1], EdgeKind::Imports);
        link(&db, &nodes[1], &nodes[2], EdgeKind::Imports);
        link(&db, &nodes[0], &nodes[2], EdgeKind::Imports);

        assert!(db.find_circular_deps().unwrap().is_empty());
    }

    #[test]
    fn test_cycles_detects_triangle() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["a", "b", "c"]);
        link(&db, &nodes[0], &nodes[1], EdgeKind::Imports);
        link(&db, &nodes[1], &nodes[2], EdgeKind::Imports);
        link(&db, &nodes[2], &nodes[0], EdgeKind::Imports);

        let cycles = db.find_circular_deps().unwrap();
        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        // Starts and ends at the same node, visits at least two distinct ones.
        assert_eq!(cycle.first().unwrap().id, cycle.last().unwrap().id);
        let distinct: HashSet<&str> = cycle.iter().map(|n| n.id.as_str()).collect();
        assert!(distinct.len() >= 2);
    }

    #[test]
    fn test_cycles_ignore_contains_edges() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["a", "b"]);
        link(&db, &nodes[0], &nodes[1], EdgeKind::Contains);
        link(&db, &nodes[1], &nodes[0], EdgeKind::Contains);
        assert!(db.find_circular_deps().unwrap().is_empty());
    }

    #[test]
    fn test_dead_code_scenario() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["used", "unused", "main"]);
        link(&db, &nodes[2], &nodes[0], EdgeKind::Calls);

        let dead = db.find_dead_code(&[NodeKind::Function], true).unwrap();
        let names: Vec<&str> = dead.iter().map(|n| n.name.as_str()).collect();
        assert!(names.contains(&"unused"));
        assert!(!names.contains(&"used"));
        // Entry points are never dead, even with zero incoming edges.
        assert!(!names.contains(&"main"));
    }

    #[test]
    fn test_dead_code_excludes_exported_by_default() {
        let db = Store::open_memory().unwrap();
        let public = test_node("api", NodeKind::Function, "api.ts", 1).with_exported(true);
        let private = test_node("helper", NodeKind::Function, "api.ts", 10);
        db.upsert_nodes(&[public, private]).unwrap();

        let dead = db.find_dead_code(&[NodeKind::Function], false).unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].name, "helper");

        let all = db.find_dead_code(&[NodeKind::Function], true).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_dead_code_kind_filter() {
        let db = Store::open_memory().unwrap();
        db.upsert_node(&test_node("orphanClass", NodeKind::Class, "a.ts", 1))
            .unwrap();
        db.upsert_node(&test_node("orphanFn", NodeKind::Function, "a.ts", 10))
            .unwrap();

        let dead = db.find_dead_code(&[NodeKind::Class], true).unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].name, "orphanClass");
    }

    #[test]
    fn test_hotspot_scenario() {
        let db = Store::open_memory().unwrap();
        let nodes = seed(&db, &["H", "A", "B", "C"]);
        link(&db, &nodes[1], &nodes[0], EdgeKind::Calls);
        link(&db, &nodes[2], &nodes[0], EdgeKind::Calls);
        link(&db, &nodes[3], &nodes[0], EdgeKind::Calls);

        let hotspots = db.find_hotspots(5).unwrap();
        assert_eq!(hotspots[0].node.name, "H");
        assert_eq!(hotspots[0].in_degree, 3);
        assert_eq!(hotspots[0].out_degree, 0);
        assert_eq!(hotspots[0].total_degree, 3);
    }

    #[test]
    fn test_hotspots_only_code_kinds() {
        let db = Store::open_memory().unwrap();
        let var = test_node("config", NodeKind::Variable, "a.ts", 1);
        let f = test_node("f", NodeKind::Function, "a.ts", 5);
        db.upsert_nodes(&[var.clone(), f.clone()]).unwrap();
        link(&db, &f, &var, EdgeKind::UsesType);

        let hotspots = db.find_hotspots(5).unwrap();
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].node.name, "f");
    }

    #[test]
    fn test_complexity_report() {
        let db = Store::open_memory().unwrap();
        db.upsert_node(
            &test_node("gnarly", NodeKind::Function, "a.ts", 1).with_complexity(25),
        )
        .unwrap();
        db.upsert_node(&test_node("simple", NodeKind::Function, "a.ts", 50))
            .unwrap();

        let report = db.get_complexity_report(10).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].name, "gnarly");
        assert!(db.get_complexity_report(1).unwrap().len() == 2);
    }
}
