//! Genealogy traversal over the advisor graph.
//!
//! Trees are grown one generation at a time with a per-path guard: a
//! person already on the path from the root is not expanded again, which
//! breaks cycles from bad data while still letting the same person show up
//! in sibling branches. Statistics use a breadth-first walk with a global visited set
//! so each descendant is counted once no matter how many paths reach it.

use crate::graph::{GraphError, LineageGraph, Link, NodeId};
use lineage_core::{AdvisorRole, Person};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Deepest lineage a tree query will expand.
pub const MAX_LINEAGE_DEPTH: usize = 32;

/// Node budget for a single tree.
pub const MAX_TREE_NODES: usize = 10_000;

/// Which way to walk from a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageDirection {
    /// Advisors, their advisors, and so on.
    Ancestors,
    /// Students, their students, and so on.
    Descendants,
}

impl std::fmt::Display for LineageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineageDirection::Ancestors => write!(f, "ancestors"),
            LineageDirection::Descendants => write!(f, "descendants"),
        }
    }
}

/// A person in a lineage tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    pub id: String,
    pub name: String,
    pub years: Option<String>,
    /// Roles on the link to the parent node; empty for the root.
    pub roles: Vec<AdvisorRole>,
    /// Dissertations behind the link to the parent node.
    pub dissertation_ids: Vec<String>,
    /// Generations from the root.
    pub depth: usize,
    pub children: Vec<LineageNode>,
}

impl LineageNode {
    fn new(person: &Person, depth: usize) -> Self {
        Self {
            id: person.id.clone(),
            name: person.name.clone(),
            years: person.years.clone(),
            roles: Vec::new(),
            dissertation_ids: Vec::new(),
            depth,
            children: Vec::new(),
        }
    }
}

/// A rooted lineage tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageTree {
    pub direction: LineageDirection,
    pub root: LineageNode,
    /// Depth limit actually applied.
    pub max_depth: usize,
    /// Nodes below the root.
    pub node_count: usize,
    /// True if the node budget cut the tree short.
    pub truncated: bool,
}

impl LineageTree {
    /// True when the root has no relations in this direction.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

/// Descendant counts for a person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescendantStats {
    /// Distinct people reachable through one or more student hops.
    pub total_descendants: usize,
    /// Greatest generation at which a descendant is first reached.
    pub max_generation_depth: usize,
    /// Distinct direct students.
    pub direct_students: usize,
}

/// Clamps a requested depth; 0 means the maximum.
pub fn effective_depth(max_depth: usize) -> usize {
    if max_depth == 0 {
        MAX_LINEAGE_DEPTH
    } else {
        max_depth.min(MAX_LINEAGE_DEPTH)
    }
}

/// A tree position while the tree is being grown. The root slot holds no
/// node; it is passed to `assemble` directly.
struct Slot {
    index: NodeId,
    parent: Option<usize>,
    node: Option<LineageNode>,
}

/// Level-by-level tree growth.
///
/// Each generation is fully expanded before the next one starts, so the
/// node budget can only cut off the deepest generations.
struct TreeWalk<'g> {
    graph: &'g LineageGraph,
    direction: LineageDirection,
    max_depth: usize,
    slots: Vec<Slot>,
    remaining: usize,
    truncated: bool,
}

impl<'g> TreeWalk<'g> {
    fn new(graph: &'g LineageGraph, direction: LineageDirection, max_depth: usize) -> Self {
        Self {
            graph,
            direction,
            max_depth,
            slots: Vec::new(),
            remaining: MAX_TREE_NODES,
            truncated: false,
        }
    }

    /// True if `index` is `slot` or one of its tree ancestors.
    fn on_path(&self, mut slot: usize, index: NodeId) -> bool {
        loop {
            if self.slots[slot].index == index {
                return true;
            }
            match self.slots[slot].parent {
                Some(parent) => slot = parent,
                None => return false,
            }
        }
    }

    fn grow(mut self, root: NodeId, root_node: LineageNode) -> LineageTree {
        let graph = self.graph;
        self.slots.push(Slot {
            index: root,
            parent: None,
            node: None,
        });
        let mut frontier = vec![0];

        'levels: for depth in 1..=self.max_depth {
            let mut next = Vec::new();

            for &slot in &frontier {
                let groups = match self.direction {
                    LineageDirection::Ancestors => graph.advisor_groups(self.slots[slot].index),
                    LineageDirection::Descendants => graph.student_groups(self.slots[slot].index),
                };

                for (neighbor, links) in groups {
                    if self.on_path(slot, neighbor) {
                        debug!("Cycle at {:?}; not expanding", neighbor);
                        continue;
                    }
                    if self.remaining == 0 {
                        self.truncated = true;
                        break 'levels;
                    }
                    let Some(person) = graph.get(neighbor) else {
                        continue;
                    };
                    self.remaining -= 1;

                    let mut node = LineageNode::new(person, depth);
                    attach_links(&mut node, &links);
                    self.slots.push(Slot {
                        index: neighbor,
                        parent: Some(slot),
                        node: Some(node),
                    });
                    next.push(self.slots.len() - 1);
                }
            }

            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let node_count = MAX_TREE_NODES - self.remaining;
        LineageTree {
            direction: self.direction,
            root: self.assemble(root_node),
            max_depth: self.max_depth,
            node_count,
            truncated: self.truncated,
        }
    }

    /// Nests grown slots under the root. Children always come after their
    /// parent, so a reverse pass finishes every child before its parent.
    fn assemble(&mut self, mut root: LineageNode) -> LineageNode {
        let mut children: Vec<Vec<LineageNode>> = vec![Vec::new(); self.slots.len()];

        for i in (1..self.slots.len()).rev() {
            let (Some(mut node), Some(parent)) = (self.slots[i].node.take(), self.slots[i].parent)
            else {
                continue;
            };
            node.children = std::mem::take(&mut children[i]);
            node.children.reverse();
            children[parent].push(node);
        }

        root.children = std::mem::take(&mut children[0]);
        root.children.reverse();
        root
    }
}

fn attach_links(node: &mut LineageNode, links: &[Link<'_>]) {
    for link in links {
        if !node.roles.contains(link.role) {
            node.roles.push(link.role.clone());
        }
        if !node.dissertation_ids.iter().any(|d| d == link.dissertation_id) {
            node.dissertation_ids.push(link.dissertation_id.to_string());
        }
    }
}

impl LineageGraph {
    /// Builds the lineage tree of a person in one direction.
    ///
    /// `max_depth` is clamped to [`MAX_LINEAGE_DEPTH`]; 0 means the maximum.
    /// A person with no relations in that direction yields a tree with no
    /// children.
    pub fn lineage_tree(
        &self,
        person_id: &str,
        direction: LineageDirection,
        max_depth: usize,
    ) -> Result<LineageTree, GraphError> {
        let root = self.require_index(person_id)?;
        let person = self
            .get(root)
            .ok_or_else(|| GraphError::PersonNotFound(person_id.to_string()))?;
        let max_depth = effective_depth(max_depth);

        let tree =
            TreeWalk::new(self, direction, max_depth).grow(root, LineageNode::new(person, 0));
        if tree.truncated {
            debug!(
                "Lineage of {} truncated after {} nodes",
                person_id, tree.node_count
            );
        }

        Ok(tree)
    }

    /// Builds the descendant tree of a person.
    pub fn descendant_tree(
        &self,
        person_id: &str,
        max_depth: usize,
    ) -> Result<LineageTree, GraphError> {
        self.lineage_tree(person_id, LineageDirection::Descendants, max_depth)
    }

    /// Builds the ancestor tree of a person.
    pub fn ancestor_tree(&self, person_id: &str, max_depth: usize) -> Result<LineageTree, GraphError> {
        self.lineage_tree(person_id, LineageDirection::Ancestors, max_depth)
    }

    /// Returns a person's ancestors grouped by generation.
    ///
    /// The first generation holds the direct advisors, the next their
    /// advisors, and so on. Within a generation each person appears once,
    /// at the position it was first reached. If the node budget runs out,
    /// only the last generation returned is incomplete.
    pub fn ancestor_chain(
        &self,
        person_id: &str,
        max_depth: usize,
    ) -> Result<Vec<Vec<&Person>>, GraphError> {
        let tree = self.ancestor_tree(person_id, max_depth)?;
        if tree.truncated {
            warn!(
                "Ancestors of {} cut off at {} nodes; deepest generation incomplete",
                person_id, tree.node_count
            );
        }
        Ok(generations(&tree)
            .into_iter()
            .map(|ids| {
                ids.into_iter()
                    .filter_map(|id| self.get_index(id).and_then(|i| self.get(i)))
                    .collect()
            })
            .collect())
    }

    /// Counts a person's distinct descendants and the generation depth
    /// they reach.
    ///
    /// Breadth-first with a global visited set; each person is counted
    /// once, at the level where it is first reached.
    pub fn descendant_stats(&self, person_id: &str) -> Result<DescendantStats, GraphError> {
        let root = self.require_index(person_id)?;

        let mut stats = DescendantStats::default();
        let mut visited: HashSet<NodeId> = HashSet::from([root]);
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::from([(root, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            for student in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if !visited.insert(student) {
                    continue;
                }

                stats.total_descendants += 1;
                stats.max_generation_depth = stats.max_generation_depth.max(depth + 1);
                if depth == 0 {
                    stats.direct_students += 1;
                }

                queue.push_back((student, depth + 1));
            }
        }

        Ok(stats)
    }
}

/// Flattens a tree into generations of ids, skipping the root and
/// de-duplicating within each level.
pub fn generations(tree: &LineageTree) -> Vec<Vec<&str>> {
    let mut levels = Vec::new();
    let mut frontier: Vec<&LineageNode> = vec![&tree.root];

    loop {
        let next: Vec<&LineageNode> = frontier
            .iter()
            .flat_map(|node| node.children.iter())
            .collect();
        if next.is_empty() {
            break;
        }

        let mut seen = HashSet::new();
        let level: Vec<&str> = next
            .iter()
            .map(|node| node.id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();
        levels.push(level);

        frontier = next;
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use lineage_core::DissertationRecord;

    /// Builds a graph from (advisor, student) pairs. Each student gets one
    /// dissertation listing all of its advisors in pair order.
    fn graph_of(pairs: &[(&str, &str)]) -> LineageGraph {
        let mut order: Vec<&str> = Vec::new();
        for (a, s) in pairs {
            for id in [a, s] {
                if !order.contains(id) {
                    order.push(*id);
                }
            }
        }

        let records = order
            .iter()
            .map(|id| {
                pairs
                    .iter()
                    .filter(|(_, s)| s == id)
                    .fold(
                        DissertationRecord::new(format!("d-{}", id), *id, id.to_uppercase()),
                        |record, (a, _)| {
                            record.with_advisor(*a, a.to_uppercase(), AdvisorRole::Advisor)
                        },
                    )
            })
            .collect();

        let mut builder = GraphBuilder::new();
        builder.add_records(records);
        builder.build()
    }

    fn ids(people: &[&Person]) -> Vec<String> {
        people.iter().map(|p| p.id.clone()).collect()
    }

    fn contains_below(node: &LineageNode, id: &str) -> bool {
        node.children
            .iter()
            .any(|c| c.id == id || contains_below(c, id))
    }

    #[test]
    fn test_linear_chain_stats() {
        // A → B → C → D
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("c", "d")]);
        let stats = graph.descendant_stats("a").unwrap();

        assert_eq!(stats.total_descendants, 3);
        assert_eq!(stats.max_generation_depth, 3);
        assert_eq!(stats.direct_students, 1);
    }

    #[test]
    fn test_joint_advising_counted_once() {
        //   A   B
        //    \ /
        //     S
        let graph = graph_of(&[("a", "s"), ("b", "s")]);

        assert_eq!(graph.descendant_stats("a").unwrap().total_descendants, 1);
        assert_eq!(graph.descendant_stats("b").unwrap().total_descendants, 1);
    }

    #[test]
    fn test_diamond_counted_once() {
        //     A
        //    / \
        //   B   C
        //    \ /
        //     D
        let graph = graph_of(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let stats = graph.descendant_stats("a").unwrap();

        assert_eq!(stats.total_descendants, 3);
        assert_eq!(stats.max_generation_depth, 2);
        assert_eq!(stats.direct_students, 2);
    }

    #[test]
    fn test_depth_is_first_reached_level() {
        // A → B → C and A → C: C is first reached at level 1
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("a", "c")]);
        let stats = graph.descendant_stats("a").unwrap();

        assert_eq!(stats.total_descendants, 2);
        assert_eq!(stats.max_generation_depth, 1);
    }

    #[test]
    fn test_stats_terminate_on_cycle() {
        // A → B → C → A
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let stats = graph.descendant_stats("a").unwrap();

        assert_eq!(stats.total_descendants, 2);
        assert_eq!(stats.max_generation_depth, 2);
    }

    #[test]
    fn test_descendant_tree_breaks_two_cycle() {
        // A → B and B → A
        let graph = graph_of(&[("a", "b"), ("b", "a")]);
        let tree = graph.descendant_tree("a", 5).unwrap();

        assert_eq!(tree.root.children.len(), 1);
        let b = &tree.root.children[0];
        assert_eq!(b.id, "b");
        assert!(b.children.is_empty());
        assert!(!contains_below(&tree.root, "a"));
        assert_eq!(tree.node_count, 1);
    }

    #[test]
    fn test_self_advising_not_expanded() {
        let graph = graph_of(&[("a", "a"), ("a", "b")]);
        let tree = graph.descendant_tree("a", 5).unwrap();

        let children: Vec<&str> = tree.root.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(children, vec!["b"]);
        assert_eq!(graph.descendant_stats("a").unwrap().total_descendants, 1);
    }

    #[test]
    fn test_sibling_branches_may_repeat_person() {
        // D is reached through both B and C; both branches show it
        let graph = graph_of(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let tree = graph.descendant_tree("a", 5).unwrap();

        let under_b = &tree.root.children[0];
        let under_c = &tree.root.children[1];
        assert_eq!(under_b.children[0].id, "d");
        assert_eq!(under_c.children[0].id, "d");
        assert_eq!(tree.node_count, 4);
    }

    #[test]
    fn test_tree_respects_max_depth() {
        // A → B → C → D → E
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]);
        let tree = graph.descendant_tree("a", 2).unwrap();

        assert_eq!(tree.max_depth, 2);
        assert!(contains_below(&tree.root, "c"));
        assert!(!contains_below(&tree.root, "d"));
    }

    #[test]
    fn test_tree_node_carries_roles_and_dissertation() {
        let mut builder = GraphBuilder::new();
        builder.add_records(vec![DissertationRecord::new("d-s", "s", "Sam")
            .with_advisor("a", "Ann", AdvisorRole::Advisor)
            .with_advisor("a", "Ann", AdvisorRole::CommitteeMember)]);
        let graph = builder.build();

        let tree = graph.descendant_tree("a", 3).unwrap();
        let sam = &tree.root.children[0];

        assert_eq!(tree.root.children.len(), 1);
        assert_eq!(
            sam.roles,
            vec![AdvisorRole::Advisor, AdvisorRole::CommitteeMember]
        );
        assert_eq!(sam.dissertation_ids, vec!["d-s".to_string()]);
        assert_eq!(sam.depth, 1);
    }

    #[test]
    fn test_no_advisors_gives_empty_chain() {
        let graph = graph_of(&[("a", "b")]);

        assert!(graph.ancestor_chain("a", 5).unwrap().is_empty());
        assert!(graph.ancestor_tree("a", 5).unwrap().is_empty());
        assert!(graph.descendant_tree("b", 5).unwrap().is_empty());
    }

    #[test]
    fn test_ancestor_chain_generations() {
        //  G1   G2
        //   \   /
        //    P1    P2
        //      \  /
        //       S
        let graph = graph_of(&[("g1", "p1"), ("g2", "p1"), ("p1", "s"), ("p2", "s")]);
        let chain = graph.ancestor_chain("s", 5).unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(ids(&chain[0]), vec!["p1", "p2"]);
        assert_eq!(ids(&chain[1]), vec!["g1", "g2"]);
    }

    #[test]
    fn test_ancestor_chain_dedupes_within_generation() {
        // G advised both P1 and P2, who both advised S
        let graph = graph_of(&[("g", "p1"), ("g", "p2"), ("p1", "s"), ("p2", "s")]);
        let chain = graph.ancestor_chain("s", 5).unwrap();

        assert_eq!(ids(&chain[1]), vec!["g"]);
    }

    #[test]
    fn test_ancestor_chain_stops_at_max_depth_and_cycles() {
        // A → B → C → A, asking for C's ancestors
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let chain = graph.ancestor_chain("c", 10).unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(ids(&chain[0]), vec!["b"]);
        assert_eq!(ids(&chain[1]), vec!["a"]);

        let chain = graph.ancestor_chain("c", 1).unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_budget_keeps_nearer_generations() {
        // S has advisors X0 and Z. Above X0 every generation holds two
        // people who both advised each person below, so X0's tree doubles
        // per level and alone exceeds the node budget.
        let mut pairs: Vec<(String, String)> = vec![
            ("x0".to_string(), "s".to_string()),
            ("z".to_string(), "s".to_string()),
            ("a1".to_string(), "x0".to_string()),
            ("b1".to_string(), "x0".to_string()),
        ];
        for k in 1..15 {
            for student in [format!("a{}", k), format!("b{}", k)] {
                pairs.push((format!("a{}", k + 1), student.clone()));
                pairs.push((format!("b{}", k + 1), student));
            }
        }
        let refs: Vec<(&str, &str)> = pairs.iter().map(|(a, s)| (a.as_str(), s.as_str())).collect();
        let graph = graph_of(&refs);

        let tree = graph.ancestor_tree("s", 0).unwrap();
        assert!(tree.truncated);
        assert_eq!(tree.node_count, MAX_TREE_NODES);
        let direct: Vec<&str> = tree.root.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(direct, vec!["x0", "z"]);

        let chain = graph.ancestor_chain("s", 0).unwrap();
        assert_eq!(ids(&chain[0]), vec!["x0", "z"]);
        assert_eq!(ids(&chain[1]), vec!["a1", "b1"]);
        // Levels 1..=13 hold 2^13 nodes; level 14 is the partial one
        assert_eq!(chain.len(), 14);
        assert_eq!(ids(&chain[12]), vec!["a12", "b12"]);
    }

    #[test]
    fn test_missing_person() {
        let graph = graph_of(&[("a", "b")]);

        assert!(matches!(
            graph.descendant_stats("zz"),
            Err(GraphError::PersonNotFound(_))
        ));
        assert!(graph.descendant_tree("zz", 3).is_err());
        assert!(graph.ancestor_chain("zz", 3).is_err());
    }

    #[test]
    fn test_effective_depth() {
        assert_eq!(effective_depth(0), MAX_LINEAGE_DEPTH);
        assert_eq!(effective_depth(3), 3);
        assert_eq!(effective_depth(1_000), MAX_LINEAGE_DEPTH);
    }

    #[test]
    fn test_stats_match_reachable_set() {
        let pairs = [
            ("a", "b"),
            ("a", "c"),
            ("b", "d"),
            ("c", "d"),
            ("d", "e"),
            ("e", "b"),
            ("x", "y"),
        ];
        let graph = graph_of(&pairs);

        for person in graph.nodes() {
            // Reachable set by repeated student hops
            let mut reached: HashSet<&str> = HashSet::new();
            let mut frontier = vec![person.id.as_str()];
            while let Some(current) = frontier.pop() {
                for (a, s) in &pairs {
                    if *a == current && *s != person.id && reached.insert(*s) {
                        frontier.push(*s);
                    }
                }
            }

            let stats = graph.descendant_stats(&person.id).unwrap();
            assert_eq!(stats.total_descendants, reached.len(), "for {}", person.id);
        }
    }
}
