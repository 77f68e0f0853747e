//! Core graph data structure.
//!
//! The LineageGraph wraps petgraph and adds indexes for fast lookups.
//! Nodes are people; edges run from advisor to student. Dissertations and
//! institutions live beside the graph in plain maps keyed by id.

use crate::edge::{AdvisorEdge, GraphEdge};
use crate::search_index::SearchIndex;
use lineage_core::{normalize, AdvisorRole, Dissertation, Institution, Person};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Unique identifier for a node in the graph.
pub type NodeId = NodeIndex;

/// Lookup failures surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Person not found: {0}")]
    PersonNotFound(String),

    #[error("Institution not found: {0}")]
    InstitutionNotFound(String),
}

/// A person related to another through one advisor slot.
#[derive(Debug, Clone, Copy)]
pub struct Relation<'a> {
    pub person: &'a Person,
    pub role: &'a AdvisorRole,
    pub dissertation: &'a Dissertation,
}

/// One advisor→student link inside a merged neighbor group.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Link<'a> {
    pub role: &'a AdvisorRole,
    pub dissertation_id: &'a str,
}

/// Where a person studied and/or advised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub institution_id: Option<String>,
    pub name: String,
    /// Authored a dissertation there.
    pub student: bool,
    /// Advised a dissertation there.
    pub faculty: bool,
    /// Year of the dissertation authored there, if any.
    pub year: Option<String>,
}

/// The advisor graph.
///
/// Built once by [`crate::GraphBuilder`] and read-only afterwards. All
/// queries take `&self`, so one instance can serve any number of
/// concurrent readers.
#[derive(Debug, Serialize, Deserialize)]
pub struct LineageGraph {
    /// The underlying petgraph graph.
    pub(crate) graph: DiGraph<Person, AdvisorEdge>,

    /// Maps person ids to graph node indexes.
    id_index: HashMap<String, NodeId>,

    /// Dissertations by id.
    dissertations: HashMap<String, Dissertation>,

    /// Dissertation ids per author, in load order.
    authored: HashMap<NodeId, Vec<String>>,

    /// Institutions by id.
    institutions: HashMap<String, Institution>,

    /// Students and advisors per institution id, ordered by name then id.
    people_by_institution: HashMap<String, Vec<NodeId>>,

    /// Name search over people.
    pub(crate) name_index: SearchIndex<NodeId>,

    /// Name search over institutions, keyed by institution id.
    pub(crate) institution_index: SearchIndex<String>,
}

impl Default for LineageGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl LineageGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_index: HashMap::new(),
            dissertations: HashMap::new(),
            authored: HashMap::new(),
            institutions: HashMap::new(),
            people_by_institution: HashMap::new(),
            name_index: SearchIndex::new(),
            institution_index: SearchIndex::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Construction (used by the builder)
    // ─────────────────────────────────────────────────────────────────────

    /// Adds a person, or returns the existing node for that id.
    ///
    /// The first name seen for an id wins. Missing life years are filled in
    /// from later occurrences.
    pub fn add_person(&mut self, person: Person) -> NodeId {
        if let Some(&index) = self.id_index.get(&person.id) {
            if let Some(existing) = self.graph.node_weight_mut(index) {
                if existing.years.is_none() && person.years.is_some() {
                    existing.years = person.years;
                }
            }
            return index;
        }

        let id = person.id.clone();
        let index = self.graph.add_node(person);
        self.id_index.insert(id, index);
        index
    }

    /// Adds an institution. The first name seen for an id wins.
    pub fn add_institution(&mut self, institution: Institution) {
        self.institutions
            .entry(institution.id.clone())
            .or_insert(institution);
    }

    /// Adds a dissertation. Returns false if its id is already present.
    ///
    /// The author must have been added first.
    pub fn add_dissertation(&mut self, dissertation: Dissertation) -> bool {
        if self.dissertations.contains_key(&dissertation.id) {
            return false;
        }
        if let Some(&author) = self.id_index.get(&dissertation.author_id) {
            self.authored
                .entry(author)
                .or_default()
                .push(dissertation.id.clone());
        }
        self.dissertations
            .insert(dissertation.id.clone(), dissertation);
        true
    }

    /// Adds an advisor→student edge.
    pub fn add_edge(&mut self, advisor: NodeId, student: NodeId, edge: AdvisorEdge) {
        self.graph.add_edge(advisor, student, edge);
    }

    /// Builds the search and institution indexes. Call once after all
    /// people, institutions, dissertations and edges are in.
    pub fn finalize(&mut self) {
        let mut name_index = SearchIndex::new();
        for index in self.graph.node_indices() {
            name_index.insert(&self.graph[index].name, index);
        }

        let mut institution_index = SearchIndex::new();
        for institution in self.institutions.values() {
            institution_index.insert(&institution.name, institution.id.clone());
        }

        // Rows that carry only a school name join the institution whose
        // name normalizes the same.
        let mut by_name: HashMap<String, &str> = HashMap::new();
        for institution in self.institutions.values() {
            let entry = by_name
                .entry(normalize(&institution.name))
                .or_insert(&institution.id);
            if institution.id.as_str() < *entry {
                *entry = &institution.id;
            }
        }

        let mut people: HashMap<String, HashSet<NodeId>> = HashMap::new();
        for dissertation in self.dissertations.values() {
            let institution_id = match &dissertation.institution_id {
                Some(id) if self.institutions.contains_key(id) => id.clone(),
                _ => match dissertation
                    .institution_name
                    .as_deref()
                    .and_then(|name| by_name.get(normalize(name).as_str()))
                {
                    Some(id) => id.to_string(),
                    None => continue,
                },
            };
            let members = people.entry(institution_id).or_default();
            if let Some(&author) = self.id_index.get(&dissertation.author_id) {
                members.insert(author);
            }
            for slot in &dissertation.advisors {
                if let Some(&advisor) = self.id_index.get(&slot.advisor_id) {
                    members.insert(advisor);
                }
            }
        }

        self.people_by_institution = people
            .into_iter()
            .map(|(id, members)| {
                let mut members: Vec<NodeId> = members.into_iter().collect();
                members.sort_by(|a, b| {
                    let (pa, pb) = (&self.graph[*a], &self.graph[*b]);
                    pa.name.cmp(&pb.name).then_with(|| pa.id.cmp(&pb.id))
                });
                (id, members)
            })
            .collect();

        self.name_index = name_index;
        self.institution_index = institution_index;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────

    /// Gets a person by id.
    pub fn get_person(&self, id: &str) -> Result<&Person, GraphError> {
        self.get_index(id)
            .and_then(|index| self.graph.node_weight(index))
            .ok_or_else(|| GraphError::PersonNotFound(id.to_string()))
    }

    /// Gets a person by graph index.
    pub fn get(&self, index: NodeId) -> Option<&Person> {
        self.graph.node_weight(index)
    }

    /// Gets the node index for a person id.
    pub fn get_index(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn require_index(&self, id: &str) -> Result<NodeId, GraphError> {
        self.get_index(id)
            .ok_or_else(|| GraphError::PersonNotFound(id.to_string()))
    }

    /// Gets a dissertation by id.
    pub fn dissertation(&self, id: &str) -> Option<&Dissertation> {
        self.dissertations.get(id)
    }

    /// Gets an institution by id.
    pub fn institution(&self, id: &str) -> Result<&Institution, GraphError> {
        self.institutions
            .get(id)
            .ok_or_else(|| GraphError::InstitutionNotFound(id.to_string()))
    }

    /// All institutions, ordered by name then id.
    pub fn institutions(&self) -> Vec<&Institution> {
        let mut all: Vec<&Institution> = self.institutions.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Dissertations authored by a person, in load order.
    pub fn dissertations_of(&self, person_id: &str) -> Result<Vec<&Dissertation>, GraphError> {
        let index = self.require_index(person_id)?;
        Ok(self.authored_by(index).collect())
    }

    fn authored_by(&self, index: NodeId) -> impl Iterator<Item = &Dissertation> + '_ {
        self.authored
            .get(&index)
            .into_iter()
            .flatten()
            .filter_map(|id| self.dissertations.get(id))
    }

    /// Direct advisors of a person, in dissertation then slot order.
    ///
    /// A person advising under two roles appears once per role.
    pub fn advisors_of(&self, person_id: &str) -> Result<Vec<Relation<'_>>, GraphError> {
        let index = self.require_index(person_id)?;
        let mut relations = Vec::new();

        for dissertation in self.authored_by(index) {
            for slot in &dissertation.advisors {
                let Some(person) = self.get_index(&slot.advisor_id).and_then(|i| self.get(i))
                else {
                    continue;
                };
                relations.push(Relation {
                    person,
                    role: &slot.role,
                    dissertation,
                });
            }
        }

        Ok(relations)
    }

    /// Direct students of a person, ordered by dissertation year (unknown
    /// last), then name, then id.
    pub fn students_of(&self, person_id: &str) -> Result<Vec<Relation<'_>>, GraphError> {
        let index = self.require_index(person_id)?;

        let mut relations: Vec<(u8, Relation<'_>)> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .filter_map(|edge_ref| {
                let edge = edge_ref.weight();
                Some((
                    edge.slot,
                    Relation {
                        person: self.get(edge_ref.target())?,
                        role: &edge.role,
                        dissertation: self.dissertations.get(&edge.dissertation_id)?,
                    },
                ))
            })
            .collect();

        relations.sort_by(|(slot_a, a), (slot_b, b)| {
            a.dissertation
                .year
                .is_none()
                .cmp(&b.dissertation.year.is_none())
                .then_with(|| a.dissertation.year.cmp(&b.dissertation.year))
                .then_with(|| a.person.name.cmp(&b.person.name))
                .then_with(|| a.person.id.cmp(&b.person.id))
                .then_with(|| slot_a.cmp(slot_b))
        });

        Ok(relations.into_iter().map(|(_, r)| r).collect())
    }

    /// People who studied or advised at an institution.
    pub fn people_at(&self, institution_id: &str) -> Result<Vec<&Person>, GraphError> {
        self.institution(institution_id)?;
        Ok(self
            .people_by_institution
            .get(institution_id)
            .into_iter()
            .flatten()
            .filter_map(|index| self.get(*index))
            .collect())
    }

    /// Institutions where a person was a student and/or advisor, in the
    /// order first seen (authored dissertations first).
    pub fn affiliations_of(&self, person_id: &str) -> Result<Vec<Affiliation>, GraphError> {
        let index = self.require_index(person_id)?;
        let mut affiliations: Vec<Affiliation> = Vec::new();

        let mut record = |dissertation: &Dissertation, as_student: bool| {
            let name = dissertation
                .institution_id
                .as_ref()
                .and_then(|id| self.institutions.get(id))
                .map(|i| i.name.clone())
                .or_else(|| dissertation.institution_name.clone());
            let Some(name) = name else {
                return;
            };
            let key = dissertation.institution_id.as_deref().unwrap_or(&name);

            let existing = affiliations
                .iter_mut()
                .find(|a| a.institution_id.as_deref().unwrap_or(&a.name) == key);

            match existing {
                Some(affiliation) => {
                    if as_student {
                        affiliation.student = true;
                        if affiliation.year.is_none() {
                            affiliation.year = dissertation.year.clone();
                        }
                    } else {
                        affiliation.faculty = true;
                    }
                }
                None => affiliations.push(Affiliation {
                    institution_id: dissertation.institution_id.clone(),
                    name,
                    student: as_student,
                    faculty: !as_student,
                    year: if as_student {
                        dissertation.year.clone()
                    } else {
                        None
                    },
                }),
            }
        };

        for dissertation in self.authored_by(index) {
            record(dissertation, true);
        }

        let mut advised: Vec<(usize, &Dissertation)> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .filter_map(|e| {
                let d = self.dissertations.get(&e.weight().dissertation_id)?;
                Some((e.id().index(), d))
            })
            .collect();
        // Edge iteration runs newest first; restore load order.
        advised.sort_by_key(|(order, _)| *order);
        for (_, dissertation) in advised {
            record(dissertation, false);
        }

        Ok(affiliations)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Traversal adjacency
    // ─────────────────────────────────────────────────────────────────────

    /// Advisors of a node merged per person, in dissertation then slot order.
    pub(crate) fn advisor_groups(&self, index: NodeId) -> Vec<(NodeId, Vec<Link<'_>>)> {
        let mut groups: Vec<(NodeId, Vec<Link<'_>>)> = Vec::new();

        for dissertation in self.authored_by(index) {
            for slot in &dissertation.advisors {
                let Some(advisor) = self.get_index(&slot.advisor_id) else {
                    continue;
                };
                let link = Link {
                    role: &slot.role,
                    dissertation_id: &dissertation.id,
                };
                match groups.iter_mut().find(|(node, _)| *node == advisor) {
                    Some((_, links)) => links.push(link),
                    None => groups.push((advisor, vec![link])),
                }
            }
        }

        groups
    }

    /// Students of a node merged per person, ordered by name then id.
    pub(crate) fn student_groups(&self, index: NodeId) -> Vec<(NodeId, Vec<Link<'_>>)> {
        let mut by_student: HashMap<NodeId, Vec<(usize, Link<'_>)>> = HashMap::new();

        for edge_ref in self.graph.edges_directed(index, Direction::Outgoing) {
            let edge = edge_ref.weight();
            by_student.entry(edge_ref.target()).or_default().push((
                edge_ref.id().index(),
                Link {
                    role: &edge.role,
                    dissertation_id: &edge.dissertation_id,
                },
            ));
        }

        let mut groups: Vec<(NodeId, Vec<Link<'_>>)> = by_student
            .into_iter()
            .map(|(student, mut links)| {
                links.sort_by_key(|(order, _)| *order);
                (student, links.into_iter().map(|(_, link)| link).collect())
            })
            .collect();

        groups.sort_by(|(a, _), (b, _)| {
            let (pa, pb) = (&self.graph[*a], &self.graph[*b]);
            pa.name.cmp(&pb.name).then_with(|| pa.id.cmp(&pb.id))
        });

        groups
    }

    // ─────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────

    /// Searches people by name.
    ///
    /// Exact normalized matches come first, then prefix, substring and
    /// all-tokens matches; ties are ordered by name then id.
    pub fn search_by_name(&self, query: &str) -> Vec<&Person> {
        let mut matches: Vec<_> = self
            .name_index
            .search(query)
            .into_iter()
            .filter_map(|hit| Some((hit.kind, self.get(hit.key)?)))
            .collect();

        matches.sort_by(|(ka, a), (kb, b)| {
            ka.cmp(kb)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });

        matches.into_iter().map(|(_, person)| person).collect()
    }

    /// Searches institutions by name, ranked like [`Self::search_by_name`].
    pub fn search_by_institution(&self, query: &str) -> Vec<&Institution> {
        let mut matches: Vec<_> = self
            .institution_index
            .search(query)
            .into_iter()
            .filter_map(|hit| Some((hit.kind, self.institutions.get(&hit.key)?)))
            .collect();

        matches.sort_by(|(ka, a), (kb, b)| {
            ka.cmp(kb)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });

        matches.into_iter().map(|(_, institution)| institution).collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Counts and export
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the number of people.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of advisor edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all people.
    pub fn nodes(&self) -> impl Iterator<Item = &Person> {
        self.graph.node_weights()
    }

    /// Returns all edges with advisor and student ids for export.
    pub fn export_edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edge_references()
            .filter_map(|edge_ref| {
                let edge = edge_ref.weight();
                Some(GraphEdge {
                    advisor: self.get(edge_ref.source())?.id.clone(),
                    student: self.get(edge_ref.target())?.id.clone(),
                    role: edge.role.clone(),
                    dissertation_id: edge.dissertation_id.clone(),
                })
            })
            .collect()
    }
}

/// Graph statistics for the info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub people: usize,
    pub institutions: usize,
    pub dissertations: usize,
    pub edges: usize,
}

impl LineageGraph {
    /// Returns graph statistics.
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            people: self.node_count(),
            institutions: self.institutions.len(),
            dissertations: self.dissertations.len(),
            edges: self.edge_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use lineage_core::DissertationRecord;

    fn sample() -> LineageGraph {
        let mut builder = GraphBuilder::new();
        builder.add_records(vec![
            DissertationRecord::new("d-a", "a", "Ada Alder")
                .at("u1", "Uppsala")
                .in_year("1950"),
            DissertationRecord::new("d-b", "b", "Bea Birch")
                .at("u1", "Uppsala")
                .in_year("1970")
                .with_advisor("a", "Ada Alder", AdvisorRole::Advisor)
                .with_advisor("z", "Zed Zelkova", AdvisorRole::CommitteeMember),
            DissertationRecord::new("d-c", "c", "Cy Cedar")
                .at("u2", "Vienna")
                .in_year("1965")
                .with_advisor("a", "Ada Alder", AdvisorRole::Advisor)
                .with_advisor("a", "Ada Alder", AdvisorRole::CommitteeMember),
        ]);
        builder.build()
    }

    #[test]
    fn test_get_person() {
        let graph = sample();
        assert_eq!(graph.get_person("b").unwrap().name, "Bea Birch");
        assert_eq!(
            graph.get_person("nope"),
            Err(GraphError::PersonNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_advisors_in_slot_order() {
        let graph = sample();
        let advisors = graph.advisors_of("b").unwrap();

        let ids: Vec<&str> = advisors.iter().map(|r| r.person.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z"]);
        assert_eq!(advisors[1].role, &AdvisorRole::CommitteeMember);
        assert_eq!(advisors[0].dissertation.id, "d-b");
    }

    #[test]
    fn test_students_keep_every_role() {
        let graph = sample();
        let students = graph.students_of("a").unwrap();

        // Cy (1965) twice for two roles, then Bea (1970)
        let ids: Vec<&str> = students.iter().map(|r| r.person.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "c", "b"]);
        assert_eq!(students[0].role, &AdvisorRole::Advisor);
        assert_eq!(students[1].role, &AdvisorRole::CommitteeMember);
    }

    #[test]
    fn test_student_groups_merge_roles() {
        let graph = sample();
        let a = graph.get_index("a").unwrap();
        let groups = graph.student_groups(a);

        assert_eq!(groups.len(), 2);
        let names: Vec<&str> = groups
            .iter()
            .map(|(n, _)| graph.get(*n).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["Bea Birch", "Cy Cedar"]);
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn test_people_at_institution() {
        let graph = sample();
        let people: Vec<&str> = graph
            .people_at("u1")
            .unwrap()
            .iter()
            .map(|p| p.id.as_str())
            .collect();

        assert_eq!(people, vec!["a", "b", "z"]);
        assert!(matches!(
            graph.people_at("missing"),
            Err(GraphError::InstitutionNotFound(_))
        ));
    }

    #[test]
    fn test_people_at_includes_school_name_only_rows() {
        let mut name_only = DissertationRecord::new("d2", "p2", "Bea")
            .with_advisor("p3", "Cy", AdvisorRole::Advisor);
        name_only.dissertation.institution_name = Some("UPPSALA".to_string());

        let mut builder = GraphBuilder::new();
        builder.add_records(vec![
            DissertationRecord::new("d1", "p1", "Ada").at("u1", "Uppsala"),
            name_only,
            DissertationRecord::new("d3", "p4", "Dee").at("u2", "Vienna"),
        ]);
        let graph = builder.build();

        let people: Vec<&str> = graph
            .people_at("u1")
            .unwrap()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(people, vec!["p1", "p2", "p3"]);
        assert_eq!(graph.people_at("u2").unwrap().len(), 1);
    }

    #[test]
    fn test_institutions_sorted_by_name() {
        let graph = sample();
        let names: Vec<&str> = graph.institutions().iter().map(|i| i.name.as_str()).collect();

        assert_eq!(names, vec!["Uppsala", "Vienna"]);
        assert_eq!(graph.institution("u2").unwrap().name, "Vienna");
    }

    #[test]
    fn test_affiliations() {
        let graph = sample();
        let affiliations = graph.affiliations_of("a").unwrap();

        assert_eq!(affiliations.len(), 2);
        assert_eq!(affiliations[0].name, "Uppsala");
        assert!(affiliations[0].student && affiliations[0].faculty);
        assert_eq!(affiliations[0].year.as_deref(), Some("1950"));
        assert_eq!(affiliations[1].name, "Vienna");
        assert!(!affiliations[1].student && affiliations[1].faculty);
    }

    #[test]
    fn test_search_by_name_is_accent_insensitive() {
        let mut builder = GraphBuilder::new();
        builder.add_records(vec![
            DissertationRecord::new("d1", "p1", "José Ortega"),
            DissertationRecord::new("d2", "p2", "Jose"),
            DissertationRecord::new("d3", "p3", "Ana Josefsson"),
        ]);
        let graph = builder.build();

        let ids = |q: &str| -> Vec<String> {
            graph.search_by_name(q).iter().map(|p| p.id.clone()).collect()
        };
        assert_eq!(ids("jose"), vec!["p2", "p1", "p3"]);
        assert_eq!(ids("jose"), ids("José"));
        assert!(ids("nobody").is_empty());
    }

    #[test]
    fn test_search_by_institution() {
        let graph = sample();
        let found: Vec<&str> = graph
            .search_by_institution("vien")
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(found, vec!["u2"]);
    }

    #[test]
    fn test_summary() {
        let graph = sample();
        let summary = graph.summary();

        assert_eq!(summary.people, 4);
        assert_eq!(summary.institutions, 2);
        assert_eq!(summary.dissertations, 3);
        assert_eq!(summary.edges, 4);
    }
}
