//! Query results handed to the presentation layer.
//!
//! These are owned, serializable views over the graph: everything a page
//! or a JSON-RPC response needs, with no borrows into the graph.

use crate::genealogy::{generations, DescendantStats, LineageDirection, LineageTree};
use crate::graph::{Affiliation, GraphError, LineageGraph, Relation};
use lineage_core::{Dissertation, Institution, Person};
use serde::{Deserialize, Serialize};

/// What a search query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    #[default]
    Name,
    Institution,
}

/// A person with affiliations, as listed in search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonInfo {
    pub id: String,
    pub name: String,
    pub years: Option<String>,
    pub affiliations: Vec<Affiliation>,
}

/// Ranked search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub kind: SearchKind,
    pub query: String,
    /// The institution matched by an institution search.
    pub institution: Option<Institution>,
    pub people: Vec<PersonInfo>,
}

/// An advisor as listed on a dissertation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorInfo {
    pub id: String,
    pub name: String,
    pub role: String,
}

/// A dissertation with its advisors in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissertationInfo {
    pub id: String,
    pub title: Option<String>,
    pub year: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub subject: Option<String>,
    pub advisors: Vec<AdvisorInfo>,
}

/// A direct student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub id: String,
    pub name: String,
    pub role: String,
    pub dissertation_id: String,
    pub year: Option<String>,
    pub institution: Option<String>,
}

/// Everything shown on a person's page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDetail {
    pub person: PersonInfo,
    pub dissertations: Vec<DissertationInfo>,
    pub students: Vec<StudentInfo>,
    pub stats: DescendantStats,
}

/// A short reference to a person inside a generation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
    pub years: Option<String>,
}

impl From<&Person> for PersonRef {
    fn from(person: &Person) -> Self {
        Self {
            id: person.id.clone(),
            name: person.name.clone(),
            years: person.years.clone(),
        }
    }
}

/// A lineage view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineage {
    pub direction: LineageDirection,
    /// Depth asked for by the caller.
    pub requested_depth: usize,
    pub tree: LineageTree,
    /// Ancestor generations, nearest first. Present for ancestor views.
    pub generations: Option<Vec<Vec<PersonRef>>>,
}

fn institution_label(graph: &LineageGraph, dissertation: &Dissertation) -> Option<String> {
    dissertation
        .institution_id
        .as_deref()
        .and_then(|id| graph.institution(id).ok())
        .map(|i| i.name.clone())
        .or_else(|| dissertation.institution_name.clone())
}

impl LineageGraph {
    fn person_info(&self, person: &Person) -> PersonInfo {
        PersonInfo {
            id: person.id.clone(),
            name: person.name.clone(),
            years: person.years.clone(),
            affiliations: self.affiliations_of(&person.id).unwrap_or_default(),
        }
    }

    /// Searches by name or by institution.
    ///
    /// An institution search resolves the best-ranked institution and
    /// returns the people who studied or advised there. No match gives an
    /// empty result, never an error.
    pub fn search(&self, query: &str, kind: SearchKind) -> SearchResults {
        let (institution, people) = match kind {
            SearchKind::Name => (None, self.search_by_name(query)),
            SearchKind::Institution => match self.search_by_institution(query).first() {
                Some(institution) => (
                    Some((*institution).clone()),
                    self.people_at(&institution.id).unwrap_or_default(),
                ),
                None => (None, Vec::new()),
            },
        };

        SearchResults {
            kind,
            query: query.to_string(),
            institution,
            people: people.into_iter().map(|p| self.person_info(p)).collect(),
        }
    }

    /// A person with their dissertations, students and descendant stats.
    pub fn person_detail(&self, person_id: &str) -> Result<PersonDetail, GraphError> {
        let person = self.get_person(person_id)?;

        let dissertations = self
            .dissertations_of(person_id)?
            .into_iter()
            .map(|dissertation| {
                let advisors = dissertation
                    .advisors
                    .iter()
                    .map(|slot| {
                        // Advisors never materialized as people keep their slot
                        let name = match self.get_person(&slot.advisor_id) {
                            Ok(advisor) => advisor.name.clone(),
                            Err(_) => slot
                                .advisor_name
                                .clone()
                                .unwrap_or_else(|| "Unknown".to_string()),
                        };
                        AdvisorInfo {
                            id: slot.advisor_id.clone(),
                            name,
                            role: slot.role.to_string(),
                        }
                    })
                    .collect();

                DissertationInfo {
                    id: dissertation.id.clone(),
                    title: dissertation.title.clone(),
                    year: dissertation.year.clone(),
                    institution: institution_label(self, dissertation),
                    department: dissertation.department.clone(),
                    subject: dissertation.subject.clone(),
                    advisors,
                }
            })
            .collect();

        let students = self
            .students_of(person_id)?
            .into_iter()
            .map(|relation: Relation<'_>| StudentInfo {
                id: relation.person.id.clone(),
                name: relation.person.name.clone(),
                role: relation.role.to_string(),
                dissertation_id: relation.dissertation.id.clone(),
                year: relation.dissertation.year.clone(),
                institution: institution_label(self, relation.dissertation),
            })
            .collect();

        Ok(PersonDetail {
            person: self.person_info(person),
            dissertations,
            students,
            stats: self.descendant_stats(person_id)?,
        })
    }

    /// A person's lineage in one direction, bounded by `max_depth`.
    pub fn lineage(
        &self,
        person_id: &str,
        direction: LineageDirection,
        max_depth: usize,
    ) -> Result<Lineage, GraphError> {
        let tree = self.lineage_tree(person_id, direction, max_depth)?;

        let generations = match direction {
            LineageDirection::Ancestors => Some(
                generations(&tree)
                    .into_iter()
                    .map(|level| {
                        level
                            .into_iter()
                            .filter_map(|id| self.get_person(id).ok().map(PersonRef::from))
                            .collect()
                    })
                    .collect(),
            ),
            LineageDirection::Descendants => None,
        };

        Ok(Lineage {
            direction,
            requested_depth: max_depth,
            tree,
            generations,
        })
    }

    /// Descendant statistics for a person.
    pub fn stats(&self, person_id: &str) -> Result<DescendantStats, GraphError> {
        self.descendant_stats(person_id)
    }
}
