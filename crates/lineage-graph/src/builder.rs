//! Graph builder for constructing the advisor graph from dataset records.
//!
//! The builder takes validated DissertationRecords and resolves their
//! advisor slots into actual graph edges.

use crate::edge::AdvisorEdge;
use crate::graph::LineageGraph;
use lineage_core::{read_dissertations, DissertationRecord, IngestError, Person, SkippedRow};
use std::path::Path;
use tracing::{info, warn};

/// Counts from a graph build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub people: usize,
    pub institutions: usize,
    pub dissertations: usize,
    pub edges: usize,
    /// Records whose dissertation id was already loaded.
    pub duplicate_dissertations: usize,
    /// Advisor slots naming an id that never resolved to a person.
    pub dangling_advisors: usize,
}

/// Builds a LineageGraph from dissertation records.
///
/// The builder handles the two-pass process:
/// 1. Register people, institutions and dissertations
/// 2. Resolve advisor slots into edges
pub struct GraphBuilder {
    graph: LineageGraph,
    /// Accepted dissertation ids in load order, for edge resolution.
    pending: Vec<String>,
    report: BuildReport,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            graph: LineageGraph::new(),
            pending: Vec::new(),
            report: BuildReport::default(),
        }
    }

    /// Adds records to the graph.
    ///
    /// Call this for each batch, then call `build` when all records are
    /// added.
    pub fn add_records(&mut self, records: Vec<DissertationRecord>) {
        for record in records {
            self.graph.add_person(record.author());

            if let Some(institution) = record.institution() {
                self.graph.add_institution(institution);
            }

            for slot in &record.dissertation.advisors {
                if let Some(name) = &slot.advisor_name {
                    self.graph
                        .add_person(Person::new(slot.advisor_id.clone(), name.clone()));
                }
            }

            let id = record.dissertation.id.clone();
            if self.graph.add_dissertation(record.dissertation) {
                self.pending.push(id);
            } else {
                warn!("Duplicate dissertation {} ignored", id);
                self.report.duplicate_dissertations += 1;
            }
        }
    }

    /// Resolves advisor slots into edges.
    ///
    /// This is the second pass after all records are added, so advisors
    /// named only on later rows still resolve.
    fn resolve_edges(&mut self) {
        let mut edges_to_add = Vec::new();

        for dissertation_id in &self.pending {
            let Some(dissertation) = self.graph.dissertation(dissertation_id) else {
                continue;
            };
            let Some(student) = self.graph.get_index(&dissertation.author_id) else {
                continue;
            };

            for slot in &dissertation.advisors {
                match self.graph.get_index(&slot.advisor_id) {
                    Some(advisor) => edges_to_add.push((
                        advisor,
                        student,
                        AdvisorEdge::new(slot.role.clone(), dissertation_id.clone(), slot.slot),
                    )),
                    None => {
                        warn!(
                            "Advisor {} on dissertation {} has no name anywhere in the dataset",
                            slot.advisor_id, dissertation_id
                        );
                        self.report.dangling_advisors += 1;
                    }
                }
            }
        }

        for (advisor, student, edge) in edges_to_add {
            self.graph.add_edge(advisor, student, edge);
        }
    }

    /// Finishes building and returns the graph.
    pub fn build(self) -> LineageGraph {
        self.build_with_report().0
    }

    /// Finishes building and returns the graph with its build counts.
    pub fn build_with_report(mut self) -> (LineageGraph, BuildReport) {
        self.resolve_edges();
        self.graph.finalize();

        let summary = self.graph.summary();
        let report = BuildReport {
            people: summary.people,
            institutions: summary.institutions,
            dissertations: summary.dissertations,
            edges: summary.edges,
            ..self.report
        };

        info!(
            "Built graph: {} people, {} dissertations, {} institutions, {} advisor edges",
            report.people, report.dissertations, report.institutions, report.edges
        );

        (self.graph, report)
    }
}

/// Outcome of loading a dataset file into a graph.
#[derive(Debug)]
pub struct DatasetLoad {
    pub graph: LineageGraph,
    pub report: BuildReport,
    pub rows_read: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Reads a dataset file and builds its graph.
///
/// Malformed rows are skipped and reported in the result; only I/O and
/// CSV framing errors fail the load.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<DatasetLoad, IngestError> {
    let outcome = read_dissertations(path)?;

    let mut builder = GraphBuilder::new();
    builder.add_records(outcome.records);
    let (graph, report) = builder.build_with_report();

    Ok(DatasetLoad {
        graph,
        report,
        rows_read: outcome.rows_read,
        skipped: outcome.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::AdvisorRole;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builder_adds_people() {
        let mut builder = GraphBuilder::new();
        builder.add_records(vec![
            DissertationRecord::new("d1", "p1", "Ada"),
            DissertationRecord::new("d2", "p2", "Bea"),
        ]);
        let graph = builder.build();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_builder_resolves_edges() {
        let mut builder = GraphBuilder::new();
        builder.add_records(vec![DissertationRecord::new("d2", "p2", "Bea")
            .with_advisor("p1", "Ada", AdvisorRole::Advisor)]);
        let graph = builder.build();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_advisor_named_on_later_row_resolves() {
        let mut record = DissertationRecord::new("d2", "p2", "Bea");
        record.dissertation.advisors.push(lineage_core::AdvisorSlot {
            slot: 1,
            advisor_id: "p1".to_string(),
            advisor_name: None,
            role: AdvisorRole::Advisor,
        });

        let mut builder = GraphBuilder::new();
        builder.add_records(vec![record]);
        builder.add_records(vec![DissertationRecord::new("d1", "p1", "Ada")]);
        let (graph, report) = builder.build_with_report();

        assert_eq!(report.edges, 1);
        assert_eq!(report.dangling_advisors, 0);
        assert_eq!(graph.advisors_of("p2").unwrap()[0].person.name, "Ada");
    }

    #[test]
    fn test_unnamed_advisor_is_dangling() {
        let mut record = DissertationRecord::new("d2", "p2", "Bea");
        record.dissertation.advisors.push(lineage_core::AdvisorSlot {
            slot: 1,
            advisor_id: "ghost".to_string(),
            advisor_name: None,
            role: AdvisorRole::Advisor,
        });

        let mut builder = GraphBuilder::new();
        builder.add_records(vec![record]);
        let (graph, report) = builder.build_with_report();

        assert_eq!(report.dangling_advisors, 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.get_person("ghost").is_err());
    }

    #[test]
    fn test_duplicate_dissertation_ignored() {
        let mut builder = GraphBuilder::new();
        builder.add_records(vec![
            DissertationRecord::new("d1", "p1", "Ada")
                .with_advisor("p0", "Zed", AdvisorRole::Advisor),
            DissertationRecord::new("d1", "p1", "Ada")
                .with_advisor("p0", "Zed", AdvisorRole::Advisor),
        ]);
        let (_, report) = builder.build_with_report();

        assert_eq!(report.duplicate_dissertations, 1);
        assert_eq!(report.dissertations, 1);
        assert_eq!(report.edges, 1);
    }

    #[test]
    fn test_author_years_fill_in_advisor_entry() {
        let mut builder = GraphBuilder::new();
        builder.add_records(vec![
            DissertationRecord::new("d2", "p2", "Bea")
                .with_advisor("p1", "Ada", AdvisorRole::Advisor),
            DissertationRecord::new("d1", "p1", "Ada Lovelace").with_author_years("1815-1852"),
        ]);
        let graph = builder.build();

        let ada = graph.get_person("p1").unwrap();
        assert_eq!(ada.name, "Ada");
        assert_eq!(ada.years.as_deref(), Some("1815-1852"));
    }

    #[test]
    fn test_load_dataset_reports_skipped_rows() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ID,Author_ID,Author_Name,Advisor_ID_1,Advisor_Name_1,Advisor_Role_1").unwrap();
        writeln!(file, "d1,p1,Ada,,,").unwrap();
        writeln!(file, "d2,p2,Bea,p1,Ada,Advisor").unwrap();
        writeln!(file, "d3,,Nobody,p1,Ada,Advisor").unwrap();

        let load = load_dataset(file.path()).unwrap();

        assert_eq!(load.rows_read, 3);
        assert_eq!(load.skipped.len(), 1);
        assert_eq!(load.report.people, 2);
        assert_eq!(load.report.edges, 1);
    }
}
