//! Request handlers for protocol methods.
//!
//! Each handler takes one snapshot of the graph and answers from it, so a
//! concurrent reload never mixes two graphs in one response.

use crate::protocol::{
    CorrectionParams, InstitutionListParams, LineageParams, PersonParams, Response, SearchParams,
};
use crate::server::AppState;
use lineage_core::{normalize, CorrectionError, IngestError};
use lineage_graph::{
    effective_depth, load_dataset, DatasetLoad, GraphError, SnapshotStore, StoreError,
};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failure while rebuilding the graph for `graph.reload`.
#[derive(Error, Debug)]
enum ReloadError {
    #[error("{0}")]
    Ingest(#[from] IngestError),
    #[error("Failed to save snapshot: {0}")]
    Store(#[from] StoreError),
}

fn graph_error(id: Option<Value>, err: GraphError) -> Response {
    Response::not_found(id, err.to_string())
}

/// Loads the dataset and, when a store is configured, saves the new graph
/// before it is published.
fn rebuild(dataset: &Path, store: Option<&Path>) -> Result<DatasetLoad, ReloadError> {
    let load = load_dataset(dataset)?;
    if let Some(path) = store {
        SnapshotStore::open(path)?.save_graph(&load.graph)?;
        debug!("Snapshot saved to {}", path.display());
    }
    Ok(load)
}

/// Handles the graph.info method.
pub async fn handle_info(state: &AppState, id: Option<Value>) -> Response {
    let (g, graph_version) = state.graph.versioned().await;
    let summary = g.summary();

    #[derive(Serialize)]
    struct InfoResult {
        people: usize,
        institutions: usize,
        dissertations: usize,
        edges: usize,
        #[serde(rename = "graphVersion")]
        graph_version: u64,
        status: &'static str,
        version: &'static str,
    }

    Response::success(
        id,
        InfoResult {
            people: summary.people,
            institutions: summary.institutions,
            dissertations: summary.dissertations,
            edges: summary.edges,
            graph_version,
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

/// Handles the search method.
pub async fn handle_search(state: &AppState, id: Option<Value>, params: SearchParams) -> Response {
    let start = Instant::now();
    let g = state.graph.snapshot().await;

    debug!("Search ({:?}): {}", params.kind, params.query);

    let mut results = g.search(&params.query, params.kind);
    let total = results.people.len();
    results.people.truncate(params.limit);

    Response::success(
        id,
        serde_json::json!({
            "kind": results.kind,
            "query": results.query,
            "institution": results.institution,
            "people": results.people,
            "total": total,
            "queryTime": start.elapsed().as_millis() as u64
        }),
    )
}

/// Handles the institutions.list method.
pub async fn handle_institutions(
    state: &AppState,
    id: Option<Value>,
    params: InstitutionListParams,
) -> Response {
    let g = state.graph.snapshot().await;
    let needle = params.query.as_deref().map(normalize).unwrap_or_default();

    let matching: Vec<_> = g
        .institutions()
        .into_iter()
        .filter(|inst| normalize(&inst.name).contains(&needle))
        .collect();
    let total = matching.len();
    let institutions: Vec<_> = matching
        .into_iter()
        .take(params.limit.unwrap_or(usize::MAX))
        .collect();

    Response::success(
        id,
        serde_json::json!({
            "institutions": institutions,
            "total": total
        }),
    )
}

/// Handles the person.get method.
pub async fn handle_person_get(
    state: &AppState,
    id: Option<Value>,
    params: PersonParams,
) -> Response {
    let g = state.graph.snapshot().await;

    match g.person_detail(&params.id) {
        Ok(detail) => Response::success(id, detail),
        Err(e) => graph_error(id, e),
    }
}

/// Handles the lineage method.
pub async fn handle_lineage(
    state: &AppState,
    id: Option<Value>,
    params: LineageParams,
) -> Response {
    let start = Instant::now();
    let g = state.graph.snapshot().await;

    debug!(
        "Lineage {} of {} (depth {})",
        params.direction,
        params.id,
        effective_depth(params.depth)
    );

    match g.lineage(&params.id, params.direction, params.depth) {
        Ok(lineage) => {
            if lineage.tree.truncated {
                warn!("Lineage of {} truncated at the node budget", params.id);
            }
            Response::success(
                id,
                serde_json::json!({
                    "lineage": lineage,
                    "queryTime": start.elapsed().as_millis() as u64
                }),
            )
        }
        Err(e) => graph_error(id, e),
    }
}

/// Handles the stats method.
pub async fn handle_stats(state: &AppState, id: Option<Value>, params: PersonParams) -> Response {
    let g = state.graph.snapshot().await;

    match g.stats(&params.id) {
        Ok(stats) => Response::success(id, stats),
        Err(e) => graph_error(id, e),
    }
}

/// Handles the correction.submit method.
///
/// The append runs on the blocking pool; the graph is not touched.
pub async fn handle_correction_submit(
    state: &AppState,
    id: Option<Value>,
    params: CorrectionParams,
) -> Response {
    let log = state.corrections.clone();
    let appended = tokio::task::spawn_blocking(move || log.append(params)).await;

    match appended {
        Ok(Ok(entry)) => Response::success(id, entry),
        Ok(Err(e @ (CorrectionError::MissingSubmitter | CorrectionError::MissingRecordId))) => {
            Response::invalid_params(id, e.to_string())
        }
        Ok(Err(e)) => {
            error!("Failed to record correction: {}", e);
            Response::internal_error(id, e.to_string())
        }
        Err(e) => Response::internal_error(id, e.to_string()),
    }
}

/// Handles the graph.reload method.
///
/// Builds a new graph from the dataset off the async runtime, saves it to
/// the snapshot store and swaps it in. On failure the current graph stays
/// in place.
pub async fn handle_reload(state: &AppState, id: Option<Value>) -> Response {
    let Some(dataset) = state.dataset.clone() else {
        return Response::invalid_params(id, "No dataset configured");
    };

    let start = Instant::now();
    info!("Reloading graph from {}", dataset.display());

    let store = state.store.clone();
    let rebuilt = tokio::task::spawn_blocking(move || rebuild(&dataset, store.as_deref())).await;

    let load = match rebuilt {
        Ok(Ok(load)) => load,
        Ok(Err(e)) => {
            error!("Reload failed: {}", e);
            return Response::internal_error(id, e.to_string());
        }
        Err(e) => return Response::internal_error(id, e.to_string()),
    };

    let report = load.report;
    let skipped = load.skipped.len();
    let version = state.graph.replace(load.graph).await;

    info!(
        "Graph version {} live: {} people, {} edges ({} rows skipped)",
        version, report.people, report.edges, skipped
    );

    Response::success(
        id,
        serde_json::json!({
            "graphVersion": version,
            "people": report.people,
            "institutions": report.institutions,
            "dissertations": report.dissertations,
            "edges": report.edges,
            "skippedRows": skipped,
            "queryTime": start.elapsed().as_millis() as u64
        }),
    )
}
