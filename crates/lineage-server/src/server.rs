//! WebSocket server implementation.
//!
//! Handles client connections and routes messages to handlers.

use crate::handlers::{
    handle_correction_submit, handle_info, handle_institutions, handle_lineage,
    handle_person_get, handle_reload, handle_search, handle_stats,
};
use crate::protocol::{
    CorrectionParams, InstitutionListParams, LineageParams, PersonParams, Request, Response,
    SearchParams,
};
use crate::{GraphHandle, SharedGraph};
use futures_util::{SinkExt, StreamExt};
use lineage_core::CorrectionLog;
use lineage_graph::LineageGraph;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
    /// Dataset to rebuild from on `graph.reload`.
    pub dataset: Option<PathBuf>,
    /// Where submitted corrections are appended.
    pub corrections_log: PathBuf,
    /// Snapshot store that `graph.reload` writes the new graph to.
    pub store: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5001)),
            dataset: None,
            corrections_log: PathBuf::from("corrections_log.csv"),
            store: None,
        }
    }
}

/// State shared by every connection.
#[derive(Debug)]
pub struct AppState {
    pub graph: SharedGraph,
    pub corrections: Arc<CorrectionLog>,
    pub dataset: Option<PathBuf>,
    pub store: Option<PathBuf>,
}

impl AppState {
    pub fn new(graph: LineageGraph, config: &ServerConfig) -> Self {
        Self {
            graph: Arc::new(GraphHandle::new(graph)),
            corrections: Arc::new(CorrectionLog::new(config.corrections_log.clone())),
            dataset: config.dataset.clone(),
            store: config.store.clone(),
        }
    }
}

/// The Lineage WebSocket server.
pub struct LineageServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl LineageServer {
    /// Creates a new server with the given graph.
    pub fn new(graph: LineageGraph, config: ServerConfig) -> Self {
        let state = Arc::new(AppState::new(graph, &config));
        Self { config, state }
    }

    /// Returns a handle to the shared graph for swaps from outside.
    pub fn graph(&self) -> SharedGraph {
        self.state.graph.clone()
    }

    /// Runs the server, accepting connections forever.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Lineage server listening on {}", self.config.addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, state).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handles a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    info!("WebSocket connection established with {}", addr);

    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("Message error from {}: {}", addr, e);
                break;
            }
        };

        if msg.is_close() {
            debug!("Client {} disconnected", addr);
            break;
        }

        if msg.is_ping() {
            write.send(Message::Pong(msg.into_data())).await?;
            continue;
        }

        if msg.is_text() {
            let text = msg.to_text().unwrap_or("");
            let response = process_message(text, &state).await;
            let json = serde_json::to_string(&response)?;
            write.send(Message::Text(json)).await?;
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

fn parse_params<T: DeserializeOwned>(
    id: &Option<Value>,
    params: Value,
) -> Result<T, Response> {
    serde_json::from_value(params).map_err(|e| Response::invalid_params(id.clone(), e.to_string()))
}

/// Processes a JSON-RPC message and returns a response.
pub(crate) async fn process_message(text: &str, state: &AppState) -> Response {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Processing method: {}", method);

    match method {
        "graph.info" => handle_info(state, id).await,

        "graph.reload" => handle_reload(state, id).await,

        "institutions.list" => {
            let params = match request.params {
                Value::Null => Ok(InstitutionListParams::default()),
                params => parse_params::<InstitutionListParams>(&id, params),
            };
            match params {
                Ok(params) => handle_institutions(state, id, params).await,
                Err(response) => response,
            }
        }

        "search" => match parse_params::<SearchParams>(&id, request.params) {
            Ok(params) => handle_search(state, id, params).await,
            Err(response) => response,
        },

        "person.get" => match parse_params::<PersonParams>(&id, request.params) {
            Ok(params) => handle_person_get(state, id, params).await,
            Err(response) => response,
        },

        "lineage" => match parse_params::<LineageParams>(&id, request.params) {
            Ok(params) => handle_lineage(state, id, params).await,
            Err(response) => response,
        },

        "stats" => match parse_params::<PersonParams>(&id, request.params) {
            Ok(params) => handle_stats(state, id, params).await,
            Err(response) => response,
        },

        "correction.submit" => match parse_params::<CorrectionParams>(&id, request.params) {
            Ok(params) => handle_correction_submit(state, id, params).await,
            Err(response) => response,
        },

        _ => Response::method_not_found(id, method),
    }
}
