//! JSON-RPC 2.0 message types and method parameters.

use lineage_core::CorrectionRecord;
use lineage_graph::{LineageDirection, SearchKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const NOT_FOUND: i32 = -32001;

/// An incoming request.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

/// A response: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl Response {
    pub fn success<T: Serialize>(id: Option<Value>, result: T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: "2.0".to_string(),
                result: Some(value),
                error: None,
                id,
            },
            Err(e) => Self::internal_error(id, e.to_string()),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::error(None, PARSE_ERROR, "Parse error")
    }

    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, INVALID_PARAMS, message)
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn internal_error(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, INTERNAL_ERROR, message)
    }

    pub fn not_found(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, NOT_FOUND, message)
    }
}

fn default_limit() -> usize {
    50
}

fn default_depth() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub kind: SearchKind,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Parameters of `institutions.list`; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstitutionListParams {
    /// Keeps institutions whose normalized name contains this text.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonParams {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineageParams {
    pub id: String,
    #[serde(default = "default_direction")]
    pub direction: LineageDirection,
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_direction() -> LineageDirection {
    LineageDirection::Descendants
}

/// Parameters of `correction.submit`: the correction record itself.
pub type CorrectionParams = CorrectionRecord;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_params() {
        let request: Request =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "graph.info", "id": 1}))
                .unwrap();
        assert_eq!(request.method, "graph.info");
        assert!(request.params.is_null());
    }

    #[test]
    fn test_search_params_defaults() {
        let params: SearchParams = serde_json::from_value(json!({"query": "gauss"})).unwrap();
        assert_eq!(params.kind, SearchKind::Name);
        assert_eq!(params.limit, 50);

        let params: SearchParams =
            serde_json::from_value(json!({"query": "mit", "kind": "institution", "limit": 3}))
                .unwrap();
        assert_eq!(params.kind, SearchKind::Institution);
    }

    #[test]
    fn test_lineage_params_direction() {
        let params: LineageParams =
            serde_json::from_value(json!({"id": "p1", "direction": "ancestors"})).unwrap();
        assert_eq!(params.direction, LineageDirection::Ancestors);
        assert_eq!(params.depth, 5);
    }

    #[test]
    fn test_error_response_shape() {
        let response = Response::not_found(Some(json!(7)), "Person not found: x");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["error"]["code"], -32001);
        assert!(value.get("result").is_none());
        assert_eq!(value["id"], 7);
    }
}
