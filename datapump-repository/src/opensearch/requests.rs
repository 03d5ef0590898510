//! Request body builders and response parsers for OpenSearch.
//!
//! Kept free of any client state so the wire format can be tested without
//! a running cluster.

use serde_json::Value;

use crate::errors::StoreError;
use crate::settings::IndexSettings;
use crate::types::{BulkItemOutcome, BulkOperation, BulkResponse};

/// Build the NDJSON lines of a bulk request: an action line followed by the
/// document source for every operation.
pub fn bulk_lines(operations: &[BulkOperation]) -> Vec<Value> {
    let mut lines = Vec::with_capacity(operations.len() * 2);
    for op in operations {
        lines.push(op.action_line());
        lines.push(op.source.clone());
    }
    lines
}

/// Parse a bulk response body into per-item outcomes.
pub fn parse_bulk_response(body: &Value) -> Result<BulkResponse, StoreError> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::parse("bulk response has no items array"))?;

    let items = items
        .iter()
        .map(parse_bulk_item)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BulkResponse {
        took_ms: body.get("took").and_then(Value::as_u64).unwrap_or(0),
        errors: body.get("errors").and_then(Value::as_bool).unwrap_or(false),
        items,
    })
}

fn parse_bulk_item(item: &Value) -> Result<BulkItemOutcome, StoreError> {
    // Each item is keyed by its action: {"index": {...}}
    let (action, detail) = item
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| StoreError::parse(format!("malformed bulk item: {}", item)))?;

    let status = detail
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .ok_or_else(|| StoreError::parse(format!("bulk item without status: {}", item)))?;

    Ok(BulkItemOutcome {
        action: action.clone(),
        id: detail
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        status,
        result: detail
            .get("result")
            .and_then(Value::as_str)
            .map(str::to_string),
        error: detail.get("error").map(describe_error),
    })
}

/// Render a store error object as `type: reason`.
fn describe_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            let kind = obj.get("type").and_then(Value::as_str).unwrap_or("error");
            match obj.get("reason").and_then(Value::as_str) {
                Some(reason) => format!("{}: {}", kind, reason),
                None => kind.to_string(),
            }
        }
        other => other.to_string(),
    }
}

/// Build the body of a create-index request.
pub fn create_index_body(settings: &IndexSettings, mappings: Option<&Value>) -> Value {
    let mut body = serde_json::Map::new();
    if !settings.is_empty() {
        body.insert("settings".to_string(), settings.to_request_body());
    }
    if let Some(mappings) = mappings {
        body.insert("mappings".to_string(), mappings.clone());
    }
    Value::Object(body)
}

/// Extract the version string of the first node in a nodes-info response.
pub fn parse_node_version(body: &Value) -> Result<String, StoreError> {
    let nodes = body
        .get("nodes")
        .and_then(Value::as_object)
        .ok_or_else(|| StoreError::parse("nodes info response has no nodes object"))?;

    let node = nodes
        .values()
        .next()
        .ok_or_else(|| StoreError::node_info("node list unexpectedly empty"))?;

    node.get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::parse("node info has no version"))
}

/// Extract index names from a get-index response.
pub fn parse_index_names(body: &Value) -> Vec<String> {
    body.as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

/// Whether an acknowledgement response says `acknowledged: true`.
pub fn is_acknowledged(body: &Value) -> bool {
    body.get("acknowledged")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// A cluster-health response that timed out.
pub fn health_timed_out(body: &Value) -> bool {
    body.get("timed_out").and_then(Value::as_bool).unwrap_or(false)
}
