//! # symserve-api
//!
//! The externally reachable surface: parses a JSON request envelope,
//! routes it to the query engine, and serializes a JSON response.
//!
//! The transport is someone else's problem. Whatever HTTP layer (or test
//! harness, or CLI) sits outside hands in a URL path and a request body
//! string and gets a response string back; [`query_api`] never fails as a
//! call. A malformed envelope produces a top-level `error` field, and
//! per-module failures inside a batch are reported inline next to their
//! siblings' results.

mod v5;

use serde_json::json;
use symserve_core::{FileAccessor, SymbolManager};

/// Dispatch one API request.
///
/// `request_url` selects the endpoint; `/symbolicate/v5` is the one wire
/// format currently spoken. The response is always valid JSON.
pub async fn query_api<A: FileAccessor>(
    request_url: &str,
    request_json: &str,
    manager: &SymbolManager<A>,
) -> String
{
    if request_url == "/symbolicate/v5" {
        v5::query_api_json(request_json, manager).await
    } else {
        json!({ "error": format!("Unrecognized URL {request_url}") }).to_string()
    }
}
