//! Tests for the /symbolicate/v5 dispatcher

mod common;

use common::{discover_breakpad_id, make_elf, MemAccessor, PanickingAccessor};
use serde_json::{json, Value};
use symserve_api::query_api;
use symserve_core::SymbolManager;

#[tokio::test]
async fn test_malformed_json_rejected_before_any_file_io()
{
    let manager = SymbolManager::new(PanickingAccessor);
    let response = query_api("/symbolicate/v5", "{ not json", &manager).await;

    let value: Value = serde_json::from_str(&response).expect("response must still be valid JSON");
    let error = value["error"].as_str().unwrap();
    assert!(error.contains("Invalid request JSON"), "got: {error}");
}

#[tokio::test]
async fn test_envelope_with_wrong_shape_rejected()
{
    let manager = SymbolManager::new(PanickingAccessor);
    let response = query_api("/symbolicate/v5", r#"{"jobs": [{"stacks": "nope"}]}"#, &manager).await;

    let value: Value = serde_json::from_str(&response).unwrap();
    assert!(value["error"].as_str().unwrap().contains("Invalid request JSON"));
}

#[tokio::test]
async fn test_unrecognized_url()
{
    let manager = SymbolManager::new(PanickingAccessor);
    let response = query_api("/symbolicate/v9000", "{}", &manager).await;

    let value: Value = serde_json::from_str(&response).unwrap();
    assert!(value["error"].as_str().unwrap().contains("Unrecognized URL"));
}

#[tokio::test]
async fn test_symbolicate_resolves_known_module()
{
    let mut accessor = MemAccessor::new();
    accessor.add_file("symbols/libapp.so", make_elf(&[("alpha", 0x100, 0x100), ("beta", 0x200, 0x80)]));
    let breakpad_id = discover_breakpad_id("libapp.so", &accessor).await;

    let manager = SymbolManager::new(accessor);
    let request = json!({
        "jobs": [{
            "memoryMap": [["libapp.so", breakpad_id]],
            "stacks": [[[0, 0x150], [0, 0x210]]]
        }]
    })
    .to_string();

    let response = query_api("/symbolicate/v5", &request, &manager).await;
    let value: Value = serde_json::from_str(&response).unwrap();

    let result = &value["results"][0];
    let module_key = format!("libapp.so/{breakpad_id}");
    assert_eq!(result["found_modules"][&module_key], Value::Bool(true));
    assert!(result.get("errors").is_none());

    let frames = result["stacks"][0].as_array().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["frame"], 0);
    assert_eq!(frames[0]["module"], "libapp.so");
    assert_eq!(frames[0]["module_offset"], "0x150");
    assert_eq!(frames[0]["function"], "alpha");
    assert_eq!(frames[0]["function_offset"], "0x50");
    assert_eq!(frames[1]["function"], "beta");
    assert_eq!(frames[1]["function_offset"], "0x10");
}

#[tokio::test]
async fn test_missing_module_reports_inline_error()
{
    let mut accessor = MemAccessor::new();
    accessor.add_file("symbols/libapp.so", make_elf(&[("alpha", 0x100, 0x100)]));
    let breakpad_id = discover_breakpad_id("libapp.so", &accessor).await;

    let manager = SymbolManager::new(accessor);
    // One resolvable module, one the accessor has no candidates for.
    let request = json!({
        "jobs": [{
            "memoryMap": [
                ["libapp.so", breakpad_id],
                ["libmissing.so", "0000000000000000000000000000000000"]
            ],
            "stacks": [[[0, 0x120], [1, 0x999]]]
        }]
    })
    .to_string();

    let response = query_api("/symbolicate/v5", &request, &manager).await;
    let value: Value = serde_json::from_str(&response).unwrap();

    let result = &value["results"][0];
    let good_key = format!("libapp.so/{breakpad_id}");
    assert_eq!(result["found_modules"][&good_key], Value::Bool(true));
    assert_eq!(
        result["found_modules"]["libmissing.so/0000000000000000000000000000000000"],
        Value::Bool(false)
    );
    assert!(
        result["errors"]["libmissing.so/0000000000000000000000000000000000"]
            .as_str()
            .unwrap()
            .contains("No candidate path"),
        "per-module error must be inline"
    );

    // The sibling module still resolved; the missing one kept its shape.
    let frames = result["stacks"][0].as_array().unwrap();
    assert_eq!(frames[0]["function"], "alpha");
    assert_eq!(frames[1]["module"], "libmissing.so");
    assert!(frames[1].get("function").is_none());
}

#[tokio::test]
async fn test_single_bare_job_envelope()
{
    let mut accessor = MemAccessor::new();
    accessor.add_file("symbols/libapp.so", make_elf(&[("alpha", 0x100, 0x100)]));
    let breakpad_id = discover_breakpad_id("libapp.so", &accessor).await;

    let manager = SymbolManager::new(accessor);
    let request = json!({
        "memoryMap": [["libapp.so", breakpad_id]],
        "stacks": [[[0, 0x140]]]
    })
    .to_string();

    let response = query_api("/symbolicate/v5", &request, &manager).await;
    let value: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(value["results"][0]["stacks"][0][0]["function"], "alpha");
}

#[tokio::test]
async fn test_negative_module_index_stays_unsymbolicated()
{
    let mut accessor = MemAccessor::new();
    accessor.add_file("symbols/libapp.so", make_elf(&[("alpha", 0x100, 0x100)]));
    let breakpad_id = discover_breakpad_id("libapp.so", &accessor).await;

    let manager = SymbolManager::new(accessor);
    let request = json!({
        "memoryMap": [["libapp.so", breakpad_id]],
        "stacks": [[[-1, 0x140], [0, 0x140]]]
    })
    .to_string();

    let response = query_api("/symbolicate/v5", &request, &manager).await;
    let value: Value = serde_json::from_str(&response).unwrap();

    let frames = value["results"][0]["stacks"][0].as_array().unwrap();
    assert_eq!(frames[0]["module"], "");
    assert!(frames[0].get("function").is_none());
    assert_eq!(frames[1]["function"], "alpha");
}
