//! # symbolicate/v5
//!
//! The batch symbolication wire format: each job carries a `memoryMap` of
//! `[debugName, breakpadId]` pairs and `stacks` of `[moduleIndex,
//! moduleOffset]` frames. The response mirrors the stack shape with
//! resolved function names, reports per-module success in
//! `found_modules`, and carries per-module failures inline in `errors`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use symserve_core::manager::ResolvedFrame;
use symserve_core::types::FrameResult;
use symserve_core::{BinaryIdentity, FileAccessor, SymbolError, SymbolManager};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job
{
    /// `[debugName, breakpadId]` per module
    memory_map: Vec<(String, String)>,
    /// Stacks of `[moduleIndex, moduleOffset]` frames; a negative module
    /// index marks a frame with no known module
    stacks: Vec<Vec<(i64, u64)>>,
}

#[derive(Serialize)]
struct Response
{
    results: Vec<JobResult>,
}

#[derive(Serialize)]
struct JobResult
{
    stacks: Vec<Vec<FrameJson>>,
    /// `"debugName/breakpadId"` -> whether a symbol table was produced
    found_modules: BTreeMap<String, bool>,
    /// Inline per-module failure details, keyed like `found_modules`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct FrameJson
{
    frame: usize,
    module_offset: String,
    module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_offset: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    inlines: Vec<InlineJson>,
}

#[derive(Serialize)]
struct InlineJson
{
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
}

/// Handle one `/symbolicate/v5` request body.
///
/// The envelope is validated before any file I/O happens; only after the
/// jobs deserialize does the handler start chasing symbol tables.
pub async fn query_api_json<A: FileAccessor>(request_json: &str, manager: &SymbolManager<A>) -> String
{
    let jobs = match parse_jobs(request_json) {
        Ok(jobs) => jobs,
        Err(err) => return json!({ "error": err.to_string() }).to_string(),
    };

    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        results.push(symbolicate_job(job, manager).await);
    }

    serde_json::to_string(&Response { results })
        .unwrap_or_else(|err| json!({ "error": format!("Failed to serialize response: {err}") }).to_string())
}

/// A request is either `{"jobs": [...]}` or a single bare job object.
fn parse_jobs(request_json: &str) -> Result<Vec<Job>, SymbolError>
{
    let value: serde_json::Value =
        serde_json::from_str(request_json).map_err(|err| SymbolError::InvalidRequestJson(err.to_string()))?;

    if let Some(jobs) = value.get("jobs") {
        serde_json::from_value(jobs.clone()).map_err(|err| SymbolError::InvalidRequestJson(err.to_string()))
    } else {
        serde_json::from_value::<Job>(value)
            .map(|job| vec![job])
            .map_err(|err| SymbolError::InvalidRequestJson(err.to_string()))
    }
}

async fn symbolicate_job<A: FileAccessor>(job: Job, manager: &SymbolManager<A>) -> JobResult
{
    // Gather the distinct addresses each referenced module needs.
    let mut addresses_by_module: HashMap<usize, Vec<u32>> = HashMap::new();
    for stack in &job.stacks {
        for &(module_index, offset) in stack {
            let Ok(module_index) = usize::try_from(module_index) else {
                continue;
            };
            if module_index >= job.memory_map.len() {
                continue;
            }
            let Ok(offset) = u32::try_from(offset) else {
                continue;
            };
            let addresses = addresses_by_module.entry(module_index).or_default();
            if !addresses.contains(&offset) {
                addresses.push(offset);
            }
        }
    }

    let mut found_modules = BTreeMap::new();
    let mut errors = BTreeMap::new();
    let mut resolved: HashMap<usize, HashMap<u32, ResolvedFrame>> = HashMap::new();

    for (module_index, addresses) in addresses_by_module {
        let (debug_name, breakpad_id) = &job.memory_map[module_index];
        let identity = BinaryIdentity::new(debug_name, breakpad_id);
        let module_key = format!("{debug_name}/{breakpad_id}");

        match manager.resolve_stack(&identity, &addresses).await {
            Ok(frames) => {
                found_modules.insert(module_key, true);
                resolved.insert(
                    module_index,
                    frames.into_iter().map(|frame| (frame.address, frame)).collect(),
                );
            }
            Err(err) => {
                debug!("module {identity} failed to symbolicate: {err}");
                found_modules.insert(module_key.clone(), false);
                errors.insert(module_key, err.to_string());
            }
        }
    }

    let stacks = job
        .stacks
        .iter()
        .map(|stack| {
            stack
                .iter()
                .enumerate()
                .map(|(frame_index, &(module_index, offset))| {
                    render_frame(&job, &resolved, frame_index, module_index, offset)
                })
                .collect()
        })
        .collect();

    JobResult {
        stacks,
        found_modules,
        errors,
    }
}

fn render_frame(
    job: &Job,
    resolved: &HashMap<usize, HashMap<u32, ResolvedFrame>>,
    frame_index: usize,
    module_index: i64,
    offset: u64,
) -> FrameJson
{
    let mut frame = FrameJson {
        frame: frame_index,
        module_offset: format!("{offset:#x}"),
        module: String::new(),
        function: None,
        function_offset: None,
        inlines: Vec::new(),
    };

    let Ok(index) = usize::try_from(module_index) else {
        return frame;
    };
    let Some((debug_name, _)) = job.memory_map.get(index) else {
        return frame;
    };
    frame.module = debug_name.clone();

    let lookup = u32::try_from(offset)
        .ok()
        .and_then(|offset| resolved.get(&index)?.get(&offset));
    let Some(resolved_frame) = lookup else {
        return frame;
    };

    if let FrameResult::Resolved(symbol) = &resolved_frame.result {
        frame.function = Some(symbol.name.clone());
        frame.function_offset = Some(format!("{:#x}", offset - u64::from(symbol.start)));
    }
    if let Some(debug_info) = &resolved_frame.debug_info {
        frame.inlines = debug_info
            .frames
            .iter()
            .map(|inline| InlineJson {
                function: inline.function.clone(),
                file: inline.file_path.clone(),
                line: inline.line_number,
            })
            .collect();
    }

    frame
}
