//! # Symbol Table Cache
//!
//! Process-wide cache of built symbol tables, keyed by binary identity.
//! Unbounded by design: tables are compact, and the process is expected
//! to be recycled long before the working set becomes a problem.
//!
//! The cache guarantees at-most-one concurrent build per identity:
//! concurrent requests for the same binary observe a single in-flight
//! build and all await its result. Builds are all-or-nothing: a failed
//! or cancelled build publishes nothing, so no task can ever observe a
//! partially-populated entry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::error::Result;
use crate::parsers::DebugData;
use crate::table::CompactSymbolTable;
use crate::types::BinaryIdentity;

/// Everything the cache retains for one binary: the compact table plus
/// the DWARF sections for inline-frame queries, when the binary has them.
pub struct BinarySymbols
{
    pub table: CompactSymbolTable,
    pub debug: Option<DebugData>,
}

/// Cache of built symbol tables, shared across requests.
///
/// Cloneable handle semantics come from the caller holding it in an `Arc`
/// (the manager does); the cache itself only needs `&self`.
#[derive(Default)]
pub struct SymbolCache
{
    entries: Mutex<HashMap<BinaryIdentity, Arc<OnceCell<Arc<BinarySymbols>>>>>,
}

impl SymbolCache
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Fetch the table for `identity`, building it with `build` on first
    /// reference.
    ///
    /// Every concurrent caller for the same identity awaits the same
    /// in-flight build future. If the build fails, the error goes to the
    /// caller that ran it, the cell stays empty, and a later request may
    /// try again; the entry is only ever published on full success.
    pub async fn get_or_build<F, Fut>(&self, identity: &BinaryIdentity, build: F) -> Result<Arc<BinarySymbols>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BinarySymbols>>,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            entries.entry(identity.clone()).or_default().clone()
        };

        cell.get_or_try_init(|| async { build().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Peek without building.
    pub fn get(&self, identity: &BinaryIdentity) -> Option<Arc<BinarySymbols>>
    {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(identity).and_then(|cell| cell.get().cloned())
    }

    /// Number of fully-built entries currently cached.
    pub fn len(&self) -> usize
    {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}
