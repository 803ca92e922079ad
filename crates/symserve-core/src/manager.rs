//! # Symbol Manager
//!
//! The high-level entry point tying the pipeline together: candidate-path
//! walking, format detection, parser dispatch, table building, and the
//! process-wide cache.
//!
//! One manager owns one [`FileAccessor`] and serves any number of
//! concurrent requests. File handles are scoped to a single candidate
//! attempt: they are opened inside the loop and dropped on every exit
//! path, success or failure.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::accessor::{FileAccessor, FileContentsWrapper};
use crate::cache::{BinarySymbols, SymbolCache};
use crate::error::{Result, SymbolError};
use crate::format::{detect_format, FormatKind, DETECT_PREFIX_LEN};
use crate::parsers::{elf, macho, pdb, pe, ParsedSymbols};
use crate::query;
use crate::table::CompactSymbolTable;
use crate::types::{AddressDebugInfo, BinaryIdentity, FrameResult};

/// One resolved stack frame, with optional DWARF inline expansion.
#[derive(Debug, Clone)]
pub struct ResolvedFrame
{
    /// The queried relative address
    pub address: u32,
    /// Symbol match, or `Unknown` for addresses outside the table
    pub result: FrameResult,
    /// Inline frame stack from DWARF, when the binary carries line info
    pub debug_info: Option<AddressDebugInfo>,
}

/// Cache-or-build-once façade over the whole extraction pipeline.
pub struct SymbolManager<A: FileAccessor>
{
    accessor: A,
    cache: SymbolCache,
}

impl<A: FileAccessor> SymbolManager<A>
{
    pub fn new(accessor: A) -> Self
    {
        Self {
            accessor,
            cache: SymbolCache::new(),
        }
    }

    /// The host accessor this manager reads through
    pub fn accessor(&self) -> &A
    {
        &self.accessor
    }

    /// Cached symbols for `identity`, building them on first reference.
    pub async fn get_symbols(&self, identity: &BinaryIdentity) -> Result<Arc<BinarySymbols>>
    {
        self.cache
            .get_or_build(identity, || self.build_symbols(identity))
            .await
    }

    /// The wire-shape compact table for `identity`.
    pub async fn get_compact_symbol_table(&self, identity: &BinaryIdentity) -> Result<CompactSymbolTable>
    {
        Ok(self.get_symbols(identity).await?.table.clone())
    }

    /// Resolve one address against the (possibly freshly built) table.
    pub async fn lookup_address(&self, identity: &BinaryIdentity, address: u32) -> Result<crate::types::SymbolRef>
    {
        let symbols = self.get_symbols(identity).await?;
        query::lookup_address(&symbols.table, address)
    }

    /// Resolve a whole stack, expanding inline frames where DWARF data is
    /// available.
    ///
    /// Per-frame failures resolve to `Unknown`; only the inability to
    /// produce a table at all is an error. The DWARF batch runs on the
    /// blocking pool so large line programs don't stall the scheduler.
    pub async fn resolve_stack(&self, identity: &BinaryIdentity, addresses: &[u32]) -> Result<Vec<ResolvedFrame>>
    {
        let symbols = self.get_symbols(identity).await?;
        let results = query::resolve_stack(&symbols.table, addresses);

        let mut debug_info = HashMap::new();
        if symbols.debug.is_some() {
            let symbols = Arc::clone(&symbols);
            let resolved_addresses: Vec<u32> = addresses
                .iter()
                .zip(&results)
                .filter(|(_, result)| matches!(result, FrameResult::Resolved(_)))
                .map(|(&address, _)| address)
                .collect();
            debug_info = tokio::task::spawn_blocking(move || {
                symbols
                    .debug
                    .as_ref()
                    .map(|debug| debug.address_debug_info(&resolved_addresses))
                    .unwrap_or_default()
            })
            .await
            .unwrap_or_default();
        }

        Ok(addresses
            .iter()
            .zip(results)
            .map(|(&address, result)| ResolvedFrame {
                address,
                result,
                debug_info: debug_info.remove(&address),
            })
            .collect())
    }

    async fn build_symbols(&self, identity: &BinaryIdentity) -> Result<BinarySymbols>
    {
        let paths = self
            .accessor
            .get_candidate_paths_for_binary_or_pdb(&identity.debug_name, &identity.breakpad_id)
            .await
            .map_err(|err| SymbolError::FileIo {
                path: identity.debug_name.clone().into(),
                source: err,
            })?;

        if paths.is_empty() {
            return Err(SymbolError::NoCandidatePath(identity.clone()));
        }

        let mut last_err = None;
        for path in paths {
            debug!("trying candidate {} for {identity}", path.display());
            match self.try_candidate_path(&path, identity, true).await {
                Ok(parsed) => {
                    let table = CompactSymbolTable::build(parsed.raw);
                    debug!("built table with {} symbols for {identity}", table.len());
                    return Ok(BinarySymbols {
                        table,
                        debug: parsed.debug,
                    });
                }
                Err(err) => {
                    debug!("candidate {} failed: {err}", path.display());
                    last_err = Some(err);
                }
            }
        }

        Err(SymbolError::NoUsableCandidatePath {
            identity: identity.clone(),
            last_error: Box::new(last_err.unwrap_or(SymbolError::NoCandidatePath(identity.clone()))),
        })
    }

    /// Open and parse one candidate file. `chase_pdb` lets a PE image
    /// redirect to its PDB exactly once (the PDB never redirects back).
    async fn try_candidate_path(
        &self,
        path: &Path,
        identity: &BinaryIdentity,
        chase_pdb: bool,
    ) -> Result<ParsedSymbols>
    {
        let contents = self
            .accessor
            .read_file(path)
            .await
            .map_err(|err| SymbolError::FileIo {
                path: path.to_path_buf(),
                source: err,
            })?;
        let contents = FileContentsWrapper::new(contents, path);

        let prefix_len = (DETECT_PREFIX_LEN as u64).min(contents.len());
        let prefix = contents.read_range(0, prefix_len)?;

        match detect_format(&prefix) {
            FormatKind::Elf => elf::parse(&contents, &identity.breakpad_id),
            FormatKind::MachO => macho::parse(&contents, &identity.breakpad_id),
            FormatKind::FatMachO => macho::parse_fat(&contents, &identity.breakpad_id),
            FormatKind::Pdb => pdb::parse(&contents, &identity.breakpad_id),
            FormatKind::Pe => {
                let pe = pe::parse(&contents, &identity.breakpad_id)?;
                if chase_pdb {
                    if let Some(pdb_name) = &pe.pdb_name {
                        match self.chase_pdb_reference(pdb_name, identity).await {
                            Ok(parsed) => return Ok(parsed),
                            Err(err) => {
                                debug!("PDB {pdb_name} referenced by {} unusable: {err}", path.display());
                            }
                        }
                    }
                }
                // Export-table fallback when the PDB is unavailable.
                Ok(pe.symbols)
            }
            FormatKind::Unknown => Err(SymbolError::NoMatchingFormat(path.to_path_buf())),
        }
    }

    /// Walk candidate paths for the PDB a PE image pointed at.
    async fn chase_pdb_reference(&self, pdb_name: &str, identity: &BinaryIdentity) -> Result<ParsedSymbols>
    {
        let paths = self
            .accessor
            .get_candidate_paths_for_binary_or_pdb(pdb_name, &identity.breakpad_id)
            .await
            .map_err(|err| SymbolError::FileIo {
                path: pdb_name.into(),
                source: err,
            })?;

        let pdb_identity = BinaryIdentity::new(pdb_name, &identity.breakpad_id);
        if paths.is_empty() {
            return Err(SymbolError::NoCandidatePath(pdb_identity));
        }

        let mut last_err = None;
        for path in paths {
            match Box::pin(self.try_candidate_path(&path, &pdb_identity, false)).await {
                Ok(parsed) => return Ok(parsed),
                Err(err) => last_err = Some(err),
            }
        }
        Err(SymbolError::NoUsableCandidatePath {
            identity: pdb_identity.clone(),
            last_error: Box::new(last_err.unwrap_or(SymbolError::NoCandidatePath(pdb_identity))),
        })
    }
}
