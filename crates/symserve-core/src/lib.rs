//! # symserve-core
//!
//! Binary symbol-table extraction and address-to-symbol queries.
//!
//! This crate reads platform object and debug-info files (ELF, Mach-O,
//! PE, PDB) through a host-provided [`FileAccessor`] capability, builds
//! compact sorted symbol tables, and answers symbolication queries
//! against them:
//! - Format detection over magic bytes picks one parser per container.
//! - Parsers verify build identity (breakpad ID) and emit raw symbols.
//! - The table builder demangles, deduplicates, and sorts into a
//!   [`CompactSymbolTable`].
//! - The query engine binary-searches tables and expands DWARF inline
//!   frames.
//! - [`SymbolManager`] caches built tables per identity for the process
//!   lifetime, with at-most-one concurrent build per identity.
//!
//! The host side of the seam (where files live and how their bytes are
//! read) is entirely the embedder's: implement [`FileAccessor`] over a
//! local directory, a symbol server, or anything else.

pub mod accessor;
pub mod cache;
pub mod debugid;
pub mod demangle;
pub mod error;
pub mod format;
pub mod manager;
pub mod parsers;
pub mod query;
pub mod table;
pub mod types;

// Re-export commonly used types
pub use accessor::{FileAccessor, FileAccessorError, FileAccessorResult, FileContents, FileContentsWrapper};
pub use cache::{BinarySymbols, SymbolCache};
pub use error::{Result, SymbolError};
pub use manager::{ResolvedFrame, SymbolManager};
pub use table::CompactSymbolTable;
pub use types::BinaryIdentity;

/// One-shot convenience: walk candidate paths and build the compact
/// symbol table for one binary.
///
/// Embedders serving repeated queries should hold a [`SymbolManager`]
/// instead, which caches built tables across calls.
pub async fn get_compact_symbol_table(
    debug_name: &str,
    breakpad_id: &str,
    accessor: &impl FileAccessor,
) -> Result<CompactSymbolTable>
{
    let identity = BinaryIdentity::new(debug_name, breakpad_id);
    let manager = SymbolManager::new(accessor);
    manager.get_compact_symbol_table(&identity).await
}
