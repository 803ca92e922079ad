//! # Query Engine
//!
//! Address lookups against a built [`CompactSymbolTable`]. Stateless: the
//! table is immutable and every operation here is a pure function over it.

use crate::error::{Result, SymbolError};
use crate::table::CompactSymbolTable;
use crate::types::{FrameResult, SymbolRef};

/// Find the symbol covering `address`.
///
/// Binary-searches for the greatest start address less than or equal to
/// the query address. The matched symbol's effective range is
/// `[start, next_start)`; the last entry's range is open-ended.
///
/// An address below the first entry fails with `AddressBeforeFirstSymbol`,
/// which callers treat as an "unknown" result rather than a hard error.
pub fn lookup_address(table: &CompactSymbolTable, address: u32) -> Result<SymbolRef>
{
    // partition_point gives the count of entries with start <= address.
    let covering = table.addr.partition_point(|&start| start <= address);
    if covering == 0 {
        return Err(SymbolError::AddressBeforeFirstSymbol(address));
    }

    let entry = covering - 1;
    let name = table.name_at(entry).unwrap_or_default().to_string();
    Ok(SymbolRef {
        name,
        start: table.addr[entry],
        end: table.addr.get(covering).copied(),
    })
}

/// Resolve a whole stack of addresses, one [`FrameResult`] per frame.
///
/// Per-frame failures do not abort the batch: a frame below the first
/// symbol resolves to [`FrameResult::Unknown`] and its siblings are
/// unaffected.
pub fn resolve_stack(table: &CompactSymbolTable, addresses: &[u32]) -> Vec<FrameResult>
{
    addresses
        .iter()
        .map(|&address| match lookup_address(table, address) {
            Ok(symbol) => FrameResult::Resolved(symbol),
            Err(_) => FrameResult::Unknown,
        })
        .collect()
}
