//! # Compact Symbol Table
//!
//! The normalized, queryable form of a parsed symbol list: parallel arrays
//! of function start address and name offset, plus a shared string blob.
//!
//! Building is pure and deterministic: identical raw input always yields
//! a byte-identical table, so cached tables can be compared and shipped
//! across process boundaries verbatim.

use std::collections::HashMap;

use crate::demangle::demangle_any;
use crate::types::RawSymbol;

/// Sorted address-to-name mapping for one binary
///
/// Invariants:
/// - `addr` is strictly increasing (duplicates are merged at build time)
/// - `index.len() == addr.len()`; `index[i]` is the offset of entry `i`'s
///   name in `buffer`
/// - `buffer` is a string-table-style blob of NUL-terminated UTF-8 names,
///   each unique name stored exactly once
///
/// Built once per binary identity, immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactSymbolTable
{
    /// Function start addresses, ascending and unique
    pub addr: Vec<u32>,
    /// Offset of each entry's name in `buffer`, parallel to `addr`
    pub index: Vec<u32>,
    /// NUL-terminated UTF-8 names, deduplicated
    pub buffer: Vec<u8>,
}

impl CompactSymbolTable
{
    /// Normalize a raw parser symbol list into a compact table.
    ///
    /// Names are demangled first. Entries sharing an address are merged:
    /// the first-seen entry wins, except that an entry with an empty
    /// demangled name yields to a later one with a real name.
    pub fn build(raw: Vec<RawSymbol>) -> Self
    {
        let mut by_address: HashMap<u32, String> = HashMap::with_capacity(raw.len());
        let mut addresses: Vec<u32> = Vec::with_capacity(raw.len());

        for symbol in raw {
            let demangled = demangle_any(&symbol.name);
            match by_address.get_mut(&symbol.address) {
                None => {
                    addresses.push(symbol.address);
                    by_address.insert(symbol.address, demangled);
                }
                Some(existing) if existing.is_empty() && !demangled.is_empty() => {
                    *existing = demangled;
                }
                Some(_) => {}
            }
        }

        addresses.sort_unstable();
        addresses.dedup();

        let mut table = Self {
            addr: Vec::with_capacity(addresses.len()),
            index: Vec::with_capacity(addresses.len()),
            buffer: Vec::new(),
        };
        let mut interned: HashMap<String, u32> = HashMap::new();
        for address in addresses {
            let name = &by_address[&address];
            let offset = match interned.get(name) {
                Some(&offset) => offset,
                None => {
                    let offset = table.buffer.len() as u32;
                    table.buffer.extend_from_slice(name.as_bytes());
                    table.buffer.push(0);
                    interned.insert(name.clone(), offset);
                    offset
                }
            };
            table.addr.push(address);
            table.index.push(offset);
        }
        table
    }

    /// Number of symbols in the table
    pub fn len(&self) -> usize
    {
        self.addr.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.addr.is_empty()
    }

    /// The name of entry `i`, read from the shared blob.
    pub fn name_at(&self, i: usize) -> Option<&str>
    {
        let start = *self.index.get(i)? as usize;
        let rest = self.buffer.get(start..)?;
        let end = rest.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&rest[..end]).ok()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_build_sorts_and_merges()
    {
        let raw = vec![
            RawSymbol::new(0x200, "bar"),
            RawSymbol::new(0x100, "foo"),
            RawSymbol::new(0x100, "foo_alias"),
        ];
        let table = CompactSymbolTable::build(raw);
        assert_eq!(table.addr, vec![0x100, 0x200]);
        assert_eq!(table.name_at(0), Some("foo"));
        assert_eq!(table.name_at(1), Some("bar"));
    }

    #[test]
    fn test_build_prefers_nonempty_name_on_tie()
    {
        let raw = vec![RawSymbol::new(0x100, ""), RawSymbol::new(0x100, "real_name")];
        let table = CompactSymbolTable::build(raw);
        assert_eq!(table.len(), 1);
        assert_eq!(table.name_at(0), Some("real_name"));
    }

    #[test]
    fn test_build_interns_repeated_names_once()
    {
        let raw = vec![
            RawSymbol::new(0x100, "thunk"),
            RawSymbol::new(0x200, "thunk"),
            RawSymbol::new(0x300, "thunk"),
        ];
        let table = CompactSymbolTable::build(raw);
        assert_eq!(table.len(), 3);
        assert_eq!(table.index[0], table.index[1]);
        assert_eq!(table.index[1], table.index[2]);
        assert_eq!(table.buffer, b"thunk\0");
    }
}
