//! # Debug Info Parsers
//!
//! One strategy per container format. Each parser is responsible for its
//! own endianness, section/stream layout, and symbol-vs-export precedence,
//! and each verifies that the file's own breakpad ID matches the requested
//! identity before doing any real work.
//!
//! Parsers emit [`ParsedSymbols`]: the raw symbol list for the table
//! builder plus, for DWARF-bearing formats, retained debug sections for
//! later inline-frame expansion.

pub mod dwarf;
pub mod elf;
pub mod macho;
pub mod pe;
pub mod pdb;

use object::{Object, ObjectSymbol, SymbolKind};

use crate::types::RawSymbol;

pub use dwarf::DebugData;

/// Output of a successful parse: everything the builder and query engine
/// need, with the file handle already released.
pub struct ParsedSymbols
{
    /// Raw (address, name, size) list, unsorted and possibly duplicated
    pub raw: Vec<RawSymbol>,
    /// Retained DWARF sections for inline/line queries, where present
    pub debug: Option<DebugData>,
}

/// Collect function symbols from any `object`-readable image.
///
/// Precedence: the full symbol table first, then dynamic symbols, then the
/// export table. The table builder keeps the first-seen entry per address,
/// so richer sources win simply by being walked first.
pub(crate) fn collect_object_symbols(file: &object::File<'_>) -> Vec<RawSymbol>
{
    let base = file.relative_address_base();
    let mut raw = Vec::new();

    let keep = |symbol: &object::Symbol<'_, '_>| {
        symbol.is_definition() && matches!(symbol.kind(), SymbolKind::Text | SymbolKind::Unknown)
    };

    for symbol in file.symbols().filter(keep) {
        if let Ok(name) = symbol.name() {
            raw.push(RawSymbol {
                address: symbol.address().wrapping_sub(base) as u32,
                name: name.to_string(),
                size: (symbol.size() != 0).then(|| symbol.size() as u32),
            });
        }
    }

    for symbol in file.dynamic_symbols().filter(keep) {
        if let Ok(name) = symbol.name() {
            raw.push(RawSymbol {
                address: symbol.address().wrapping_sub(base) as u32,
                name: name.to_string(),
                size: (symbol.size() != 0).then(|| symbol.size() as u32),
            });
        }
    }

    if let Ok(exports) = file.exports() {
        for export in exports {
            raw.push(RawSymbol {
                address: export.address().wrapping_sub(base) as u32,
                name: String::from_utf8_lossy(export.name()).into_owned(),
                size: None,
            });
        }
    }

    raw
}
