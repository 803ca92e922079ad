//! # ELF Parser
//!
//! Symbols come from `.symtab`, then `.dynsym`, then the dynamic export
//! table, in that precedence. The file's breakpad ID is derived from the
//! GNU build ID note, or from a first-page hash for stripped files that
//! carry no note.

use object::Object;
use tracing::debug;

use crate::accessor::{FileContents, FileContentsWrapper};
use crate::debugid;
use crate::error::{Result, SymbolError};
use crate::format::FormatKind;
use crate::parsers::{collect_object_symbols, DebugData, ParsedSymbols};

/// Parse an ELF image, verifying the requested breakpad ID.
pub fn parse<F: FileContents>(
    contents: &FileContentsWrapper<F>,
    breakpad_id: &str,
) -> Result<ParsedSymbols>
{
    let data = contents.read_entire_data()?;
    let file = object::File::parse(data).map_err(|err| SymbolError::MalformedDebugInfo {
        format: FormatKind::Elf,
        detail: err.to_string(),
    })?;

    let file_id = match file.build_id().ok().flatten() {
        Some(build_id) => debugid::from_elf_build_id(build_id),
        None => {
            debug!("{} has no build ID note, hashing first page", contents.path().display());
            let page = &data[..data.len().min(4096)];
            debugid::from_first_page_hash(page)
        }
    };
    if file_id != breakpad_id {
        return Err(SymbolError::UnmatchedBreakpadId {
            expected: file_id,
            actual: breakpad_id.to_string(),
        });
    }

    Ok(ParsedSymbols {
        raw: collect_object_symbols(&file),
        debug: DebugData::from_object(&file),
    })
}
