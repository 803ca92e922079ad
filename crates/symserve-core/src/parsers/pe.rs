//! # PE Parser
//!
//! A PE image is usually a stepping stone: its CodeView debug directory
//! names the PDB that holds the real symbol table, and the manager chases
//! that PDB through fresh candidate paths. The PE's own export table is
//! kept as the fallback when no PDB can be located.
//!
//! The breakpad ID of a PE is the GUID + age of its CodeView record: the
//! same identity its PDB carries, which is what makes the chase sound.

use std::path::Path;

use object::Object;

use crate::accessor::{FileContents, FileContentsWrapper};
use crate::debugid;
use crate::error::{Result, SymbolError};
use crate::format::FormatKind;
use crate::parsers::{collect_object_symbols, DebugData, ParsedSymbols};

/// A parsed PE image: exported symbols plus the name of the matching PDB,
/// when the image names one.
pub struct PeParse
{
    pub symbols: ParsedSymbols,
    /// File name (not path) of the PDB from the CodeView record
    pub pdb_name: Option<String>,
}

/// Parse a PE image, verifying the requested breakpad ID against the
/// CodeView record.
pub fn parse<F: FileContents>(
    contents: &FileContentsWrapper<F>,
    breakpad_id: &str,
) -> Result<PeParse>
{
    let data = contents.read_entire_data()?;
    let file = object::File::parse(data).map_err(|err| SymbolError::MalformedDebugInfo {
        format: FormatKind::Pe,
        detail: err.to_string(),
    })?;

    let codeview = file
        .pdb_info()
        .map_err(|err| SymbolError::MalformedDebugInfo {
            format: FormatKind::Pe,
            detail: format!("unreadable debug directory: {err}"),
        })?
        .ok_or_else(|| SymbolError::MalformedDebugInfo {
            format: FormatKind::Pe,
            detail: "image carries no CodeView record".to_string(),
        })?;

    let file_id = debugid::from_little_endian_guid(&codeview.guid(), codeview.age());
    if file_id != breakpad_id {
        return Err(SymbolError::UnmatchedBreakpadId {
            expected: file_id,
            actual: breakpad_id.to_string(),
        });
    }

    // The record stores a full build-machine path; only the file name is
    // meaningful on this machine.
    let pdb_name = std::str::from_utf8(codeview.path())
        .ok()
        .map(|path| path.replace('\\', "/"))
        .and_then(|path| {
            Path::new(&path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        });

    Ok(PeParse {
        symbols: ParsedSymbols {
            raw: collect_object_symbols(&file),
            debug: DebugData::from_object(&file),
        },
        pdb_name,
    })
}
