//! # Mach-O Parser
//!
//! Thin images parse directly; fat (multi-architecture) archives read only
//! the member table and then the byte range of members until one matches
//! the requested breakpad ID, so a multi-hundred-MB universal binary never
//! gets materialized wholesale.
//!
//! The breakpad ID is the image's `LC_UUID`, verbatim, with age 0.

use object::read::macho::{FatArch, MachOFatFile32, MachOFatFile64};
use object::Object;
use tracing::debug;

use crate::accessor::{FileContents, FileContentsWrapper};
use crate::debugid;
use crate::error::{Result, SymbolError};
use crate::format::FormatKind;
use crate::parsers::{collect_object_symbols, DebugData, ParsedSymbols};

/// Bytes to read for the fat header and member table. 4 KiB covers far
/// more members than any real universal binary carries.
const FAT_HEADER_LEN: u64 = 4096;

/// Parse a thin Mach-O image, verifying the requested breakpad ID.
pub fn parse<F: FileContents>(
    contents: &FileContentsWrapper<F>,
    breakpad_id: &str,
) -> Result<ParsedSymbols>
{
    let data = contents.read_entire_data()?;
    parse_member(data, breakpad_id)
}

/// Parse a fat archive: find the member whose UUID matches.
///
/// Every member is tried; if none matches, the per-member failures are
/// collected into `NoMatchMultiArch` so the caller can enumerate the IDs
/// the archive actually contains.
pub fn parse_fat<F: FileContents>(
    contents: &FileContentsWrapper<F>,
    breakpad_id: &str,
) -> Result<ParsedSymbols>
{
    let header = contents.read_range(0, FAT_HEADER_LEN.min(contents.len()))?;

    let ranges: Vec<(u64, u64)> = if let Ok(fat) = MachOFatFile32::parse(header.as_slice()) {
        fat.arches().iter().map(FatArch::file_range).collect()
    } else if let Ok(fat) = MachOFatFile64::parse(header.as_slice()) {
        fat.arches().iter().map(FatArch::file_range).collect()
    } else {
        return Err(SymbolError::MalformedDebugInfo {
            format: FormatKind::FatMachO,
            detail: "unreadable fat member table".to_string(),
        });
    };

    let mut member_errors = Vec::with_capacity(ranges.len());
    for (offset, size) in ranges {
        let member = contents.read_range(offset, size)?;
        match parse_member(&member, breakpad_id) {
            Ok(parsed) => return Ok(parsed),
            Err(err) => {
                debug!("fat member at offset {offset}: {err}");
                member_errors.push(err);
            }
        }
    }
    Err(SymbolError::NoMatchMultiArch(member_errors))
}

fn parse_member(data: &[u8], breakpad_id: &str) -> Result<ParsedSymbols>
{
    let file = object::File::parse(data).map_err(|err| SymbolError::MalformedDebugInfo {
        format: FormatKind::MachO,
        detail: err.to_string(),
    })?;

    let uuid = file
        .mach_uuid()
        .ok()
        .flatten()
        .ok_or_else(|| SymbolError::MalformedDebugInfo {
            format: FormatKind::MachO,
            detail: "image carries no LC_UUID".to_string(),
        })?;
    let file_id = debugid::from_big_endian_uuid(&uuid, 0);
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
