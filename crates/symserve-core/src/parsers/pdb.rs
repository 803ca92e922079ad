//! # PDB Parser
//!
//! Reads Microsoft program databases with the `pdb` crate over a seekable
//! cursor that issues bounded range reads against the file handle, so only
//! the touched MSF pages of a multi-hundred-MB PDB are ever fetched.
//!
//! Symbols come from the module streams (procedures, with sizes) and the
//! global public table; the table builder's first-seen precedence makes
//! the richer procedure records win over public stubs at the same address.

use std::io;

use pdb::{FallibleIterator, SymbolData, PDB};

use crate::accessor::{FileContents, FileContentsWrapper};
use crate::debugid;
use crate::error::{Result, SymbolError};
use crate::format::FormatKind;
use crate::parsers::ParsedSymbols;
use crate::types::RawSymbol;

/// Parse a PDB, verifying the requested breakpad ID.
pub fn parse<F: FileContents>(
    contents: &FileContentsWrapper<F>,
    breakpad_id: &str,
) -> Result<ParsedSymbols>
{
    parse_impl(contents, breakpad_id).map_err(|err| match err {
        PdbParseError::Symbol(err) => err,
        PdbParseError::Pdb(err) => SymbolError::MalformedDebugInfo {
            format: FormatKind::Pdb,
            detail: err.to_string(),
        },
    })
}

enum PdbParseError
{
    Symbol(SymbolError),
    Pdb(pdb::Error),
}

impl From<pdb::Error> for PdbParseError
{
    fn from(err: pdb::Error) -> Self
    {
        PdbParseError::Pdb(err)
    }
}

impl From<SymbolError> for PdbParseError
{
    fn from(err: SymbolError) -> Self
    {
        PdbParseError::Symbol(err)
    }
}

fn parse_impl<F: FileContents>(
    contents: &FileContentsWrapper<F>,
    breakpad_id: &str,
) -> std::result::Result<ParsedSymbols, PdbParseError>
{
    let mut pdb = PDB::open(RangeReadCursor::new(contents))?;

    let info = pdb.pdb_information()?;
    let dbi = pdb.debug_information()?;
    // The DBI age supersedes the header age when both exist.
    let age = dbi.age().unwrap_or(info.age);
    let file_id = debugid::from_big_endian_uuid(info.guid.as_bytes(), age);
    if file_id != breakpad_id {
        return Err(SymbolError::UnmatchedBreakpadId {
            expected: file_id,
            actual: breakpad_id.to_string(),
        }
        .into());
    }

    let address_map = pdb.address_map()?;
    let mut raw = Vec::new();

    let mut modules = dbi.modules()?;
    while let Some(module) = modules.next()? {
        let Some(module_info) = pdb.module_info(&module)? else {
            continue;
        };
        let mut symbols = module_info.symbols()?;
        while let Some(symbol) = symbols.next()? {
            if let Ok(SymbolData::Procedure(proc)) = symbol.parse() {
                let Some(rva) = proc.offset.to_rva(&address_map) else {
                    continue;
                };
                raw.push(RawSymbol {
                    address: rva.0,
                    name: proc.name.to_string().into_owned(),
                    size: Some(proc.len),
                });
            }
        }
    }

    let global_symbols = pdb.global_symbols()?;
    let mut globals = global_symbols.iter();
    while let Some(symbol) = globals.next()? {
        if let Ok(SymbolData::Public(public)) = symbol.parse() {
            if !public.function {
                continue;
            }
            let Some(rva) = public.offset.to_rva(&address_map) else {
                continue;
            };
            raw.push(RawSymbol {
                address: rva.0,
                name: public.name.to_string().into_owned(),
                size: None,
            });
        }
    }

    Ok(ParsedSymbols { raw, debug: None })
}

/// `Read + Seek` adapter over a file handle, for `PDB::open`.
///
/// Each `read` becomes one bounded range read against the handle; nothing
/// is buffered beyond what the `pdb` crate asks for.
struct RangeReadCursor<'a, F: FileContents>
{
    contents: &'a FileContentsWrapper<F>,
    position: u64,
}

impl<'a, F: FileContents> RangeReadCursor<'a, F>
{
    fn new(contents: &'a FileContentsWrapper<F>) -> Self
    {
        Self { contents, position: 0 }
    }
}

impl<F: FileContents> std::fmt::Debug for RangeReadCursor<'_, F>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(
            f,
            "RangeReadCursor({}, at {})",
            self.contents.path().display(),
            self.position
        )
    }
}

impl<F: FileContents> io::Read for RangeReadCursor<'_, F>
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>
    {
        let remaining = self.contents.len().saturating_sub(self.position);
        let wanted = (buf.len() as u64).min(remaining);
        if wanted == 0 {
            return Ok(0);
        }
        let bytes = self
            .contents
            .read_range(self.position, wanted)
            .map_err(|err| io::Error::other(err.to_string()))?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        self.position += wanted;
        Ok(wanted as usize)
    }
}

impl<F: FileContents> io::Seek for RangeReadCursor<'_, F>
{
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64>
    {
        let new_position = match pos {
            io::SeekFrom::Start(offset) => Some(offset),
            io::SeekFrom::End(delta) => self.contents.len().checked_add_signed(delta),
            io::SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match new_position {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}
