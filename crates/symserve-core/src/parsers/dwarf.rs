//! # DWARF Debug Data
//!
//! Retains a parsed image's `.debug_*` sections and answers inline-frame
//! and file/line queries through `addr2line`.
//!
//! Section data is copied into `Arc` slices at parse time so the debug
//! data is self-contained: the file handle is released as soon as the
//! parse finishes, and the sections can live in the process-wide cache
//! for as long as their table does. The addr2line context itself is
//! rebuilt per query batch, since it holds lazily-parsed unit state that is
//! not shareable across tasks, and building it from preloaded sections
//! is cheap next to the lookups it serves.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use tracing::debug;

use crate::demangle::demangle_any;
use crate::types::{AddressDebugInfo, InlineStackFrame};

type OwnedReader = EndianArcSlice<RunTimeEndian>;

/// Section names addr2line needs, with their Mach-O aliases.
const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_aranges", &[".debug_aranges", "__debug_aranges"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
];

/// DWARF sections of one parsed image.
pub struct DebugData
{
    sections: HashMap<&'static str, Arc<[u8]>>,
    endian: RunTimeEndian,
    /// Relative-address base of the image; query addresses are relative,
    /// DWARF addresses are vmaddrs.
    base: u64,
}

impl DebugData
{
    /// Copy the debug sections out of `file`, or `None` if the image
    /// carries no `.debug_info` at all.
    pub(crate) fn from_object(file: &object::File<'_>) -> Option<Self>
    {
        file.section_by_name(".debug_info")
            .or_else(|| file.section_by_name("__debug_info"))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            sections.insert(*canonical, load_section_bytes(file, aliases));
        }

        Some(Self {
            sections,
            endian,
            base: file.relative_address_base(),
        })
    }

    /// Resolve inline frame stacks for a batch of relative addresses,
    /// innermost frame first, keyed by the queried address.
    ///
    /// Addresses no line program covers are simply absent from the result;
    /// the caller falls back to the plain symbol name for those.
    pub fn address_debug_info(&self, addresses: &[u32]) -> HashMap<u32, AddressDebugInfo>
    {
        let mut resolved = HashMap::new();
        if addresses.is_empty() {
            return resolved;
        }

        let context = match self.make_context() {
            Some(context) => context,
            None => return resolved,
        };

        for &address in addresses {
            let vmaddr = self.base + u64::from(address);
            let Ok(mut frame_iter) = context.find_frames(vmaddr).skip_all_loads() else {
                continue;
            };

            let mut frames = Vec::new();
            while let Ok(Some(frame)) = frame_iter.next() {
                let function = frame
                    .function
                    .as_ref()
                    .and_then(|func| func.raw_name().ok())
                    .map(|raw| demangle_any(&raw));
                let (file_path, line_number) = match frame.location {
                    Some(location) => (location.file.map(str::to_string), location.line),
                    None => (None, None),
                };
                frames.push(InlineStackFrame {
                    function,
                    file_path,
                    line_number,
                });
            }

            if !frames.is_empty() {
                resolved.insert(address, AddressDebugInfo { frames });
            }
        }
        resolved
    }

    fn make_context(&self) -> Option<Context<OwnedReader>>
    {
        let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)));
        match dwarf.and_then(Context::from_dwarf) {
            Ok(context) => Some(context),
            Err(err) => {
                debug!("failed to build addr2line context: {err}");
                None
            }
        }
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }
}

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> Arc<[u8]>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            // uncompressed_data handles zlib/zstd-compressed debug sections.
            if let Ok(data) = section.uncompressed_data() {
                return match data {
                    Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                    Cow::Owned(vec) => vec.into(),
                };
            }
        }
    }
    Arc::<[u8]>::from(Vec::new())
}
