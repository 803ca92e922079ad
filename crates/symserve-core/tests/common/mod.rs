//! Shared fixtures: an in-memory accessor and synthesized ELF images.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use object::write;
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};
use symserve_core::accessor::{FileAccessor, FileAccessorResult, MemoryContents};

/// Accessor over a map of in-memory files, counting opens so tests can
/// assert how many parses actually happened.
#[derive(Default)]
pub struct MemAccessor
{
    files: HashMap<PathBuf, Vec<u8>>,
    pub opens: AtomicUsize,
}

impl MemAccessor
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>)
    {
        self.files.insert(path.into(), bytes);
    }

    pub fn open_count(&self) -> usize
    {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileAccessor for MemAccessor
{
    type Contents = MemoryContents;

    async fn get_candidate_paths_for_binary_or_pdb(
        &self,
        debug_name: &str,
        _breakpad_id: &str,
    ) -> FileAccessorResult<Vec<PathBuf>>
    {
        let mut paths: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|path| path.file_name().is_some_and(|name| name == debug_name))
            .cloned()
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn read_file(&self, path: &Path) -> FileAccessorResult<Self::Contents>
    {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(path)
            .cloned()
            .map(MemoryContents)
            .ok_or_else(|| format!("no such file: {}", path.display()).into())
    }
}

/// Synthesize a little ELF image with the given `(name, address, size)`
/// function symbols and a fixed build ID note.
pub fn make_elf(symbols: &[(&str, u64, u64)]) -> Vec<u8>
{
    let mut obj = write::Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);

    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    let code_len = symbols
        .iter()
        .map(|&(_, address, size)| address + size.max(1))
        .max()
        .unwrap_or(0x10);
    obj.append_section_data(text, &vec![0x90; code_len as usize], 16);

    for &(name, address, size) in symbols {
        obj.add_symbol(write::Symbol {
            name: name.as_bytes().to_vec(),
            value: address,
            size,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: write::SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }

    let note = obj.add_section(Vec::new(), b".note.gnu.build-id".to_vec(), SectionKind::Note);
    obj.append_section_data(note, &build_id_note(), 4);

    obj.write().expect("synthesizing ELF fixture failed")
}

/// A GNU build-id note with a fixed 20-byte identifier.
fn build_id_note() -> Vec<u8>
{
    let mut note = Vec::new();
    note.extend_from_slice(&4u32.to_le_bytes()); // namesz, "GNU\0"
    note.extend_from_slice(&20u32.to_le_bytes()); // descsz
    note.extend_from_slice(&3u32.to_le_bytes()); // NT_GNU_BUILD_ID
    note.extend_from_slice(b"GNU\0");
    note.extend_from_slice(&[
        0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xde,
        0xad, 0xbe, 0xef,
    ]);
    note
}

/// The breakpad ID the fixture ELF carries, discovered through the
/// mismatch error so tests don't hardcode the derivation.
pub async fn discover_breakpad_id(debug_name: &str, accessor: &MemAccessor) -> String
{
    let err = symserve_core::get_compact_symbol_table(debug_name, "<unspecified>", accessor)
        .await
        .expect_err("bogus breakpad ID must not match");
    expected_id(&err).expect("error did not carry the expected breakpad ID")
}

fn expected_id(err: &symserve_core::SymbolError) -> Option<String>
{
    use symserve_core::SymbolError;
    match err {
        SymbolError::UnmatchedBreakpadId { expected, .. } => Some(expected.clone()),
        SymbolError::NoUsableCandidatePath { last_error, .. } => expected_id(last_error),
        SymbolError::NoMatchMultiArch(errors) => errors.iter().find_map(expected_id),
        _ => None,
    }
}
