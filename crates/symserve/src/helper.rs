//! # Directory Accessor
//!
//! `FileAccessor` over one local symbol directory: the CLI's host side of
//! the capability seam. Candidate paths cover the usual debug-companion
//! layouts next to the binary itself.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use symserve_core::accessor::{FileAccessor, FileAccessorResult, FileContents};

/// Resolves binaries inside a single local directory.
pub struct DirectoryAccessor
{
    symbol_directory: PathBuf,
}

impl DirectoryAccessor
{
    pub fn new(symbol_directory: impl Into<PathBuf>) -> Self
    {
        Self {
            symbol_directory: symbol_directory.into(),
        }
    }
}

#[async_trait]
impl FileAccessor for DirectoryAccessor
{
    type Contents = LocalFile;

    async fn get_candidate_paths_for_binary_or_pdb(
        &self,
        debug_name: &str,
        _breakpad_id: &str,
    ) -> FileAccessorResult<Vec<PathBuf>>
    {
        let mut paths = vec![];

        // Detached debug info next to shared libraries.
        if debug_name.ends_with(".so") {
            paths.push(self.symbol_directory.join(format!("{debug_name}.dbg")));
        }

        // dSYM bundles.
        if !debug_name.ends_with(".pdb") {
            paths.push(
                self.symbol_directory
                    .join(format!("{debug_name}.dSYM"))
                    .join("Contents")
                    .join("Resources")
                    .join("DWARF")
                    .join(debug_name),
            );
        }

        // Finally, the file itself.
        paths.push(self.symbol_directory.join(debug_name));

        Ok(paths)
    }

    async fn read_file(&self, path: &Path) -> FileAccessorResult<Self::Contents>
    {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(LocalFile {
            file: Mutex::new(file),
            len,
        })
    }
}

/// An opened local file serving positioned reads.
///
/// Reads on one handle are sequential by contract, so a plain mutex
/// around seek-then-read is enough; it never contends.
pub struct LocalFile
{
    file: Mutex<File>,
    len: u64,
}

impl FileContents for LocalFile
{
    fn len(&self) -> u64
    {
        self.len
    }

    fn read_bytes_at(&self, buffer: &mut [u8], offset: u64) -> FileAccessorResult<()>
    {
        let mut file = self.file.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buffer)?;
        Ok(())
    }
}
