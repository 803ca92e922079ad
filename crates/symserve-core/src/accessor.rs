//! # File Accessor
//!
//! The capability seam between the core and the host environment.
//!
//! The host supplies candidate file-system paths for a binary identity and
//! random-access reads over a chosen path. The core never touches the file
//! system directly; everything flows through [`FileAccessor`], so the same
//! engine runs against local directories, symbol servers, or an embedder's
//! own storage.
//!
//! Contents handles are scoped to a single parse: they are acquired inside
//! the candidate-path loop and dropped on every exit path, including parse
//! failure, by normal ownership rules.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use crate::error::{Result, SymbolError};

/// Host-defined error type for accessor operations
pub type FileAccessorError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias for accessor results
pub type FileAccessorResult<T> = std::result::Result<T, FileAccessorError>;

/// Host-provided file location and access service
///
/// Implementors answer two questions: where might a binary (or its debug
/// companion, e.g. a PDB) live, and what bytes does a chosen path hold.
/// Both operations are asynchronous; a pending read suspends the issuing
/// task without blocking sibling requests.
#[async_trait]
pub trait FileAccessor: Send + Sync
{
    /// Random-access byte source returned by [`Self::read_file`]
    type Contents: FileContents + 'static;

    /// Candidate file-system paths for the named binary, best guess first.
    ///
    /// May legitimately return an empty list when the host has no idea
    /// where the binary lives; the caller reports that per module.
    async fn get_candidate_paths_for_binary_or_pdb(
        &self,
        debug_name: &str,
        breakpad_id: &str,
    ) -> FileAccessorResult<Vec<PathBuf>>;

    /// Open one candidate path for reading.
    async fn read_file(&self, path: &Path) -> FileAccessorResult<Self::Contents>;
}

#[async_trait]
impl<'a, A: FileAccessor> FileAccessor for &'a A
{
    type Contents = A::Contents;

    async fn get_candidate_paths_for_binary_or_pdb(
        &self,
        debug_name: &str,
        breakpad_id: &str,
    ) -> FileAccessorResult<Vec<PathBuf>>
    {
        (**self).get_candidate_paths_for_binary_or_pdb(debug_name, breakpad_id).await
    }

    async fn read_file(&self, path: &Path) -> FileAccessorResult<Self::Contents>
    {
        (**self).read_file(path).await
    }
}

/// Random-access bytes of one opened file
///
/// Reads on one handle are strictly sequential (the trait takes `&self`
/// but the core never issues overlapping reads against the same handle);
/// independent handles may be read concurrently.
pub trait FileContents: Send + Sync
{
    /// Total size of the file in bytes
    fn len(&self) -> u64;

    /// Fill `buffer` with bytes starting at `offset`.
    ///
    /// Fails if the requested range extends past the end of the file.
    fn read_bytes_at(&self, buffer: &mut [u8], offset: u64) -> FileAccessorResult<()>;

    fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

/// Wrapper that adapts a [`FileContents`] handle for the parsers
///
/// Whole-file formats (ELF, thin Mach-O, PE) parse from one memoized full
/// read; streaming formats (PDB streams, fat Mach-O members) issue bounded
/// range reads and never materialize the whole file.
pub struct FileContentsWrapper<F: FileContents>
{
    contents: F,
    path: PathBuf,
    len: u64,
    entire: OnceCell<Vec<u8>>,
}

impl<F: FileContents> FileContentsWrapper<F>
{
    pub fn new(contents: F, path: impl Into<PathBuf>) -> Self
    {
        let len = contents.len();
        Self {
            contents,
            path: path.into(),
            len,
            entire: OnceCell::new(),
        }
    }

    pub fn len(&self) -> u64
    {
        self.len
    }

    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    /// The candidate path this handle was opened from
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Read a bounded range without touching the rest of the file.
    ///
    /// If the whole file has already been memoized by
    /// [`Self::read_entire_data`], the range is served from that buffer
    /// instead of issuing another host read.
    pub fn read_range(&self, offset: u64, size: u64) -> Result<Vec<u8>>
    {
        if offset.checked_add(size).is_none_or(|end| end > self.len) {
            return Err(self.io_error(format!(
                "read of {size} bytes at offset {offset} past end of {}-byte file",
                self.len
            )));
        }

        if let Some(entire) = self.entire.get() {
            return Ok(entire[offset as usize..(offset + size) as usize].to_vec());
        }

        let mut buffer = vec![0; size as usize];
        self.contents
            .read_bytes_at(&mut buffer, offset)
            .map_err(|err| SymbolError::FileIo {
                path: self.path.clone(),
                source: err,
            })?;
        Ok(buffer)
    }

    /// Read and memoize the entire file.
    ///
    /// Subsequent calls (and range reads) are served from the cached
    /// buffer. Used by the whole-file parsers.
    pub fn read_entire_data(&self) -> Result<&[u8]>
    {
        self.entire
            .get_or_try_init(|| {
                let mut buffer = vec![0; self.len as usize];
                self.contents
                    .read_bytes_at(&mut buffer, 0)
                    .map_err(|err| SymbolError::FileIo {
                        path: self.path.clone(),
                        source: err,
                    })?;
                Ok(buffer)
            })
            .map(Vec::as_slice)
    }

    fn io_error(&self, detail: String) -> SymbolError
    {
        SymbolError::FileIo {
            path: self.path.clone(),
            source: detail.into(),
        }
    }
}

/// In-memory contents, mainly for tests and embedders that already hold
/// the file bytes.
#[derive(Debug, Clone)]
pub struct MemoryContents(pub Vec<u8>);

impl FileContents for MemoryContents
{
    fn len(&self) -> u64
    {
        self.0.len() as u64
    }

    fn read_bytes_at(&self, buffer: &mut [u8], offset: u64) -> FileAccessorResult<()>
    {
        let start = offset as usize;
        let end = start
            .checked_add(buffer.len())
            .filter(|&end| end <= self.0.len())
            .ok_or_else(|| -> FileAccessorError {
                format!("read past end: offset {offset}, len {}", buffer.len()).into()
            })?;
        buffer.copy_from_slice(&self.0[start..end]);
        Ok(())
    }
}
