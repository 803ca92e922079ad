//! # Error Types
//!
//! General error handling for symbol extraction and queries.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatKind;

/// Main error type for symbol operations
///
/// This enum represents all the ways a symbolication operation can fail.
/// Each variant corresponds to a specific error condition that can occur
/// while locating, reading, or parsing a binary's debug info.
///
/// ## Error Categories
///
/// 1. **Lookup errors**: NoCandidatePath, NoUsableCandidatePath, UnmatchedBreakpadId
/// 2. **Format errors**: NoMatchingFormat, MalformedDebugInfo, NoMatchMultiArch
/// 3. **Query errors**: AddressBeforeFirstSymbol (soft, maps to an "unknown" result)
/// 4. **Request errors**: InvalidRequestJson
/// 5. **I/O errors**: FileIo (propagated from the host `FileAccessor`)
#[derive(Error, Debug)]
pub enum SymbolError
{
    /// The host returned no candidate paths at all for the requested binary.
    ///
    /// This happens when the `FileAccessor` has no idea where the binary or
    /// its debug companion could live. Callers typically report this per
    /// requested module rather than failing the whole request.
    #[error("No candidate path for binary {0}")]
    NoCandidatePath(crate::types::BinaryIdentity),

    /// Every candidate path was tried and none produced a usable symbol table.
    ///
    /// The wrapped error is the failure from the last candidate, which is
    /// usually the most meaningful one (the earlier candidates tend to be
    /// speculative locations that simply don't exist).
    #[error("No usable candidate path for binary {identity}: {last_error}")]
    NoUsableCandidatePath
    {
        identity: crate::types::BinaryIdentity,
        #[source]
        last_error: Box<SymbolError>,
    },

    /// None of the known container formats matched the file's magic bytes.
    #[error("Unrecognized file format for {0}")]
    NoMatchingFormat(PathBuf),

    /// The file matched a format's magic but its structure is invalid.
    ///
    /// Non-fatal for the overall lookup: the caller falls back to the next
    /// candidate path if any remain.
    #[error("Malformed {format} debug info: {detail}")]
    MalformedDebugInfo
    {
        format: FormatKind, detail: String
    },

    /// The file's own build identifier doesn't match the requested one.
    ///
    /// `expected` is the ID the file actually carries, so a caller that
    /// queried with a wrong or unspecified ID can retry with the right one.
    #[error("Unmatched breakpad ID: file has {expected}, requested {actual}")]
    UnmatchedBreakpadId
    {
        expected: String, actual: String
    },

    /// No member of a fat (multi-arch) Mach-O archive matched the requested ID.
    ///
    /// Carries the per-member failures so the caller can enumerate the IDs
    /// the archive does contain.
    #[error("No matching member in multi-arch binary ({} members tried)", .0.len())]
    NoMatchMultiArch(Vec<SymbolError>),

    /// Query address is below the first symbol in the table.
    ///
    /// Soft failure: per-frame callers map this to an "unknown" result
    /// instead of aborting the batch.
    #[error("Address 0x{0:x} is before the first symbol in the table")]
    AddressBeforeFirstSymbol(u32),

    /// The top-level request envelope is not valid JSON.
    #[error("Invalid request JSON: {0}")]
    InvalidRequestJson(String),

    /// An error reported by the host `FileAccessor` while listing candidate
    /// paths, opening a file, or reading a byte range.
    #[error("File I/O error for {path}: {source}")]
    FileIo
    {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience type alias for `Result<T, SymbolError>`
///
/// ```rust
/// use symserve_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, SymbolError>;
