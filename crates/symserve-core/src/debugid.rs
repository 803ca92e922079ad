//! # Breakpad ID Derivation
//!
//! Every parser computes the breakpad ID its file actually carries so the
//! manager can reject candidates whose build doesn't match the requested
//! identity. The ID is 33 hex chars: a 32-char GUID followed by the PDB
//! age (`0` for formats without one).
//!
//! Breakpad prints the identifier as a Windows GUID struct read from
//! memory on a little-endian machine, which byte-swaps the first three
//! fields. ELF build IDs and PE CodeView GUIDs go through that swap;
//! Mach-O UUIDs are already stored in big-endian field order and don't.

/// Format 16 little-endian GUID bytes plus an age.
///
/// Used for ELF build IDs and PE CodeView records.
pub fn from_little_endian_guid(bytes: &[u8; 16], age: u32) -> String
{
    let data1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);
    format_guid(data1, data2, data3, &bytes[8..16], age)
}

/// Format 16 big-endian UUID bytes plus an age.
///
/// Used for Mach-O `LC_UUID` values and GUIDs that were already decoded
/// into field order (the `pdb` crate's `Uuid`).
pub fn from_big_endian_uuid(bytes: &[u8; 16], age: u32) -> String
{
    let data1 = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let data2 = u16::from_be_bytes([bytes[4], bytes[5]]);
    let data3 = u16::from_be_bytes([bytes[6], bytes[7]]);
    format_guid(data1, data2, data3, &bytes[8..16], age)
}

/// Derive an ID from an ELF GNU build ID note.
///
/// Takes the first 16 bytes, zero-padding a shorter note, and uses age 0.
pub fn from_elf_build_id(build_id: &[u8]) -> String
{
    let mut bytes = [0u8; 16];
    let len = build_id.len().min(16);
    bytes[..len].copy_from_slice(&build_id[..len]);
    from_little_endian_guid(&bytes, 0)
}

/// Derive an ID for an ELF file with no build ID note.
///
/// Folds the first page of the file into 16 bytes by XORing 16-byte
/// blocks, matching Breakpad's fallback for stripped files.
pub fn from_first_page_hash(page: &[u8]) -> String
{
    let mut bytes = [0u8; 16];
    for (index, byte) in page.iter().take(4096).enumerate() {
        bytes[index % 16] ^= byte;
    }
    // An all-zero identifier would collide with "no ID at all".
    if bytes.iter().all(|&b| b == 0) {
        bytes[0] = 1;
    }
    from_little_endian_guid(&bytes, 0)
}

fn format_guid(data1: u32, data2: u16, data3: u16, data4: &[u8], age: u32) -> String
{
    use std::fmt::Write;

    let mut id = String::with_capacity(33);
    // Infallible for String, but write! is the only formatted append.
    let _ = write!(id, "{data1:08X}{data2:04X}{data3:04X}");
    for byte in data4 {
        let _ = write!(id, "{byte:02X}");
    }
    let _ = write!(id, "{age:x}");
    id
}
