//! Tests for symbol table building invariants

use symserve_core::table::CompactSymbolTable;
use symserve_core::types::RawSymbol;

fn messy_input() -> Vec<RawSymbol>
{
    vec![
        RawSymbol::new(0x400, "_ZN4core3ptr13drop_in_place17h1443b15eb8838cedE"),
        RawSymbol::new(0x100, "foo"),
        RawSymbol::new(0x200, "bar"),
        RawSymbol::new(0x100, "foo_alias"),
        RawSymbol::new(0x300, ""),
        RawSymbol::new(0x300, "late_name"),
        RawSymbol::new(0x250, "bar"),
    ]
}

#[test]
fn test_addresses_strictly_ascending()
{
    let table = CompactSymbolTable::build(messy_input());
    for window in table.addr.windows(2) {
        assert!(window[0] < window[1], "addresses must be strictly increasing");
    }
}

#[test]
fn test_parallel_arrays_same_length()
{
    let table = CompactSymbolTable::build(messy_input());
    assert_eq!(table.addr.len(), table.index.len());
}

#[test]
fn test_every_index_is_valid_offset()
{
    let table = CompactSymbolTable::build(messy_input());
    for i in 0..table.len() {
        assert!((table.index[i] as usize) < table.buffer.len());
        assert!(table.name_at(i).is_some(), "entry {i} must have a readable name");
    }
}

#[test]
fn test_build_is_deterministic()
{
    let first = CompactSymbolTable::build(messy_input());
    let second = CompactSymbolTable::build(messy_input());
    assert_eq!(first.addr, second.addr);
    assert_eq!(first.index, second.index);
    assert_eq!(first.buffer, second.buffer);
}

#[test]
fn test_duplicate_address_prefers_first_seen()
{
    let table = CompactSymbolTable::build(vec![
        RawSymbol::new(0x100, "foo"),
        RawSymbol::new(0x200, "bar"),
        RawSymbol::new(0x100, "foo_alias"),
    ]);
    assert_eq!(table.addr, vec![0x100, 0x200]);
    assert_eq!(table.name_at(0), Some("foo"));
    assert_eq!(table.name_at(1), Some("bar"));
}

#[test]
fn test_names_are_demangled()
{
    let table = CompactSymbolTable::build(messy_input());
    let position = table.addr.iter().position(|&a| a == 0x400).unwrap();
    assert_eq!(table.name_at(position), Some("core::ptr::drop_in_place"));
}

#[test]
fn test_empty_input_builds_empty_table()
{
    let table = CompactSymbolTable::build(Vec::new());
    assert!(table.is_empty());
    assert!(table.addr.is_empty());
    assert!(table.index.is_empty());
    assert!(table.buffer.is_empty());
}
