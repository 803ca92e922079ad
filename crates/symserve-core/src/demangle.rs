//! # Demangling
//!
//! Turns mangled linker names into human-readable ones, across the Rust,
//! Itanium C++, and MSVC mangling schemes. Unmangled or unknown-scheme
//! names pass through unchanged, so the table builder can feed every raw
//! symbol through [`demangle_any`] unconditionally.

use msvc_demangler::DemangleFlags;

/// Demangle `name` with whichever scheme matches, or return it as-is.
///
/// Order matters: legacy Rust symbols are a strict subset of Itanium C++
/// (`_ZN...17h<hash>E`), so Rust demangling runs first and strips the
/// trailing hash. MSVC names are disjoint (`?`-prefixed).
pub fn demangle_any(name: &str) -> String
{
    if let Ok(demangled) = rustc_demangle::try_demangle(name) {
        return format!("{demangled:#}");
    }

    if name.starts_with('?') {
        let flags = DemangleFlags::NO_ACCESS_SPECIFIERS
            | DemangleFlags::NO_FUNCTION_RETURNS
            | DemangleFlags::NO_MEMBER_TYPE
            | DemangleFlags::NO_MS_KEYWORDS
            | DemangleFlags::NO_THISTYPE
            | DemangleFlags::NO_CLASS_TYPE
            | DemangleFlags::SPACE_AFTER_COMMA
            | DemangleFlags::HUG_TYPE;
        if let Ok(demangled) = msvc_demangler::demangle(name, flags) {
            return demangled;
        }
    }

    if name.starts_with("_Z") || name.starts_with("__Z") {
        let stripped = name.strip_prefix('_').filter(|n| n.starts_with("_Z")).unwrap_or(name);
        if let Ok(symbol) = cpp_demangle::Symbol::new(stripped) {
            let options = cpp_demangle::DemangleOptions::default().no_return_type();
            if let Ok(demangled) = symbol.demangle(&options) {
                return demangled;
            }
        }
    }

    name.to_string()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_demangle_rust_legacy()
    {
        let demangled = demangle_any("_ZN4core3ptr13drop_in_place17h1443b15eb8838cedE");
        assert_eq!(demangled, "core::ptr::drop_in_place");
    }

    #[test]
    fn test_demangle_rust_v0()
    {
        let demangled = demangle_any("_RNvC6_123foo3bar");
        assert_eq!(demangled, "123foo::bar");
    }

    #[test]
    fn test_demangle_itanium_cpp()
    {
        let demangled = demangle_any("_ZN3foo3barEv");
        assert!(demangled.contains("foo::bar"));
    }

    #[test]
    fn test_demangle_macho_itanium_extra_underscore()
    {
        // Mach-O prepends an extra underscore to every C symbol.
        let demangled = demangle_any("__ZN7mozilla20ProfileChunkedBuffer17ResetChunkManagerEv");
        assert!(demangled.contains("ProfileChunkedBuffer"));
    }

    #[test]
    fn test_demangle_msvc()
    {
        let demangled = demangle_any("?world@@YAXXZ");
        assert!(demangled.contains("world"));
    }

    #[test]
    fn test_passthrough_plain_name()
    {
        assert_eq!(demangle_any("main"), "main");
        assert_eq!(demangle_any(""), "");
    }
}
