//! Minimal ELF support: reading GNU build IDs of ELF64 little endian
//! binaries, straight from a memory mapped view of the file.

pub(crate) mod buildid;
#[allow(dead_code, non_camel_case_types)]
mod types;

pub use buildid::read_build_id;
pub use buildid::read_elf_build_id;
pub use buildid::BuildId;
