use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::path::Path;
use std::str::FromStr;

use crate::log::debug;
use crate::util::hexify;
use crate::util::unhexify;
use crate::util::ReadRaw as _;
use crate::Error;
use crate::Mmap;
use crate::Result;

use super::types::Elf64_Ehdr;
use super::types::Elf64_Nhdr;
use super::types::Elf64_Shdr;
use super::types::EHDR_SIZE;
use super::types::ELF64_LE_MAGIC;
use super::types::NHDR_SIZE;
use super::types::NT_GNU_BUILD_ID;
use super::types::SHDR_SIZE;
use super::types::SHT_NOTE;


/// The name of the note owner we are interested in.
const GNU_NOTE_NAME: &[u8; 4] = b"GNU\0";
/// ELF64 notes pad both name and description to four bytes.
const NOTE_ALIGN: usize = 4;


/// A build ID, as embedded in a binary's `.note.gnu.build-id`.
///
/// Build IDs are opaque byte strings. They are rendered (and parsed)
/// as lower case hexadecimal strings, the way crash reports print
/// them.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BuildId(Vec<u8>);

impl BuildId {
    /// Create a build ID from its raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Retrieve the raw bytes making up the build ID.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Display for BuildId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&hexify(&self.0))
    }
}

impl FromStr for BuildId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        unhexify(s)
            .map(Self)
            .ok_or_else(|| Error::with_invalid_input(format!("invalid build ID: `{s}`")))
    }
}


/// Scan the notes of a single `SHT_NOTE` section for a GNU build ID.
fn find_build_id_note(mut notes: &[u8]) -> Option<BuildId> {
    while notes.len() >= NHDR_SIZE {
        let nhdr = Elf64_Nhdr::read(&mut notes)?;
        let name = notes.read_padded_slice(nhdr.n_namesz as usize, NOTE_ALIGN)?;
        let desc = notes.read_padded_slice(nhdr.n_descsz as usize, NOTE_ALIGN)?;

        if nhdr.n_type == NT_GNU_BUILD_ID && name == GNU_NOTE_NAME {
            return Some(BuildId(desc.to_vec()))
        }
    }
    None
}

/// Read the GNU build ID of the ELF64 little endian image in `data`.
///
/// Anything not looking like such an image (too short, wrong magic,
/// 32 bit or big endian) is reported as not having a build ID. The
/// first qualifying note across all `SHT_NOTE` sections wins.
pub fn read_build_id(data: &[u8]) -> Option<BuildId> {
    if data.len() < EHDR_SIZE || data[..ELF64_LE_MAGIC.len()] != ELF64_LE_MAGIC {
        return None
    }

    let ehdr = Elf64_Ehdr::parse(data)?;
    let shoff = usize::try_from(ehdr.e_shoff).ok()?;

    for idx in 0..usize::from(ehdr.e_shnum) {
        let Some(shdr) = idx
            .checked_mul(SHDR_SIZE)
            .and_then(|offset| offset.checked_add(shoff))
            .and_then(|offset| data.get(offset..))
            .and_then(Elf64_Shdr::parse)
        else {
            debug!("section header {idx} is out of bounds; stopping");
            break
        };

        if shdr.sh_type != SHT_NOTE {
            continue
        }

        let notes = usize::try_from(shdr.sh_offset)
            .ok()
            .zip(usize::try_from(shdr.sh_size).ok())
            .and_then(|(offset, size)| data.get(offset..offset.checked_add(size)?));
        let Some(notes) = notes else {
            debug!("note section {idx} is out of bounds; skipping");
            continue
        };

        if let Some(build_id) = find_build_id_note(notes) {
            return Some(build_id)
        }
    }
    None
}

/// Read the GNU build ID of the ELF file at `path`.
///
/// The file is memory mapped rather than read. Failure to open or map
/// the file is reported as an error; the file not being an ELF64 little
/// endian binary or lacking a build ID is not.
#[cfg_attr(feature = "tracing", crate::log::instrument(err))]
pub fn read_elf_build_id(path: &Path) -> Result<Option<BuildId>> {
    let mmap = Mmap::open(path)?;
    Ok(read_build_id(&mmap))
}
