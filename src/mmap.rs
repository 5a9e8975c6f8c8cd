use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap as Mapping;
use memmap2::MmapOptions;

use crate::Error;
use crate::ErrorExt as _;
use crate::Result;


/// A read-only view of a file's contents, backed by a memory mapping.
///
/// Files are never copied into memory in their entirety; pages are
/// faulted in by the kernel as they get accessed.
#[derive(Debug)]
pub struct Mmap {
    /// The actual memory mapping, if any.
    ///
    /// The kernel does not allow mapping a region of size zero, so
    /// empty files are represented without one.
    mapping: Option<Mapping>,
}

impl Mmap {
    /// Memory map the file at the provided `path`.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::map(&file).with_context(|| format!("failed to map {}", path.display()))
    }

    /// Map the provided file into memory, in its entirety.
    pub fn map(file: &File) -> Result<Self> {
        let len = libc::size_t::try_from(file.metadata()?.len())
            .map_err(Error::with_invalid_data)
            .context("file is too large to mmap")?;

        let mapping = if len == 0 {
            None
        } else {
            // SAFETY: The mapping is read-only. Concurrent modification
            //         of the file by another process could change the
            //         data underneath us, but not invalidate memory
            //         safety of reads through the slice.
            let mapping = unsafe { MmapOptions::new().len(len).map(file) }?;
            Some(mapping)
        };
        Ok(Self { mapping })
    }
}

impl Deref for Mmap {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.mapping.as_deref().unwrap_or(&[])
    }
}
