//! **hwasym** symbolizes crash reports of tag-based memory-safety
//! runtimes and attributes faulting accesses to stack objects.
#![doc = include_str!("../README.md")]

mod error;
mod log;
mod mmap;
mod util;

pub mod elf;
pub mod locate;
pub mod scan;
pub mod symbolize;


pub use crate::error::Error;
pub use crate::error::ErrorExt;
pub use crate::error::ErrorKind;
pub use crate::error::IntoError;
pub use crate::mmap::Mmap;

/// A result type using our [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A type representing addresses.
pub type Addr = u64;
