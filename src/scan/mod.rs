//! Scanning of crash reports.
//!
//! A [`Scanner`] reads a report line by line and passes every line
//! through, except for
//! - backtrace frames (`#0 0x... (/lib/libfoo.so+0x1234)`), which are
//!   symbolized, including their inlined callers
//! - stack history records following a `Previously allocated frames:`
//!   header, which are consumed and checked for local variables the
//!   faulting access may have referenced
//!
//! ```no_run
//! use std::io;
//!
//! use hwasym::scan::Scanner;
//! use hwasym::symbolize::Session;
//!
//! let session = Session::builder()
//!     .set_binary_prefixes(vec!["/out/symbols".into()])
//!     .build("/usr/bin/llvm-symbolizer");
//! let mut scanner = Scanner::builder().build(session);
//! let () = scanner.run(io::stdin().lock(), io::stdout().lock()).unwrap();
//! ```

mod classify;
mod print;
mod scanner;
mod stack;

pub use print::Format;
pub use scanner::Builder;
pub use scanner::ScanState;
pub use scanner::Scanner;
pub use stack::find_stack_objects;
pub use stack::Access;
pub use stack::FrameRecord;
pub use stack::StackObject;
