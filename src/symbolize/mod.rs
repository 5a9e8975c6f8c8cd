//! Symbolization by means of an external, `llvm-symbolizer` compatible
//! process.
//!
//! A [`Session`] owns a single long-lived symbolizer process and issues
//! two kinds of requests to it:
//! - `CODE <binary> <addr>`, answered with pairs of lines (function
//!   name, `file:line`), one pair per (inlined) frame
//! - `FRAME <binary> <addr>`, answered with quadruples of lines
//!   (function name, variable name, `file:line`, `offset size
//!   tag_offset`), one quadruple per local variable
//!
//! Both replies are terminated by an empty line.
//!
//! ```no_run
//! use hwasym::symbolize::Session;
//!
//! let mut session = Session::builder()
//!     .set_binary_prefixes(vec!["/out/symbols".into()])
//!     .build("/usr/bin/llvm-symbolizer");
//!
//! for frame in session.call_stack("/system/lib64/libc.so", None, 0x1234) {
//!     let frame = frame.unwrap();
//!     println!("{} in {}", frame.function, frame.file_line);
//! }
//! ```

pub(crate) mod backend;
mod session;
mod source_path;

pub use backend::Backend;
pub use backend::Process;
pub use session::Builder;
pub use session::CallStack;
pub use session::Locals;
pub use session::Reply;
pub use session::Session;


/// A single frame of a call stack, as reported for a code address.
///
/// Inlined functions produce multiple frames for one address; they are
/// reported innermost first.
#[derive(Clone, Debug, PartialEq)]
pub struct CallFrame {
    /// The name of the function.
    pub function: String,
    /// The source location, typically `file:line[:column]`.
    pub file_line: String,
}


/// Stack frame meta data of a single local variable.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariable {
    /// The name of the function the variable belongs to.
    pub function: String,
    /// The source location of the variable's declaration.
    pub file_line: String,
    /// The name of the variable.
    pub name: String,
    /// The variable's offset relative to the frame's base, if known.
    pub frame_offset: Option<i64>,
    /// The variable's size in bytes, if known.
    pub size: Option<u64>,
    /// The tag offset the variable was tagged with, relative to the
    /// frame's base tag, if known.
    pub tag_offset: Option<u64>,
}
