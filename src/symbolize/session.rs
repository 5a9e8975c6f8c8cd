use std::collections::HashSet;
use std::fmt::Arguments;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::io;
use std::io::Write;
use std::mem::replace;
use std::path::PathBuf;

use crate::elf::BuildId;
use crate::locate::Locator;
use crate::log::debug;
use crate::log::warn;
use crate::Addr;
use crate::Error;
use crate::Result;

use super::backend::Backend;
use super::backend::Process;
use super::source_path::SourcePaths;
use super::CallFrame;
use super::LocalVariable;


/// The marker symbolizers use for unknown values.
const UNKNOWN_MARKERS: [&str; 2] = ["??", "unknown"];


/// Write a single line to the diagnostic stream.
fn emit(diagnostics: &mut dyn Write, args: Arguments<'_>) {
    let result = diagnostics
        .write_fmt(args)
        .and_then(|()| diagnostics.write_all(b"\n"));
    if let Err(err) = result {
        warn!("failed to write diagnostic: {err}");
    }
}

/// Parse a single field of a local variable's location line.
fn parse_field<T>(field: Option<&str>) -> Option<T>
where
    T: std::str::FromStr,
{
    let field = field?;
    if UNKNOWN_MARKERS.contains(&field) {
        return None
    }

    let value = field.parse().ok();
    if value.is_none() {
        warn!("encountered malformed frame field `{field}`; treating as unknown");
    }
    value
}


/// A builder for configurable construction of [`Session`] objects.
///
/// By default no directories are searched for binaries, no source
/// prefixes are stripped, protocol logging is disabled, no build ID
/// index is built, and diagnostics go to standard error.
pub struct Builder {
    /// See [`Builder::set_binary_prefixes`].
    binary_prefixes: Vec<PathBuf>,
    /// See [`Builder::set_source_prefixes`].
    source_prefixes: Vec<String>,
    /// See [`Builder::enable_protocol_logging`].
    log_protocol: bool,
    /// See [`Builder::enable_build_id_index`].
    build_index: bool,
    /// See [`Builder::set_diagnostics`].
    diagnostics: Option<Box<dyn Write>>,
}

impl Builder {
    /// Set the directories to search for binaries, in order of
    /// preference.
    pub fn set_binary_prefixes(mut self, prefixes: Vec<PathBuf>) -> Builder {
        self.binary_prefixes = prefixes;
        self
    }

    /// Set the prefixes to strip from reported source locations.
    pub fn set_source_prefixes(mut self, prefixes: Vec<String>) -> Builder {
        self.source_prefixes = prefixes;
        self
    }

    /// Enable/disable echoing of all lines exchanged with the
    /// symbolizer to the diagnostic stream.
    pub fn enable_protocol_logging(mut self, enable: bool) -> Builder {
        self.log_protocol = enable;
        self
    }

    /// Enable/disable indexing all binaries below the binary prefixes
    /// by build ID when the session is created.
    ///
    /// Indexing makes binaries locatable by build ID even if they do
    /// not live at the path recorded in the report, at the cost of
    /// reading every file below the prefixes up front.
    pub fn enable_build_id_index(mut self, enable: bool) -> Builder {
        self.build_index = enable;
        self
    }

    /// Set the stream diagnostics are written to.
    pub fn set_diagnostics<W>(mut self, diagnostics: W) -> Builder
    where
        W: Write + 'static,
    {
        self.diagnostics = Some(Box::new(diagnostics));
        self
    }

    /// Create a [`Session`] talking to the symbolizer at `symbolizer`.
    ///
    /// The process is only started once the first request is issued.
    pub fn build<P>(self, symbolizer: P) -> Session<Process>
    where
        P: Into<PathBuf>,
    {
        self.build_with_backend(Process::new(symbolizer))
    }

    /// Create a [`Session`] using the provided [`Backend`].
    pub fn build_with_backend<B>(self, backend: B) -> Session<B>
    where
        B: Backend,
    {
        let Builder {
            binary_prefixes,
            source_prefixes,
            log_protocol,
            build_index,
            diagnostics,
        } = self;

        let mut session = Session {
            backend,
            locator: Locator::new(binary_prefixes),
            source_paths: SourcePaths::new(source_prefixes),
            log_protocol,
            diagnostics: diagnostics.unwrap_or_else(|| Box::new(io::stderr())),
            warned: HashSet::new(),
        };

        if build_index {
            let _count = session.build_index();
        }
        session
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            binary_prefixes: Vec::new(),
            source_prefixes: Vec::new(),
            log_protocol: false,
            build_index: false,
            diagnostics: None,
        }
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Builder")
            .field("binary_prefixes", &self.binary_prefixes)
            .field("source_prefixes", &self.source_prefixes)
            .field("log_protocol", &self.log_protocol)
            .field("build_index", &self.build_index)
            .finish_non_exhaustive()
    }
}


/// A symbolization session, owning the symbolizer backend for its
/// entire lifetime.
///
/// Binaries named in requests are mapped to files on disk using a
/// [`Locator`]. Binaries that cannot be found produce empty replies and
/// a single warning per distinct binary on the diagnostic stream.
pub struct Session<B = Process> {
    backend: B,
    locator: Locator,
    source_paths: SourcePaths,
    log_protocol: bool,
    diagnostics: Box<dyn Write>,
    /// Binaries we already warned about not finding.
    warned: HashSet<String>,
}

impl Session<Process> {
    /// Retrieve a [`Builder`] object for configurable construction of a
    /// [`Session`].
    pub fn builder() -> Builder {
        Builder::default()
    }
}

impl<B> Session<B>
where
    B: Backend,
{
    /// Retrieve the [`Locator`] used for finding binaries.
    #[inline]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Retrieve the backend in use.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Index all binaries below the binary prefixes by their build ID,
    /// returning the number of binaries indexed.
    pub fn build_index(&mut self) -> usize {
        let Self {
            locator,
            diagnostics,
            ..
        } = self;

        let count = locator.build_index(|path, err| {
            emit(
                &mut **diagnostics,
                format_args!("Failed to parse {}: {err:#}", path.display()),
            )
        });
        debug!("indexed {count} binaries by build ID");
        count
    }

    /// Request the call stack for the code at `addr` inside `binary`.
    ///
    /// `binary` is the path as recorded in the crash report. If it
    /// cannot be located, the call stack is empty.
    pub fn call_stack(
        &mut self,
        binary: &str,
        build_id: Option<&BuildId>,
        addr: Addr,
    ) -> CallStack<'_, B> {
        let state = self.request("CODE", binary, build_id, addr);
        Reply {
            session: self,
            state,
            read: Self::read_call_frame,
        }
    }

    /// Request the local variables of the function containing the code
    /// at `addr` inside `binary`.
    ///
    /// `binary` is the path as recorded in the crash report. If it
    /// cannot be located, no variables are reported.
    pub fn locals(
        &mut self,
        binary: &str,
        build_id: Option<&BuildId>,
        addr: Addr,
    ) -> Locals<'_, B> {
        let state = self.request("FRAME", binary, build_id, addr);
        Reply {
            session: self,
            state,
            read: Self::read_local,
        }
    }

    /// Shut down the session, reporting abnormal termination of the
    /// backend.
    pub fn close(mut self) -> Result<()> {
        self.backend.close()
    }

    fn diagnostic(&mut self, args: Arguments<'_>) {
        emit(&mut *self.diagnostics, args)
    }

    fn locate(&mut self, binary: &str, build_id: Option<&BuildId>) -> Option<PathBuf> {
        let path = self.locator.locate(binary, build_id);
        if path.is_none() {
            let name = binary.strip_prefix('/').unwrap_or(binary);
            if self.warned.insert(name.to_string()) {
                self.diagnostic(format_args!("Could not find symbols for {name}"));
            }
        }
        path
    }

    fn request(
        &mut self,
        kind: &str,
        binary: &str,
        build_id: Option<&BuildId>,
        addr: Addr,
    ) -> State {
        let Some(path) = self.locate(binary, build_id) else {
            return State::Done
        };

        let line = format!("{kind} {} {addr:#x}", path.display());
        if self.log_protocol {
            self.diagnostic(format_args!("#>>  |{line}|"));
        }

        match self.backend.send(&line) {
            Ok(()) => State::Reading,
            Err(err) => State::Failed(err),
        }
    }

    /// Read a single line of a reply.
    ///
    /// `None` marks the end of the reply.
    fn read_line(&mut self) -> Result<Option<String>> {
        let line = self.backend.recv()?;
        let line = line.map(|line| line.trim_end().to_string());
        if self.log_protocol {
            self.diagnostic(format_args!("# << |{}|", line.as_deref().unwrap_or("")));
        }

        match line {
            None => Err(Error::with_unexpected_eof("symbolizer terminated")),
            Some(line) if line.is_empty() => Ok(None),
            Some(line) => Ok(Some(line)),
        }
    }

    fn read_call_frame(&mut self) -> Result<Option<CallFrame>> {
        let Some(function) = self.read_line()? else {
            return Ok(None)
        };
        let Some(file_line) = self.read_line()? else {
            return Ok(None)
        };

        let frame = CallFrame {
            function,
            file_line: self.source_paths.rewrite(&file_line),
        };
        Ok(Some(frame))
    }

    fn read_local(&mut self) -> Result<Option<LocalVariable>> {
        let Some(function) = self.read_line()? else {
            return Ok(None)
        };
        let Some(name) = self.read_line()? else {
            return Ok(None)
        };
        let Some(file_line) = self.read_line()? else {
            return Ok(None)
        };
        let Some(location) = self.read_line()? else {
            return Ok(None)
        };

        let mut fields = location.split_whitespace();
        let local = LocalVariable {
            function,
            file_line: self.source_paths.rewrite(&file_line),
            name,
            frame_offset: parse_field(fields.next()),
            size: parse_field(fields.next()),
            tag_offset: parse_field(fields.next()),
        };
        Ok(Some(local))
    }
}

impl<B> Debug for Session<B>
where
    B: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("locator", &self.locator)
            .field("log_protocol", &self.log_protocol)
            .field("warned", &self.warned)
            .finish_non_exhaustive()
    }
}


#[derive(Debug)]
enum State {
    /// The request was sent and the reply is being read.
    Reading,
    /// Sending the request failed; the error is yet to be reported.
    Failed(Error),
    /// The reply has been read in its entirety (or there is none).
    Done,
}


/// The reply to a single request, as a single-pass sequence of records.
///
/// The sequence ends with the empty line terminating the reply. If the
/// backend went away, the sequence ends with a single error of kind
/// [`UnexpectedEof`][crate::ErrorKind::UnexpectedEof].
///
/// Dropping a partially consumed reply reads the remainder, keeping the
/// session usable for further requests.
pub struct Reply<'session, B, T>
where
    B: Backend,
{
    session: &'session mut Session<B>,
    state: State,
    read: fn(&mut Session<B>) -> Result<Option<T>>,
}

/// The call stack reported for a code address.
pub type CallStack<'session, B> = Reply<'session, B, CallFrame>;

/// The local variables reported for a code address.
pub type Locals<'session, B> = Reply<'session, B, LocalVariable>;

impl<B, T> Iterator for Reply<'_, B, T>
where
    B: Backend,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match replace(&mut self.state, State::Done) {
            State::Done => None,
            State::Failed(err) => Some(Err(err)),
            State::Reading => match (self.read)(&mut *self.session) {
                Ok(Some(record)) => {
                    self.state = State::Reading;
                    Some(Ok(record))
                }
                Ok(None) => None,
                Err(err) => Some(Err(err)),
            },
        }
    }
}

impl<B, T> Drop for Reply<'_, B, T>
where
    B: Backend,
{
    fn drop(&mut self) {
        if let State::Reading = self.state {
            while let Ok(Some(_line)) = self.session.read_line() {}
        }
    }
}

impl<B, T> Debug for Reply<'_, B, T>
where
    B: Backend,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Reply")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
