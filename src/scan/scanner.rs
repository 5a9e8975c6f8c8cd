use std::io::BufRead;
use std::io::Write;

use crate::log::debug;
use crate::log::trace;
use crate::log::warn;
use crate::symbolize::Backend;
use crate::symbolize::CallFrame;
use crate::symbolize::Process;
use crate::symbolize::Session;
use crate::Addr;
use crate::Result;

use super::classify::Frame;
use super::classify::HistoryRecord;
use super::classify::Line;
use super::classify::LineClassifier;
use super::print::Format;
use super::stack::find_stack_objects;
use super::stack::Access;


/// The state carried from one line of a report to the next.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanState {
    /// The address of the most recently reported tag mismatch.
    pub last_access_address: Option<Addr>,
    /// The pointer tag of the most recently reported access.
    pub last_access_tag: Option<u8>,
    /// Whether stack history records are being processed.
    history: bool,
}

impl ScanState {
    /// The faulting access, if both its address and tag are known.
    pub fn access(&self) -> Option<Access> {
        Some(Access {
            addr: self.last_access_address?,
            tag: self.last_access_tag?,
        })
    }

    /// Whether a stack history header has been seen for the current
    /// access.
    #[inline]
    pub fn history_armed(&self) -> bool {
        self.history
    }

    pub(crate) fn arm_history(&mut self) {
        self.history = true
    }
}


/// A builder for configurable construction of [`Scanner`] objects.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    /// See [`Builder::enable_ignore_tags`].
    ignore_tags: bool,
    /// See [`Builder::set_format`].
    format: Format,
}

impl Builder {
    /// Enable/disable ignoring tags when attributing an access to stack
    /// objects.
    ///
    /// With tags ignored, every variable the faulting address falls
    /// into is reported, irrespective of its tag.
    pub fn enable_ignore_tags(mut self, enable: bool) -> Builder {
        self.ignore_tags = enable;
        self
    }

    /// Set the output format.
    pub fn set_format(mut self, format: Format) -> Builder {
        self.format = format;
        self
    }

    /// Create the [`Scanner`], symbolizing using `session`.
    pub fn build<B>(self, session: Session<B>) -> Scanner<B>
    where
        B: Backend,
    {
        let Builder {
            ignore_tags,
            format,
        } = self;

        Scanner {
            session,
            classifier: LineClassifier::new(),
            state: ScanState::default(),
            ignore_tags,
            format,
        }
    }
}


/// A scanner of crash reports, symbolizing them line by line.
#[derive(Debug)]
pub struct Scanner<B = Process>
where
    B: Backend,
{
    session: Session<B>,
    classifier: LineClassifier,
    state: ScanState,
    ignore_tags: bool,
    format: Format,
}

impl Scanner<Process> {
    /// Retrieve a [`Builder`] object for configurable construction of a
    /// [`Scanner`].
    pub fn builder() -> Builder {
        Builder::default()
    }
}

impl<B> Scanner<B>
where
    B: Backend,
{
    /// Symbolize the report read from `input`, writing the result to
    /// `out`.
    pub fn run<R, W>(&mut self, mut input: R, mut out: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        let () = self.format.prologue(&mut out)?;

        let mut buffer = Vec::new();
        loop {
            let () = buffer.clear();
            if input.read_until(b'\n', &mut buffer)? == 0 {
                break
            }
            let line = String::from_utf8_lossy(&buffer);
            let () = self.process_line(&line, &mut out)?;
        }

        let () = self.format.epilogue(&mut out)?;
        let () = out.flush()?;
        Ok(())
    }

    /// Process a single line of a report, writing the resulting line(s)
    /// to `out`.
    pub fn process_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let line = line.trim_end_matches(['\n', '\r']);

        if let Some(addr) = self.classifier.access_address(line) {
            debug!("tag mismatch on address {addr:#x}");
            self.state.last_access_address = Some(addr);
            self.state.history = false;
        }
        if let Some(tag) = self.classifier.access_tag(line) {
            debug!("access with pointer tag {tag:#04x}");
            self.state.last_access_tag = Some(tag);
        }

        match self.classifier.classify(line, &self.state) {
            Line::HistoryHeader => {
                let () = self.state.arm_history();
                Ok(())
            }
            Line::HistoryRecord(record) => self.print_stack_objects(&record, out),
            Line::Frame(frame) => self.print_frame(line, &frame, out),
            Line::Other => self.format.line(out, line.trim_end()),
        }
    }

    fn print_stack_objects(
        &mut self,
        record: &HistoryRecord<'_>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let Some(access) = self.state.access() else {
            return Ok(())
        };

        trace!(
            "resolving {access:?} against frame record {:?} (pc {:#x})",
            record.record,
            record.record.pc()
        );

        // The symbolizer resolves module relative addresses, so the
        // record's `(binary+offset)` is what we ask about. The decoded
        // pc is absolute and only useful for tracing.
        let mut locals = Vec::new();
        for result in self
            .session
            .locals(record.binary, record.build_id.as_ref(), record.offset)
        {
            match result {
                Ok(local) => locals.push(local),
                Err(err) => {
                    warn!("failed to retrieve locals for {}: {err}", record.binary);
                    break
                }
            }
        }

        let objects = find_stack_objects(&record.record, &access, locals, self.ignore_tags);
        for object in objects {
            let () = self.format.line(out, "")?;
            let () = self
                .format
                .line(out, "Potentially referenced stack object:")?;
            let () = self.format.line(
                out,
                &format!(
                    "  {} bytes inside a variable \"{}\" in stack frame of function \"{}\"",
                    object.offset, object.local.name, object.local.function
                ),
            )?;
            let () = self
                .format
                .line(out, &format!("  at {}", object.local.file_line))?;
        }
        Ok(())
    }

    fn print_frame(
        &mut self,
        line: &str,
        frame: &Frame<'_>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut frames = Vec::<CallFrame>::new();
        for result in self
            .session
            .call_stack(frame.binary, frame.build_id.as_ref(), frame.offset)
        {
            match result {
                Ok(call_frame) => frames.push(call_frame),
                Err(err) => {
                    warn!("failed to symbolize {}+{:#x}: {err}", frame.binary, frame.offset);
                    break
                }
            }
        }

        let mut frames = frames.into_iter();
        let Some(first) = frames.next() else {
            return self.format.line(out, line.trim_end())
        };

        let () = self.format.line(
            out,
            &format!(
                "{}#{}{}{} in {}",
                frame.prefix, frame.number, frame.spacing, first.function, first.file_line
            ),
        )?;

        // Inlined frames are aligned with the function name above.
        let indent = " ".repeat(frame.prefix.chars().count());
        let padding = " ".repeat((1 + frame.number.len() + frame.spacing.len()).saturating_sub(2));
        for inlined in frames {
            let () = self.format.line(
                out,
                &format!(
                    "{indent}->{padding}{} in {}",
                    inlined.function, inlined.file_line
                ),
            )?;
        }
        Ok(())
    }

    /// Retrieve the current scan state.
    #[inline]
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Retrieve the session used for symbolization.
    #[inline]
    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    /// Destroy the scanner, returning the session it used.
    pub fn into_session(self) -> Session<B> {
        self.session
    }
}
