use std::ffi::OsString;
use std::io::BufRead as _;
use std::io::BufReader;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::ChildStdin;
use std::process::ChildStdout;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;

use crate::log::debug;
use crate::log::warn;
use crate::Error;
use crate::ErrorExt as _;
use crate::IntoError as _;
use crate::Result;


/// The arguments we pass to the symbolizer: expand inlined frames and
/// report function names.
const DEFAULT_ARGS: [&str; 2] = ["--inlining", "--functions"];


/// A line based channel to a symbolization backend.
///
/// Requests are single lines. Replies are a sequence of lines
/// terminated by an empty one.
pub trait Backend {
    /// Send a single request line.
    fn send(&mut self, line: &str) -> Result<()>;

    /// Receive a single reply line, without the line terminator.
    ///
    /// `None` indicates that the backend closed its output.
    fn recv(&mut self) -> Result<Option<String>>;

    /// Shut down the backend, reporting abnormal termination.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}


#[derive(Debug)]
struct Running {
    child: Child,
    /// The request channel. Dropping it signals end-of-input to the
    /// child.
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}


/// A [`Backend`] talking to an external `llvm-symbolizer` compatible
/// process over its standard input and output.
///
/// The process is started on first use and lives until the object is
/// closed or dropped, at which point its input gets closed and it is
/// waited for.
#[derive(Debug)]
pub struct Process {
    program: PathBuf,
    args: Vec<OsString>,
    running: Option<Running>,
}

impl Process {
    /// Create a new [`Process`] for the symbolizer at `program`.
    pub fn new<P>(program: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self::with_args(program, DEFAULT_ARGS)
    }

    /// Create a new [`Process`] for `program`, invoked with `args`
    /// instead of the default arguments.
    pub fn with_args<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(A::into).collect(),
            running: None,
        }
    }

    /// Retrieve the path to the symbolizer executable.
    #[inline]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check whether the process has been started (and not yet shut
    /// down).
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn running(&mut self) -> Result<&mut Running> {
        if self.running.is_none() {
            debug!("starting symbolizer {}", self.program.display());
            let mut child = Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .spawn()
                .with_context(|| format!("failed to start {}", self.program.display()))?;
            let stdin = child.stdin.take().ok_or_invalid_data(|| "no stdin pipe")?;
            let stdout = child.stdout.take().ok_or_invalid_data(|| "no stdout pipe")?;

            self.running = Some(Running {
                child,
                stdin: Some(stdin),
                stdout: BufReader::new(stdout),
            });
        }

        // SANITY: We just made sure that the process is running.
        Ok(self.running.as_mut().unwrap())
    }

    /// Close the request channel and wait for the process to exit.
    ///
    /// Returns `None` if the process was never started.
    fn shutdown(&mut self) -> Result<Option<ExitStatus>> {
        let Some(mut running) = self.running.take() else {
            return Ok(None)
        };

        drop(running.stdin.take());
        let status = running
            .child
            .wait()
            .with_context(|| format!("failed to wait for {}", self.program.display()))?;
        debug!("symbolizer exited with {status}");
        Ok(Some(status))
    }
}

impl Backend for Process {
    fn send(&mut self, line: &str) -> Result<()> {
        let running = self.running()?;
        let stdin = running
            .stdin
            .as_mut()
            .ok_or_else(|| Error::with_other("symbolizer input is closed"))?;
        let () = writeln!(stdin, "{line}").context("failed to send request to symbolizer")?;
        let () = stdin.flush().context("failed to send request to symbolizer")?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<String>> {
        let running = self.running()?;
        let mut buf = Vec::new();
        let count = running
            .stdout
            .read_until(b'\n', &mut buf)
            .context("failed to read reply from symbolizer")?;
        if count == 0 {
            return Ok(None)
        }

        // Names may not be valid UTF-8. The line is consumed either
        // way, so decode lossily to stay in step with the reply.
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        Ok(Some(line))
    }

    fn close(&mut self) -> Result<()> {
        match self.shutdown()? {
            Some(status) if !status.success() => Err(Error::with_other(format!(
                "{} exited with {status}",
                self.program.display()
            ))),
            _ => Ok(()),
        }
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("failed to shut down symbolizer: {err}");
        }
    }
}
