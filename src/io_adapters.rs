use crate::lexer::MAX_LINE;
use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Result as IoResult, Write};
use std::os::fd::AsFd;
use std::process::Stdio;
use std::rc::Rc;

/// Result of one blocking read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, without its trailing newline.
    Line(String),
    /// The read was cut short by the interrupt key or signal.
    Interrupted,
    /// The input stream is exhausted.
    Eof,
}

/// Source of command lines for the read-eval loop.
pub trait LineSource {
    /// Show `prompt` and block for one line.
    ///
    /// An `Err` means the stream is unusable and the interpreter must stop.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Called with every line that was recorded into history.
    fn remember(&mut self, _line: &str) {}
}

impl LineSource for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(ReadlineError::Io(e)) if e.kind() == std::io::ErrorKind::Interrupted => {
                Ok(ReadOutcome::Interrupted)
            }
            Err(err) => Err(anyhow::anyhow!("Unable to read command: {}", err)),
        }
    }

    fn remember(&mut self, line: &str) {
        if let Err(err) = self.add_history_entry(line) {
            tracing::debug!(%err, "editor rejected history entry");
        }
    }
}

/// Line source for non-terminal input (pipes, files).
///
/// Prints the prompt itself and reads with plain `read(2)` calls, so a signal
/// that interrupts the read ends the cycle as [`ReadOutcome::Interrupted`]
/// instead of being retried. Bytes already received stay buffered.
pub struct ReaderLines<R, W> {
    reader: R,
    prompt_out: W,
    pending: Vec<u8>,
    eof: bool,
}

impl<R: Read, W: Write> ReaderLines<R, W> {
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self {
            reader,
            prompt_out,
            pending: Vec::new(),
            eof: false,
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    }
}

impl ReaderLines<File, io::Stdout> {
    /// Read the process's standard input, prompting on standard output.
    pub fn stdin() -> Result<Self> {
        let fd = io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .context("failed to duplicate stdin")?;
        Ok(Self::new(File::from(fd), io::stdout()))
    }
}

impl<R: Read, W: Write> LineSource for ReaderLines<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.prompt_out.write_all(prompt.as_bytes())?;
        self.prompt_out.flush()?;

        let mut chunk = [0u8; MAX_LINE];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(ReadOutcome::Line(line));
            }
            if self.eof {
                if self.pending.is_empty() {
                    return Ok(ReadOutcome::Eof);
                }
                let rest = std::mem::take(&mut self.pending);
                return Ok(ReadOutcome::Line(String::from_utf8_lossy(&rest).into_owned()));
            }
            match self.reader.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    return Ok(ReadOutcome::Interrupted);
                }
                Err(e) => return Err(e).context("Unable to read command. Terminating."),
            }
        }
    }
}

/// Memory-backed line source that replays a fixed script.
///
/// Once the script runs out every read reports [`ReadOutcome::Eof`].
pub struct ScriptedInput {
    outcomes: VecDeque<ReadOutcome>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    /// Create a source that returns each of `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_outcomes(lines.into_iter().map(|l| ReadOutcome::Line(l.into())))
    }

    /// Create a source from arbitrary read outcomes, e.g. to simulate interrupts.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts that were shown so far, one per read.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.prompts.push(prompt.to_string());
        Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::Eof))
    }
}

/// Memory-backed writer for capturing interpreter output.
///
/// Clones share one buffer.
#[derive(Clone)]
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    /// Public constructor.
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }

    /// Collected output decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl crate::command::Stdout for MemWriter {
    /// Children of an in-memory session write nowhere; only the interpreter's
    /// own messages are captured.
    fn stdio(&self) -> Stdio {
        Stdio::null()
    }
}
