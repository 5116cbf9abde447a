use crate::env::Environment;
use anyhow::Result;
use std::io::Write;
use std::os::fd::{AsRawFd, RawFd};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Abstraction over the interpreter's output stream that can also hand a
/// [`Stdio`] handle to spawned processes.
///
/// Real standard output gives children an inherited handle so their output
/// interleaves with the interpreter's own. In-memory sinks give them
/// [`Stdio::null()`].
pub trait Stdout: Write {
    /// Handle to use as a child's standard output.
    fn stdio(&self) -> Stdio;

    /// Descriptor the SIGINT handler may write to directly, if any.
    fn raw_fd(&self) -> Option<RawFd> {
        None
    }
}

impl Stdout for std::io::Stdout {
    fn stdio(&self) -> Stdio {
        Stdio::inherit()
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }
}

/// One tokenized command, background marker already stripped.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Command name (`argv[0]`).
    pub name: &'a str,
    /// Remaining arguments.
    pub args: &'a [&'a str],
    /// Whether the command should run without the interpreter waiting for it.
    pub background: bool,
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// An `Err` is fatal to the interpreter; recoverable failures are reported
    /// on `stdout` and surface as a non-zero exit code instead.
    fn execute(self: Box<Self>, stdout: &mut dyn Stdout, env: &mut Environment)
    -> Result<ExitCode>;
}

/// Factory that tries to create a command from an invocation.
///
/// Returns `None` when the factory doesn't recognize the name.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided invocation.
    fn try_create(
        &self,
        env: &Environment,
        invocation: &Invocation<'_>,
    ) -> Option<Box<dyn ExecutableCommand>>;
}
