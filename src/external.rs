use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Invocation, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::io;
use std::process::ExitStatus;
use tracing::{debug, trace};

/// Exit status reported for a command whose program image could not be loaded.
///
/// Matches a child that called `exit(-1)` after a failed `execvp`.
pub const EXEC_FAILURE_STATUS: ExitCode = 255;

/// Command that is not a builtin.
pub struct ExternalCommand {
    name: OsString,
    args: Vec<OsString>,
    background: bool,
}

impl ExternalCommand {
    pub fn new(name: OsString, args: Vec<OsString>, background: bool) -> Self {
        Self {
            name,
            args,
            background,
        }
    }

    fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        _env: &Environment,
        invocation: &Invocation<'_>,
    ) -> Option<Box<dyn ExecutableCommand>> {
        Some(Box::new(ExternalCommand::new(
            invocation.name.into(),
            invocation.args.iter().map(|x| x.into()).collect(),
            invocation.background,
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        stdout.flush()?;
        let spawned = std::process::Command::new(&self.name)
            .args(&self.args)
            .stdout(stdout.stdio())
            .current_dir(&env.current_dir)
            .spawn();

        let code = match spawned {
            Ok(mut child) => {
                let pid = child.id();
                if self.background {
                    debug!(pid, command = %self.display_name(), "running in background");
                    0
                } else {
                    debug!(pid, command = %self.display_name(), "waiting for foreground process");
                    let status = child
                        .wait()
                        .with_context(|| format!("waitpid failed for process {}", pid))?;
                    let code = exit_code(status);
                    debug!(pid, code, "foreground process finished");
                    // A child killed by a signal has no exit code and is not reported.
                    if status.code().is_some_and(|c| c != 0) {
                        report_unknown(stdout, &self.display_name())?;
                    }
                    code
                }
            }
            Err(err) if is_exec_failure(&err) => {
                debug!(command = %self.display_name(), %err, "program image could not be loaded");
                if !self.background {
                    report_unknown(stdout, &self.display_name())?;
                }
                EXEC_FAILURE_STATUS
            }
            Err(err) => return Err(err).context("fork"),
        };

        reap_finished_children();
        Ok(code)
    }
}

fn report_unknown(stdout: &mut dyn Stdout, name: &str) -> io::Result<()> {
    writeln!(stdout, "shell: \"{}\" unknown command", name)?;
    stdout.flush()
}

/// Spawn errors that mean the process was created but `exec` failed.
///
/// Anything else (out of memory, process limit) means no child could be
/// created at all.
fn is_exec_failure(err: &io::Error) -> bool {
    match err.raw_os_error().map(Errno::from_raw) {
        Some(
            Errno::ENOENT
            | Errno::EACCES
            | Errno::ENOEXEC
            | Errno::ENOTDIR
            | Errno::ELOOP
            | Errno::ENAMETOOLONG
            | Errno::E2BIG
            | Errno::EISDIR
            | Errno::EPERM,
        ) => true,
        Some(_) => false,
        None => err.kind() == io::ErrorKind::NotFound,
    }
}

/// Collect every child that has already terminated, without blocking.
///
/// Returns how many were reaped.
pub fn reap_finished_children() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                trace!(?status, "reaped child");
                reaped += 1;
            }
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
    reaped
}

fn exit_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(x) => x,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}
