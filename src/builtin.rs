use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Invocation, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. A trailing background marker is
/// ignored for them.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "pwd" or "cd".
    fn name() -> &'static str;

    /// Build the command from its raw arguments.
    ///
    /// Defaults to argh parsing. Builtins that must run whatever their
    /// arguments look like (leading `-`, `--help`) override this.
    fn from_invocation(name: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[name], args)
    }

    /// Executes the command using the interpreter's output and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        mut stdout: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        debug!(builtin = T::name(), "running builtin");
        match T::execute(*self, &mut stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "shell: {:#}", e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Stdout,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        invocation: &Invocation<'_>,
    ) -> Option<Box<dyn ExecutableCommand>> {
        if invocation.name == T::name() {
            Some(match T::from_invocation(invocation.name, invocation.args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let cwd = env::current_dir().context("pwd: can't read working directory")?;
        writeln!(stdout, "shell: Working directory: {}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Extra arguments are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn from_invocation(_name: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Cd {
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let Some(target) = self.args.first() else {
            writeln!(stdout, "shell: Expected argument for \"cd\", no action taken.")?;
            return Ok(1);
        };

        env::set_current_dir(target).with_context(|| format!("cd: {}", target))?;
        env.refresh_current_dir()
            .context("cd: can't read new working directory")?;
        debug!(cwd = %env.current_dir.display(), "changed directory");
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit shell process
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with status 0
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_invocation(_name: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Exit {
            _args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the most recent commands with their sequence numbers.
pub struct History {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.history.write_listing(stdout)?;
        Ok(0)
    }
}
