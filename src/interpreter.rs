use crate::command::{CommandFactory, ExitCode, Invocation, Stdout};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::interrupt::InterruptHandler;
use crate::io_adapters::{LineSource, ReadOutcome, ReaderLines};
use crate::lexer;
use anyhow::{Context, Result};
use rustyline::{Config, DefaultEditor};
use std::borrow::Cow;
use std::io::IsTerminal;
use tracing::{debug, warn};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: builtins and the external launcher.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// An interactive command interpreter with bang-style history recall.
///
/// The interpreter owns an [`Environment`] (working directory, prompt and
/// history) and a list of [`CommandFactory`] objects that are queried in order
/// to create commands by name. See [`Default`] for the factories included out
/// of the box.
///
/// Example
/// ```
/// use history_shell::{Interpreter, MemWriter};
/// let mut sh = Interpreter::default();
/// let mut out = MemWriter::new();
/// sh.run_line("history", &mut out).unwrap();
/// assert_eq!(out.contents(), "   1. history\n");
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    interrupts: InterruptHandler,
    config: ShellConfig,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self::with_config(ShellConfig::default(), commands)
    }

    /// Create a new interpreter with explicit settings.
    pub fn with_config(config: ShellConfig, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(&config),
            commands,
            interrupts: InterruptHandler,
            config,
        }
    }

    /// Read-only view of the session state.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run the read-eval loop on the process's standard streams until `exit`
    /// or end of input.
    ///
    /// A terminal gets the rustyline editor; any other input is read line by
    /// line with the prompt written to standard output.
    pub fn repl(&mut self) -> Result<ExitCode> {
        let mut stdout = std::io::stdout();
        if !std::io::stdin().is_terminal() {
            debug!("stdin is not a terminal, reading plain lines");
            let mut input = ReaderLines::stdin()?;
            return self.repl_with(&mut input, &mut stdout);
        }

        let editor_config = Config::builder()
            .max_history_size(self.config.history_capacity)
            .context("invalid history size")?
            .auto_add_history(false)
            .build();
        let mut editor =
            DefaultEditor::with_config(editor_config).context("failed to open line editor")?;
        self.repl_with(&mut editor, &mut stdout)
    }

    /// Run the read-eval loop on an arbitrary line source and output sink.
    ///
    /// Returns the interpreter's exit status. Only fatal conditions (the input
    /// stream failing, no process can be created) come back as `Err`.
    pub fn repl_with(
        &mut self,
        input: &mut dyn LineSource,
        stdout: &mut dyn Stdout,
    ) -> Result<ExitCode> {
        self.interrupts.arm()?;
        self.interrupts.publish(&self.env.history)?;
        self.interrupts.set_output_fd(stdout.raw_fd());

        let result = self.read_eval(input, stdout);
        self.interrupts.set_output_fd(None);
        result
    }

    fn read_eval(
        &mut self,
        input: &mut dyn LineSource,
        stdout: &mut dyn Stdout,
    ) -> Result<ExitCode> {
        while !self.env.should_exit {
            if self.interrupts.take_pending() && !self.interrupts.prints_directly() {
                self.print_interrupt_listing(stdout)?;
            }

            let outcome = input.read_line(&self.env.prompt)?;
            self.interrupts.arm()?;

            match outcome {
                ReadOutcome::Line(line) => {
                    if let Some(recorded) = self.run_line(&line, stdout)? {
                        input.remember(&recorded);
                    }
                }
                ReadOutcome::Interrupted => {
                    // A delivered signal has already written the listing.
                    let delivered = self.interrupts.take_pending();
                    if !(delivered && self.interrupts.prints_directly()) {
                        self.print_interrupt_listing(stdout)?;
                    }
                }
                ReadOutcome::Eof => {
                    debug!("end of input");
                    break;
                }
            }
        }

        stdout.flush()?;
        Ok(0)
    }

    /// Process one raw input line: history substitution, tokenization,
    /// recording and dispatch.
    ///
    /// Returns the text recorded into history, or `None` when the line was
    /// blank or an invalid history reference.
    pub fn run_line(&mut self, line: &str, stdout: &mut dyn Stdout) -> Result<Option<String>> {
        let line = line.trim_end_matches(['\n', '\r']);
        let clamped = lexer::clamp_line(line);
        if clamped.len() < line.len() {
            warn!(
                length = line.len(),
                limit = lexer::MAX_LINE - 1,
                "input line truncated"
            );
        }

        let text: Cow<'_, str> = if clamped.starts_with('!') {
            match self.env.history.resolve(clamped) {
                Ok(text) => {
                    debug!(reference = clamped, resolved = text, "history substitution");
                    Cow::Owned(text.to_string())
                }
                Err(err) => {
                    writeln!(stdout, "shell: {}", err)?;
                    stdout.flush()?;
                    return Ok(None);
                }
            }
        } else {
            Cow::Borrowed(clamped)
        };

        let tokens = lexer::split_into_tokens(&text);
        if tokens.is_empty() {
            return Ok(None);
        }
        self.env.history.record(text.as_ref());
        self.interrupts.publish(&self.env.history)?;

        {
            let command = lexer::split_background(tokens);
            if let Some((&name, args)) = command.argv.split_first() {
                let invocation = Invocation {
                    name,
                    args,
                    background: command.background,
                };
                let code = self.dispatch(&invocation, stdout)?;
                debug!(command = name, code, "command finished");
            }
        }
        stdout.flush()?;
        Ok(Some(text.into_owned()))
    }

    fn dispatch(&mut self, invocation: &Invocation<'_>, stdout: &mut dyn Stdout) -> Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, invocation) {
                return cmd.execute(stdout, &mut self.env);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", invocation.name))
    }

    fn print_interrupt_listing(&self, stdout: &mut dyn Stdout) -> Result<()> {
        writeln!(stdout)?;
        self.env.history.write_listing(stdout)?;
        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `exit`, `cd`, `pwd`, `history`
    /// - external command launcher
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<History>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}
