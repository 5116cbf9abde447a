//! A small interactive command interpreter with bang-style history recall.
//!
//! Each input line goes through history substitution (`!!`, `!N`), whitespace
//! tokenization and dispatch to either a built-in (`exit`, `cd`, `pwd`,
//! `history`) or an external program, which may be started in background with
//! a trailing `&`. The last ten executed lines are kept in a bounded history
//! that is also printed when the interpreter receives SIGINT.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`],
//! [`env`] and [`history`] expose the traits and types for plugging in your own
//! commands and for inspecting session state.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
mod external;
pub mod history;
mod interpreter;
mod interrupt;
mod io_adapters;
pub mod lexer;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

pub use external::{EXEC_FAILURE_STATUS, reap_finished_children};
pub use interrupt::InterruptHandler;
pub use io_adapters::{LineSource, MemWriter, ReadOutcome, ReaderLines, ScriptedInput};

#[cfg(test)]
pub(crate) mod test_support {
    use std::env as stdenv;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Serializes tests that spawn or reap processes, change the working
    /// directory, or touch the SIGINT flag.
    pub fn lock_process_state() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn make_unique_temp_dir(tag: &str) -> io::Result<PathBuf> {
        let mut p = stdenv::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("history_shell_{}_{}_{}", tag, std::process::id(), nanos));
        fs::create_dir_all(&p)?;
        Ok(p)
    }
}
