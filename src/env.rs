use crate::config::ShellConfig;
use crate::history::History;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable session state shared by the dispatcher and the builtins.
///
/// The environment contains:
/// - `current_dir`: the working directory as last observed by the interpreter.
/// - `prompt`: cached prompt string, refreshed after every successful `cd`.
/// - `history`: the bounded store of executed command lines.
/// - `should_exit`: a flag the read-eval loop checks to know when to terminate.
#[derive(Debug, Clone)]
pub struct Environment {
    /// The current working directory.
    pub current_dir: PathBuf,
    /// Prompt printed before every read.
    pub prompt: String,
    /// Previously executed command lines.
    pub history: History,
    /// When set to true, the interactive loop terminates after this cycle.
    pub should_exit: bool,
    prompt_suffix: String,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// `current_dir` comes from `std::env::current_dir()`; the prompt starts
    /// as the configured initial prompt and only tracks the directory after `cd`.
    pub fn new(config: &ShellConfig) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            current_dir,
            prompt: config.initial_prompt.clone(),
            history: History::with_capacity(config.history_capacity),
            should_exit: false,
            prompt_suffix: config.prompt_suffix.clone(),
        }
    }

    /// Re-read the process working directory and rebuild the prompt from it.
    pub fn refresh_current_dir(&mut self) -> std::io::Result<()> {
        self.current_dir = stdenv::current_dir()?;
        self.prompt = format!("{}{}", self.current_dir.display(), self.prompt_suffix);
        Ok(())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(&ShellConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lock_process_state;

    #[test]
    fn test_env_starts_with_initial_prompt() {
        let config = ShellConfig {
            initial_prompt: "$ ".to_string(),
            ..ShellConfig::default()
        };
        let env = Environment::new(&config);
        assert_eq!(env.prompt, "$ ");
        assert!(!env.should_exit);
        assert!(env.history.is_empty());
    }

    #[test]
    fn test_env_history_uses_configured_capacity() {
        let config = ShellConfig {
            history_capacity: 3,
            ..ShellConfig::default()
        };
        let env = Environment::new(&config);
        assert_eq!(env.history.capacity(), 3);
    }

    #[test]
    fn test_refresh_builds_prompt_from_cwd() {
        let _lock = lock_process_state();
        let mut env = Environment::default();
        env.refresh_current_dir().unwrap();

        let cwd = stdenv::current_dir().unwrap();
        assert_eq!(env.current_dir, cwd);
        assert_eq!(env.prompt, format!("{}> ", cwd.display()));
    }
}
