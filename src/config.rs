use crate::history::DEFAULT_CAPACITY;

/// Compiled-in settings of the interpreter.
///
/// There is no configuration file; callers that need different values (tests,
/// embedders) build one by hand and pass it to [`crate::Interpreter::with_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// How many history entries are retained and listed.
    pub history_capacity: usize,
    /// Prompt shown until the first successful `cd`.
    pub initial_prompt: String,
    /// Appended to the working directory to form the prompt after `cd`.
    pub prompt_suffix: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            initial_prompt: "> ".to_string(),
            prompt_suffix: "> ".to_string(),
        }
    }
}
