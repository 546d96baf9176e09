use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::commands;
use crate::error::CommandError;
use crate::step::StepRef;

/// Builds a command's step from its (optional) argument.
pub type CommandFactory =
    Arc<dyn Fn(Option<String>) -> Result<StepRef, CommandError> + Send + Sync>;

/// How a command's argument text is decoded before reaching its factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentDecoding {
    /// Interpreted as the body of a double-quoted string literal (`\n`, `\t`,
    /// `\\`, `\"`, ...), falling back to the raw text when malformed.
    Escaped,
    /// Passed through untouched, e.g. regular expression sources.
    Raw,
}

#[derive(Clone)]
pub struct CommandEntry {
    pub decoding: ArgumentDecoding,
    factory: CommandFactory,
}

impl CommandEntry {
    pub fn build(&self, argument: Option<String>) -> Result<StepRef, CommandError> {
        (self.factory)(argument)
    }
}

/// The table of commands a script may use, filled before any script compiles.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandEntry>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        CommandRegistry::default()
    }

    /// A registry holding the built-in commands.
    pub fn with_builtins() -> Self {
        let mut registry = CommandRegistry::new();
        commands::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) a command.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        decoding: ArgumentDecoding,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(Option<String>) -> Result<StepRef, CommandError> + Send + Sync + 'static,
    {
        self.commands.insert(
            name.into(),
            CommandEntry {
                decoding,
                factory: Arc::new(factory),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// All registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
