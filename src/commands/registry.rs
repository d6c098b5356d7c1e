//! Command registry
//!
//! Centralized registry for all available commands.
//! This allows loose coupling between command implementations and the dispatcher.

use super::{key, string, Command};
use std::collections::HashMap;

/// Registry of all available commands
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create a new command registry and register all commands
    pub fn new() -> Self {
        let mut registry = CommandRegistry {
            commands: HashMap::new(),
        };

        // String commands
        registry.register(Box::new(string::GetCommand));
        registry.register(Box::new(string::SetCommand));

        // Key commands
        registry.register(Box::new(key::DelCommand));

        registry
    }

    /// Register a command
    fn register(&mut self, command: Box<dyn Command>) {
        let name = command.name().to_ascii_uppercase();
        self.commands.insert(name, command);
    }

    /// Get a command by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(&name.to_ascii_uppercase()).map(|cmd| &**cmd)
    }

    /// Check if a command exists
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_ascii_uppercase())
    }

    /// Get all command names
    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
