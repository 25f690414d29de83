//! The unit of work sent to a device.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a command reports device state or mutates it.
///
/// The distinction drives retry and caching policy: a Show command is
/// idempotent, so it may be re-issued after a timeout and memoized inside a
/// transaction. A Write command is neither — after a timeout its effect on
/// the device is unknown and silently retrying risks double-application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Read-only, idempotent (e.g. "show running-config").
    Show,
    /// Mutates device configuration state.
    Write,
}

/// An immutable command: literal text plus kind.
///
/// Two commands with identical text and kind are the same unit of work.
/// Equality and hashing are defined accordingly so the modification cache
/// can key on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    text: String,
    kind: CommandKind,
}

impl Command {
    /// Create a command with an explicit kind.
    pub fn new(text: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// Create a read-only Show command.
    pub fn show(text: impl Into<String>) -> Self {
        Self::new(text, CommandKind::Show)
    }

    /// Create a state-mutating Write command.
    pub fn write(text: impl Into<String>) -> Self {
        Self::new(text, CommandKind::Write)
    }

    /// The literal command text, without line terminator.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Show commands are idempotent and safe to re-issue.
    pub fn is_idempotent(&self) -> bool {
        self.kind == CommandKind::Show
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_text_plus_kind() {
        assert_eq!(Command::show("show version"), Command::show("show version"));
        assert_ne!(Command::show("show version"), Command::write("show version"));
        assert_ne!(Command::show("show version"), Command::show("show vlan"));
    }

    #[test]
    fn show_is_idempotent_write_is_not() {
        assert!(Command::show("show version").is_idempotent());
        assert!(!Command::write("no shutdown").is_idempotent());
    }
}
