//! Command handling for the Jitsi bridge.
//!
//! # Components
//!
//! - `command` - Parses `/meet ...` text input and routes it to the
//!   orchestrator or the settings store

pub mod command;

pub use command::{
    parse_command, CommandContext, CommandHandler, ParsedCommand, COMMAND_HELP, COMMAND_TRIGGER,
};
