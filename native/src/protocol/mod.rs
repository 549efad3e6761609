// Pipe message protocol: pipe-delimited command fields sent by the game.

pub mod command;

pub use command::{encode_actions, parse_message, Action, CommandToken};

/// Field and command delimiter inside one message.
pub const FIELD_DELIMITER: char = '|';

/// Literal written back after every processed message.
pub const ACKNOWLEDGMENT: &str = "OK";
