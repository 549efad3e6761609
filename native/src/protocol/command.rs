// Command grammar for pipelined messages such as `STOP|SPEAK|Hello`.

use super::FIELD_DELIMITER;
use log::trace;

/// A dispatchable request produced from one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Interrupt whatever the screen reader is currently saying.
    Cancel,
    /// Speak the payload verbatim.
    Speak(String),
}

/// Recognized command words. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandToken {
    Stop,
    Speak,
    /// Carries verbosity context; its argument is consumed and ignored for now.
    Context,
}

impl CommandToken {
    pub fn from_field(field: &str) -> Option<Self> {
        if field.eq_ignore_ascii_case("STOP") {
            Some(CommandToken::Stop)
        } else if field.eq_ignore_ascii_case("SPEAK") {
            Some(CommandToken::Speak)
        } else if field.eq_ignore_ascii_case("CONTEXT") {
            Some(CommandToken::Context)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandToken::Stop => "STOP",
            CommandToken::Speak => "SPEAK",
            CommandToken::Context => "CONTEXT",
        }
    }

    /// Whether the command consumes the following field as its argument.
    pub fn takes_argument(&self) -> bool {
        !matches!(self, CommandToken::Stop)
    }
}

/// Split a raw message into the actions it requests, in message order.
///
/// Never fails: a binary command at the end of the message with no argument
/// field is dropped, empty unrecognized fields are skipped, and any other
/// unrecognized field is spoken as-is.
pub fn parse_message(message: &str) -> Vec<Action> {
    let message = message.trim();
    if message.is_empty() {
        return Vec::new();
    }

    let fields: Vec<&str> = message.split(FIELD_DELIMITER).collect();
    let mut actions = Vec::new();
    let mut i = 0;

    while i < fields.len() {
        let field = fields[i];

        match CommandToken::from_field(field) {
            Some(token) if token.takes_argument() => match fields.get(i + 1) {
                Some(argument) => {
                    if token == CommandToken::Speak {
                        actions.push(Action::Speak((*argument).to_string()));
                    }
                    i += 2;
                }
                None => {
                    trace!("[PROTOCOL] Dropping {} without argument", token.as_str());
                    i += 1;
                }
            },
            Some(_) => {
                actions.push(Action::Cancel);
                i += 1;
            }
            None => {
                // Unknown input is treated as speakable text. This also turns
                // misspelled commands into speech.
                if !field.is_empty() {
                    actions.push(Action::Speak(field.to_string()));
                }
                i += 1;
            }
        }
    }

    actions
}

/// Serialize actions back into a message that parses to the same actions.
///
/// Payloads must not contain the field delimiter. When the last payload ends
/// in whitespace an empty field is appended so message trimming keeps it.
pub fn encode_actions(actions: &[Action]) -> String {
    let mut fields: Vec<&str> = Vec::with_capacity(actions.len() * 2 + 1);
    for action in actions {
        match action {
            Action::Cancel => fields.push(CommandToken::Stop.as_str()),
            Action::Speak(text) => {
                fields.push(CommandToken::Speak.as_str());
                fields.push(text);
            }
        }
    }

    if let Some(Action::Speak(text)) = actions.last() {
        if text.ends_with(char::is_whitespace) {
            fields.push("");
        }
    }

    fields.join(&FIELD_DELIMITER.to_string())
}
