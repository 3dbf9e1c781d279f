//! services/companion/src/session/command.rs
//!
//! Defines the line protocol between the terminal and the controller.
//! Plain text is a chat message; lines starting with `/` are commands.

use calmmind_core::mood::is_valid_score;

/// Steps within the CBT walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbtAction {
    Show,
    Next,
    Back,
    Restart,
    /// Sends the current step to the chat.
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingAction {
    Show,
    Next,
    Chat,
}

/// Represents one parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Mood(u8),
    NewEntry,
    List,
    /// Switches to an entry id, or to the `current` sentinel.
    Switch(String),
    Delete(String),
    Stats,
    Cbt(CbtAction),
    Grounding(GroundingAction),
    Export,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}. Type /help for a list of commands.")]
    Unknown(String),
    #[error("Mood must be a whole number from 1 to 10.")]
    InvalidMood,
    #[error("Usage: {0}")]
    Usage(&'static str),
}

pub const HELP_TEXT: &str = r#"Commands:
  <text>                    talk to CalmMind
  /mood <1-10>              save how you are feeling
  /new                      start a new entry
  /list                     list saved entries
  /switch <id|current>      open a saved entry
  /delete <id>              delete a saved entry
  /stats                    all-time entry count and average mood
  /cbt [next|back|restart|chat]
  /ground [next|chat]
  /export                   write the current entry to a JSON file
  /help                     show this help
  /quit                     leave"#;

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_string())));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next();

    let command = match (name.as_str(), arg) {
        ("mood", Some(value)) => {
            let score = value.parse::<u8>().map_err(|_| CommandError::InvalidMood)?;
            if !is_valid_score(score) {
                return Err(CommandError::InvalidMood);
            }
            Command::Mood(score)
        }
        ("mood", None) => return Err(CommandError::Usage("/mood <1-10>")),
        ("new", _) => Command::NewEntry,
        ("list", _) => Command::List,
        ("switch", Some(id)) => Command::Switch(id.to_string()),
        ("switch", None) => return Err(CommandError::Usage("/switch <id|current>")),
        ("delete", Some(id)) => Command::Delete(id.to_string()),
        ("delete", None) => return Err(CommandError::Usage("/delete <id>")),
        ("stats", _) => Command::Stats,
        ("cbt", None) => Command::Cbt(CbtAction::Show),
        ("cbt", Some("next")) => Command::Cbt(CbtAction::Next),
        ("cbt", Some("back")) => Command::Cbt(CbtAction::Back),
        ("cbt", Some("restart")) => Command::Cbt(CbtAction::Restart),
        ("cbt", Some("chat")) => Command::Cbt(CbtAction::Chat),
        ("cbt", Some(_)) => return Err(CommandError::Usage("/cbt [next|back|restart|chat]")),
        ("ground", None) => Command::Grounding(GroundingAction::Show),
        ("ground", Some("next")) => Command::Grounding(GroundingAction::Next),
        ("ground", Some("chat")) => Command::Grounding(GroundingAction::Chat),
        ("ground", Some(_)) => return Err(CommandError::Usage("/ground [next|chat]")),
        ("export", _) => Command::Export,
        ("help", _) => Command::Help,
        ("quit", _) | ("exit", _) => Command::Quit,
        _ => return Err(CommandError::Unknown(format!("/{}", name))),
    };
    Ok(Some(command))
}
