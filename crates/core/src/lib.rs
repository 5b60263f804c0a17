pub mod engine;
pub mod error;
pub mod mode;
pub mod phrase;
pub mod settings;
pub mod timer;
pub mod tools;
pub mod transcript;

pub use engine::{Engine, Input};
pub use mode::AgentMode;
pub use settings::SessionConfig;

use openai_realtime_types::ClientEvent;
use std::fmt;

/// Represents commands that the engine issues to an external runtime.
///
/// The engine decides; the runtime performs the side effects: writing to the
/// realtime session, updating status and indicators, and showing log lines.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Write this event to the realtime session.
    Send(ClientEvent),
    Status(Status),
    /// A line for the conversation log.
    Log { speaker: Speaker, text: String },
    /// Indicator: the user's voice is being detected.
    UserSpeaking(bool),
    /// Indicator: the agent is producing a reply.
    AgentSpeaking(bool),
}

impl Command {
    pub fn system_log(text: impl Into<String>) -> Self {
        Command::Log {
            speaker: Speaker::System,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Agent,
    System,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Agent => write!(f, "agent"),
            Speaker::System => write!(f, "system"),
        }
    }
}

/// Connection status reported to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Connecting,
    Idle,
    Dialogue,
    Speaking,
    Error(String),
    Disconnected,
}

impl Status {
    /// Human readable text shown next to the status.
    pub fn label(&self) -> String {
        match self {
            Status::Connecting => "Connecting...".to_string(),
            Status::Idle => "Listening (passive)".to_string(),
            Status::Dialogue => "Dialogue active".to_string(),
            Status::Speaking => "Speaking...".to_string(),
            Status::Error(message) => format!("Error: {message}"),
            Status::Disconnected => "Disconnected".to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Status::Connecting => "connecting",
            Status::Idle => "idle",
            Status::Dialogue => "dialogue",
            Status::Speaking => "speaking",
            Status::Error(_) => "error",
            Status::Disconnected => "disconnected",
        };
        f.write_str(value)
    }
}
