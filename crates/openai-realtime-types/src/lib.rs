//! Wire types for the OpenAI Realtime event protocol.
//!
//! Only the subset of the protocol that the dialogue engine consumes or emits is
//! modelled here. Inbound events whose `type` is not listed deserialize into
//! [`ServerEvent::Unknown`] so newer server versions never break parsing.

pub mod client;
pub mod server;
pub mod session;

pub use client::{ClientEvent, Item, ResponseConfig};
pub use server::ServerEvent;
pub use session::{AudioTranscription, FunctionTool, Modality, Session, ToolDefinition, TurnDetection};

/// Parses one text frame received from the realtime socket.
pub fn parse_server_event(text: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(text)
}
