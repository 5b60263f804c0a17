//! Per-connection session configuration.

use crate::{
    mode::DEFAULT_DIALOGUE_TIMEOUT,
    phrase,
    tools::{ToolKind, ToolToggles},
    transcript::DEFAULT_DEBOUNCE,
};
use openai_realtime_types::{AudioTranscription, Modality, Session, ToolDefinition, TurnDetection};
use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_AGENT_NAME: &str = "Alex";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-realtime-preview-2024-12-17";
pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_STOP_WORDS: &str = "thanks, stop, enough, bye";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Placeholder in the instruction template replaced by the agent name.
pub const AGENT_NAME_PLACEHOLDER: &str = "{agentName}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a podcast participant named {agentName}. \n\
Respond briefly and to the point, like in a live conversation.\n\
Speak naturally, you can use colloquial expressions.\n\
Don't start your response with a greeting if it's a continuation of the dialogue.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineTimings {
    /// Quiet period before buffered fragments become an utterance.
    pub debounce: Duration,
    /// Dialogue falls back to idle after this long without a qualifying utterance.
    pub dialogue_timeout: Duration,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            dialogue_timeout: DEFAULT_DIALOGUE_TIMEOUT,
        }
    }
}

/// Server-side voice activity detection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnDetectionSettings {
    pub threshold: f64,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for TurnDetectionSettings {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            prefix_padding_ms: 300,
            silence_duration_ms: 1200,
        }
    }
}

impl TurnDetectionSettings {
    /// Responses are never created by the server; the engine decides.
    pub fn to_wire(self) -> TurnDetection {
        TurnDetection::ServerVad {
            threshold: self.threshold,
            prefix_padding_ms: self.prefix_padding_ms,
            silence_duration_ms: self.silence_duration_ms,
            create_response: false,
        }
    }
}

/// Everything the engine needs to know about the agent for one connection.
///
/// The agent name and stop phrases are private so their derived forms stay in
/// sync: wake variants are regenerated on every rename, and stop phrases are
/// always stored normalized.
#[derive(Debug)]
pub struct SessionConfig {
    agent_name: String,
    wake_variants: Vec<String>,
    stop_phrases: Vec<String>,
    search_api_key: Option<SecretString>,
    pub instructions: String,
    pub voice: String,
    pub model: String,
    pub tools: ToolToggles,
    pub timings: EngineTimings,
    pub turn_detection: TurnDetectionSettings,
    pub transcription_model: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            wake_variants: phrase::wake_variants(DEFAULT_AGENT_NAME),
            stop_phrases: phrase::parse_stop_phrases(DEFAULT_STOP_WORDS),
            search_api_key: None,
            instructions: DEFAULT_SYSTEM_PROMPT.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            tools: ToolToggles::default(),
            timings: EngineTimings::default(),
            turn_detection: TurnDetectionSettings::default(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Renames the agent. A blank name falls back to the default.
    pub fn set_agent_name(&mut self, name: &str) {
        let name = name.trim();
        self.agent_name = if name.is_empty() {
            DEFAULT_AGENT_NAME.to_string()
        } else {
            name.to_string()
        };
        self.wake_variants = phrase::wake_variants(&self.agent_name);
    }

    pub fn wake_variants(&self) -> &[String] {
        &self.wake_variants
    }

    pub fn stop_phrases(&self) -> &[String] {
        &self.stop_phrases
    }

    /// Replaces the stop phrases from a comma-separated list.
    pub fn set_stop_phrases(&mut self, list: &str) {
        self.stop_phrases = phrase::parse_stop_phrases(list);
    }

    pub fn set_search_api_key(&mut self, key: Option<SecretString>) {
        self.search_api_key = key;
    }

    pub fn has_search_credential(&self) -> bool {
        self.search_api_key.is_some()
    }

    pub fn search_api_key(&self) -> Option<&SecretString> {
        self.search_api_key.as_ref()
    }

    /// Enabled tools, with web search only when a credential is present.
    pub fn active_tools(&self) -> Vec<ToolKind> {
        ToolKind::ALL
            .into_iter()
            .filter(|kind| self.tools.is_enabled(*kind))
            .filter(|kind| *kind != ToolKind::WebSearch || self.has_search_credential())
            .collect()
    }

    pub fn interpolated_instructions(&self) -> String {
        self.instructions
            .replace(AGENT_NAME_PLACEHOLDER, &self.agent_name)
    }

    /// The `session.update` payload sent once the channel opens.
    pub fn session_update(&self) -> Session {
        let tools: Vec<ToolDefinition> = self
            .active_tools()
            .into_iter()
            .map(ToolKind::definition)
            .collect();
        Session {
            modalities: Some(vec![Modality::Text, Modality::Audio]),
            instructions: Some(self.interpolated_instructions()),
            voice: Some(self.voice.clone()),
            input_audio_transcription: Some(AudioTranscription {
                model: self.transcription_model.clone(),
            }),
            turn_detection: Some(self.turn_detection.to_wire()),
            tools: Some(tools),
        }
    }
}
