//! Events received from the realtime server.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated(SessionEvent),
    #[serde(rename = "session.updated")]
    SessionUpdated(SessionEvent),
    #[serde(rename = "input_audio_buffer.speech_started")]
    InputAudioBufferSpeechStarted(SpeechEvent),
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    InputAudioBufferSpeechStopped(SpeechEvent),
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    ConversationItemInputAudioTranscriptionCompleted(TranscriptEvent),
    #[serde(rename = "response.audio_transcript.delta")]
    ResponseAudioTranscriptDelta(TranscriptDeltaEvent),
    #[serde(rename = "response.audio_transcript.done")]
    ResponseAudioTranscriptDone(TranscriptEvent),
    #[serde(rename = "response.done")]
    ResponseDone(ResponseDoneEvent),
    #[serde(rename = "response.function_call_arguments.done")]
    ResponseFunctionCallArgumentsDone(FunctionCallArgumentsDoneEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
    /// Any event type this crate does not model.
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::SessionCreated(_) => "session.created",
            ServerEvent::SessionUpdated(_) => "session.updated",
            ServerEvent::InputAudioBufferSpeechStarted(_) => "input_audio_buffer.speech_started",
            ServerEvent::InputAudioBufferSpeechStopped(_) => "input_audio_buffer.speech_stopped",
            ServerEvent::ConversationItemInputAudioTranscriptionCompleted(_) => {
                "conversation.item.input_audio_transcription.completed"
            }
            ServerEvent::ResponseAudioTranscriptDelta(_) => "response.audio_transcript.delta",
            ServerEvent::ResponseAudioTranscriptDone(_) => "response.audio_transcript.done",
            ServerEvent::ResponseDone(_) => "response.done",
            ServerEvent::ResponseFunctionCallArgumentsDone(_) => {
                "response.function_call_arguments.done"
            }
            ServerEvent::Error(_) => "error",
            ServerEvent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub session: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpeechEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub audio_start_ms: Option<u64>,
    #[serde(default)]
    pub audio_end_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranscriptEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranscriptDeltaEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub delta: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseDoneEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionCallArgumentsDoneEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    pub call_id: String,
    #[serde(default)]
    pub name: String,
    /// The arguments object, still encoded as a JSON string.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    pub error: ApiError,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiError {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}
