//! The per-connection dialogue orchestrator.
//!
//! An [`Engine`] consumes [`Input`]s (channel lifecycle and realtime server
//! events) and produces [`Command`]s. It owns the listening mode, the
//! transcript buffer, both timers and the in-flight tool calls, and is driven
//! from a single task by [`Engine::run`]. Handlers never block: the only
//! suspension points are the inbound channel, the two timers and tool calls.

use crate::{
    Command, Speaker, Status,
    error::ToolError,
    mode::{AgentMode, ModeMachine},
    phrase,
    settings::SessionConfig,
    tools::ToolExecutor,
    transcript::TranscriptAccumulator,
};
use anyhow::{Context, Result};
use futures::FutureExt;
use openai_realtime_types::{
    ClientEvent, ServerEvent, server::FunctionCallArgumentsDoneEvent,
};
use serde_json::{Value, json};
use std::{ops::ControlFlow, panic::AssertUnwindSafe, sync::Arc};
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinSet},
};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Everything the engine reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// The event channel to the realtime service is ready.
    ChannelOpened,
    Server(ServerEvent),
    /// The transport reported a problem; the session may still be usable.
    TransportError(String),
    /// The user or the transport ended the session.
    Disconnect,
}

impl From<ServerEvent> for Input {
    fn from(event: ServerEvent) -> Self {
        Input::Server(event)
    }
}

/// A finished tool call, ready to be reported back to the agent.
#[derive(Debug)]
struct ToolOutcome {
    call_id: String,
    output: Value,
}

/// Who is currently talking. Only drives timing and indicators.
#[derive(Debug, Default, Clone, Copy)]
struct SpeakingFlags {
    user: bool,
    agent: bool,
}

pub struct Engine {
    config: SessionConfig,
    mode: ModeMachine,
    transcript: TranscriptAccumulator,
    speaking: SpeakingFlags,
    tools: Arc<dyn ToolExecutor>,
    tool_calls: JoinSet<ToolOutcome>,
    session_configured: bool,
    outbox: Vec<Command>,
    connection_id: Uuid,
}

impl Engine {
    pub fn new(config: SessionConfig, tools: Arc<dyn ToolExecutor>) -> Self {
        Self {
            mode: ModeMachine::new(config.timings.dialogue_timeout),
            transcript: TranscriptAccumulator::new(config.timings.debounce),
            config,
            speaking: SpeakingFlags::default(),
            tools,
            tool_calls: JoinSet::new(),
            session_configured: false,
            outbox: Vec::new(),
            connection_id: Uuid::new_v4(),
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> AgentMode {
        self.mode.mode()
    }

    pub fn buffered_transcript(&self) -> &str {
        self.transcript.buffered()
    }

    pub fn is_flush_pending(&self) -> bool {
        self.transcript.is_flush_pending()
    }

    pub fn is_dialogue_timeout_armed(&self) -> bool {
        self.mode.is_timeout_armed()
    }

    pub fn pending_tool_calls(&self) -> usize {
        self.tool_calls.len()
    }

    /// Drains the commands produced since the last call.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outbox)
    }

    /// Drives the engine until disconnect.
    ///
    /// Inputs, tool completions and timer expiries are handled one at a time,
    /// in that priority order. Commands are forwarded to `outbound` after each
    /// step. A closed inbound channel counts as a disconnect; a closed outbound
    /// channel is an error.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<Input>,
        outbound: mpsc::Sender<Command>,
    ) -> Result<()> {
        let span = info_span!("dialogue_session", connection_id = %self.connection_id);
        async move {
            info!(agent = %self.config.agent_name(), "Dialogue engine started");
            loop {
                let flow = tokio::select! {
                    biased;
                    input = inbound.recv() => self.handle(input.unwrap_or(Input::Disconnect)),
                    Some(joined) = self.tool_calls.join_next() => {
                        self.on_tool_joined(joined);
                        ControlFlow::Continue(())
                    }
                    utterance = self.transcript.flush_due() => {
                        if let Some(utterance) = utterance {
                            self.on_utterance(&utterance);
                        }
                        ControlFlow::Continue(())
                    }
                    () = self.mode.timed_out() => {
                        self.on_dialogue_timeout();
                        ControlFlow::Continue(())
                    }
                };

                for command in self.take_commands() {
                    outbound
                        .send(command)
                        .await
                        .context("command receiver dropped")?;
                }
                if flow.is_break() {
                    break;
                }
            }
            info!("Dialogue engine stopped");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Handles one input. Returns `Break` once the session is over.
    pub fn handle(&mut self, input: Input) -> ControlFlow<()> {
        match input {
            Input::ChannelOpened => self.on_channel_opened(),
            Input::Server(event) => self.on_server_event(event),
            Input::TransportError(message) => {
                error!(error = %message, "Transport error");
                self.set_status(Status::Error(message));
            }
            Input::Disconnect => {
                self.on_disconnect();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn on_channel_opened(&mut self) {
        if self.session_configured {
            debug!("Channel reopened; session already configured");
            return;
        }
        self.session_configured = true;

        let session = self.config.session_update();
        let tool_names: Vec<&str> = self
            .config
            .active_tools()
            .into_iter()
            .map(|kind| kind.name())
            .collect();
        info!(voice = %self.config.voice, tools = ?tool_names, "Configuring session");
        self.emit(Command::Send(ClientEvent::SessionUpdate { session }));
        if !tool_names.is_empty() {
            self.emit(Command::system_log(format!(
                "Active tools: {}",
                tool_names.join(", ")
            )));
        }
        self.mode.enter_idle();
        self.set_status(Status::Idle);
    }

    fn on_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::SessionCreated(_) => info!("Session created"),
            ServerEvent::SessionUpdated(_) => info!("Session updated"),
            ServerEvent::InputAudioBufferSpeechStarted(_) => {
                debug!("User started speaking");
                self.speaking.user = true;
                self.emit(Command::UserSpeaking(true));
            }
            ServerEvent::InputAudioBufferSpeechStopped(_) => {
                debug!("User stopped speaking");
                self.speaking.user = false;
                self.emit(Command::UserSpeaking(false));
                self.transcript.on_user_speech_stopped();
            }
            ServerEvent::ConversationItemInputAudioTranscriptionCompleted(event) => {
                self.on_transcription(&event.transcript);
            }
            ServerEvent::ResponseAudioTranscriptDelta(_) => {}
            ServerEvent::ResponseAudioTranscriptDone(event) => {
                if !event.transcript.trim().is_empty() {
                    info!(transcript = %event.transcript, "Agent said");
                    self.emit(Command::Log {
                        speaker: Speaker::Agent,
                        text: event.transcript,
                    });
                }
            }
            ServerEvent::ResponseDone(_) => self.on_response_done(),
            ServerEvent::ResponseFunctionCallArgumentsDone(call) => self.on_function_call(call),
            ServerEvent::Error(event) => {
                error!(
                    code = ?event.error.code,
                    kind = ?event.error.kind,
                    message = %event.error.message,
                    "Realtime API error"
                );
                self.set_status(Status::Error(event.error.message));
            }
            ServerEvent::Unknown => {}
        }
    }

    fn on_transcription(&mut self, text: &str) {
        debug!(fragment = %text, user_speaking = self.speaking.user, "Transcription received");
        // While the user is still talking, the end of speech schedules the flush.
        if self.speaking.user {
            self.transcript.append(text);
        } else {
            self.transcript.on_fragment(text);
        }
    }

    /// Decides what to do with a finalized utterance.
    pub fn on_utterance(&mut self, utterance: &str) {
        let mode = self.mode.mode();
        info!(%utterance, %mode, "Processing utterance");
        match mode {
            AgentMode::Dialogue => {
                if phrase::matches_stop(utterance, self.config.stop_phrases()) {
                    self.emit(Command::system_log(format!(
                        "{} ending dialogue",
                        self.config.agent_name()
                    )));
                    self.mode.exit_dialogue();
                    self.set_status(Status::Idle);
                    return;
                }
                self.request_response();
                self.mode.extend();
            }
            AgentMode::Idle => {
                if phrase::matches_wake(utterance, self.config.wake_variants()) {
                    self.mode.enter_dialogue();
                    self.set_status(Status::Dialogue);
                    self.request_response();
                } else {
                    debug!("Not addressed; staying passive");
                }
            }
        }
    }

    fn on_response_done(&mut self) {
        self.speaking.agent = false;
        self.emit(Command::AgentSpeaking(false));
        if self.mode.is_dialogue() {
            self.set_status(Status::Dialogue);
            self.mode.extend();
        } else {
            self.set_status(Status::Idle);
        }
    }

    fn on_dialogue_timeout(&mut self) {
        self.set_status(Status::Idle);
    }

    fn on_function_call(&mut self, call: FunctionCallArgumentsDoneEvent) {
        let FunctionCallArgumentsDoneEvent {
            call_id,
            name,
            arguments,
            ..
        } = call;
        info!(tool = %name, %call_id, "Function call requested");

        let raw = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments.as_str()
        };
        let args: Value = match serde_json::from_str(raw) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %name, %call_id, error = %e, "Malformed tool arguments");
                let output = ToolError::InvalidArguments(e.to_string()).to_payload();
                self.on_tool_outcome(ToolOutcome { call_id, output });
                return;
            }
        };

        let tools = Arc::clone(&self.tools);
        self.tool_calls.spawn(
            async move {
                let output = AssertUnwindSafe(tools.execute(&name, args))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        error!(tool = %name, "Tool panicked");
                        json!({ "error": format!("Tool {name} failed unexpectedly") })
                    });
                ToolOutcome { call_id, output }
            }
            .in_current_span(),
        );
    }

    fn on_tool_joined(&mut self, joined: Result<ToolOutcome, JoinError>) {
        match joined {
            Ok(outcome) => self.on_tool_outcome(outcome),
            Err(e) => debug!(error = %e, "Tool call abandoned"),
        }
    }

    /// Reports a tool result and asks the agent to continue the turn.
    fn on_tool_outcome(&mut self, outcome: ToolOutcome) {
        debug!(call_id = %outcome.call_id, output = %outcome.output, "Tool call finished");
        self.emit(Command::Send(ClientEvent::function_call_output(
            outcome.call_id,
            outcome.output.to_string(),
        )));
        self.request_response();
    }

    fn request_response(&mut self) {
        info!("Requesting response");
        self.speaking.agent = true;
        self.emit(Command::AgentSpeaking(true));
        self.set_status(Status::Speaking);
        self.emit(Command::Send(ClientEvent::response_create()));
    }

    fn on_disconnect(&mut self) {
        info!(
            pending_tools = self.tool_calls.len(),
            buffered = !self.transcript.buffered().is_empty(),
            "Disconnecting"
        );
        self.transcript.reset();
        self.mode.enter_idle();
        self.tool_calls.abort_all();
        self.speaking = SpeakingFlags::default();
        self.emit(Command::UserSpeaking(false));
        self.emit(Command::AgentSpeaking(false));
        self.set_status(Status::Disconnected);
    }

    fn set_status(&mut self, status: Status) {
        debug!(%status, "Status changed");
        self.emit(Command::Status(status));
    }

    fn emit(&mut self, command: Command) {
        self.outbox.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use openai_realtime_types::server::{SpeechEvent, TranscriptEvent};

    struct EchoTools;

    #[async_trait]
    impl ToolExecutor for EchoTools {
        async fn execute(&self, name: &str, args: Value) -> Value {
            json!({ "tool": name, "args": args })
        }
    }

    fn engine() -> Engine {
        Engine::new(SessionConfig::default(), Arc::new(EchoTools))
    }

    fn sends(commands: &[Command]) -> Vec<&'static str> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Send(event) => Some(event.kind()),
                _ => None,
            })
            .collect()
    }

    /// Hands one input to the engine, which must keep running.
    fn feed(engine: &mut Engine, input: Input) {
        assert!(engine.handle(input).is_continue());
    }

    fn response_creates(commands: &[Command]) -> usize {
        sends(commands)
            .into_iter()
            .filter(|kind| *kind == "response.create")
            .count()
    }

    #[tokio::test]
    async fn channel_open_configures_session_once() {
        let mut engine = engine();
        feed(&mut engine, Input::ChannelOpened);
        let commands = engine.take_commands();
        assert_eq!(sends(&commands), ["session.update"]);
        assert!(commands.contains(&Command::system_log(
            "Active tools: get_current_datetime, calculator"
        )));
        assert_eq!(commands.last(), Some(&Command::Status(Status::Idle)));

        feed(&mut engine, Input::ChannelOpened);
        assert!(engine.take_commands().is_empty());
    }

    #[tokio::test]
    async fn wake_phrase_starts_dialogue_with_one_response() {
        let mut engine = engine();
        engine.on_utterance("Alex, what time is it");
        let commands = engine.take_commands();
        assert_eq!(engine.mode(), AgentMode::Dialogue);
        assert!(engine.is_dialogue_timeout_armed());
        assert_eq!(response_creates(&commands), 1);
        assert!(commands.contains(&Command::Status(Status::Dialogue)));
        assert_eq!(
            commands.last(),
            Some(&Command::Send(ClientEvent::response_create()))
        );
    }

    #[tokio::test]
    async fn idle_without_wake_is_silent() {
        let mut engine = engine();
        engine.on_utterance("what time is it");
        assert!(engine.take_commands().is_empty());
        assert_eq!(engine.mode(), AgentMode::Idle);
    }

    #[tokio::test]
    async fn stop_phrase_ends_dialogue_without_response() {
        let mut engine = engine();
        engine.on_utterance("hey alex");
        engine.take_commands();

        engine.on_utterance("thanks bye");
        let commands = engine.take_commands();
        assert_eq!(response_creates(&commands), 0);
        assert_eq!(engine.mode(), AgentMode::Idle);
        assert!(!engine.is_dialogue_timeout_armed());
        assert!(commands.contains(&Command::system_log("Alex ending dialogue")));
        assert!(commands.contains(&Command::Status(Status::Idle)));
    }

    #[tokio::test]
    async fn stop_phrase_in_idle_is_ignored() {
        let mut engine = engine();
        engine.on_utterance("stop");
        assert!(engine.take_commands().is_empty());
    }

    #[tokio::test]
    async fn fragment_while_speaking_waits_for_speech_stop() {
        let mut engine = engine();
        feed(
            &mut engine,
            ServerEvent::InputAudioBufferSpeechStarted(SpeechEvent::default()).into(),
        );
        feed(
            &mut engine,
            ServerEvent::ConversationItemInputAudioTranscriptionCompleted(TranscriptEvent {
                transcript: "hello".into(),
                ..Default::default()
            })
            .into(),
        );
        assert_eq!(engine.buffered_transcript(), "hello");
        assert!(!engine.is_flush_pending());

        feed(
            &mut engine,
            ServerEvent::InputAudioBufferSpeechStopped(SpeechEvent::default()).into(),
        );
        assert!(engine.is_flush_pending());
        assert_eq!(
            engine.take_commands(),
            [Command::UserSpeaking(true), Command::UserSpeaking(false)]
        );
    }

    #[tokio::test]
    async fn response_done_reports_mode() {
        let mut engine = engine();
        feed(&mut engine, ServerEvent::ResponseDone(Default::default()).into());
        assert_eq!(
            engine.take_commands(),
            [
                Command::AgentSpeaking(false),
                Command::Status(Status::Idle)
            ]
        );

        engine.on_utterance("hey alex");
        engine.take_commands();
        feed(&mut engine, ServerEvent::ResponseDone(Default::default()).into());
        assert_eq!(
            engine.take_commands(),
            [
                Command::AgentSpeaking(false),
                Command::Status(Status::Dialogue)
            ]
        );
        assert!(engine.is_dialogue_timeout_armed());
    }

    #[tokio::test]
    async fn malformed_arguments_answer_immediately() {
        let mut engine = engine();
        feed(
            &mut engine,
            ServerEvent::ResponseFunctionCallArgumentsDone(FunctionCallArgumentsDoneEvent {
                call_id: "call_9".into(),
                name: "calculator".into(),
                arguments: "{not json".into(),
                ..Default::default()
            })
            .into(),
        );
        assert_eq!(engine.pending_tool_calls(), 0);
        let commands = engine.take_commands();
        assert_eq!(sends(&commands), ["conversation.item.create", "response.create"]);
        let Command::Send(ClientEvent::ConversationItemCreate { item }) = &commands[0] else {
            panic!("expected function call output first, got {commands:?}");
        };
        let openai_realtime_types::Item::FunctionCallOutput { call_id, output } = item;
        assert_eq!(call_id, "call_9");
        let output: Value = serde_json::from_str(output).unwrap();
        assert!(
            output["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid tool arguments")
        );
    }

    #[tokio::test]
    async fn empty_arguments_are_an_empty_object() {
        let mut engine = engine();
        feed(
            &mut engine,
            ServerEvent::ResponseFunctionCallArgumentsDone(FunctionCallArgumentsDoneEvent {
                call_id: "call_1".into(),
                name: "get_current_datetime".into(),
                arguments: String::new(),
                ..Default::default()
            })
            .into(),
        );
        assert_eq!(engine.pending_tool_calls(), 1);
        assert!(engine.take_commands().is_empty());
    }

    #[tokio::test]
    async fn disconnect_resets_everything() {
        let mut engine = engine();
        engine.on_utterance("hey alex");
        feed(
            &mut engine,
            ServerEvent::ConversationItemInputAudioTranscriptionCompleted(TranscriptEvent {
                transcript: "half a".into(),
                ..Default::default()
            })
            .into(),
        );
        engine.take_commands();

        assert!(engine.handle(Input::Disconnect).is_break());
        assert_eq!(engine.mode(), AgentMode::Idle);
        assert_eq!(engine.buffered_transcript(), "");
        assert!(!engine.is_flush_pending());
        assert!(!engine.is_dialogue_timeout_armed());
        assert_eq!(
            engine.take_commands().last(),
            Some(&Command::Status(Status::Disconnected))
        );
    }

    #[tokio::test]
    async fn errors_are_status_only() {
        let mut engine = engine();
        let flow = engine.handle(Input::TransportError("Connection error".into()));
        assert!(flow.is_continue());
        assert_eq!(
            engine.take_commands(),
            [Command::Status(Status::Error("Connection error".into()))]
        );
        assert!(engine.handle(Input::Server(ServerEvent::Unknown)).is_continue());
        assert!(engine.take_commands().is_empty());
    }
}
