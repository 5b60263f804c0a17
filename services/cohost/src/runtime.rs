//! Wires one realtime connection to a dialogue engine.
//!
//! Three tasks cooperate: the transport (reader and writer), the engine, and
//! the bridge loop below, which forwards transport events to the engine and
//! performs the engine's commands. Ctrl+C ends the session.

use anyhow::{Context, Result};
use base64::Engine as _;
use cohost_core::{
    Command, Engine, Input, SessionConfig, Status,
    tools::{Toolbox, web_search::TavilyClient},
};
use openai_realtime::{
    RealtimeConfig, TransportEvent, connect,
    types::ClientEvent,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc,
};
use tracing::{debug, error, info, warn};

/// 100 ms of 24 kHz mono PCM16.
const AUDIO_CHUNK_BYTES: usize = 4800;

/// Builds the tool set, with web search only when a credential is configured.
pub fn toolbox_for(config: &SessionConfig) -> Toolbox {
    match config.search_api_key() {
        Some(key) => {
            let client = TavilyClient::new(SecretString::from(key.expose_secret().to_owned()));
            Toolbox::new().with_search(Arc::new(client))
        }
        None => Toolbox::new(),
    }
}

/// Maps a transport notification to engine inputs.
pub fn inputs_for(event: TransportEvent) -> Vec<Input> {
    match event {
        TransportEvent::Opened => vec![Input::ChannelOpened],
        TransportEvent::Server(event) => vec![Input::Server(event)],
        TransportEvent::Failed(message) => vec![Input::TransportError(message), Input::Disconnect],
        TransportEvent::Closed => vec![Input::Disconnect],
    }
}

/// Wraps one chunk of raw PCM16 audio for the input buffer.
pub fn audio_append(chunk: &[u8]) -> ClientEvent {
    ClientEvent::InputAudioBufferAppend {
        audio: base64::engine::general_purpose::STANDARD.encode(chunk),
    }
}

/// Runs one session until the user interrupts or the connection ends.
pub async fn run_session(
    realtime: RealtimeConfig,
    session: SessionConfig,
    audio_stdin: bool,
) -> Result<()> {
    let tools = toolbox_for(&session);
    let connecting = Status::Connecting;
    info!(status = %connecting, "{}", connecting.label());
    let mut connection = connect(&realtime)
        .await
        .context("Failed to open realtime session")?;
    let client_events = connection.sender.clone();

    let (input_tx, input_rx) = mpsc::channel::<Input>(128);
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(128);
    let engine = tokio::spawn(Engine::new(session, Arc::new(tools)).run(input_rx, command_tx));

    let audio = audio_stdin.then(|| tokio::spawn(stream_audio(tokio::io::stdin(), client_events)));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut disconnecting = false;

    loop {
        tokio::select! {
            biased;
            result = &mut shutdown, if !disconnecting => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Received shutdown signal. Ending session...");
                disconnecting = true;
                let _ = input_tx.send(Input::Disconnect).await;
            }
            event = connection.events.recv(), if !disconnecting => {
                let inputs = match event {
                    Some(event) => inputs_for(event),
                    None => vec![Input::Disconnect],
                };
                for input in inputs {
                    disconnecting |= input == Input::Disconnect;
                    if input_tx.send(input).await.is_err() {
                        break;
                    }
                }
            }
            command = command_rx.recv() => match command {
                Some(command) => perform(command, &connection.sender).await,
                // The engine has stopped and dropped its sender.
                None => break,
            },
        }
    }

    if let Some(audio) = audio {
        audio.abort();
    }
    connection.close();
    match engine.await {
        Ok(result) => result.context("Dialogue engine failed"),
        Err(e) => Err(anyhow::Error::new(e).context("Dialogue engine task panicked")),
    }
}

/// Carries out one engine command.
async fn perform(command: Command, sender: &mpsc::Sender<ClientEvent>) {
    match command {
        Command::Send(event) => {
            let kind = event.kind();
            if sender.send(event).await.is_err() {
                warn!(kind, "Realtime connection gone; event dropped");
            }
        }
        Command::Status(status) => info!(%status, "{}", status.label()),
        Command::Log { speaker, text } => info!(%speaker, "{}", text),
        Command::UserSpeaking(speaking) => debug!(speaking, "User speaking indicator"),
        Command::AgentSpeaking(speaking) => debug!(speaking, "Agent speaking indicator"),
    }
}

/// Forwards raw audio from `reader` as `input_audio_buffer.append` events.
async fn stream_audio<R>(mut reader: R, sender: mpsc::Sender<ClientEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; AUDIO_CHUNK_BYTES];
    let mut pending = 0usize;
    loop {
        match reader.read(&mut buf[pending..]).await {
            Ok(0) => break,
            Ok(n) => pending += n,
            Err(e) => {
                error!(error = %e, "Failed to read audio from stdin");
                return;
            }
        }
        if pending == buf.len() {
            if sender.send(audio_append(&buf)).await.is_err() {
                return;
            }
            pending = 0;
        }
    }
    // Flush whole samples left at end of input.
    let tail = pending - pending % 2;
    if tail > 0 {
        let _ = sender.send(audio_append(&buf[..tail])).await;
    }
    info!("Audio input ended");
}
