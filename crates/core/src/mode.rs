//! The agent's listening mode and the dialogue inactivity timeout.

use crate::timer::Deadline;
use serde::Serialize;
use std::{fmt, time::Duration};
use tracing::info;

pub const DEFAULT_DIALOGUE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Passive listening: only a wake phrase gets a reaction.
    Idle,
    /// Active dialogue: every utterance gets a reply until a stop phrase or
    /// the inactivity timeout.
    Dialogue,
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentMode::Idle => write!(f, "idle"),
            AgentMode::Dialogue => write!(f, "dialogue"),
        }
    }
}

/// Owns the [`AgentMode`] and its sliding inactivity timeout.
///
/// The timeout is armed exactly while the mode is `Dialogue`.
#[derive(Debug)]
pub struct ModeMachine {
    mode: AgentMode,
    timeout: Deadline,
}

impl ModeMachine {
    pub fn new(dialogue_timeout: Duration) -> Self {
        Self {
            mode: AgentMode::Idle,
            timeout: Deadline::new(dialogue_timeout),
        }
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    pub fn is_dialogue(&self) -> bool {
        self.mode == AgentMode::Dialogue
    }

    /// Idle -> Dialogue. Arms the inactivity timeout.
    pub fn enter_dialogue(&mut self) {
        self.mode = AgentMode::Dialogue;
        self.timeout.rearm();
        info!(timeout = ?self.timeout.period(), "Entered dialogue mode");
    }

    /// Restarts the inactivity window. No effect outside dialogue.
    pub fn extend(&mut self) {
        if self.is_dialogue() {
            self.timeout.rearm();
        }
    }

    /// Dialogue -> Idle. Returns false if the machine was already idle.
    pub fn exit_dialogue(&mut self) -> bool {
        let was_dialogue = self.is_dialogue();
        self.enter_idle();
        if was_dialogue {
            info!("Exited dialogue mode");
        }
        was_dialogue
    }

    /// Unconditional reset to Idle, used on session start and disconnect.
    pub fn enter_idle(&mut self) {
        self.mode = AgentMode::Idle;
        self.timeout.cancel();
    }

    /// Resolves when the dialogue times out; the machine is Idle afterwards.
    ///
    /// Pends forever while idle.
    pub async fn timed_out(&mut self) {
        self.timeout.expired().await;
        self.mode = AgentMode::Idle;
        info!("Dialogue timed out");
    }

    pub fn is_timeout_armed(&self) -> bool {
        self.timeout.is_armed()
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new(DEFAULT_DIALOGUE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[test]
    fn starts_idle_without_timer() {
        let machine = ModeMachine::default();
        assert_eq!(machine.mode(), AgentMode::Idle);
        assert!(!machine.is_timeout_armed());
    }

    #[tokio::test]
    async fn dialogue_arms_and_exit_cancels() {
        let mut machine = ModeMachine::default();
        machine.enter_dialogue();
        assert!(machine.is_dialogue());
        assert!(machine.is_timeout_armed());

        assert!(machine.exit_dialogue());
        assert_eq!(machine.mode(), AgentMode::Idle);
        assert!(!machine.is_timeout_armed());
        assert!(!machine.exit_dialogue());
    }

    #[tokio::test]
    async fn extend_is_ignored_while_idle() {
        let mut machine = ModeMachine::default();
        machine.extend();
        assert!(!machine.is_timeout_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_returns_to_idle() {
        let mut machine = ModeMachine::new(Duration::from_secs(30));
        machine.enter_dialogue();
        timeout(Duration::from_secs(31), machine.timed_out())
            .await
            .expect("dialogue should time out");
        assert_eq!(machine.mode(), AgentMode::Idle);
        assert!(!machine.is_timeout_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn extend_slides_the_window() {
        let mut machine = ModeMachine::new(Duration::from_secs(30));
        machine.enter_dialogue();
        advance(Duration::from_secs(20)).await;
        machine.extend();
        assert!(
            timeout(Duration::from_secs(25), machine.timed_out())
                .await
                .is_err()
        );
        assert!(machine.is_dialogue());
        timeout(Duration::from_secs(10), machine.timed_out())
            .await
            .expect("dialogue should time out after the extended window");
        assert!(!machine.is_dialogue());
    }

    #[tokio::test(start_paused = true)]
    async fn exit_before_expiry_prevents_stale_timeout() {
        let mut machine = ModeMachine::new(Duration::from_secs(30));
        machine.enter_dialogue();
        machine.exit_dialogue();
        assert!(
            timeout(Duration::from_secs(120), machine.timed_out())
                .await
                .is_err()
        );
    }
}
