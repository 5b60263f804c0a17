//! Cancellable one-shot deadlines.
//!
//! A [`Deadline`] owns at most one pending expiry. Re-arming replaces it, so a
//! superseded expiry can never fire. The owner awaits [`Deadline::expired`]
//! from its select loop; that future is cancel-safe because the underlying
//! `Sleep` lives in the deadline, not in the future.

use std::{future::pending, pin::Pin, time::Duration};
use tokio::time::{Instant, Sleep, sleep};

#[derive(Debug)]
pub struct Deadline {
    period: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Deadline {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            sleep: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drops any pending expiry and schedules a new one `period` from now.
    pub fn rearm(&mut self) {
        self.sleep = Some(Box::pin(sleep(self.period)));
    }

    /// Drops the pending expiry. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Time left until expiry, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.sleep
            .as_ref()
            .map(|s| s.deadline().saturating_duration_since(Instant::now()))
    }

    /// Resolves when the armed expiry elapses, then disarms.
    ///
    /// Pends forever while disarmed.
    pub async fn expired(&mut self) {
        let Some(sleep) = self.sleep.as_mut() else {
            return pending().await;
        };
        sleep.as_mut().await;
        self.sleep = None;
    }
}
