//! Playback timer.
//!
//! The timer only emits tick signals on a channel; the session turns each
//! signal into a [`Command::Tick`](crate::commands::Command::Tick). Dropping
//! or stopping the timer aborts its task, so no tick is emitted afterwards.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

pub struct PlaybackTimer {
    speed: Duration,
    task: JoinHandle<()>,
}

impl PlaybackTimer {
    /// Start ticking every `speed`. The first tick fires one full interval
    /// after the start.
    pub fn start(speed: Duration, ticks: UnboundedSender<()>) -> Self {
        debug!(speed_ms = speed.as_millis() as u64, "Starting playback timer");
        let task = tokio::spawn(async move {
            let mut ticker = interval(speed);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately once
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if ticks.send(()).is_err() {
                    break;
                }
            }
        });
        Self { speed, task }
    }

    pub fn speed(&self) -> Duration {
        self.speed
    }

    pub fn stop(self) {
        debug!(speed_ms = self.speed.as_millis() as u64, "Stopping playback timer");
        self.task.abort();
    }
}

impl Drop for PlaybackTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn test_ticks_until_stopped() {
        let (tx, mut rx) = unbounded_channel();
        let timer = PlaybackTimer::start(Duration::from_millis(20), tx);

        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        timer.stop();

        // sender was dropped with the aborted task; the channel drains and closes
        while rx.recv().await.is_some() {}
    }
}
