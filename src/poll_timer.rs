use std::sync::Arc;
use std::time::Duration;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant},
};

use crate::{CommandPublisher, DoorCommand};

/// Periodically asks a device for its status. The task is aborted when the
/// timer is dropped.
#[derive(Default, Debug)]
pub struct PollTimer {
    handle: Option<JoinHandle<()>>,
}

impl PollTimer {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Starts publishing `get-status` to `topic` every `period`, the first time
    /// one full period from now. Must be called from within a tokio runtime.
    pub fn start(
        publisher: Arc<dyn CommandPublisher>,
        topic: impl Into<String>,
        period: Duration,
    ) -> Self {
        let topic = topic.into();
        let Some(start) = Instant::now().checked_add(period) else {
            log::error!(
                "Poll period {:?} for [{}] is out of range, not polling",
                period,
                topic
            );
            return Self::new();
        };
        let handle = Some(tokio::task::spawn(async move {
            let mut interval = interval_at(start, period);
            loop {
                interval.tick().await;
                log::trace!("Polling status on [{}]", topic);
                if let Err(err) = publisher.publish_command(&topic, DoorCommand::GetStatus) {
                    log::warn!("Error sending scheduled status request: {}", err)
                }
            }
        }));
        Self { handle }
    }

    /// Return true if the task was aborted, false if it was not running
    pub fn abort(&mut self) -> bool {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            return true;
        }
        false
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.abort();
    }
}
