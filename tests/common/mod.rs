use std::sync::Mutex;

use hc_garadget::{CommandPublisher, DoorCommand, PublishError};

/// Publisher that records every command instead of sending it.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, DoorCommand)>>,
    reject: bool,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn published(&self) -> Vec<(String, DoorCommand)> {
        self.published.lock().unwrap().clone()
    }

    pub fn count(&self, command: DoorCommand) -> usize {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| *c == command)
            .count()
    }
}

impl CommandPublisher for RecordingPublisher {
    fn publish_command(&self, topic: &str, command: DoorCommand) -> Result<(), PublishError> {
        if self.reject {
            return Err(PublishError::Rejected {
                topic: topic.to_string(),
                command,
                reason: "queue full".to_string(),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), command));
        Ok(())
    }
}
