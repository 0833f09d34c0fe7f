use std::fmt;

use thiserror::Error;

use crate::TargetDoorState;

/// Plain text commands understood by the Garadget firmware on its command topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorCommand {
    GetStatus,
    Open,
    Close,
}

impl DoorCommand {
    pub fn as_payload(&self) -> &'static str {
        match self {
            DoorCommand::GetStatus => "get-status",
            DoorCommand::Open => "open",
            DoorCommand::Close => "close",
        }
    }
}

impl From<TargetDoorState> for DoorCommand {
    fn from(target: TargetDoorState) -> Self {
        match target {
            TargetDoorState::Open => DoorCommand::Open,
            TargetDoorState::Closed => DoorCommand::Close,
        }
    }
}

impl fmt::Display for DoorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_payload())
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Publish of [{command}] to [{topic}] was rejected: {reason}")]
    Rejected {
        topic: String,
        command: DoorCommand,
        reason: String,
    },
}

/// Outbound side of the MQTT connection as seen by a device adapter.
///
/// Implementations must not block: the adapter calls this from host reads
/// which are expected to answer from cached state immediately.
pub trait CommandPublisher: Send + Sync {
    fn publish_command(&self, topic: &str, command: DoorCommand) -> Result<(), PublishError>;
}
