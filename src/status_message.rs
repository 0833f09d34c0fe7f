use serde::Deserialize;
use thiserror::Error;

use crate::CurrentDoorState;

#[derive(Debug, Error)]
pub enum StatusMessageError {
    #[error("Error decoding status message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown door status [{0}]")]
    UnknownStatus(String),
}

/// Status report published by the device, e.g.
/// `{"status":"closed","time":"5m","sensor":23,"bright":48,"signal":-59}`.
/// Only `status` and `bright` are used. `bright` is kept undecoded so a
/// malformed reading never rejects the status itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    #[serde(default)]
    pub bright: Option<serde_json::Value>,
}

impl StatusMessage {
    pub fn parse(payload: &[u8]) -> Result<Self, StatusMessageError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Brightness reading, `None` when absent or not a number.
    pub fn light_level(&self) -> Option<f64> {
        self.bright.as_ref().and_then(|bright| bright.as_f64())
    }

    pub fn door_state(&self) -> Result<CurrentDoorState, StatusMessageError> {
        map_door_status(&self.status)
            .ok_or_else(|| StatusMessageError::UnknownStatus(self.status.clone()))
    }
}

pub fn map_door_status(status: &str) -> Option<CurrentDoorState> {
    match status {
        "open" => Some(CurrentDoorState::Open),
        "closed" => Some(CurrentDoorState::Closed),
        "opening" => Some(CurrentDoorState::Opening),
        "closing" => Some(CurrentDoorState::Closing),
        "stopped" => Some(CurrentDoorState::Stopped),
        _ => None,
    }
}
