use serde::{Deserialize, Serialize};
use thiserror::Error;

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/ServiceDefinitions.ts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HapService {
    AccessoryInformation,
    GarageDoorOpener,
    LightSensor,
}

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/CharacteristicDefinitions.ts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HapCharacteristic {
    Manufacturer,
    Model,
    Name,
    CurrentDoorState,
    TargetDoorState,
    ObstructionDetected,
    CurrentAmbientLightLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    UInt8(u8),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DoorStateError {
    #[error("Invalid current door state value: {0}")]
    InvalidCurrent(u8),
    #[error("Invalid target door state value: {0}")]
    InvalidTarget(u8),
}

/// Door position as reported by the device. Discriminants are the HAP
/// characteristic values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CurrentDoorState {
    Open = 0,
    #[default]
    Closed = 1,
    Opening = 2,
    Closing = 3,
    Stopped = 4,
}

impl From<CurrentDoorState> for u8 {
    fn from(state: CurrentDoorState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for CurrentDoorState {
    type Error = DoorStateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CurrentDoorState::Open),
            1 => Ok(CurrentDoorState::Closed),
            2 => Ok(CurrentDoorState::Opening),
            3 => Ok(CurrentDoorState::Closing),
            4 => Ok(CurrentDoorState::Stopped),
            _ => Err(DoorStateError::InvalidCurrent(value)),
        }
    }
}

impl std::fmt::Display for CurrentDoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CurrentDoorState::Open => "open",
            CurrentDoorState::Closed => "closed",
            CurrentDoorState::Opening => "opening",
            CurrentDoorState::Closing => "closing",
            CurrentDoorState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Door position requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TargetDoorState {
    Open = 0,
    #[default]
    Closed = 1,
}

impl From<TargetDoorState> for u8 {
    fn from(state: TargetDoorState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for TargetDoorState {
    type Error = DoorStateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TargetDoorState::Open),
            1 => Ok(TargetDoorState::Closed),
            _ => Err(DoorStateError::InvalidTarget(value)),
        }
    }
}

impl std::fmt::Display for TargetDoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetDoorState::Open => write!(f, "open"),
            TargetDoorState::Closed => write!(f, "closed"),
        }
    }
}
