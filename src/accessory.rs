use thiserror::Error;

use crate::{CharacteristicValue, CurrentDoorState, HapCharacteristic, HapService, TargetDoorState};

#[derive(Debug, Error, PartialEq)]
pub enum AccessoryError {
    #[error("Service {0:?} is not exposed by this accessory")]
    ServiceNotExposed(HapService),
    #[error("Characteristic {characteristic:?} does not belong to service {service:?}")]
    UnknownCharacteristic {
        service: HapService,
        characteristic: HapCharacteristic,
    },
    #[error("Characteristic {0:?} is read only")]
    ReadOnly(HapCharacteristic),
    #[error("Invalid value {value:?} for characteristic {characteristic:?}")]
    InvalidValue {
        characteristic: HapCharacteristic,
        value: CharacteristicValue,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub manufacturer: String,
    pub model: String,
    pub name: String,
}

/// Garage door opener capability as the host consumes it.
pub trait GarageDoorOpener {
    fn current_door_state(&self) -> CurrentDoorState;
    fn target_door_state(&self) -> TargetDoorState;
    /// Takes the raw characteristic value so out of range requests from the
    /// host can be reported. Always reports success to the caller.
    fn set_target_door_state(&self, value: u8);
    fn obstruction_detected(&self) -> bool;
}

pub trait LightSensor {
    fn current_ambient_light_level(&self) -> f64;
}

pub trait Accessory: Send + Sync {
    fn name(&self) -> &str;
    fn information(&self) -> AccessoryInformation;
    fn services(&self) -> Vec<HapService>;

    fn read(
        &self,
        service: HapService,
        characteristic: HapCharacteristic,
    ) -> Result<CharacteristicValue, AccessoryError>;

    fn write(
        &self,
        service: HapService,
        characteristic: HapCharacteristic,
        value: CharacteristicValue,
    ) -> Result<(), AccessoryError>;

    fn has_service(&self, service: HapService) -> bool {
        self.services().contains(&service)
    }
}
