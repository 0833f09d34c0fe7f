use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::{
    Accessory, AccessoryConfig, AccessoryError, AccessoryInformation, CharacteristicValue,
    CommandPublisher, CurrentDoorState, DoorCommand, DoorSnapshot, DoorStateStore,
    GarageDoorOpener, HapCharacteristic, HapService, LightSensor, PollTimer, StatusMessage,
    StatusMessageError, TargetDoorState, ValueUpdate,
};

pub const MANUFACTURER: &str = "Garadget";
pub const MODEL: &str = "Photon";

/// Result of applying one status message.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub door_state: ValueUpdate<CurrentDoorState>,
    /// `None` when light sensor reporting is disabled or the message carried
    /// no numeric brightness.
    pub light_level: Option<ValueUpdate<Option<f64>>>,
}

/// Adapter between one Garadget device and the accessory host.
pub struct GarageDoor {
    name: String,
    status_topic: String,
    command_topic: String,
    light_sensor: bool,
    poll_interval: Option<Duration>,
    state: DoorStateStore,
    publisher: Arc<dyn CommandPublisher>,
    poll_timer: Mutex<PollTimer>,
}

impl std::fmt::Debug for GarageDoor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GarageDoor")
            .field("name", &self.name)
            .field("status_topic", &self.status_topic)
            .field("command_topic", &self.command_topic)
            .field("light_sensor", &self.light_sensor)
            .field("poll_interval", &self.poll_interval)
            .field("state", &self.state.snapshot())
            .finish()
    }
}

impl GarageDoor {
    pub fn new(config: &AccessoryConfig, publisher: Arc<dyn CommandPublisher>) -> Self {
        Self {
            name: config.name.clone(),
            status_topic: config.status_topic.clone(),
            command_topic: config.command_topic.clone(),
            light_sensor: config.light_sensor,
            poll_interval: config.poll_interval(),
            state: DoorStateStore::new(),
            publisher,
            poll_timer: Mutex::new(PollTimer::new()),
        }
    }

    pub fn status_topic(&self) -> &str {
        &self.status_topic
    }

    pub fn command_topic(&self) -> &str {
        &self.command_topic
    }

    pub fn light_sensor_enabled(&self) -> bool {
        self.light_sensor
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    pub fn snapshot(&self) -> DoorSnapshot {
        self.state.snapshot()
    }

    /// Receiver that is notified whenever the door state, target or light
    /// level changes.
    pub fn watch(&self) -> watch::Receiver<DoorSnapshot> {
        self.state.subscribe()
    }

    pub fn light_level(&self) -> Option<f64> {
        self.state.light_level()
    }

    /// Decodes and applies a payload received on the status topic. Nothing is
    /// modified when the payload can't be decoded or carries an unknown status.
    pub fn handle_status_payload(&self, payload: &[u8]) -> Result<StatusUpdate, StatusMessageError> {
        let message = StatusMessage::parse(payload)?;
        self.apply_status(&message)
    }

    pub fn apply_status(&self, message: &StatusMessage) -> Result<StatusUpdate, StatusMessageError> {
        let door_state = message.door_state()?;
        log::info!("{} door is {}", self.name, message.status);

        let light_level = match &message.bright {
            Some(bright) if self.light_sensor => {
                let level = message.light_level();
                if level.is_none() {
                    log::warn!("{}: ignoring non numeric brightness [{}]", self.name, bright);
                }
                level
            }
            _ => None,
        };

        let (door_state, light_level) = self.state.store_status(door_state, light_level);
        Ok(StatusUpdate {
            door_state,
            light_level,
        })
    }

    /// Asks the device to publish its status. Fire and forget.
    pub fn request_status(&self) {
        self.publish(DoorCommand::GetStatus);
    }

    /// Sends the open/close command and records the target optimistically.
    pub fn request_target(&self, target: TargetDoorState) -> ValueUpdate<TargetDoorState> {
        let command = DoorCommand::from(target);
        log::info!("Set {} door state to {}", self.name, command);
        self.publish(command);
        self.state.store_target(target)
    }

    fn publish(&self, command: DoorCommand) {
        if let Err(err) = self.publisher.publish_command(&self.command_topic, command) {
            log::warn!("{}: {}", self.name, err);
        }
    }

    /// Starts the status poll timer if an interval is configured. Returns
    /// whether a timer is running afterwards.
    pub fn start_polling(&self) -> bool {
        let Some(period) = self.poll_interval else {
            return false;
        };
        let Ok(mut timer) = self.poll_timer.lock() else {
            log::error!("{}: poll timer lock poisoned", self.name);
            return false;
        };
        if timer.is_running() {
            return true;
        }
        log::debug!(
            "{}: requesting status every {} minutes",
            self.name,
            period.as_secs() / 60
        );
        *timer = PollTimer::start(self.publisher.clone(), self.command_topic.clone(), period);
        timer.is_running()
    }

    pub fn stop_polling(&self) -> bool {
        match self.poll_timer.lock() {
            Ok(mut timer) => timer.abort(),
            Err(_) => false,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_timer
            .lock()
            .map(|timer| timer.is_running())
            .unwrap_or(false)
    }
}

impl GarageDoorOpener for GarageDoor {
    fn current_door_state(&self) -> CurrentDoorState {
        log::debug!("Get {} door status", self.name);
        self.request_status();
        self.state.current()
    }

    fn target_door_state(&self) -> TargetDoorState {
        self.state.target()
    }

    fn set_target_door_state(&self, value: u8) {
        match TargetDoorState::try_from(value) {
            Ok(target) => {
                self.request_target(target);
            }
            Err(err) => {
                log::error!("Error setting {} door state: {}", self.name, err);
            }
        }
    }

    fn obstruction_detected(&self) -> bool {
        false
    }
}

impl LightSensor for GarageDoor {
    fn current_ambient_light_level(&self) -> f64 {
        self.state.light_level().unwrap_or_default()
    }
}

impl Accessory for GarageDoor {
    fn name(&self) -> &str {
        &self.name
    }

    fn information(&self) -> AccessoryInformation {
        AccessoryInformation {
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            name: self.name.clone(),
        }
    }

    fn services(&self) -> Vec<HapService> {
        let mut services = vec![HapService::AccessoryInformation, HapService::GarageDoorOpener];
        if self.light_sensor {
            services.push(HapService::LightSensor);
        }
        services
    }

    fn read(
        &self,
        service: HapService,
        characteristic: HapCharacteristic,
    ) -> Result<CharacteristicValue, AccessoryError> {
        if !self.has_service(service) {
            return Err(AccessoryError::ServiceNotExposed(service));
        }
        let value = match (service, characteristic) {
            (HapService::AccessoryInformation, HapCharacteristic::Manufacturer) => {
                CharacteristicValue::String(MANUFACTURER.to_string())
            }
            (HapService::AccessoryInformation, HapCharacteristic::Model) => {
                CharacteristicValue::String(MODEL.to_string())
            }
            (HapService::AccessoryInformation, HapCharacteristic::Name) => {
                CharacteristicValue::String(self.name.clone())
            }
            (HapService::GarageDoorOpener, HapCharacteristic::CurrentDoorState) => {
                CharacteristicValue::UInt8(self.current_door_state().into())
            }
            (HapService::GarageDoorOpener, HapCharacteristic::TargetDoorState) => {
                CharacteristicValue::UInt8(self.target_door_state().into())
            }
            (HapService::GarageDoorOpener, HapCharacteristic::ObstructionDetected) => {
                CharacteristicValue::Bool(self.obstruction_detected())
            }
            (HapService::LightSensor, HapCharacteristic::CurrentAmbientLightLevel) => {
                CharacteristicValue::Float(self.current_ambient_light_level())
            }
            _ => {
                return Err(AccessoryError::UnknownCharacteristic {
                    service,
                    characteristic,
                })
            }
        };
        Ok(value)
    }

    fn write(
        &self,
        service: HapService,
        characteristic: HapCharacteristic,
        value: CharacteristicValue,
    ) -> Result<(), AccessoryError> {
        if !self.has_service(service) {
            return Err(AccessoryError::ServiceNotExposed(service));
        }
        match (service, characteristic) {
            (HapService::GarageDoorOpener, HapCharacteristic::TargetDoorState) => match value {
                CharacteristicValue::UInt8(raw) => {
                    self.set_target_door_state(raw);
                    Ok(())
                }
                value => Err(AccessoryError::InvalidValue {
                    characteristic,
                    value,
                }),
            },
            (
                HapService::AccessoryInformation,
                HapCharacteristic::Manufacturer | HapCharacteristic::Model | HapCharacteristic::Name,
            )
            | (
                HapService::GarageDoorOpener,
                HapCharacteristic::CurrentDoorState | HapCharacteristic::ObstructionDetected,
            )
            | (HapService::LightSensor, HapCharacteristic::CurrentAmbientLightLevel) => {
                Err(AccessoryError::ReadOnly(characteristic))
            }
            _ => Err(AccessoryError::UnknownCharacteristic {
                service,
                characteristic,
            }),
        }
    }
}
