use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{CurrentDoorState, TargetDoorState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueUpdate<T> {
    Equal,
    Changed { old: T, new: T },
}

impl<T> ValueUpdate<T> {
    pub fn is_changed(&self) -> bool {
        matches!(self, ValueUpdate::Changed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DoorSnapshot {
    pub current: CurrentDoorState,
    pub target: TargetDoorState,
    pub light_level: Option<f64>,
    pub status_received_at: Option<DateTime<Utc>>,
    pub command_sent_at: Option<DateTime<Utc>>,
}

/// Last known state of one door. Each store operation is a single atomic
/// modification of the underlying watch channel; watchers are only woken when
/// a value actually changed.
#[derive(Debug)]
pub struct DoorStateStore(watch::Sender<DoorSnapshot>);

impl Default for DoorStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DoorStateStore {
    pub fn new() -> Self {
        Self(watch::Sender::new(DoorSnapshot::default()))
    }

    pub fn snapshot(&self) -> DoorSnapshot {
        self.0.borrow().clone()
    }

    pub fn current(&self) -> CurrentDoorState {
        self.0.borrow().current
    }

    pub fn target(&self) -> TargetDoorState {
        self.0.borrow().target
    }

    pub fn light_level(&self) -> Option<f64> {
        self.0.borrow().light_level
    }

    pub fn subscribe(&self) -> watch::Receiver<DoorSnapshot> {
        self.0.subscribe()
    }

    /// Applies a status report in one modification so watchers never see the
    /// door state and light level of different reports.
    pub fn store_status(
        &self,
        state: CurrentDoorState,
        light_level: Option<f64>,
    ) -> (ValueUpdate<CurrentDoorState>, Option<ValueUpdate<Option<f64>>>) {
        let now = Utc::now();
        let mut door_update = ValueUpdate::Equal;
        let mut light_update = light_level.map(|_| ValueUpdate::Equal);
        self.0.send_if_modified(|snapshot| {
            snapshot.status_received_at = Some(now);
            let mut modified = false;
            if snapshot.current != state {
                door_update = ValueUpdate::Changed {
                    old: snapshot.current,
                    new: state,
                };
                snapshot.current = state;
                modified = true;
            }
            if let Some(level) = light_level {
                if snapshot.light_level != Some(level) {
                    light_update = Some(ValueUpdate::Changed {
                        old: snapshot.light_level,
                        new: Some(level),
                    });
                    snapshot.light_level = Some(level);
                    modified = true;
                }
            }
            modified
        });
        (door_update, light_update)
    }

    pub fn store_target(&self, target: TargetDoorState) -> ValueUpdate<TargetDoorState> {
        let now = Utc::now();
        let mut update = ValueUpdate::Equal;
        self.0.send_if_modified(|snapshot| {
            snapshot.command_sent_at = Some(now);
            if snapshot.target == target {
                return false;
            }
            update = ValueUpdate::Changed {
                old: snapshot.target,
                new: target,
            };
            snapshot.target = target;
            true
        });
        update
    }
}
