use std::{
    collections::{hash_map::Keys, HashMap},
    sync::Arc,
};

use crate::{Accessory, GarageDoor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryAdd {
    Added,
    DuplicateName,
}

/// All adapters of one platform, indexed by name and by status topic.
#[derive(Default, Debug)]
pub struct AccessoryStore {
    doors: Vec<Arc<GarageDoor>>,
    by_name: HashMap<String, usize>,
    by_topic: HashMap<String, Vec<usize>>,
}

impl AccessoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, door: Arc<GarageDoor>) -> AccessoryAdd {
        if self.by_name.contains_key(door.name()) {
            return AccessoryAdd::DuplicateName;
        }
        let index = self.doors.len();
        self.by_name.insert(door.name().to_string(), index);
        self.by_topic
            .entry(door.status_topic().to_string())
            .or_default()
            .push(index);
        self.doors.push(door);
        AccessoryAdd::Added
    }

    pub fn get(&self, name: &str) -> Option<&Arc<GarageDoor>> {
        self.by_name.get(name).map(|index| &self.doors[*index])
    }

    pub fn subscribers<'a>(&'a self, topic: &str) -> impl Iterator<Item = &'a Arc<GarageDoor>> + 'a {
        self.by_topic
            .get(topic)
            .into_iter()
            .flatten()
            .map(move |index| &self.doors[*index])
    }

    pub fn status_topics(&self) -> Keys<'_, String, Vec<usize>> {
        self.by_topic.keys()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<GarageDoor>> {
        self.doors.iter()
    }

    pub fn to_vec(&self) -> Vec<Arc<GarageDoor>> {
        self.doors.clone()
    }

    pub fn count(&self) -> usize {
        self.doors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doors.is_empty()
    }

    /// Hands a received publish to every adapter subscribed to `topic`.
    /// Rejected payloads are logged and never propagated. Returns the number
    /// of adapters that accepted the message.
    pub fn route_message(&self, topic: &str, payload: &[u8]) -> usize {
        let mut accepted = 0;
        let mut matched = false;
        for door in self.subscribers(topic) {
            matched = true;
            match door.handle_status_payload(payload) {
                Ok(_) => accepted += 1,
                Err(err) => {
                    log::error!(
                        "Error: {} encountered an error processing data.\n  Topic: [{}]\n  Payload: [{}]\n  Error: {}",
                        door.name(),
                        topic,
                        String::from_utf8_lossy(payload),
                        err
                    );
                }
            }
        }
        if !matched {
            log::debug!("No accessory subscribed to [{}], message dropped", topic);
        }
        accepted
    }
}
