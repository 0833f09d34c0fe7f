use std::ops::{Deref, DerefMut};

use rumqttc::{AsyncClient, ClientError, QoS};

use crate::{CommandPublisher, DoorCommand, PublishError};

/// Shared handle to the platform's MQTT connection.
#[derive(Debug, Clone)]
pub struct GaradgetMQTTClient(AsyncClient);

impl Deref for GaradgetMQTTClient {
    type Target = AsyncClient;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for GaradgetMQTTClient {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl GaradgetMQTTClient {
    // Garadget firmware publishes and expects QoS 0, non retained
    pub const QOS: QoS = QoS::AtMostOnce;

    pub fn new(mqtt_client: AsyncClient) -> Self {
        Self(mqtt_client)
    }

    pub async fn subscribe_status(&self, topic: &str) -> Result<(), ClientError> {
        self.0.subscribe(topic, Self::QOS).await
    }

    pub async fn unsubscribe_status(&self, topic: &str) -> Result<(), ClientError> {
        self.0.unsubscribe(topic).await
    }

    pub async fn subscribe_all(&self, topics: &[String]) -> Vec<(String, ClientError)> {
        let mut failed = Vec::new();
        for topic in topics {
            if let Err(err) = self.subscribe_status(topic).await {
                failed.push((topic.clone(), err));
            }
        }
        failed
    }

    /// Queues a subscription for every topic without waiting for room in the
    /// request channel. Used from the event consumer, which must never block
    /// on the client event loop it is draining.
    pub fn resubscribe_all(&self, topics: &[String]) -> Vec<(String, ClientError)> {
        let mut failed = Vec::new();
        for topic in topics {
            if let Err(err) = self.0.try_subscribe(topic, Self::QOS) {
                failed.push((topic.clone(), err));
            }
        }
        failed
    }

    pub async fn unsubscribe_all(&self, topics: &[String]) -> Vec<(String, ClientError)> {
        let mut failed = Vec::new();
        for topic in topics {
            if let Err(err) = self.unsubscribe_status(topic).await {
                failed.push((topic.clone(), err));
            }
        }
        failed
    }
}

impl CommandPublisher for GaradgetMQTTClient {
    fn publish_command(&self, topic: &str, command: DoorCommand) -> Result<(), PublishError> {
        self.0
            .try_publish(topic, Self::QOS, false, command.as_payload())
            .map_err(|err| PublishError::Rejected {
                topic: topic.to_string(),
                command,
                reason: err.to_string(),
            })
    }
}
