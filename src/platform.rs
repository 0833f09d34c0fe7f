use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::{
    sync::mpsc::Receiver,
    task::JoinHandle,
    time::{timeout_at, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    run_garadget_client, Accessory, AccessoryAdd, AccessoryStore, CommandPublisher, ConfigError,
    GaradgetClientError, GaradgetClientEvent, GaradgetClientHandle, GaradgetMQTTClient,
    GarageDoor, MqttClientConfig, PlatformConfig,
};

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] GaradgetClientError),
    #[error("Broker did not accept the connection within {0:?}")]
    ConnectTimeout(Duration),
    #[error("Mqtt client stopped before a connection was established")]
    ConnectionClosed,
}

/// One MQTT connection and the garage doors configured on it.
///
/// Connection failures at startup are retried by the client event loop until
/// `connect_timeout` runs out, then the whole platform load fails. After the
/// initial connection the client keeps reconnecting on its own and status
/// subscriptions are restored on every reconnect.
pub struct GaradgetPlatform {
    client: GaradgetMQTTClient,
    store: Arc<AccessoryStore>,
    client_handle: Option<GaradgetClientHandle>,
    dispatcher: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl GaradgetPlatform {
    pub async fn connect(config: &PlatformConfig) -> Result<Self, PlatformError> {
        config.validate()?;
        let client_config = MqttClientConfig::try_from(config)?;
        log::info!(
            "Connecting to mqtt broker {}:{}",
            client_config.hostname,
            client_config.port
        );

        let (client_handle, client, mut events) = run_garadget_client(
            client_config.to_mqtt_options(),
            client_config.mqtt_channel_size,
            client_config.reconnect_delay,
        )?;

        if let Err(err) = await_connection(&mut events, config.connect_timeout_duration()).await {
            if let Err(stop_err) = client_handle.stop().await {
                log::debug!("Error stopping garadget client: {}", stop_err);
            }
            return Err(err);
        }
        log::info!("Connected to mqtt broker");

        let store = Arc::new(build_accessories(config, &client));
        if store.is_empty() {
            log::warn!("No accessories configured");
        }
        subscribe_status_topics(&client, &store).await;
        for door in store.iter() {
            door.start_polling();
        }

        let cancel = CancellationToken::new();
        let dispatcher = tokio::task::spawn(dispatch(
            events,
            store.clone(),
            client.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            client,
            store,
            client_handle: Some(client_handle),
            dispatcher: Some(dispatcher),
            cancel,
        })
    }

    /// The adapters created for the configured accessories, in configuration order.
    pub fn accessories(&self) -> Vec<Arc<GarageDoor>> {
        self.store.to_vec()
    }

    pub fn accessory(&self, name: &str) -> Option<Arc<GarageDoor>> {
        self.store.get(name).cloned()
    }

    pub fn client(&self) -> &GaradgetMQTTClient {
        &self.client
    }

    /// Unsubscribes all status topics, stops the poll timers, disconnects
    /// and waits for the client task to finish.
    pub async fn shutdown(&mut self) -> Result<(), PlatformError> {
        let Some(client_handle) = self.client_handle.take() else {
            return Ok(());
        };
        for door in self.store.iter() {
            door.stop_polling();
        }

        let topics = self.store.status_topics().cloned().collect::<Vec<_>>();
        for (topic, err) in self.client.unsubscribe_all(&topics).await {
            log::warn!("Error unsubscribing from [{}]: {}", topic, err);
        }
        if let Err(err) = self.client.disconnect().await {
            log::warn!("Error disconnecting from mqtt broker: {}", err);
        }

        let stopped = client_handle.stop().await;
        if let Some(dispatcher) = self.dispatcher.take() {
            // the dispatcher exits once the client task dropped its event sender
            if let Err(err) = dispatcher.await {
                log::warn!("Error waiting for dispatcher: {}", err);
            }
        }
        self.cancel.cancel();
        stopped?;
        log::info!("Garadget platform shut down");
        Ok(())
    }
}

impl Drop for GaradgetPlatform {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(client_handle) = &self.client_handle {
            client_handle.signal_stop();
        }
    }
}

async fn await_connection(
    events: &mut Receiver<GaradgetClientEvent>,
    timeout: Option<Duration>,
) -> Result<(), PlatformError> {
    let deadline = timeout.map(|timeout| Instant::now() + timeout);
    loop {
        let event = match deadline {
            Some(deadline) => match timeout_at(deadline, events.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    let timeout = timeout.unwrap_or_default();
                    log::error!("Broker did not accept the connection within {:?}", timeout);
                    return Err(PlatformError::ConnectTimeout(timeout));
                }
            },
            None => events.recv().await,
        };
        match event {
            Some(GaradgetClientEvent::Connect) => return Ok(()),
            Some(GaradgetClientEvent::Error(err)) => {
                log::warn!("Connection attempt failed, retrying: {}", err);
            }
            Some(GaradgetClientEvent::Stop) | None => return Err(PlatformError::ConnectionClosed),
            Some(_) => {}
        }
    }
}

fn build_accessories(config: &PlatformConfig, client: &GaradgetMQTTClient) -> AccessoryStore {
    let publisher: Arc<dyn CommandPublisher> = Arc::new(client.clone());
    let mut store = AccessoryStore::new();
    for accessory in &config.accessories {
        let door = Arc::new(GarageDoor::new(accessory, publisher.clone()));
        match store.add(door) {
            AccessoryAdd::Added => log::info!("Created '{}' Accessory", accessory.name),
            AccessoryAdd::DuplicateName => {
                log::error!("Skipping duplicate accessory '{}'", accessory.name)
            }
        }
    }
    store
}

async fn subscribe_status_topics(client: &GaradgetMQTTClient, store: &AccessoryStore) {
    let topics = store.status_topics().cloned().collect::<Vec<_>>();
    let failed = client.subscribe_all(&topics).await;
    for door in store.iter() {
        match failed.iter().find(|(topic, _)| topic == door.status_topic()) {
            Some((topic, err)) => log::error!(
                "Error: {} could not subscribe to [{}], no live updates: {}",
                door.name(),
                topic,
                err
            ),
            None => log::info!("Subscribed to {} door status channel", door.name()),
        }
    }
}

async fn dispatch(
    mut events: Receiver<GaradgetClientEvent>,
    store: Arc<AccessoryStore>,
    client: GaradgetMQTTClient,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Some(GaradgetClientEvent::Message { topic, payload }) => {
                store.route_message(&topic, &payload);
            }
            Some(GaradgetClientEvent::Connect) => {
                log::info!("Reconnected to mqtt broker, restoring subscriptions");
                let topics = store.status_topics().cloned().collect::<Vec<_>>();
                for (topic, err) in client.resubscribe_all(&topics) {
                    log::error!("Error restoring subscription to [{}]: {}", topic, err);
                }
            }
            Some(GaradgetClientEvent::Disconnect) => {
                log::warn!("Disconnected from mqtt broker");
            }
            Some(GaradgetClientEvent::Error(err)) => {
                log::debug!("Mqtt connection error: {}", err);
            }
            Some(GaradgetClientEvent::Stop) | None => break,
        }
    }
    log::trace!("Exiting garadget dispatcher...");
}
