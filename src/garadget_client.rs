use std::time::Duration;

use rand::{distr::Alphanumeric, rng, RngExt};
use rumqttc::{
    AsyncClient, ClientError, ConnectionError, MqttOptions, SubscribeReasonCode, Transport,
};
use thiserror::Error;
use tokio::{
    sync::{
        mpsc::{self, error::SendError, Receiver},
        watch,
    },
    task::JoinError,
};

use crate::{ConfigError, GaradgetMQTTClient, PlatformConfig};

#[derive(Debug, Error)]
pub enum GaradgetClientError {
    #[error("Mqtt Client error: {0}")]
    MqttClient(#[from] ClientError),
    #[error("Error waiting for garadget client task to complete: {0} -- {0:#?}")]
    JoinError(#[from] JoinError),
    #[error("Garadget client channel is closed. Error sending event via mpsc::channel.")]
    ChannelClosed,
}
impl From<SendError<GaradgetClientEvent>> for GaradgetClientError {
    fn from(_: SendError<GaradgetClientEvent>) -> Self {
        Self::ChannelClosed
    }
}

#[derive(Debug, Clone)]
pub struct MqttClientConfig {
    pub hostname: String,
    pub port: u16,
    pub tls: bool,
    pub username: String,
    pub password: String,
    pub client_id: Option<String>,
    pub mqtt_channel_size: usize,
    pub keep_alive: u64,
    pub reconnect_delay: Duration,
    pub max_packet_size_incoming: usize,
    pub max_packet_size_outgoing: usize,
    pub clean_session: bool,
}

impl MqttClientConfig {
    // Builder methods

    /// Create a new instance with required fields and default optional fields
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: 1883,
            tls: false,
            username: String::new(),
            password: String::new(),
            client_id: None,
            mqtt_channel_size: 1024,
            keep_alive: 30,
            reconnect_delay: Duration::from_secs(5),
            max_packet_size_incoming: 64 * 1024,
            max_packet_size_outgoing: 64 * 1024,
            clean_session: true, // Default value
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        let id = client_id.into();
        if id.len() > 23 {
            log::warn!(
                "Warning, client id [{}] exceeds 23 (<{}) character length limit of mqtt spec!",
                id,
                id.len()
            );
        }
        self.client_id = Some(id);
        self
    }

    pub fn mqtt_channel_size(mut self, mqtt_channel_size: usize) -> Self {
        self.mqtt_channel_size = mqtt_channel_size;
        self
    }

    pub fn keep_alive(mut self, keep_alive: u64) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    pub fn max_packet_size_incoming(mut self, max_packet_size: usize) -> Self {
        self.max_packet_size_incoming = max_packet_size;
        self
    }

    pub fn max_packet_size_outgoing(mut self, max_packet_size: usize) -> Self {
        self.max_packet_size_outgoing = max_packet_size;
        self
    }

    pub fn clean_session(mut self, clean_session: bool) -> Self {
        self.clean_session = clean_session;
        self
    }

    pub fn to_mqtt_options(&self) -> MqttOptions {
        let client_id = match &self.client_id {
            Some(client_id) => client_id.clone(),
            None => format!(
                "garadget-{}",
                rng()
                    .sample_iter(&Alphanumeric)
                    .take(12)
                    .map(char::from)
                    .collect::<String>()
            ),
        };
        let mut mqttoptions = MqttOptions::new(client_id, self.hostname.to_owned(), self.port);
        if !self.username.is_empty() {
            mqttoptions.set_credentials(self.username.to_owned(), self.password.to_owned());
        }
        mqttoptions.set_keep_alive(Duration::from_secs(self.keep_alive));
        mqttoptions.set_clean_session(self.clean_session);
        mqttoptions
            .set_max_packet_size(self.max_packet_size_incoming, self.max_packet_size_outgoing);
        if self.tls {
            mqttoptions.set_transport(Transport::tls_with_default_config());
        }
        mqttoptions
    }
}

impl TryFrom<&PlatformConfig> for MqttClientConfig {
    type Error = ConfigError;

    fn try_from(config: &PlatformConfig) -> Result<Self, Self::Error> {
        let broker = config.broker()?;
        let mut client_config = MqttClientConfig::new(broker.host)
            .port(broker.port)
            .tls(broker.tls)
            .username(broker.username.unwrap_or_default())
            .password(broker.password.unwrap_or_default());
        if let Some(client_id) = &config.mqtt_client_id {
            client_config = client_config.client_id(client_id.clone());
        }
        Ok(client_config)
    }
}

#[derive(Debug)]
pub enum GaradgetClientEvent {
    Connect,
    Disconnect,
    Stop,
    Message { topic: String, payload: Vec<u8> },
    Error(ConnectionError),
}

pub struct GaradgetClientHandle {
    stop_sender: watch::Sender<bool>, // Shutdown signal
    handle: tokio::task::JoinHandle<Result<(), GaradgetClientError>>,
}

impl GaradgetClientHandle {
    /// Signals the event loop to exit without waiting for it.
    pub fn signal_stop(&self) {
        let _ = self.stop_sender.send(true);
    }

    /// Stops the event loop task.
    pub async fn stop(self) -> Result<(), GaradgetClientError> {
        self.signal_stop();
        self.handle.await??;
        Ok(())
    }
}

pub fn run_garadget_client(
    mqttoptions: MqttOptions,
    channel_size: usize,
    reconnect_delay: Duration,
) -> Result<
    (
        GaradgetClientHandle,
        GaradgetMQTTClient,
        Receiver<GaradgetClientEvent>,
    ),
    GaradgetClientError,
> {
    log::trace!("Connecting to mqtt: {}", mqttoptions.client_id());
    let (sender, receiver) = mpsc::channel(channel_size);

    let (mqtt_client, mut eventloop) = AsyncClient::new(mqttoptions, channel_size);
    let (stop_sender, mut stop_receiver) = watch::channel(false);

    let handle = tokio::task::spawn(async move {
        let mut connected = false;
        loop {
            let poll_res = tokio::select! {
                poll_res = eventloop.poll() => poll_res,
                changed = stop_receiver.changed() => {
                    // a dropped handle counts as a stop request
                    if changed.is_err() || *stop_receiver.borrow() {
                        log::trace!("Received stop signal. Exiting...");
                        break;
                    }
                    continue;
                }
            };

            match poll_res {
                Ok(event) => match event {
                    rumqttc::Event::Incoming(rumqttc::Packet::Publish(p)) => {
                        sender
                            .send(GaradgetClientEvent::Message {
                                topic: p.topic,
                                payload: p.payload.to_vec(),
                            })
                            .await?;
                    }
                    rumqttc::Event::Incoming(rumqttc::Incoming::ConnAck(_)) => {
                        log::trace!("GARADGET: Connected");
                        connected = true;
                        sender.send(GaradgetClientEvent::Connect).await?;
                    }
                    rumqttc::Event::Incoming(rumqttc::Incoming::SubAck(ack)) => {
                        if ack
                            .return_codes
                            .iter()
                            .any(|code| matches!(code, SubscribeReasonCode::Failure))
                        {
                            log::error!(
                                "Broker rejected subscription (pkid {}): {:?}",
                                ack.pkid,
                                ack.return_codes
                            );
                        }
                    }
                    rumqttc::Event::Outgoing(rumqttc::Outgoing::Disconnect) => {
                        log::trace!("GARADGET: Connection closed from our side.",);
                        sender.send(GaradgetClientEvent::Disconnect).await?;

                        break;
                    }
                    _ => {}
                },

                Err(err) => {
                    if connected {
                        connected = false;
                        sender.send(GaradgetClientEvent::Disconnect).await?;
                    }

                    log::error!("GaradgetClient: Error connecting mqtt. {:#?}", err);
                    sender.send(GaradgetClientEvent::Error(err)).await?;

                    tokio::select! {
                        _ = tokio::time::sleep(reconnect_delay) => {}
                        changed = stop_receiver.changed() => {
                            if changed.is_err() || *stop_receiver.borrow() {
                                log::trace!("Received stop signal while reconnecting. Exiting...");
                                break;
                            }
                        }
                    }
                }
            };
        }
        // the receiving side may already be gone when the platform was dropped
        let _ = sender.send(GaradgetClientEvent::Stop).await;
        log::trace!("Exiting garadget client eventloop...");
        Ok(())
    });
    Ok((
        GaradgetClientHandle {
            handle,
            stop_sender,
        },
        GaradgetMQTTClient::new(mqtt_client),
        receiver,
    ))
}
