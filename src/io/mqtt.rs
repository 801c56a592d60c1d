//! MQTT session with the IoT platform
//!
//! Speaks the platform's device conventions directly over rumqttc:
//! client id `d:<org>:<type>:<id>`, token credentials, events published on
//! `iot-2/evt/<event>/fmt/<format>`, commands received on
//! `iot-2/cmd/<name>/fmt/<format>`.
//!
//! Error policy: any event loop error terminates the process. There is no
//! retry or backoff of our own; a device that cannot hold its connection is
//! restarted by the platform supervisor.

use crate::domain::command::{dispatch, Command, CommandAction};
use crate::infra::config::Config;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet,
    Publish, QoS,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Username the platform expects for token-based device auth
const TOKEN_AUTH_USERNAME: &str = "use-token-auth";

/// Subscription filter matching every inbound command
pub const COMMAND_FILTER: &str = "iot-2/cmd/+/fmt/+";

/// Map a numeric QoS level from config onto the MQTT QoS enum
pub fn qos_from_level(level: u8) -> QoS {
    match level {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

/// Topic for an outbound device event
pub fn event_topic(event_id: &str, format: &str) -> String {
    format!("iot-2/evt/{event_id}/fmt/{format}")
}

/// Handle to the single platform connection
///
/// Cheap to clone; all clones share one underlying connection.
#[derive(Clone)]
pub struct PlatformSession {
    client: AsyncClient,
    qos: QoS,
}

impl PlatformSession {
    /// Connect to the platform and spawn the event loop driver
    ///
    /// The command subscription is registered up front. Once the broker
    /// accepts the session, `connected_tx` flips to true.
    pub async fn connect(
        config: &Config,
        connected_tx: watch::Sender<bool>,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<Self> {
        let mut mqttoptions =
            MqttOptions::new(config.client_id(), config.broker_host(), config.broker_port());
        mqttoptions.set_keep_alive(Duration::from_secs(30));
        mqttoptions.set_clean_session(true);
        mqttoptions.set_credentials(TOKEN_AUTH_USERNAME, config.auth_token());

        let (client, eventloop) = AsyncClient::new(mqttoptions, 100);
        let qos = qos_from_level(config.qos());
        client.subscribe(COMMAND_FILTER, qos).await?;

        info!(
            host = %config.broker_host(),
            port = %config.broker_port(),
            client_id = %config.client_id(),
            "platform_session_started"
        );

        let loop_config = config.clone();
        tokio::spawn(async move {
            run_event_loop(eventloop, loop_config, connected_tx, shutdown).await;
        });

        Ok(Self { client, qos })
    }

    /// Publish a device event on `iot-2/evt/<event_id>/fmt/<format>`
    pub async fn publish_event(
        &self,
        event_id: &str,
        format: &str,
        payload: &[u8],
    ) -> Result<(), rumqttc::ClientError> {
        self.client.publish(event_topic(event_id, format), self.qos, false, payload).await
    }
}

/// Drive the connection until shutdown, dispatching inbound commands
async fn run_event_loop(
    mut eventloop: EventLoop,
    config: Config,
    connected_tx: watch::Sender<bool>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mqtt_shutdown");
                    return;
                }
            }
            result = eventloop.poll() => {
                match result {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(qos = %config.qos(), "connected to the IoT platform");
                        let _ = connected_tx.send(true);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        handle_publish(&publish);
                    }
                    Ok(_) => {}
                    Err(e) => exit_on_broker_error(&e, &config),
                }
            }
        }
    }
}

fn handle_publish(publish: &Publish) {
    match std::str::from_utf8(&publish.payload) {
        Ok(payload) => match Command::from_publish(&publish.topic, payload) {
            Some(command) => handle_command(&command),
            None => debug!(topic = %publish.topic, "non_command_publish_ignored"),
        },
        Err(e) => {
            warn!(topic = %publish.topic, error = %e, "Invalid UTF-8 in MQTT payload");
        }
    }
}

fn handle_command(command: &Command) {
    match dispatch(command) {
        CommandAction::Blink => {
            // no LED on a dev host; receipt is the observable effect
            info!(name = %command.name, "blink_requested");
        }
        CommandAction::ShowTweet(text) => {
            info!("Text Twitter: {}", text);
        }
        CommandAction::MalformedTweet => {
            warn!(payload = %command.payload, "showtwittext payload missing tweettext");
        }
        CommandAction::Unsupported(name) => {
            warn!("Command not supported.. {}", name);
        }
    }
    info!(
        name = %command.name,
        payload = %command.payload,
        topic = %command.topic,
        "command_received"
    );
}

/// Terminate the process on any broker error
///
/// Authorization failures get a remediation hint plus the configuration the
/// device presented, so a mis-registered device can be fixed from the logs.
fn exit_on_broker_error(err: &ConnectionError, config: &Config) -> ! {
    if is_auth_error(err) {
        error!(error = %err, "platform refused the device credentials");
        error!(
            config = ?config,
            "make sure the device is registered in the platform org with this configuration"
        );
    } else {
        error!(error = %err, "broker connection error");
    }
    std::process::exit(1);
}

/// Authorization failures: the typed CONNACK refusal codes, or any error
/// whose message mentions authorization
fn is_auth_error(err: &ConnectionError) -> bool {
    if let ConnectionError::ConnectionRefused(code) = err {
        return matches!(
            code,
            ConnectReturnCode::NotAuthorized | ConnectReturnCode::BadUserNamePassword
        );
    }
    err.to_string().to_ascii_lowercase().contains("authorized")
}
