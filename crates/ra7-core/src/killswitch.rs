//! Kill switch: a shared halt flag plus the MQTT listener that trips it.

use anyhow::Result;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::events::{HaltData, SuiteEvent};

/// One-way halt flag shared between the listener and the kernel.
#[derive(Debug, Clone, Default)]
pub struct KillSwitch {
    engaged: Arc<AtomicBool>,
}

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage(&self) {
        self.engaged.store(true, Ordering::SeqCst);
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// A halt command engaged the switch
    Halted,
    /// Interrupted by the operator
    Stopped,
}

pub struct HaltListener {
    config: Config,
    switch: KillSwitch,
    event_tx: broadcast::Sender<SuiteEvent>,
}

impl HaltListener {
    pub fn new(config: Config, switch: KillSwitch, event_tx: broadcast::Sender<SuiteEvent>) -> Self {
        Self {
            config,
            switch,
            event_tx,
        }
    }

    /// React to a message on `topic`. Returns true if it was a halt.
    pub fn handle_message(&self, topic: &str) -> bool {
        if topic != self.config.kill_switch_topic {
            return false;
        }
        warn!("!!! KILL SWITCH COMMAND RECEIVED !!!");
        warn!("!!! System halt initiated. Latency target: <1s. !!!");
        self.switch.engage();
        info!(
            "Simulating GPIO-{} pull-down. System terminating.",
            self.config.gpio_pin
        );
        let _ = self.event_tx.send(SuiteEvent::Halt(HaltData {
            topic: topic.to_string(),
            gpio_pin: self.config.gpio_pin,
        }));
        true
    }

    /// Listen on the broker; falls back to mock mode if the broker fails.
    pub async fn run(&self, mock: bool) -> ListenerExit {
        if mock {
            return self.listen_mock().await;
        }
        match self.listen_mqtt().await {
            Ok(exit) => exit,
            Err(e) => {
                error!("Failed to connect to MQTT broker: {:#}", e);
                info!("Running mock listener instead.");
                self.listen_mock().await
            }
        }
    }

    async fn listen_mqtt(&self) -> Result<ListenerExit> {
        let client_id = format!("ra7-{}", uuid::Uuid::new_v4().simple());
        let mut options = MqttOptions::new(
            client_id,
            self.config.mqtt_broker.clone(),
            self.config.mqtt_port,
        );
        options.set_keep_alive(Duration::from_secs(60));

        info!(
            "Connecting to MQTT broker at {}:{}...",
            self.config.mqtt_broker, self.config.mqtt_port
        );
        let (client, mut eventloop) = AsyncClient::new(options, 10);

        loop {
            match eventloop.poll().await? {
                Event::Incoming(Packet::ConnAck(ack)) => {
                    info!("Connected to MQTT Broker with result code {:?}", ack.code);
                    // QoS 2 for exactly-once delivery
                    client
                        .subscribe(self.config.kill_switch_topic.clone(), QoS::ExactlyOnce)
                        .await?;
                    info!("Subscribed to topic: {}", self.config.kill_switch_topic);
                }
                Event::Incoming(Packet::Publish(publish)) => {
                    if self.handle_message(&publish.topic) {
                        let _ = client.disconnect().await;
                        return Ok(ListenerExit::Halted);
                    }
                }
                _ => {}
            }
        }
    }

    /// Idle until Ctrl-C, or until something else engages the switch.
    async fn listen_mock(&self) -> ListenerExit {
        info!("Kill Switch Listener Initialized (Mock Mode).");
        info!("Subscribed to topic: {}", self.config.kill_switch_topic);
        info!("Waiting for AGI HALT command... (Press Ctrl+C to stop)");

        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Listener stopped.");
                    return ListenerExit::Stopped;
                }
                _ = tick.tick() => {
                    if self.switch.is_engaged() {
                        return ListenerExit::Halted;
                    }
                }
            }
        }
    }
}
