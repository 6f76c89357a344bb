//! A tokio/rumqttc implementation of the wrapper contract.
//!
//! One instance owns one broker connection plus the registries that must
//! survive it: connect/disconnect listeners, the topic dispatch map, and the
//! outbound queue. The connected loop runs as a background task; entity
//! callbacks execute synchronously on that task, so handlers are expected to
//! be short.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, error, info};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions};

use crate::config::MqttConfig;
use crate::errors::Error;
use crate::wrapper::{
    ConnectListener, DisconnectListener, MessageCallback, MqttClientWrapper, QoS,
};

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
struct QueuedMessage {
    topic: String,
    payload: String,
    retain: bool,
    qos: QoS,
}

/// Registries and queue shared between the public handle and the loop task.
#[derive(Default)]
struct Shared {
    connect_listeners: Mutex<Vec<ConnectListener>>,
    disconnect_listeners: Mutex<Vec<DisconnectListener>>,
    subscribers: Mutex<HashMap<String, Vec<MessageCallback>>>,
    queue: Mutex<Vec<QueuedMessage>>,
    link: Mutex<Option<AsyncClient>>,
}

impl Shared {
    /// Atomically snapshot and clear the outbound queue. Publishes that
    /// arrive during a drain land in the next iteration's batch, in strict
    /// enqueue (FIFO) order.
    fn take_queue(&self) -> Vec<QueuedMessage> {
        std::mem::take(&mut *self.queue.lock().unwrap())
    }

    /// Put an unsent remainder back at the head of the queue, ahead of
    /// anything published since the snapshot, preserving FIFO order.
    fn requeue_front(&self, mut pending: Vec<QueuedMessage>) {
        let mut queue = self.queue.lock().unwrap();
        pending.append(&mut queue);
        *queue = pending;
    }

    fn notify_connect(&self, reconnect: bool) {
        let listeners = self.connect_listeners.lock().unwrap().clone();
        for listener in listeners {
            listener(reconnect);
        }
    }

    fn notify_disconnect(&self) {
        let listeners = self.disconnect_listeners.lock().unwrap().clone();
        for listener in listeners {
            listener();
        }
    }

    /// Dispatch an inbound message to a snapshot of the topic's subscribers.
    /// Re-subscription during dispatch never affects the in-flight pass.
    fn dispatch(&self, topic: &str, payload: &str) {
        let snapshot = self.subscribers.lock().unwrap().get(topic).cloned();
        match snapshot {
            Some(subscribers) => {
                for subscriber in subscribers {
                    subscriber(payload);
                }
            }
            None => debug!("No subscribers for '{topic}', dropping"),
        }
    }

    fn subscribed_topics(&self) -> Vec<String> {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, callbacks)| !callbacks.is_empty())
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}

/// MQTT client wrapper driven by a background tokio task.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use ha_entities::{MqttConfig, TokioMqttClient};
///
/// let client = Arc::new(TokioMqttClient::new(MqttConfig::from_env()?));
/// client.start().await?;
/// entity.start(client.clone());
/// ```
pub struct TokioMqttClient {
    config: MqttConfig,
    shared: Arc<Shared>,
}

impl TokioMqttClient {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Connect to the broker and launch the connected loop.
    ///
    /// Blocks (retrying indefinitely) until the broker acknowledges the
    /// connection, then returns; the loop itself runs as a background task
    /// and never exits under normal operation.
    pub async fn start(&self) -> Result<()> {
        let client_id = if self.config.client_id.is_empty() {
            format!("ha-entities-{}", std::process::id())
        } else {
            self.config.client_id.clone()
        };
        debug!(
            "Create MQTT client {}:{}",
            self.config.broker, self.config.port
        );
        let mut options = MqttOptions::new(client_id, &self.config.broker, self.config.port);
        options.set_keep_alive(std::time::Duration::from_secs(30));
        if let Some((username, password)) = &self.config.credentials {
            options.set_credentials(username, password);
        }

        let (client, mut event_loop) = AsyncClient::new(options, 32);
        *self.shared.link.lock().unwrap() = Some(client.clone());

        // block until the broker acknowledges us
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT connect failed: {e}, retrying");
                    tokio::time::sleep(self.config.reconnect_wait).await;
                }
            }
        }
        info!("MQTT connected");

        let shared = Arc::clone(&self.shared);
        let loop_client = client.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            run_loop(shared, loop_client, event_loop, config).await;
        });

        // anything registered before start() needs its network subscription;
        // the loop is already polling, so the bounded request channel keeps
        // draining no matter how many topics there are
        for topic in self.shared.subscribed_topics() {
            client
                .subscribe(&topic, rumqttc::QoS::AtMostOnce)
                .await
                .map_err(|e| Error::transport("subscribe", e))?;
        }
        self.shared.notify_connect(false);
        Ok(())
    }
}

/// The connected loop: drain the queue, service I/O for a bounded step,
/// sleep; on a transport error notify disconnect listeners once, wait out
/// the backoff, and on the next CONNACK re-subscribe everything and notify
/// connect listeners with `reconnect=true`.
async fn run_loop(
    shared: Arc<Shared>,
    client: AsyncClient,
    mut event_loop: rumqttc::EventLoop,
    config: MqttConfig,
) {
    let mut connected = true;
    loop {
        if connected {
            drain_outbound(&shared, &client);
        }

        match tokio::time::timeout(config.loop_timeout, event_loop.poll()).await {
            // nothing to service this step
            Err(_elapsed) => {}
            Ok(Ok(Event::Incoming(Incoming::Publish(publish)))) => {
                let payload = String::from_utf8_lossy(&publish.payload);
                debug!("New message on topic {}: {}", publish.topic, payload);
                shared.dispatch(&publish.topic, &payload);
            }
            Ok(Ok(Event::Incoming(Incoming::ConnAck(_)))) => {
                info!("MQTT reconnected");
                for topic in shared.subscribed_topics() {
                    if let Err(e) = client.try_subscribe(&topic, rumqttc::QoS::AtMostOnce) {
                        error!("Failed to re-subscribe '{topic}': {e}");
                    }
                }
                shared.notify_connect(true);
                connected = true;
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                error!("MQTT connection lost: {e}");
                if connected {
                    shared.notify_disconnect();
                    connected = false;
                }
                tokio::time::sleep(config.reconnect_wait).await;
            }
        }

        tokio::time::sleep(config.loop_sleep).await;
    }
}

impl MqttClientWrapper for TokioMqttClient {
    fn add_connect_listener(&self, callback: ConnectListener) {
        self.shared.connect_listeners.lock().unwrap().push(callback);
    }

    fn add_disconnect_listener(&self, callback: DisconnectListener) {
        self.shared
            .disconnect_listeners
            .lock()
            .unwrap()
            .push(callback);
    }

    fn subscribe(&self, topic: &str, callback: MessageCallback) {
        let needs_network_sub = {
            let mut subscribers = self.shared.subscribers.lock().unwrap();
            let callbacks = subscribers.entry(topic.to_string()).or_default();
            debug!("Adding sub to {topic} of {}", callbacks.len());
            callbacks.push(callback);
            callbacks.len() == 1
        };

        // only the first subscriber for a topic costs a network subscribe
        if needs_network_sub {
            let link = self.shared.link.lock().unwrap().clone();
            if let Some(client) = link {
                info!("Subscribing to '{topic}'");
                if let Err(e) = client.try_subscribe(topic, rumqttc::QoS::AtMostOnce) {
                    error!("Failed to subscribe '{topic}': {e}");
                }
            }
        }
    }

    fn publish(&self, topic: &str, payload: &str, retain: bool, qos: QoS) {
        debug!("Appending '{topic}: {payload}'");
        self.shared.queue.lock().unwrap().push(QueuedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
            qos,
        });
    }
}

/// Hand queued messages to the client without blocking the loop. The
/// client's request channel is bounded and only `poll()` empties it, so a
/// blocking `publish().await` here could wedge the loop on a large burst.
/// Instead, stop at the first refusal and put the remainder back at the
/// head of the queue for the next iteration, after `poll()` has had a turn.
fn drain_outbound(shared: &Shared, client: &AsyncClient) {
    let mut pending = shared.take_queue();
    let mut sent = 0;
    for message in &pending {
        match client.try_publish(
            &message.topic,
            map_qos(message.qos),
            message.retain,
            message.payload.clone(),
        ) {
            Ok(()) => {
                debug!("Pub to {}: {}", message.topic, message.payload);
                sent += 1;
            }
            Err(e) => {
                debug!(
                    "Client busy ({e}), deferring {} publishes",
                    pending.len() - sent
                );
                break;
            }
        }
    }
    pending.drain(..sent);
    if !pending.is_empty() {
        shared.requeue_front(pending);
    }
}

fn map_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use super::*;

    #[test]
    fn test_queue_drains_in_fifo_order() {
        let client = TokioMqttClient::new(MqttConfig::new("unused"));
        client.publish("t/1", "first", false, QoS::AtMostOnce);
        client.publish("t/2", "second", true, QoS::AtLeastOnce);
        client.publish("t/1", "third", false, QoS::AtMostOnce);

        let batch = client.shared.take_queue();
        let payloads: Vec<&str> = batch.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, vec!["first", "second", "third"]);
        assert!(batch[1].retain);

        // the drain cleared the queue
        assert!(client.shared.take_queue().is_empty());
    }

    #[test]
    fn test_burst_defers_instead_of_blocking() {
        // a client whose request channel fills well before the burst ends;
        // nothing polls it, so publishes past capacity are refused
        let (client, _event_loop) =
            AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 2);

        let shared = Shared::default();
        for i in 0..40 {
            shared.queue.lock().unwrap().push(QueuedMessage {
                topic: format!("t/{i:02}"),
                payload: "x".to_string(),
                retain: false,
                qos: QoS::AtMostOnce,
            });
        }

        // must return rather than wait for channel capacity
        drain_outbound(&shared, &client);

        let queue = shared.queue.lock().unwrap();
        assert!(!queue.is_empty(), "nothing was deferred");
        assert!(queue.len() < 40, "nothing was sent");
        // the deferred remainder is the unsent tail, still in FIFO order
        let first_unsent = 40 - queue.len();
        for (offset, message) in queue.iter().enumerate() {
            assert_eq!(message.topic, format!("t/{:02}", first_unsent + offset));
        }
    }

    #[test]
    fn test_requeue_front_keeps_fifo_order() {
        let client = TokioMqttClient::new(MqttConfig::new("unused"));
        client.publish("t/1", "first", false, QoS::AtMostOnce);
        client.publish("t/2", "second", false, QoS::AtMostOnce);
        client.publish("t/3", "third", false, QoS::AtMostOnce);

        let mut pending = client.shared.take_queue();
        // first message went out; a new publish lands mid-drain
        pending.remove(0);
        client.publish("t/4", "fourth", false, QoS::AtMostOnce);
        client.shared.requeue_front(pending);

        let payloads: Vec<String> = client
            .shared
            .take_queue()
            .into_iter()
            .map(|m| m.payload)
            .collect();
        assert_eq!(payloads, vec!["second", "third", "fourth"]);
    }

    #[test]
    fn test_dispatch_in_subscription_order() {
        let client = TokioMqttClient::new(MqttConfig::new("unused"));
        let seen = Arc::new(StdMutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            client.subscribe(
                "some/topic",
                Arc::new(move |payload: &str| {
                    seen.lock().unwrap().push(format!("{tag}:{payload}"));
                }),
            );
        }

        client.shared.dispatch("some/topic", "hi");
        assert_eq!(*seen.lock().unwrap(), vec!["a:hi", "b:hi"]);
    }

    #[test]
    fn test_unknown_topic_dropped() {
        let client = TokioMqttClient::new(MqttConfig::new("unused"));
        // nothing registered; must not panic
        client.shared.dispatch("nobody/home", "hello?");
    }

    #[test]
    fn test_reentrant_subscribe_misses_inflight_dispatch() {
        let client = Arc::new(TokioMqttClient::new(MqttConfig::new("unused")));
        let late_calls = Arc::new(StdMutex::new(0usize));

        let reentrant = Arc::clone(&client);
        let late = Arc::clone(&late_calls);
        client.subscribe(
            "some/topic",
            Arc::new(move |_payload: &str| {
                let late = Arc::clone(&late);
                reentrant.subscribe(
                    "some/topic",
                    Arc::new(move |_p: &str| {
                        *late.lock().unwrap() += 1;
                    }),
                );
            }),
        );

        client.shared.dispatch("some/topic", "once");
        assert_eq!(*late_calls.lock().unwrap(), 0);

        client.shared.dispatch("some/topic", "twice");
        assert_eq!(*late_calls.lock().unwrap(), 1);
    }
}
