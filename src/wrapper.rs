//! The transport wrapper contract every concrete MQTT driver satisfies.
//!
//! Entities never talk to a broker client directly; they see this trait. A
//! driver owns the listener registries, the topic dispatch map and the
//! outbound queue, so entity registrations survive a broken link.

use std::sync::Arc;

/// Delivery quality-of-service for a published message.
///
/// Mirrors the three MQTT levels without leaking a client crate into the
/// wrapper contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Invoked once per successful (re)connection; the flag is `false` on the
/// first connect and `true` thereafter.
pub type ConnectListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Invoked once per detected link loss, before any reconnect attempt begins.
pub type DisconnectListener = Arc<dyn Fn() + Send + Sync>;

/// Receives the payload of a message published to a subscribed topic.
pub type MessageCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The basic wrapper definition.
///
/// Listener and subscriber registration is additive: the same callback may be
/// added more than once and will be invoked that many times. More than one
/// callback **can** be subscribed to a topic; all subscribers are re-subscribed
/// automatically on reconnect.
pub trait MqttClientWrapper: Send + Sync {
    /// Add a callback for when the client is (re-)connected to the broker.
    fn add_connect_listener(&self, callback: ConnectListener);

    /// Add a callback for when the client is disconnected from the broker.
    fn add_disconnect_listener(&self, callback: DisconnectListener);

    /// Subscribe a callback to a topic. The first subscriber for a topic
    /// triggers a network-level subscribe; later ones only join the dispatch
    /// list.
    fn subscribe(&self, topic: &str, callback: MessageCallback);

    /// Queue a payload for publication. Does not block and does not report
    /// per-message failure; delivery problems surface as a
    /// disconnect/reconnect cycle visible to the listeners.
    fn publish(&self, topic: &str, payload: &str, retain: bool, qos: QoS);
}
