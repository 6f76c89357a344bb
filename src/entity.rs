//! The base every Home Assistant entity builds on: connection lifecycle,
//! discovery payload assembly, and command wiring.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumIter, EnumString};

use crate::device::DeviceIdentifier;
use crate::errors::Error;
use crate::wrapper::{MqttClientWrapper, QoS};

/// The default MQTT topic prefix -- you probably do not want to use it.
pub const DEFAULT_TOPIC_PREFIX: &str = "kobots_ha/mqtt";

/// Topic Home Assistant announces its own liveness on.
pub const HA_STATUS_TOPIC: &str = "homeassistant/status";

/// Payload on [`HA_STATUS_TOPIC`] that signals the hub is up; anything else
/// is treated as the hub going away.
const HA_ONLINE: &str = "online";

/// Home Assistant's category tag for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Component {
    Sensor,
    BinarySensor,
    Light,
    Switch,
    Number,
    Select,
    Text,
}

/// Capability for entities that take commands from Home Assistant.
///
/// Implementations are expected to trap their own failures: a malformed
/// payload should be logged and ignored, never panic. Any state change made
/// by [`handle_command`](CommandHandler::handle_command) must be visible to
/// the [`current_state`](CommandHandler::current_state) call that immediately
/// follows it, because the entity republishes state after every command.
pub trait CommandHandler: Send {
    /// Process a command. Blocks the transport loop until it returns, so keep
    /// it short.
    fn handle_command(&mut self, payload: &str);

    /// The current state in its "native" representation (e.g. `50.0`, not a
    /// display-formatted string). Defaults to "no state".
    fn current_state(&self) -> String {
        String::new()
    }

    /// Contribute extra discovery fields (e.g. select options, supported
    /// color modes).
    fn extend_discovery(&self, _discovery: &mut Map<String, Value>) {}
}

struct EntityInner {
    icon: String,
    topic_prefix: String,
    entity_category: &'static str,
    device_class: Option<String>,
    unit_of_measurement: Option<String>,
    extra_discovery: Map<String, Value>,
    handler: Option<Box<dyn CommandHandler>>,
    connected: bool,
    deleted: bool,
    client: Option<Arc<dyn MqttClientWrapper>>,
}

/// The base of every Home Assistant entity.
///
/// An `Entity` is a cheap-to-clone handle; clones share lifecycle state, so
/// the closures registered with the transport wrapper and the handle kept by
/// application code always agree on connection status.
///
/// Lifecycle: constructed (validated) → [`start`](Entity::start) →
/// optimistically connected → driven by transport events → optionally
/// [`remove`](Entity::remove), which is terminal. While disconnected or
/// removed, all sends are silent no-ops: an offline device must not grow an
/// unbounded outbound queue.
#[derive(Clone)]
pub struct Entity {
    component: Component,
    unique_id: String,
    name: String,
    device: DeviceIdentifier,
    inner: Arc<Mutex<EntityInner>>,
}

impl Entity {
    /// Make the thing. `unique_id` and `name` must be non-blank; `unique_id`
    /// must be system-wide unique.
    pub fn new(
        component: Component,
        unique_id: &str,
        name: &str,
        device: DeviceIdentifier,
    ) -> Result<Self, Error> {
        if unique_id.trim().is_empty() {
            return Err(Error::blank("unique_id"));
        }
        if name.trim().is_empty() {
            return Err(Error::blank("name"));
        }
        Ok(Self {
            component,
            unique_id: unique_id.to_string(),
            name: name.to_string(),
            device,
            inner: Arc::new(Mutex::new(EntityInner {
                icon: "mdi:devices".to_string(),
                topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
                entity_category: "config",
                device_class: None,
                unit_of_measurement: None,
                extra_discovery: Map::new(),
                handler: None,
                connected: false,
                deleted: false,
                client: None,
            })),
        })
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// The "friendly" (display) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &DeviceIdentifier {
        &self.device
    }

    pub fn icon(&self) -> String {
        self.inner.lock().unwrap().icon.clone()
    }

    /// Set the icon -- must be one of the "mdi:xxx" definitions HA supports.
    pub fn set_icon(&self, icon: &str) {
        self.inner.lock().unwrap().icon = icon.to_string();
    }

    pub fn topic_prefix(&self) -> String {
        self.inner.lock().unwrap().topic_prefix.clone()
    }

    /// Set the namespace segment prepended to the unique id for the state and
    /// command topics.
    pub fn set_topic_prefix(&self, prefix: &str) {
        self.inner.lock().unwrap().topic_prefix = prefix.to_string();
    }

    /// True if this entity thinks it is still talking to HA and has not been
    /// removed.
    pub fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected && !inner.deleted
    }

    /// The topic discovery payloads (and the removal tombstone) go to.
    pub fn discovery_topic(&self) -> String {
        discovery_topic(self.component, &self.unique_id)
    }

    /// The topic this entity reports state on.
    pub fn status_topic(&self) -> String {
        state_topic(&self.topic_prefix(), &self.unique_id)
    }

    /// The topic this entity listens to for commands, when it has a handler.
    pub fn command_topic(&self) -> String {
        command_topic(&self.topic_prefix(), &self.unique_id)
    }

    pub(crate) fn set_entity_category(&self, category: &'static str) {
        self.inner.lock().unwrap().entity_category = category;
    }

    pub(crate) fn set_device_class(&self, class: &str) {
        self.inner.lock().unwrap().device_class = Some(class.to_string());
    }

    pub(crate) fn set_unit_of_measurement(&self, unit: &str) {
        self.inner.lock().unwrap().unit_of_measurement = Some(unit.to_string());
    }

    pub(crate) fn add_discovery_field(&self, key: &str, value: Value) {
        self.inner
            .lock()
            .unwrap()
            .extra_discovery
            .insert(key.to_string(), value);
    }

    pub(crate) fn set_handler(&self, handler: Box<dyn CommandHandler>) {
        self.inner.lock().unwrap().handler = Some(handler);
    }

    /// "Starts" the entity: wires the lifecycle into the wrapper, then
    /// optimistically assumes the broker is reachable and announces itself.
    ///
    /// Registration order is part of the contract: the connect listener goes
    /// first, the HA status subscription second, and -- for command-enabled
    /// entities -- the command subscription is in place before the first
    /// discovery payload is published.
    pub fn start(&self, wrapper: Arc<dyn MqttClientWrapper>) {
        let on_connect = self.clone();
        wrapper.add_connect_listener(Arc::new(move |reconnect| {
            info!(
                "Connecting '{}' - reconnect {}",
                on_connect.unique_id, reconnect
            );
            on_connect.redo_connection();
        }));

        let on_status = self.clone();
        wrapper.subscribe(
            HA_STATUS_TOPIC,
            Arc::new(move |message| {
                if message == HA_ONLINE {
                    on_status.redo_connection();
                } else {
                    on_status.mark_disconnected();
                }
            }),
        );

        let on_disconnect = self.clone();
        wrapper.add_disconnect_listener(Arc::new(move || on_disconnect.mark_disconnected()));

        // if there's a handler, wire it in
        let has_handler = self.inner.lock().unwrap().handler.is_some();
        if has_handler {
            let on_command = self.clone();
            wrapper.subscribe(
                &self.command_topic(),
                Arc::new(move |payload| on_command.dispatch_command(payload)),
            );
        }

        self.inner.lock().unwrap().client = Some(wrapper);

        // assume ready to go
        self.redo_connection();
    }

    /// Reset the connection state and re-send discovery.
    pub fn redo_connection(&self) {
        self.inner.lock().unwrap().connected = true;
        self.send_discovery();
    }

    fn mark_disconnected(&self) {
        self.inner.lock().unwrap().connected = false;
    }

    /// Run the command through the handler, then republish state. The
    /// republish is deliberate and unconditional so handlers never have to
    /// remember to report back.
    fn dispatch_command(&self, payload: &str) {
        let state = {
            let mut inner = self.inner.lock().unwrap();
            match inner.handler.as_mut() {
                Some(handler) => {
                    handler.handle_command(payload);
                    Some(handler.current_state())
                }
                None => None,
            }
        };
        if let Some(state) = state {
            self.send_state(&state);
        }
    }

    /// The ready-to-publish auto-discovery descriptor.
    pub fn discovery(&self) -> Value {
        let inner = self.inner.lock().unwrap();
        let mut disco = Map::new();
        disco.insert(
            "device".to_string(),
            self.device.as_discovery(&self.unique_id),
        );
        disco.insert(
            "entity_category".to_string(),
            Value::from(inner.entity_category),
        );
        disco.insert("icon".to_string(), Value::from(inner.icon.as_str()));
        disco.insert("name".to_string(), Value::from(self.name.as_str()));
        disco.insert("schema".to_string(), Value::from("json"));
        disco.insert(
            "state_topic".to_string(),
            Value::from(state_topic(&inner.topic_prefix, &self.unique_id)),
        );
        disco.insert(
            "unique_id".to_string(),
            Value::from(self.unique_id.as_str()),
        );

        if inner.handler.is_some() {
            disco.insert(
                "command_topic".to_string(),
                Value::from(command_topic(&inner.topic_prefix, &self.unique_id)),
            );
        }

        // a recognized device class drives HA's own icon/unit handling
        if let Some(class) = &inner.device_class {
            disco.remove("icon");
            disco.insert("device_class".to_string(), Value::from(class.as_str()));
        }
        if let Some(unit) = &inner.unit_of_measurement {
            disco.insert(
                "unit_of_measurement".to_string(),
                Value::from(unit.as_str()),
            );
        }

        for (key, value) in &inner.extra_discovery {
            disco.insert(key.clone(), value.clone());
        }
        if let Some(handler) = &inner.handler {
            handler.extend_discovery(&mut disco);
        }
        Value::Object(disco)
    }

    /// Send the auto-discovery payload, if connected. Does **not** error if
    /// not.
    pub fn send_discovery(&self) {
        if !self.is_connected() {
            debug!("Not connected, skipping discovery for '{}'", self.unique_id);
            return;
        }
        let payload = self.discovery().to_string();
        info!("Sending discovery for '{}'", self.unique_id);
        self.publish(&self.discovery_topic(), &payload);
    }

    /// Send the handler's current state, if connected and a handler exists.
    pub fn send_current_state(&self) {
        let state = {
            let inner = self.inner.lock().unwrap();
            inner.handler.as_ref().map(|h| h.current_state())
        };
        match state {
            Some(state) => self.send_state(&state),
            None => debug!("'{}' has no handler state to send", self.unique_id),
        }
    }

    /// Send an explicit state value, if connected. Does **not** error if not.
    pub fn send_state(&self, state: &str) {
        if !self.is_connected() {
            debug!("Not connected, skipping state for '{}'", self.unique_id);
            return;
        }
        self.publish(&self.status_topic(), state);
    }

    /// Remove the entity from HA by publishing an empty discovery payload,
    /// then mark it deleted. Terminal and idempotent: once deleted, no
    /// further transport traffic is attempted.
    pub fn remove(&self) {
        if self.is_connected() {
            warn!("Removing entity '{}'", self.unique_id);
            self.publish(&self.discovery_topic(), "");
        }
        self.inner.lock().unwrap().deleted = true;
    }

    fn publish(&self, topic: &str, payload: &str) {
        let client = self.inner.lock().unwrap().client.clone();
        if let Some(client) = client {
            client.publish(topic, payload, false, QoS::AtMostOnce);
        }
    }
}

fn discovery_topic(component: Component, unique_id: &str) -> String {
    format!("homeassistant/{component}/{unique_id}/config")
}

fn state_topic(prefix: &str, unique_id: &str) -> String {
    format!("{prefix}/{unique_id}/state")
}

fn command_topic(prefix: &str, unique_id: &str) -> String {
    format!("{prefix}/{unique_id}/set")
}
