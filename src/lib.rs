//! # ha_entities
//!
//! An async Rust library for exposing device entities to Home Assistant
//! over MQTT, using HA's
//! [discovery mechanism](https://www.home-assistant.io/integrations/mqtt/#mqtt-discovery)
//! so entities show up on the hub without any YAML.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use ha_entities::{AnalogDevice, AnalogSensor, DeviceIdentifier, MqttConfig, TokioMqttClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Describe the physical thing this process runs on
//!     let device = DeviceIdentifier::new("Kobots", "thermo-widget")?;
//!
//!     let sensor = AnalogSensor::new("office_temp", "Office Temperature", device)?
//!         .with_device_class(AnalogDevice::Temperature)
//!         .with_unit_of_measurement("°C");
//!
//!     // Connect and register; HA discovers the entity on connect
//!     let client = Arc::new(TokioMqttClient::new(MqttConfig::new("homeassistant.local")));
//!     client.start().await?;
//!     sensor.start(client.clone());
//!
//!     sensor.set_current_state(20.5);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Auto-discovery**: Entities publish their own HA discovery payloads
//! - **Sensors**: On/off reporting with [`BinarySensor`], numeric readings
//!   with [`AnalogSensor`]
//! - **Commandable entities**: [`NumberEntity`], [`SelectEntity`],
//!   [`SwitchEntity`], [`TextEntity`] wire hub commands to a
//!   [`CommandHandler`] and republish state automatically
//! - **Lights**: JSON-schema lights via [`LightEntity`], from plain on/off
//!   up to RGB with effects ([`LightHandler`], [`RgbAdapter`])
//! - **Reconnect handling**: entities re-announce themselves when the
//!   broker connection or the hub itself bounces
//! - **Pluggable transport**: everything runs against the
//!   [`MqttClientWrapper`] trait; [`TokioMqttClient`] is the bundled
//!   tokio + rumqttc implementation
//!
//! ## Topics
//!
//! Discovery goes to `homeassistant/<component>/<id>/config`. State and
//! command topics default to under `kobots_ha/mqtt`; set your own prefix
//! with [`Entity::set_topic_prefix`].

mod client;
pub mod color;
mod config;
mod device;
mod entity;
mod errors;
mod light;
mod number;
mod select;
mod sensor;
mod switch;
mod text;
mod wrapper;

// Re-export public API
pub use client::TokioMqttClient;
pub use config::MqttConfig;
pub use device::DeviceIdentifier;
pub use entity::{CommandHandler, Component, DEFAULT_TOPIC_PREFIX, Entity, HA_STATUS_TOPIC};
pub use errors::Error;
pub use light::{
    ColorMode, LightControl, LightEntity, LightHandler, RgbAdapter, RgbColor, RgbControl,
};
pub use number::{NumberDisplayMode, NumberEntity, NumericDevice};
pub use select::{SelectEntity, SelectHandler};
pub use sensor::{AnalogDevice, AnalogSensor, BinaryDevice, BinarySensor, StateClass};
pub use switch::SwitchEntity;
pub use text::TextEntity;
pub use wrapper::{ConnectListener, DisconnectListener, MessageCallback, MqttClientWrapper, QoS};
