//! Basic "sensor" definitions -- either on/off or send a number.

use std::ops::Deref;

use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString};

use crate::device::DeviceIdentifier;
use crate::entity::{Component, Entity};
use crate::errors::Error;

/// The binary (on/off) device classes Home Assistant recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BinaryDevice {
    Battery,
    BatteryCharging,
    CarbonMonoxide,
    Cold,
    Connectivity,
    Door,
    GarageDoor,
    Gas,
    Heat,
    Light,
    Lock,
    Moisture,
    Motion,
    Moving,
    Occupancy,
    Opening,
    Plug,
    Power,
    Presence,
    Problem,
    Running,
    Safety,
    Smoke,
    Sound,
    Tamper,
    Update,
    Vibration,
    Window,
}

/// How analog data is accumulated/graphed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum StateClass {
    Measurement,
    Total,
    TotalIncreasing,
}

/// The various things Home Assistant knows about for numeric sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum AnalogDevice {
    ApparentPower,
    Aqi,
    AtmosphericPressure,
    Battery,
    CarbonMonoxide,
    CarbonDioxide,
    Current,
    DataRate,
    DataSize,
    Date,
    Distance,
    Duration,
    Energy,
    EnergyStorage,
    Enum,
    Frequency,
    Gas,
    Humidity,
    Illuminance,
    Irradiance,
    Moisture,
    Monetary,
    NitrogenDioxide,
    NitrogenMonoxide,
    NitrousOxide,
    Ozone,
    Ph,
    Pm1,
    Pm10,
    Pm25,
    PowerFactor,
    Power,
    Precipitation,
    PrecipitationIntensity,
    Pressure,
    ReactivePower,
    SignalStrength,
    SoundPressure,
    Speed,
    SulphurDioxide,
    Temperature,
    Timestamp,
    VolatileOrganicCompounds,
    VolatileOrganicCompoundsParts,
    Voltage,
    Volume,
    VolumeStorage,
    Water,
    Weight,
    WindSpeed,
}

/// An on/off sensor. The component is `binary_sensor`; states are reported
/// as `ON`/`OFF` and the entity category is `diagnostic`.
pub struct BinarySensor {
    entity: Entity,
}

impl BinarySensor {
    pub fn new(unique_id: &str, name: &str, device: DeviceIdentifier) -> Result<Self, Error> {
        let entity = Entity::new(Component::BinarySensor, unique_id, name, device)?;
        entity.set_icon("mdi:door");
        entity.set_entity_category("diagnostic");
        Ok(Self { entity })
    }

    pub fn with_device_class(self, class: BinaryDevice) -> Self {
        self.entity.set_device_class(&class.to_string());
        self
    }

    /// Time in seconds after which the hub considers a reading expired;
    /// minimum 1.
    pub fn with_expires(self, seconds: u32) -> Result<Self, Error> {
        if seconds < 1 {
            return Err(Error::invalid("expires", "must be >= 1 second"));
        }
        self.entity
            .add_discovery_field("expire_after", Value::from(seconds));
        Ok(self)
    }

    /// Delay in seconds after which the hub flips an `ON` report back to
    /// `OFF`; minimum 1.
    pub fn with_off_delay(self, seconds: u32) -> Result<Self, Error> {
        if seconds < 1 {
            return Err(Error::invalid("off_delay", "must be >= 1 second"));
        }
        self.entity
            .add_discovery_field("off_delay", Value::from(seconds));
        Ok(self)
    }

    /// Set and send the current state.
    pub fn set_current_state(&self, on: bool) {
        self.entity.send_state(if on { "ON" } else { "OFF" });
    }

    /// Set and send the current state from text; must be `ON`/`OFF`
    /// (case-insensitive).
    pub fn set_current_state_text(&self, value: &str) -> Result<(), Error> {
        match value.to_uppercase().as_str() {
            "ON" => self.set_current_state(true),
            "OFF" => self.set_current_state(false),
            other => return Err(Error::invalid("state", format!("'{other}' must be ON or OFF"))),
        }
        Ok(())
    }
}

impl Deref for BinarySensor {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}

/// Sends variable numeric data, typically on a schedule or when "triggered"
/// by a change. The component is `sensor`.
pub struct AnalogSensor {
    entity: Entity,
}

impl AnalogSensor {
    pub fn new(unique_id: &str, name: &str, device: DeviceIdentifier) -> Result<Self, Error> {
        let entity = Entity::new(Component::Sensor, unique_id, name, device)?;
        entity.set_icon("mdi:gauge");
        entity.set_entity_category("diagnostic");
        Ok(Self { entity })
    }

    /// Note: when a device class is used, the unit of measurement must match
    /// what HA expects for that class.
    pub fn with_device_class(self, class: AnalogDevice) -> Self {
        self.entity.set_device_class(&class.to_string());
        self
    }

    pub fn with_unit_of_measurement(self, unit: &str) -> Self {
        self.entity.set_unit_of_measurement(unit);
        self
    }

    pub fn with_state_class(self, class: StateClass) -> Self {
        self.entity
            .add_discovery_field("state_class", Value::from(class.to_string()));
        self
    }

    pub fn with_expires(self, seconds: u32) -> Result<Self, Error> {
        if seconds < 1 {
            return Err(Error::invalid("expires", "must be >= 1 second"));
        }
        self.entity
            .add_discovery_field("expire_after", Value::from(seconds));
        Ok(self)
    }

    pub fn with_suggested_precision(self, digits: u32) -> Self {
        self.entity
            .add_discovery_field("suggested_display_precision", Value::from(digits));
        self
    }

    /// Set and send the current reading.
    pub fn set_current_state(&self, value: f64) {
        self.entity.send_state(&value.to_string());
    }
}

impl Deref for AnalogSensor {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::wrapper::testing::RecordingWrapper;

    fn test_device() -> DeviceIdentifier {
        DeviceIdentifier::with_identifier("Kobots", "tests", "unit").unwrap()
    }

    #[test]
    fn test_device_class_strings() {
        assert_eq!(BinaryDevice::GarageDoor.to_string(), "garage_door");
        assert_eq!(AnalogDevice::AtmosphericPressure.to_string(), "atmospheric_pressure");
        assert_eq!(AnalogDevice::Pm25.to_string(), "pm25");
        assert_eq!(StateClass::TotalIncreasing.to_string(), "total_increasing");
    }

    #[test]
    fn test_unknown_class_string_rejected() {
        assert!(AnalogDevice::from_str("volume").is_ok());
        assert!(AnalogDevice::from_str("warp_flux").is_err());
        assert!(BinaryDevice::from_str("door").is_ok());
        assert!(BinaryDevice::from_str("revolving_door").is_err());
    }

    #[test]
    fn test_analog_discovery() {
        let sensor = AnalogSensor::new("id2", "AS", test_device())
            .unwrap()
            .with_device_class(AnalogDevice::Temperature)
            .with_unit_of_measurement("°C")
            .with_state_class(StateClass::Measurement);
        let wrapper = RecordingWrapper::new();
        sensor.start(wrapper.clone());
        wrapper.clear();

        wrapper.fire_connect(false);
        let publishes = wrapper.publishes();
        assert_eq!(publishes.len(), 1);
        assert_eq!(publishes[0].0, "homeassistant/sensor/id2/config");

        let disco: serde_json::Value = serde_json::from_str(&publishes[0].1).unwrap();
        assert_eq!(disco["device"]["model"], "tests");
        assert_eq!(disco["device"]["manufacturer"], "Kobots");
        assert_eq!(disco["entity_category"], "diagnostic");
        assert_eq!(disco["device_class"], "temperature");
        assert_eq!(disco["unit_of_measurement"], "°C");
        assert_eq!(disco["state_class"], "measurement");
        assert!(disco.get("icon").is_none());
        assert!(disco.get("command_topic").is_none());
    }

    #[test]
    fn test_analog_state_publish() {
        let sensor = AnalogSensor::new("id2", "AS", test_device()).unwrap();
        let wrapper = RecordingWrapper::new();
        sensor.start(wrapper.clone());
        wrapper.clear();

        sensor.set_current_state(50.5);
        let publishes = wrapper.publishes();
        assert_eq!(publishes.len(), 1);
        assert_eq!(publishes[0].0, "kobots_ha/mqtt/id2/state");
        assert_eq!(publishes[0].1, "50.5");
    }

    #[test]
    fn test_binary_state_values() {
        let sensor = BinarySensor::new("id1", "BS", test_device()).unwrap();
        let wrapper = RecordingWrapper::new();
        sensor.start(wrapper.clone());
        wrapper.clear();

        sensor.set_current_state(true);
        sensor.set_current_state_text("off").unwrap();
        let publishes = wrapper.publishes();
        assert_eq!(publishes[0].1, "ON");
        assert_eq!(publishes[1].1, "OFF");

        assert!(sensor.set_current_state_text("sideways").is_err());
    }

    #[test]
    fn test_binary_extras() {
        let sensor = BinarySensor::new("id1", "BS", test_device())
            .unwrap()
            .with_device_class(BinaryDevice::Battery)
            .with_off_delay(5)
            .unwrap();
        let disco = sensor.discovery();
        assert_eq!(disco["off_delay"], 5);
        assert_eq!(disco["device_class"], "battery");

        assert!(
            BinarySensor::new("id1", "BS", test_device())
                .unwrap()
                .with_off_delay(0)
                .is_err()
        );
    }
}
