//! A numeric entity the hub can set, within bounds.

use std::ops::Deref;

use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString};

use crate::device::DeviceIdentifier;
use crate::entity::{CommandHandler, Component, Entity};
use crate::errors::Error;

/// Device classes for settable numbers. Mostly overlaps the analog sensor
/// list, minus the read-only oddities (dates, enums, timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum NumericDevice {
    ApparentPower,
    Aqi,
    AtmosphericPressure,
    Battery,
    CarbonMonoxide,
    CarbonDioxide,
    Current,
    DataRate,
    DataSize,
    Distance,
    Duration,
    Energy,
    EnergyStorage,
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
    VolatileOrganicCompounds,
    VolatileOrganicCompoundsParts,
    Voltage,
    Volume,
    VolumeStorage,
    Water,
    Weight,
    WindSpeed,
}

/// How the hub renders the input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum NumberDisplayMode {
    #[default]
    Auto,
    Box,
    Slider,
}

/// A number that can be set from the hub. Commands arrive as the plain
/// decimal text of the requested value; the handler decides what to do
/// with it.
pub struct NumberEntity {
    entity: Entity,
}

impl NumberEntity {
    pub fn new(
        unique_id: &str,
        name: &str,
        device: DeviceIdentifier,
        handler: impl CommandHandler + 'static,
    ) -> Result<Self, Error> {
        let entity = Entity::new(Component::Number, unique_id, name, device)?;
        entity.set_icon("mdi:numeric");
        entity.set_handler(Box::new(handler));
        entity.add_discovery_field("min", Value::from(1.0));
        entity.add_discovery_field("max", Value::from(100.0));
        entity.add_discovery_field("step", Value::from(1.0));
        entity.add_discovery_field("mode", Value::from(NumberDisplayMode::Auto.to_string()));
        Ok(Self { entity })
    }

    pub fn with_range(self, min: f64, max: f64) -> Result<Self, Error> {
        if min >= max {
            return Err(Error::invalid("range", "min must be less than max"));
        }
        self.entity.add_discovery_field("min", Value::from(min));
        self.entity.add_discovery_field("max", Value::from(max));
        Ok(self)
    }

    pub fn with_step(self, step: f64) -> Result<Self, Error> {
        if step <= 0.0 {
            return Err(Error::invalid("step", "must be positive"));
        }
        self.entity.add_discovery_field("step", Value::from(step));
        Ok(self)
    }

    pub fn with_mode(self, mode: NumberDisplayMode) -> Self {
        self.entity
            .add_discovery_field("mode", Value::from(mode.to_string()));
        self
    }

    pub fn with_device_class(self, class: NumericDevice) -> Self {
        self.entity.set_device_class(&class.to_string());
        self
    }

    pub fn with_unit_of_measurement(self, unit: &str) -> Self {
        self.entity.set_unit_of_measurement(unit);
        self
    }
}

impl Deref for NumberEntity {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrapper::testing::RecordingWrapper;

    struct Knob {
        value: f64,
    }

    impl CommandHandler for Knob {
        fn handle_command(&mut self, payload: &str) {
            if let Ok(v) = payload.parse() {
                self.value = v;
            }
        }

        fn current_state(&self) -> String {
            self.value.to_string()
        }
    }

    fn knob_entity() -> NumberEntity {
        let device = DeviceIdentifier::with_identifier("Kobots", "tests", "unit").unwrap();
        NumberEntity::new("id3", "Knob", device, Knob { value: 0.0 }).unwrap()
    }

    #[test]
    fn test_default_discovery() {
        let number = knob_entity();
        let disco = number.discovery();
        assert_eq!(disco["min"], 1.0);
        assert_eq!(disco["max"], 100.0);
        assert_eq!(disco["step"], 1.0);
        assert_eq!(disco["mode"], "auto");
        assert_eq!(disco["icon"], "mdi:numeric");
        assert_eq!(disco["command_topic"], "kobots_ha/mqtt/id3/set");
    }

    #[test]
    fn test_builder_overrides() {
        let number = knob_entity()
            .with_range(0.0, 255.0)
            .unwrap()
            .with_step(0.5)
            .unwrap()
            .with_mode(NumberDisplayMode::Slider);
        let disco = number.discovery();
        assert_eq!(disco["min"], 0.0);
        assert_eq!(disco["max"], 255.0);
        assert_eq!(disco["step"], 0.5);
        assert_eq!(disco["mode"], "slider");
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(knob_entity().with_range(10.0, 10.0).is_err());
        assert!(knob_entity().with_step(0.0).is_err());
    }

    #[test]
    fn test_command_republishes_state() {
        let number = knob_entity();
        let wrapper = RecordingWrapper::new();
        number.start(wrapper.clone());
        wrapper.clear();

        wrapper.deliver("kobots_ha/mqtt/id3/set", "42");
        let publishes = wrapper.publishes();
        assert_eq!(publishes.len(), 1);
        assert_eq!(publishes[0].0, "kobots_ha/mqtt/id3/state");
        assert_eq!(publishes[0].1, "42");
    }
}
