//! Report a (fake) temperature to Home Assistant every few seconds.
//!
//! This example demonstrates:
//! - An analog sensor with a device class and unit
//! - Broker settings pulled from `HAMM_*` environment variables
//!
//! Run with: HAMM_BROKER=homeassistant.local cargo run --example thermometer

use std::sync::Arc;
use std::time::Duration;

use ha_entities::{AnalogDevice, AnalogSensor, DeviceIdentifier, MqttConfig, TokioMqttClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let device = DeviceIdentifier::new("Kobots", "thermometer-demo")?;
    let sensor = AnalogSensor::new("demo_temp", "Demo Temperature", device)?
        .with_device_class(AnalogDevice::Temperature)
        .with_unit_of_measurement("°C")
        .with_suggested_precision(1);

    let client = Arc::new(TokioMqttClient::new(MqttConfig::from_env()?));
    client.start().await?;
    sensor.start(client.clone());

    // wander around room temperature
    let mut reading: f64 = 21.0;
    let mut up = true;
    loop {
        tokio::time::sleep(Duration::from_secs(10)).await;
        reading += if up { 0.3 } else { -0.3 };
        if reading > 24.0 || reading < 18.0 {
            up = !up;
        }
        println!("Reporting {reading:.1}°C");
        sensor.set_current_state((reading * 10.0).round() / 10.0);
    }
}
