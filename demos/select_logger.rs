//! Expose a drop-down "select" to Home Assistant and log whatever option
//! gets picked on the hub.
//!
//! This example demonstrates:
//! - Wiring a `SelectHandler` to a `SelectEntity`
//! - Connecting with `TokioMqttClient` and letting discovery do its thing
//!
//! Run with: cargo run --example select_logger -- --broker homeassistant.local

use std::sync::Arc;

use clap::Parser;
use ha_entities::{DeviceIdentifier, MqttConfig, SelectEntity, SelectHandler, TokioMqttClient};

#[derive(Parser)]
struct Args {
    /// Broker host name or address
    #[arg(long, default_value = "localhost")]
    broker: String,

    /// Broker port
    #[arg(long, default_value_t = 1883)]
    port: u16,
}

struct LoggingSelect;

impl SelectHandler for LoggingSelect {
    fn options(&self) -> Vec<String> {
        ["First", "Second", "Third"]
            .iter()
            .map(|o| o.to_string())
            .collect()
    }

    fn execute_option(&mut self, option: &str) {
        println!("Hub selected: {option}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let device = DeviceIdentifier::new("Kobots", "select-demo")?;
    let select = SelectEntity::new("select_demo", "Demo Selector", device, LoggingSelect)?;

    let config = MqttConfig::new(&args.broker).with_port(args.port);
    let client = Arc::new(TokioMqttClient::new(config));
    client.start().await?;
    select.start(client.clone());

    println!("Selector registered; pick options on the hub. Ctrl-C to exit.");
    tokio::signal::ctrl_c().await?;

    // clean up the entity on the hub
    select.remove();
    Ok(())
}
