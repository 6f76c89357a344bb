//! Broker connection settings for the bundled tokio driver.

use std::env;
use std::time::Duration;

use crate::errors::Error;

/// Connection settings for [`crate::TokioMqttClient`].
///
/// The loop timings default to fairly aggressive values since automation
/// devices usually want commands handled promptly.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub broker: String,
    /// Broker port; default 1883.
    pub port: u16,
    /// MQTT client id; the client crate picks one when empty.
    pub client_id: String,
    /// Optional broker credentials.
    pub credentials: Option<(String, String)>,
    /// Pause between iterations of the connected loop.
    pub loop_sleep: Duration,
    /// Bound on a single I/O service step.
    pub loop_timeout: Duration,
    /// Wait before re-running the connect sequence after a link loss.
    pub reconnect_wait: Duration,
}

impl MqttConfig {
    pub fn new(broker: &str) -> Self {
        Self {
            broker: broker.to_string(),
            port: 1883,
            client_id: String::new(),
            credentials: None,
            loop_sleep: Duration::from_millis(100),
            loop_timeout: Duration::from_secs(1),
            reconnect_wait: Duration::from_secs(5),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_client_id(mut self, client_id: &str) -> Self {
        self.client_id = client_id.to_string();
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn with_loop_sleep(mut self, sleep: Duration) -> Self {
        self.loop_sleep = sleep;
        self
    }

    pub fn with_loop_timeout(mut self, timeout: Duration) -> Self {
        self.loop_timeout = timeout;
        self
    }

    pub fn with_reconnect_wait(mut self, wait: Duration) -> Self {
        self.reconnect_wait = wait;
        self
    }

    /// Build a configuration from the environment.
    ///
    /// Recognized variables: `HAMM_BROKER` (required), `HAMM_BROKER_PORT`,
    /// `HAMM_CLIENT_ID`, `HAMM_USERNAME`/`HAMM_PASSWORD`, `HAMM_LOOP_SLEEP`
    /// and `HAMM_LOOP_TIMEOUT` (seconds, fractional allowed), and
    /// `HAMM_RECONNECT_DELAY` (seconds).
    pub fn from_env() -> Result<Self, Error> {
        let broker = env::var("HAMM_BROKER").map_err(|_| Error::MissingConfig {
            name: "HAMM_BROKER",
        })?;
        let mut config = Self::new(&broker);

        if let Some(port) = parse_env("HAMM_BROKER_PORT", |s| s.parse::<u16>().ok())? {
            config.port = port;
        }
        if let Ok(client_id) = env::var("HAMM_CLIENT_ID") {
            config.client_id = client_id;
        }
        if let (Ok(user), Ok(pass)) = (env::var("HAMM_USERNAME"), env::var("HAMM_PASSWORD")) {
            config.credentials = Some((user, pass));
        }
        if let Some(sleep) = parse_env("HAMM_LOOP_SLEEP", parse_seconds)? {
            config.loop_sleep = sleep;
        }
        if let Some(timeout) = parse_env("HAMM_LOOP_TIMEOUT", parse_seconds)? {
            config.loop_timeout = timeout;
        }
        if let Some(wait) = parse_env("HAMM_RECONNECT_DELAY", parse_seconds)? {
            config.reconnect_wait = wait;
        }
        Ok(config)
    }
}

fn parse_seconds(s: &str) -> Option<Duration> {
    s.parse::<f64>()
        .ok()
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn parse_env<T>(name: &'static str, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>, Error> {
    match env::var(name) {
        Ok(raw) => parse(&raw)
            .map(Some)
            .ok_or_else(|| Error::invalid(name, format!("cannot parse '{raw}'"))),
        Err(_) => Ok(None),
    }
}
