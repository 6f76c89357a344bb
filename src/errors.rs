/// All error types that can occur when building entities or talking to the broker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required string field was blank (or whitespace-only).
    #[error("'{field}' must not be blank")]
    Blank { field: &'static str },

    /// A field value was outside its allowed range or enumeration.
    #[error("'{field}' is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// An MQTT client request could not be issued.
    #[error("mqtt {action} error: {source:?}")]
    Transport {
        action: &'static str,
        source: rumqttc::ClientError,
    },

    /// A required configuration value was missing from the environment.
    #[error("missing configuration value {name}")]
    MissingConfig { name: &'static str },
}

impl Error {
    /// Create a blank-field validation error
    pub(crate) fn blank(field: &'static str) -> Self {
        Error::Blank { field }
    }

    /// Create an invalid-value validation error
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub(crate) fn transport(action: &'static str, source: rumqttc::ClientError) -> Self {
        Error::Transport { action, source }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
