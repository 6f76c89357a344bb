//! Identity of the physical (or logical) unit hosting one or more entities.

use serde_json::{Value, json};

use crate::errors::Error;

/// Describes the device the entities are running on -- typically the
/// microcontroller or computer itself. Embedded in every discovery payload.
///
/// # Example
///
/// ```
/// use ha_entities::DeviceIdentifier;
///
/// let device = DeviceIdentifier::with_identifier("Kobots", "3B+", "marvin").unwrap();
/// assert_eq!(device.identifier(), "marvin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentifier {
    manufacturer: String,
    model: String,
    identifier: String,
}

impl DeviceIdentifier {
    /// Create a device identity using the network hostname as the identifier.
    pub fn new(manufacturer: &str, model: &str) -> Result<Self, Error> {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        Self::with_identifier(manufacturer, model, &host)
    }

    /// Create a device identity with an explicit identifier.
    ///
    /// All three fields must be non-blank after trimming.
    pub fn with_identifier(manufacturer: &str, model: &str, identifier: &str) -> Result<Self, Error> {
        if manufacturer.trim().is_empty() {
            return Err(Error::blank("manufacturer"));
        }
        if model.trim().is_empty() {
            return Err(Error::blank("model"));
        }
        if identifier.trim().is_empty() {
            return Err(Error::blank("identifier"));
        }
        Ok(Self {
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
            identifier: identifier.to_string(),
        })
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The unique identifier for the device in the system.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The `device` block of an entity discovery payload. The entity's own
    /// unique id is listed alongside the device identifier so Home Assistant
    /// groups all entities of this device together.
    pub(crate) fn as_discovery(&self, unique_id: &str) -> Value {
        json!({
            "identifiers": [unique_id, self.identifier],
            "name": self.identifier,
            "model": self.model,
            "manufacturer": self.manufacturer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank_fields() {
        assert!(DeviceIdentifier::with_identifier("", "model", "id").is_err());
        assert!(DeviceIdentifier::with_identifier("mfg", "  ", "id").is_err());
        assert!(DeviceIdentifier::with_identifier("mfg", "model", "\t").is_err());
    }

    #[test]
    fn test_valid_triple() {
        let device = DeviceIdentifier::with_identifier("Kobots", "tests", "unit").unwrap();
        assert_eq!(device.manufacturer(), "Kobots");
        assert_eq!(device.model(), "tests");
    }

    #[test]
    fn test_hostname_default() {
        let device = DeviceIdentifier::new("Kobots", "tests").unwrap();
        assert!(!device.identifier().trim().is_empty());
    }

    #[test]
    fn test_discovery_block() {
        let device = DeviceIdentifier::with_identifier("Kobots", "tests", "unit").unwrap();
        let block = device.as_discovery("id2");
        assert_eq!(block["manufacturer"], "Kobots");
        assert_eq!(block["model"], "tests");
        assert_eq!(block["name"], "unit");
        let ids = block["identifiers"].as_array().unwrap();
        assert!(ids.contains(&serde_json::json!("id2")));
        assert!(ids.contains(&serde_json::json!("unit")));
    }
}
