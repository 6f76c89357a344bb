//! Free-form text the hub can send to a device.

use std::ops::Deref;

use crate::device::DeviceIdentifier;
use crate::entity::{CommandHandler, Component, Entity};
use crate::errors::Error;

/// A text entity. The command payload is the raw text entered on the hub;
/// the handler's reported state is what shows in the input box.
pub struct TextEntity {
    entity: Entity,
}

impl TextEntity {
    pub fn new(
        unique_id: &str,
        name: &str,
        device: DeviceIdentifier,
        handler: impl CommandHandler + 'static,
    ) -> Result<Self, Error> {
        let entity = Entity::new(Component::Text, unique_id, name, device)?;
        entity.set_icon("mdi:text");
        entity.set_handler(Box::new(handler));
        Ok(Self { entity })
    }
}

impl Deref for TextEntity {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}
