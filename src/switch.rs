//! An on/off thing the hub can flip.

use std::ops::Deref;

use crate::device::DeviceIdentifier;
use crate::entity::{CommandHandler, Component, Entity};
use crate::errors::Error;

/// A switch. Commands arrive as `ON`/`OFF` text; the handler's reported
/// state uses the same values.
pub struct SwitchEntity {
    entity: Entity,
}

impl SwitchEntity {
    pub fn new(
        unique_id: &str,
        name: &str,
        device: DeviceIdentifier,
        handler: impl CommandHandler + 'static,
    ) -> Result<Self, Error> {
        let entity = Entity::new(Component::Switch, unique_id, name, device)?;
        entity.set_icon("mdi:toggle-switch-variant");
        entity.set_handler(Box::new(handler));
        Ok(Self { entity })
    }
}

impl Deref for SwitchEntity {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}
