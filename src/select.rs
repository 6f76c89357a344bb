//! A "select" entity: the hub shows a drop-down of options and sends back
//! whichever one the user picks.

use std::ops::Deref;

use serde_json::{Map, Value};

use crate::device::DeviceIdentifier;
use crate::entity::{CommandHandler, Component, Entity};
use crate::errors::Error;

/// Receives the chosen option and reports the set of choices.
pub trait SelectHandler: Send {
    /// The options offered to the hub, in display order.
    fn options(&self) -> Vec<String>;

    /// React to the hub selecting `option`.
    fn execute_option(&mut self, option: &str);
}

/// Adapts a [`SelectHandler`] to the generic command plumbing, remembering
/// the last option so state republish reflects the selection.
struct SelectAdapter<H> {
    handler: H,
    last_option: Option<String>,
}

impl<H: SelectHandler> CommandHandler for SelectAdapter<H> {
    fn handle_command(&mut self, payload: &str) {
        self.handler.execute_option(payload);
        self.last_option = Some(payload.to_string());
    }

    fn current_state(&self) -> String {
        self.last_option.clone().unwrap_or_else(|| "None".to_string())
    }

    fn extend_discovery(&self, discovery: &mut Map<String, Value>) {
        discovery.insert("options".to_string(), Value::from(self.handler.options()));
    }
}

pub struct SelectEntity {
    entity: Entity,
}

impl SelectEntity {
    pub fn new(
        unique_id: &str,
        name: &str,
        device: DeviceIdentifier,
        handler: impl SelectHandler + 'static,
    ) -> Result<Self, Error> {
        let entity = Entity::new(Component::Select, unique_id, name, device)?;
        entity.set_icon("mdi:list-status");
        entity.set_handler(Box::new(SelectAdapter {
            handler,
            last_option: None,
        }));
        Ok(Self { entity })
    }
}

impl Deref for SelectEntity {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}
