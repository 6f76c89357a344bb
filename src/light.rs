//! Lights: anywhere from simple on/off to full RGB with effects.
//!
//! The hub talks to lights with JSON payloads (`schema = "json"`), so the
//! handler here does the payload parsing and delegates the actual hardware
//! bits to a [`LightControl`].

use std::ops::Deref;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum_macros::{Display, EnumIter, EnumString};

use crate::color::{BLACK, Rgb, WHITE, cct_to_rgb, mireds_to_cct, rgb_to_brightness, rgb_to_mireds};
use crate::device::DeviceIdentifier;
use crate::entity::{CommandHandler, Component, Entity};
use crate::errors::Error;

/// Color modes the hub knows about.
/// See <https://www.home-assistant.io/integrations/light.mqtt/#supported_color_modes>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ColorMode {
    #[strum(serialize = "onoff")]
    OnOff,
    Brightness,
    ColorTemp,
    #[strum(serialize = "hs")]
    HueSat,
    Xy,
    Rgb,
    Rgbw,
    Rgbww,
    White,
}

impl ColorMode {
    fn does_color(self) -> bool {
        matches!(self, ColorMode::Rgb | ColorMode::Rgbw | ColorMode::Rgbww)
    }

    /// `onoff` and `brightness` are exclusive; `hs`, `xy` and `white` are
    /// not implemented yet.
    pub fn validate(modes: &[ColorMode]) -> Result<(), Error> {
        if modes.is_empty() {
            return Err(Error::blank("color modes"));
        }
        if (modes.contains(&ColorMode::OnOff) || modes.contains(&ColorMode::Brightness))
            && modes.len() > 1
        {
            return Err(Error::invalid(
                "color modes",
                "'onoff' and 'brightness' must be the only mode when used",
            ));
        }
        for mode in modes {
            if matches!(mode, ColorMode::HueSat | ColorMode::Xy | ColorMode::White) {
                return Err(Error::invalid(
                    "color modes",
                    format!("'{mode}' is currently not supported"),
                ));
            }
        }
        Ok(())
    }
}

/// RGB triple as the hub represents it in JSON payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<Rgb> for RgbColor {
    fn from((r, g, b): Rgb) -> Self {
        Self { r, g, b }
    }
}

impl From<RgbColor> for Rgb {
    fn from(c: RgbColor) -> Self {
        (c.r, c.g, c.b)
    }
}

#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
struct LightState {
    state: String,
    color_mode: Option<String>,
    brightness: Option<u8>,
    color: Option<RgbColor>,
    color_temp: Option<u16>,
    effect: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LightCommand {
    state: Option<String>,
    brightness: Option<u8>,
    color: Option<RgbColor>,
    color_temp: Option<u16>,
    effect: Option<String>,
}

/// What a light can actually do. The getters return `None` for abilities the
/// hardware does not have; the matching setters are then never called for
/// sensible color-mode lists.
pub trait LightControl: Send {
    fn is_on(&self) -> bool;
    fn set_on(&mut self, on: bool);

    fn brightness(&self) -> Option<u8> {
        None
    }
    fn set_brightness(&mut self, _brightness: u8) {}

    fn color(&self) -> Option<Rgb> {
        None
    }
    fn set_color(&mut self, _color: Rgb) {}

    /// Color temperature in mireds.
    fn color_temp(&self) -> Option<u16> {
        None
    }
    fn set_color_temp(&mut self, _mireds: u16) {}

    /// Run a named effect; may block.
    fn run_effect(&mut self, _effect: &str) {}
}

/// Translates the hub's JSON light payloads to and from a [`LightControl`].
pub struct LightHandler<C> {
    modes: Vec<ColorMode>,
    effects: Vec<String>,
    current_effect: Option<String>,
    control: C,
}

impl<C: LightControl> LightHandler<C> {
    pub fn new(control: C, modes: &[ColorMode]) -> Result<Self, Error> {
        ColorMode::validate(modes)?;
        Ok(Self {
            modes: modes.to_vec(),
            effects: Vec::new(),
            current_effect: None,
            control,
        })
    }

    /// The common micro-controller LED setup: RGB color plus temperature
    /// (brightness and on/off are derived from the color).
    pub fn rgb(control: C) -> Result<Self, Error> {
        Self::new(control, &[ColorMode::Rgb, ColorMode::ColorTemp])
    }

    pub fn with_effects(mut self, effects: &[&str]) -> Self {
        self.effects = effects.iter().map(|e| e.to_string()).collect();
        self
    }
}

impl<C: LightControl> CommandHandler for LightHandler<C> {
    fn handle_command(&mut self, payload: &str) {
        debug!("received light command: {payload}");
        let command: LightCommand = match serde_json::from_str(payload) {
            Ok(c) => c,
            Err(e) => {
                warn!("ignoring malformed light command: {e}");
                return;
            }
        };

        // effects take priority over everything else
        if !self.effects.is_empty()
            && let Some(effect) = command.effect
        {
            self.control.run_effect(&effect);
            self.current_effect = Some(effect);
        } else if let Some(color) = command.color {
            self.control.set_color(color.into());
        } else if let Some(mireds) = command.color_temp {
            self.control.set_color_temp(mireds);
        } else if let Some(brightness) = command.brightness {
            self.control.set_brightness(brightness);
        } else if let Some(state) = command.state {
            self.control.set_on(state == "ON");
        }
    }

    fn current_state(&self) -> String {
        if !self.effects.is_empty()
            && let Some(effect) = &self.current_effect
        {
            let state = LightState {
                state: "ON".to_string(),
                effect: Some(effect.clone()),
                ..Default::default()
            };
            return serde_json::to_string(&state).unwrap_or_default();
        }

        let mut state = LightState {
            state: if self.control.is_on() { "ON" } else { "OFF" }.to_string(),
            ..Default::default()
        };

        if self.modes.contains(&ColorMode::Brightness) {
            state.color_mode = Some(ColorMode::Brightness.to_string());
            state.brightness = self.control.brightness();
        } else if self.modes.iter().any(|m| m.does_color()) {
            let rgb = self.control.color().unwrap_or(BLACK);
            state.color_mode = Some(ColorMode::Rgb.to_string());
            state.color = Some(rgb.into());
            state.brightness = self.control.brightness();
            // a lot of RGB hardware also does temperatures; report one
            // either way
            state.color_temp = if self.modes.contains(&ColorMode::ColorTemp) {
                self.control.color_temp().or_else(|| Some(rgb_to_mireds(rgb)))
            } else {
                Some(rgb_to_mireds(rgb))
            };
        } else if self.modes.contains(&ColorMode::ColorTemp) {
            state.color_mode = Some(ColorMode::ColorTemp.to_string());
            state.color_temp = self.control.color_temp();
            state.brightness = self.control.brightness();
        }
        // a bare "onoff" light only reports the state field

        serde_json::to_string(&state).unwrap_or_default()
    }

    fn extend_discovery(&self, discovery: &mut serde_json::Map<String, serde_json::Value>) {
        let modes: Vec<String> = self.modes.iter().map(|m| m.to_string()).collect();
        discovery.insert("supported_color_modes".to_string(), modes.into());
        if self.modes != [ColorMode::OnOff] {
            discovery.insert("brightness".to_string(), true.into());
        }
        if !self.effects.is_empty() {
            discovery.insert("effect".to_string(), true.into());
            discovery.insert("effect_list".to_string(), self.effects.clone().into());
        }
    }
}

/// The color-only surface most addressable LEDs expose.
pub trait RgbControl: Send {
    fn color(&self) -> Rgb;
    fn set_color(&mut self, color: Rgb);
}

/// Wraps an [`RgbControl`] into a full [`LightControl`], deriving on/off,
/// brightness and temperature from the color.
///
/// Since this keeps no color history, "on" means white; implementations
/// wanting a "last color" concept should implement [`LightControl`]
/// directly.
pub struct RgbAdapter<C> {
    control: C,
}

impl<C: RgbControl> RgbAdapter<C> {
    pub fn new(control: C) -> Self {
        Self { control }
    }
}

impl<C: RgbControl> LightControl for RgbAdapter<C> {
    fn is_on(&self) -> bool {
        self.control.color() != BLACK
    }

    fn set_on(&mut self, on: bool) {
        self.control.set_color(if on { WHITE } else { BLACK });
    }

    fn brightness(&self) -> Option<u8> {
        Some(rgb_to_brightness(self.control.color()))
    }

    fn set_brightness(&mut self, brightness: u8) {
        // adjust the current color or, if off, scale from white
        let base = if self.is_on() { self.control.color() } else { WHITE };
        let factor = brightness as f64 / 255.0;
        self.control.set_color((
            (base.0 as f64 * factor).round() as u8,
            (base.1 as f64 * factor).round() as u8,
            (base.2 as f64 * factor).round() as u8,
        ));
    }

    fn color(&self) -> Option<Rgb> {
        Some(self.control.color())
    }

    fn set_color(&mut self, color: Rgb) {
        self.control.set_color(color);
    }

    fn color_temp(&self) -> Option<u16> {
        Some(rgb_to_mireds(self.control.color()))
    }

    fn set_color_temp(&mut self, mireds: u16) {
        self.control.set_color(cct_to_rgb(mireds_to_cct(mireds)));
    }
}

pub struct LightEntity {
    entity: Entity,
}

impl LightEntity {
    pub fn new(
        unique_id: &str,
        name: &str,
        device: DeviceIdentifier,
        handler: impl CommandHandler + 'static,
    ) -> Result<Self, Error> {
        let entity = Entity::new(Component::Light, unique_id, name, device)?;
        entity.set_handler(Box::new(handler));
        Ok(Self { entity })
    }
}

impl Deref for LightEntity {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::wrapper::testing::RecordingWrapper;

    // color-only double, shared so the test can inspect what the handler did
    #[derive(Clone, Default)]
    struct SharedStrip(Arc<Mutex<Rgb>>);

    impl SharedStrip {
        fn current(&self) -> Rgb {
            *self.0.lock().unwrap()
        }

        fn set(&self, color: Rgb) {
            *self.0.lock().unwrap() = color;
        }
    }

    impl RgbControl for SharedStrip {
        fn color(&self) -> Rgb {
            self.current()
        }

        fn set_color(&mut self, color: Rgb) {
            self.set(color);
        }
    }

    #[derive(Default)]
    struct EffectState {
        on: bool,
        effects_run: Vec<String>,
    }

    // full-control double for the on/off and effect paths
    #[derive(Clone, Default)]
    struct EffectLight(Arc<Mutex<EffectState>>);

    impl LightControl for EffectLight {
        fn is_on(&self) -> bool {
            self.0.lock().unwrap().on
        }

        fn set_on(&mut self, on: bool) {
            self.0.lock().unwrap().on = on;
        }

        fn run_effect(&mut self, effect: &str) {
            self.0.lock().unwrap().effects_run.push(effect.to_string());
        }
    }

    #[test]
    fn test_mode_validation() {
        assert!(ColorMode::validate(&[ColorMode::OnOff]).is_ok());
        assert!(ColorMode::validate(&[ColorMode::Rgb, ColorMode::ColorTemp]).is_ok());
        assert!(ColorMode::validate(&[]).is_err());
        assert!(ColorMode::validate(&[ColorMode::OnOff, ColorMode::Rgb]).is_err());
        assert!(ColorMode::validate(&[ColorMode::Brightness, ColorMode::ColorTemp]).is_err());
        assert!(ColorMode::validate(&[ColorMode::HueSat]).is_err());
    }

    #[test]
    fn test_mode_strings() {
        assert_eq!(ColorMode::OnOff.to_string(), "onoff");
        assert_eq!(ColorMode::ColorTemp.to_string(), "color_temp");
        assert_eq!(ColorMode::HueSat.to_string(), "hs");
    }

    #[test]
    fn test_rgb_state_payload() {
        let strip = SharedStrip::default();
        strip.set((255, 0, 0));
        let handler = LightHandler::rgb(RgbAdapter::new(strip)).unwrap();

        let state: serde_json::Value = serde_json::from_str(&handler.current_state()).unwrap();
        assert_eq!(state["state"], "ON");
        assert_eq!(state["color_mode"], "rgb");
        assert_eq!(state["color"], serde_json::json!({"r": 255, "g": 0, "b": 0}));
        assert_eq!(state["brightness"], 85);
        assert!(state["color_temp"].is_number());
        assert!(state.get("effect").is_none());
    }

    #[test]
    fn test_onoff_state_is_bare() {
        let light = EffectLight::default();
        let handler = LightHandler::new(light, &[ColorMode::OnOff]).unwrap();
        let state: serde_json::Value = serde_json::from_str(&handler.current_state()).unwrap();
        assert_eq!(state, serde_json::json!({"state": "OFF"}));
    }

    #[test]
    fn test_command_routing() {
        let strip = SharedStrip::default();
        let mut handler = LightHandler::rgb(RgbAdapter::new(strip.clone())).unwrap();

        handler.handle_command(r#"{"state": "ON"}"#);
        assert_eq!(strip.current(), WHITE);

        handler.handle_command(r#"{"color": {"r": 10, "g": 20, "b": 30}}"#);
        assert_eq!(strip.current(), (10, 20, 30));

        // color wins over state when both are present
        handler.handle_command(r#"{"state": "ON", "color": {"r": 1, "g": 2, "b": 3}}"#);
        assert_eq!(strip.current(), (1, 2, 3));

        handler.handle_command(r#"{"state": "OFF"}"#);
        assert_eq!(strip.current(), BLACK);

        handler.handle_command("not json");
        assert_eq!(strip.current(), BLACK);
    }

    #[test]
    fn test_effects() {
        let light = EffectLight::default();
        let mut handler = LightHandler::new(light.clone(), &[ColorMode::Rgb])
            .unwrap()
            .with_effects(&["rainbow", "strobe"]);

        handler.handle_command(r#"{"effect": "rainbow", "state": "ON"}"#);
        assert_eq!(light.0.lock().unwrap().effects_run, vec!["rainbow"]);

        let state: serde_json::Value = serde_json::from_str(&handler.current_state()).unwrap();
        assert_eq!(state, serde_json::json!({"state": "ON", "effect": "rainbow"}));
    }

    #[test]
    fn test_brightness_scales_color() {
        let strip = SharedStrip::default();
        let mut adapter = RgbAdapter::new(strip.clone());

        // off: scale from white
        adapter.set_brightness(128);
        assert_eq!(strip.current(), (128, 128, 128));

        // on: scale the current color
        strip.set((200, 100, 0));
        adapter.set_brightness(255);
        assert_eq!(strip.current(), (200, 100, 0));
    }

    #[test]
    fn test_discovery_fields() {
        let strip = SharedStrip::default();
        let handler = LightHandler::rgb(RgbAdapter::new(strip))
            .unwrap()
            .with_effects(&["rainbow"]);
        let device = DeviceIdentifier::with_identifier("Kobots", "tests", "unit").unwrap();
        let light = LightEntity::new("id7", "Strip", device, handler).unwrap();

        let disco = light.discovery();
        assert_eq!(disco["schema"], "json");
        assert_eq!(disco["supported_color_modes"], serde_json::json!(["rgb", "color_temp"]));
        assert_eq!(disco["brightness"], true);
        assert_eq!(disco["effect"], true);
        assert_eq!(disco["effect_list"], serde_json::json!(["rainbow"]));
        assert_eq!(disco["command_topic"], "kobots_ha/mqtt/id7/set");
    }

    #[test]
    fn test_guarded_while_disconnected() {
        let strip = SharedStrip::default();
        let handler = LightHandler::rgb(RgbAdapter::new(strip)).unwrap();
        let device = DeviceIdentifier::with_identifier("Kobots", "tests", "unit").unwrap();
        let light = LightEntity::new("id7", "Strip", device, handler).unwrap();

        let wrapper = RecordingWrapper::new();
        light.start(wrapper.clone());
        wrapper.fire_disconnect();
        wrapper.clear();

        light.send_current_state();
        assert!(wrapper.publishes().is_empty());
    }
}
