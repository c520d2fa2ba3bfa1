//! Inbound controller commands.

use lumibridge_devices::{attrs, lookup, EntityDomain};
use serde_json::{json, Value};

use crate::composite::{brightness_to_percent, LightCommand};
use crate::error::{BridgeError, BridgeResult};

/// A command received on a `.../set` topic, already validated against the
/// catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Write `1` when `on`, `0` otherwise.
    Switch { attr: &'static str, on: bool },
    /// Write an integer value.
    Number { attr: &'static str, value: i64 },
    /// Spotlight; each field is written independently when present.
    Light {
        on: Option<bool>,
        level_percent: Option<u8>,
    },
}

impl Command {
    /// Build a command from the topic's domain and attribute and the message
    /// payload.
    ///
    /// Returns `Ok(None)` for topics that do not address a commandable
    /// entity; those are ignored rather than reported.
    pub fn parse(domain: &str, attr: &str, payload: &str) -> BridgeResult<Option<Self>> {
        let domain: EntityDomain = match domain.parse() {
            Ok(domain) => domain,
            Err(_) => return Ok(None),
        };

        match domain {
            EntityDomain::Switch | EntityDomain::Number => {
                let entity = match lookup(attr) {
                    Some(entity) if entity.writable && entity.domain == domain => entity,
                    _ => return Ok(None),
                };
                if domain == EntityDomain::Switch {
                    Ok(Some(Command::Switch {
                        attr: entity.attr,
                        on: payload == "ON",
                    }))
                } else {
                    let value = parse_integer(payload)?;
                    Ok(Some(Command::Number {
                        attr: entity.attr,
                        value,
                    }))
                }
            }
            EntityDomain::Light => {
                if attr != attrs::SPOTLIGHT {
                    return Ok(None);
                }
                let light = LightCommand::parse(payload)?;
                Ok(Some(Command::Light {
                    on: light.state.map(|s| s == "ON"),
                    level_percent: light.brightness.map(brightness_to_percent),
                }))
            }
            EntityDomain::Sensor | EntityDomain::BinarySensor => Ok(None),
        }
    }

    /// Remote writes in the order they must be issued.
    pub fn writes(&self) -> Vec<(&'static str, Value)> {
        match self {
            Command::Switch { attr, on } => vec![(*attr, json!(if *on { 1 } else { 0 }))],
            Command::Number { attr, value } => vec![(*attr, json!(value))],
            Command::Light { on, level_percent } => {
                let mut writes = Vec::with_capacity(2);
                if let Some(on) = on {
                    writes.push((attrs::WHITE_LIGHT_ENABLE, json!(if *on { 1 } else { 0 })));
                }
                if let Some(level) = level_percent {
                    writes.push((attrs::WHITE_LIGHT_LEVEL, json!(level)));
                }
                writes
            }
        }
    }

    /// Key re-polled after the writes succeed.
    pub fn confirm_attr(&self) -> &'static str {
        match self {
            Command::Switch { attr, .. } | Command::Number { attr, .. } => *attr,
            Command::Light { .. } => attrs::WHITE_LIGHT_ENABLE,
        }
    }
}

/// Leading-integer parse: fractional parts are truncated.
fn parse_integer(payload: &str) -> BridgeResult<i64> {
    let value: f64 = payload
        .trim()
        .parse()
        .map_err(|_| BridgeError::Payload(format!("not a number: {:?}", payload)))?;
    if !value.is_finite() {
        return Err(BridgeError::Payload(format!("not a finite number: {:?}", payload)));
    }
    Ok(value.trunc() as i64)
}
