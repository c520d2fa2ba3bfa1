//! Entity catalog.
//!
//! Static mapping from a remote camera attribute to the entity the
//! controller shows for it. The table is authored data; the only logic here
//! is [`lookup`].

use std::fmt;
use std::str::FromStr;

/// Well-known attribute keys.
pub mod attrs {
    /// Spotlight power, `"1"` when on.
    pub const WHITE_LIGHT_ENABLE: &str = "white_light_enable";
    /// Spotlight level in percent.
    pub const WHITE_LIGHT_LEVEL: &str = "white_light_level";
    /// Both spotlight-backing keys, queried together.
    pub const LIGHT_KEYS: [&str; 2] = [WHITE_LIGHT_ENABLE, WHITE_LIGHT_LEVEL];
    /// Object id of the synthesized spotlight light.
    pub const SPOTLIGHT: &str = "spotlight";

    /// JSON document `{totalsize, freesize, sdstatus}`.
    pub const SDCARD_STATUS: &str = "sdcard_status";
    pub const SDCARD_TOTAL: &str = "sdcard_total";
    pub const SDCARD_FREE: &str = "sdcard_free";
    pub const SDCARD_PERCENT: &str = "sdcard_percent";

    pub const WORK_MODE: &str = "work_mode";
    pub const BATTERY_POWER: &str = "device_battery_power";
}

/// Controller entity domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityDomain {
    Sensor,
    BinarySensor,
    Switch,
    Light,
    Number,
}

impl EntityDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityDomain::Sensor => "sensor",
            EntityDomain::BinarySensor => "binary_sensor",
            EntityDomain::Switch => "switch",
            EntityDomain::Light => "light",
            EntityDomain::Number => "number",
        }
    }

    /// Whether state is published as `ON`/`OFF`.
    pub fn is_boolean(&self) -> bool {
        matches!(self, EntityDomain::Switch | EntityDomain::BinarySensor)
    }
}

impl FromStr for EntityDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sensor" => Ok(EntityDomain::Sensor),
            "binary_sensor" => Ok(EntityDomain::BinarySensor),
            "switch" => Ok(EntityDomain::Switch),
            "light" => Ok(EntityDomain::Light),
            "number" => Ok(EntityDomain::Number),
            other => Err(format!("Unknown entity domain: {}", other)),
        }
    }
}

impl fmt::Display for EntityDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller-facing description of one remote attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub domain: EntityDomain,
    /// Display name, prefixed with the device name on announcement
    pub name: &'static str,
    /// Remote attribute key, also the entity object id
    pub attr: &'static str,
    pub icon: Option<&'static str>,
    pub unit: Option<&'static str>,
    /// Accepts commands from the controller
    pub writable: bool,
}

impl EntityDescriptor {
    const fn switch(name: &'static str, attr: &'static str, icon: &'static str) -> Self {
        Self {
            domain: EntityDomain::Switch,
            name,
            attr,
            icon: Some(icon),
            unit: None,
            writable: true,
        }
    }

    const fn number(name: &'static str, attr: &'static str, unit: Option<&'static str>) -> Self {
        Self {
            domain: EntityDomain::Number,
            name,
            attr,
            icon: None,
            unit,
            writable: true,
        }
    }

    const fn sensor(name: &'static str, attr: &'static str, unit: Option<&'static str>) -> Self {
        Self {
            domain: EntityDomain::Sensor,
            name,
            attr,
            icon: None,
            unit,
            writable: false,
        }
    }

    const fn with_icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }
}

/// Every plain entity bridged for a camera.
pub static ENTITIES: &[EntityDescriptor] = &[
    EntityDescriptor::switch("Lens Obstruction Detection", "lens_hide_enable", "mdi:eye-off"),
    EntityDescriptor::switch("AI Sound Detection", "ai_sound_enable", "mdi:ear-hearing"),
    EntityDescriptor::switch("Face Detection", "face_detect_enable", "mdi:face-recognition"),
    EntityDescriptor::switch("Human Detection", "human_detect_enable", "mdi:human"),
    EntityDescriptor::switch("Pets Detection", "pets_detect_enable", "mdi:paw"),
    EntityDescriptor::switch("Vehicle Detection", "vehicle_detect_enable", "mdi:car"),
    EntityDescriptor::switch("Package Detection", "package_detect_enable", "mdi:package-variant"),
    EntityDescriptor::switch("Lingerer Detection", "pir_enable", "mdi:motion-sensor"),
    EntityDescriptor::number("System Volume", "system_volume", Some("%")),
    EntityDescriptor::number("Alarm Volume", "alarm_bell_volume", Some("%")),
    EntityDescriptor::number("Alarm Tone", "alarm_bell_index", None),
    EntityDescriptor::number("Report Interval", "report_status_sec", Some("s")),
    EntityDescriptor::sensor("WiFi RSSI", "device_wifi_rssi", Some("dBm")).with_icon("mdi:wifi"),
    EntityDescriptor::sensor("WiFi Level", "wifi_level", None),
    EntityDescriptor::sensor("SD Card", attrs::SDCARD_STATUS, None),
    EntityDescriptor::sensor("Alarm Status", "alarm_status", None),
    EntityDescriptor::sensor("P2P Stream", "P2P_capture_status", None),
    EntityDescriptor::sensor("Work Mode", attrs::WORK_MODE, None).with_icon("mdi:theme-light-dark"),
    EntityDescriptor::sensor("Battery", attrs::BATTERY_POWER, Some("%")).with_icon("mdi:battery"),
];

/// Find the descriptor for a remote attribute.
pub fn lookup(attr: &str) -> Option<&'static EntityDescriptor> {
    ENTITIES.iter().find(|e| e.attr == attr)
}

/// Whether `attr` feeds a composite entity rather than a plain one.
pub fn is_composite_key(attr: &str) -> bool {
    attr == attrs::SDCARD_STATUS || attrs::LIGHT_KEYS.contains(&attr)
}

/// Keys requested by one full poll: every catalog attribute plus the light keys.
pub fn poll_attrs() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = ENTITIES.iter().map(|e| e.attr).collect();
    for key in attrs::LIGHT_KEYS {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}
