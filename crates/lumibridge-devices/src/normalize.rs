//! Raw attribute value to controller display value.

use crate::catalog::{attrs, EntityDomain};

/// Sentinel published when a value cannot be shown.
pub const UNAVAILABLE: &str = "unavailable";

/// Map a raw remote value to the text the controller expects for `domain`.
///
/// Rules apply in order: boolean domains, battery sentinel, work mode labels,
/// numeric coercion, pass-through. A `number` value that does not parse as a
/// finite number becomes [`UNAVAILABLE`].
pub fn normalize(domain: EntityDomain, attr: &str, raw: &str) -> String {
    if domain.is_boolean() {
        return if raw == "1" { "ON" } else { "OFF" }.to_string();
    }

    if attr == attrs::BATTERY_POWER && matches!(raw, "" | "null" | "-1") {
        return UNAVAILABLE.to_string();
    }

    if attr == attrs::WORK_MODE {
        return match raw {
            "0" => "Day",
            "1" => "Night",
            "2" => "Auto",
            other => other,
        }
        .to_string();
    }

    if domain == EntityDomain::Number {
        return coerce_number(raw).unwrap_or_else(|| UNAVAILABLE.to_string());
    }

    raw.to_string()
}

fn coerce_number(raw: &str) -> Option<String> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some((value as i64).to_string())
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_domains() {
        for domain in [EntityDomain::Switch, EntityDomain::BinarySensor] {
            assert_eq!(normalize(domain, "pir_enable", "1"), "ON");
            for raw in ["0", "", "true", "ON", " 1", "1.0", "2"] {
                assert_eq!(normalize(domain, "pir_enable", raw), "OFF", "{:?}", raw);
            }
        }
    }

    #[test]
    fn test_battery_sentinel() {
        for raw in ["", "null", "-1"] {
            assert_eq!(
                normalize(EntityDomain::Sensor, attrs::BATTERY_POWER, raw),
                UNAVAILABLE
            );
        }
        assert_eq!(normalize(EntityDomain::Sensor, attrs::BATTERY_POWER, "87"), "87");
        // Sentinel only applies to the battery attribute.
        assert_eq!(normalize(EntityDomain::Sensor, "wifi_level", "-1"), "-1");
    }

    #[test]
    fn test_work_mode_labels() {
        assert_eq!(normalize(EntityDomain::Sensor, attrs::WORK_MODE, "0"), "Day");
        assert_eq!(normalize(EntityDomain::Sensor, attrs::WORK_MODE, "1"), "Night");
        assert_eq!(normalize(EntityDomain::Sensor, attrs::WORK_MODE, "2"), "Auto");
        assert_eq!(normalize(EntityDomain::Sensor, attrs::WORK_MODE, "7"), "7");
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(normalize(EntityDomain::Number, "system_volume", "50"), "50");
        assert_eq!(normalize(EntityDomain::Number, "system_volume", " 50.0 "), "50");
        assert_eq!(normalize(EntityDomain::Number, "system_volume", "-3"), "-3");
        assert_eq!(normalize(EntityDomain::Number, "system_volume", "12.5"), "12.5");
    }

    #[test]
    fn test_number_fails_closed() {
        for raw in ["", "abc", "NaN", "inf", "null"] {
            assert_eq!(
                normalize(EntityDomain::Number, "system_volume", raw),
                UNAVAILABLE,
                "{:?}",
                raw
            );
        }
    }

    #[test]
    fn test_pass_through() {
        assert_eq!(normalize(EntityDomain::Sensor, "alarm_status", "armed"), "armed");
        assert_eq!(normalize(EntityDomain::Sensor, "device_wifi_rssi", "-61"), "-61");
    }
}
