//! Broker topic layout.
//!
//! Every topic of an entity derives from the `(domain, slug, attr)` triple:
//!
//! - `<prefix>/<domain>/<slug>/<attr>/config` discovery announcement
//! - `<prefix>/<domain>/<slug>/<attr>/state` retained state
//! - `<prefix>/<domain>/<slug>/<attr>/set` controller commands

const CONFIG_SUFFIX: &str = "config";
const STATE_SUFFIX: &str = "state";
const COMMAND_SUFFIX: &str = "set";

/// Topic builder for one discovery prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn entity(&self, domain: &str, slug: &str, attr: &str, suffix: &str) -> String {
        format!("{}/{}/{}/{}/{}", self.prefix, domain, slug, attr, suffix)
    }

    pub fn config(&self, domain: &str, slug: &str, attr: &str) -> String {
        self.entity(domain, slug, attr, CONFIG_SUFFIX)
    }

    pub fn state(&self, domain: &str, slug: &str, attr: &str) -> String {
        self.entity(domain, slug, attr, STATE_SUFFIX)
    }

    pub fn command(&self, domain: &str, slug: &str, attr: &str) -> String {
        self.entity(domain, slug, attr, COMMAND_SUFFIX)
    }

    /// Wildcard covering every command topic of one device.
    pub fn command_filter(&self, slug: &str) -> String {
        format!("{}/+/{}/+/{}", self.prefix, slug, COMMAND_SUFFIX)
    }

    /// Split a command topic back into its triple.
    pub fn parse_command<'a>(&self, topic: &'a str) -> Option<CommandTopic<'a>> {
        let rest = topic.strip_prefix(self.prefix.as_str())?.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let domain = parts.next()?;
        let slug = parts.next()?;
        let attr = parts.next()?;
        let suffix = parts.next()?;
        if parts.next().is_some() || suffix != COMMAND_SUFFIX {
            return None;
        }
        if domain.is_empty() || slug.is_empty() || attr.is_empty() {
            return None;
        }
        Some(CommandTopic { domain, slug, attr })
    }
}

/// Parsed `<prefix>/<domain>/<slug>/<attr>/set` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTopic<'a> {
    pub domain: &'a str,
    pub slug: &'a str,
    pub attr: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_layout() {
        let topics = Topics::new("homeassistant");
        assert_eq!(
            topics.config("switch", "lumi1_cam", "pir_enable"),
            "homeassistant/switch/lumi1_cam/pir_enable/config"
        );
        assert_eq!(
            topics.state("switch", "lumi1_cam", "pir_enable"),
            "homeassistant/switch/lumi1_cam/pir_enable/state"
        );
        assert_eq!(
            topics.command("switch", "lumi1_cam", "pir_enable"),
            "homeassistant/switch/lumi1_cam/pir_enable/set"
        );
        assert_eq!(topics.command_filter("lumi1_cam"), "homeassistant/+/lumi1_cam/+/set");
    }

    #[test]
    fn test_parse_command_round_trip() {
        let topics = Topics::new("homeassistant");
        let topic = topics.command("light", "lumi1_cam", "spotlight");
        let parsed = topics.parse_command(&topic).unwrap();
        assert_eq!(
            parsed,
            CommandTopic {
                domain: "light",
                slug: "lumi1_cam",
                attr: "spotlight"
            }
        );
    }

    #[test]
    fn test_parse_command_rejects() {
        let topics = Topics::new("homeassistant");
        assert!(topics.parse_command("homeassistant/switch/lumi1_cam/pir_enable/state").is_none());
        assert!(topics.parse_command("homeassistant/switch/lumi1_cam/set").is_none());
        assert!(topics.parse_command("other/switch/lumi1_cam/pir_enable/set").is_none());
        assert!(topics.parse_command("homeassistantx/switch/lumi1_cam/pir_enable/set").is_none());
        assert!(topics.parse_command("homeassistant/switch/lumi1_cam/pir_enable/set/x").is_none());
        assert!(topics.parse_command("homeassistant//lumi1_cam/pir_enable/set").is_none());
    }

    #[test]
    fn test_nested_prefix() {
        let topics = Topics::new("home/ha");
        let parsed = topics
            .parse_command("home/ha/number/lumi1_cam/system_volume/set")
            .unwrap();
        assert_eq!(parsed.domain, "number");
        assert_eq!(parsed.attr, "system_volume");
    }
}
