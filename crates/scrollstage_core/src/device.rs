//! Device classification
//!
//! Classifies the runtime as desktop or mobile from the user agent. Smooth
//! scrolling and the stacking effect only run on desktop.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Touch-first user agent tokens
const MOBILE_PATTERN: &str = r"mobile|android|ipad|tablet|touch";

fn mobile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MOBILE_PATTERN).expect("static pattern is valid"))
}

/// Coarse device class of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceClass {
    /// Classify a user agent string (case-insensitive)
    pub fn from_user_agent(user_agent: &str) -> Self {
        if mobile_regex().is_match(&user_agent.to_lowercase()) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn is_desktop(&self) -> bool {
        matches!(self, DeviceClass::Desktop)
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, DeviceClass::Mobile)
    }
}

/// Environment signals the host reports at startup
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub user_agent: String,
}

impl Environment {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    pub fn device(&self) -> DeviceClass {
        DeviceClass::from_user_agent(&self.user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_agents() {
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 Safari/605.1.15";
        assert_eq!(DeviceClass::from_user_agent(mac), DeviceClass::Desktop);
        assert!(Environment::new(mac).device().is_desktop());
    }

    #[test]
    fn test_mobile_agents() {
        for ua in [
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148",
            "Mozilla/5.0 (Linux; Android 14; Pixel 8)",
            "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)",
            "Some TABLET browser",
        ] {
            assert!(DeviceClass::from_user_agent(ua).is_mobile(), "{ua}");
        }
    }
}
