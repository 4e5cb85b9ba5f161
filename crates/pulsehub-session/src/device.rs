//! Coarse device classification from user-agent strings.

use serde::{Deserialize, Serialize};

/// Device family a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Phones
    Mobile,
    /// Tablets
    Tablet,
    /// Desktop and laptop browsers
    Desktop,
    /// Crawlers, scripts and HTTP tools
    Bot,
    /// Anything unrecognized
    Unknown,
}

impl DeviceClass {
    /// Classify a user agent.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ua.trim().is_empty() {
            return Self::Unknown;
        }
        let has = |needles: &[&str]| needles.iter().any(|n| ua.contains(n));

        if has(&["bot", "crawler", "spider", "curl/", "wget/", "python-requests"]) {
            Self::Bot
        } else if has(&["ipad", "tablet", "kindle", "silk/"])
            || (ua.contains("android") && !ua.contains("mobile"))
        {
            Self::Tablet
        } else if has(&["iphone", "ipod", "mobile", "windows phone"]) {
            Self::Mobile
        } else if has(&["windows nt", "macintosh", "x11", "linux", "cros"]) {
            Self::Desktop
        } else {
            Self::Unknown
        }
    }
}
