use serde::Serialize;

const MOBILE_MARKERS: [&str; 7] = [
    "mobile",
    "android",
    "iphone",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];
const TABLET_MARKERS: [&str; 4] = ["tablet", "ipad", "playbook", "silk"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
    Unknown,
}

impl Browser {
    pub fn as_str(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
            Browser::Edge => "edge",
            Browser::Opera => "opera",
            Browser::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperatingSystem {
    #[serde(rename = "windows")]
    Windows,
    #[serde(rename = "windows 10/11")]
    Windows10,
    #[serde(rename = "windows 8.1")]
    Windows81,
    #[serde(rename = "windows 8")]
    Windows8,
    #[serde(rename = "windows 7")]
    Windows7,
    #[serde(rename = "ios")]
    Ios,
    #[serde(rename = "android")]
    Android,
    #[serde(rename = "macos")]
    MacOs,
    #[serde(rename = "linux")]
    Linux,
    #[serde(rename = "unknown")]
    Unknown,
}

impl OperatingSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            OperatingSystem::Windows => "windows",
            OperatingSystem::Windows10 => "windows 10/11",
            OperatingSystem::Windows81 => "windows 8.1",
            OperatingSystem::Windows8 => "windows 8",
            OperatingSystem::Windows7 => "windows 7",
            OperatingSystem::Ios => "ios",
            OperatingSystem::Android => "android",
            OperatingSystem::MacOs => "macos",
            OperatingSystem::Linux => "linux",
            OperatingSystem::Unknown => "unknown",
        }
    }
}

/// Coarse classification of a `User-Agent` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgentInfo {
    pub device_type: DeviceType,
    pub browser: Browser,
    pub browser_version: String,
    pub os: OperatingSystem,
}

pub fn parse_user_agent(user_agent: &str) -> UserAgentInfo {
    let ua = user_agent.to_lowercase();
    let (browser, browser_version) = detect_browser(&ua);

    UserAgentInfo {
        device_type: detect_device(&ua),
        browser,
        browser_version,
        os: detect_os(&ua),
    }
}

fn detect_device(ua: &str) -> DeviceType {
    if MOBILE_MARKERS.iter().any(|marker| ua.contains(marker)) {
        DeviceType::Mobile
    } else if TABLET_MARKERS.iter().any(|marker| ua.contains(marker)) {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

// Order matters: Chromium derivatives advertise "chrome" and every WebKit
// browser advertises "safari".
fn detect_browser(ua: &str) -> (Browser, String) {
    if ua.contains("chrome") && !ua.contains("edg") && !ua.contains("opr") {
        (Browser::Chrome, version_after(ua, &["chrome/"]))
    } else if ua.contains("firefox") {
        (Browser::Firefox, version_after(ua, &["firefox/"]))
    } else if ua.contains("safari") && !ua.contains("chrome") {
        (Browser::Safari, version_after(ua, &["version/"]))
    } else if ua.contains("edg") {
        (Browser::Edge, version_after(ua, &["edg/"]))
    } else if ua.contains("opr") || ua.contains("opera") {
        (Browser::Opera, version_after(ua, &["opr/", "opera/"]))
    } else {
        (Browser::Unknown, String::new())
    }
}

// Mobile platforms first: iOS agents say "like Mac OS X" and Android agents say "Linux".
fn detect_os(ua: &str) -> OperatingSystem {
    if ua.contains("windows") {
        if ua.contains("windows nt 10") {
            OperatingSystem::Windows10
        } else if ua.contains("windows nt 6.3") {
            OperatingSystem::Windows81
        } else if ua.contains("windows nt 6.2") {
            OperatingSystem::Windows8
        } else if ua.contains("windows nt 6.1") {
            OperatingSystem::Windows7
        } else {
            OperatingSystem::Windows
        }
    } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        OperatingSystem::Ios
    } else if ua.contains("android") {
        OperatingSystem::Android
    } else if ua.contains("mac os x") || ua.contains("macintosh") {
        OperatingSystem::MacOs
    } else if ua.contains("linux") {
        OperatingSystem::Linux
    } else {
        OperatingSystem::Unknown
    }
}

/// Digits and dots following the first marker that occurs with a non-empty version.
fn version_after(ua: &str, markers: &[&str]) -> String {
    markers
        .iter()
        .filter_map(|marker| {
            let start = ua.find(marker)? + marker.len();
            let version: String = ua[start..]
                .chars()
                .take_while(|ch| ch.is_ascii_digit() || *ch == '.')
                .collect();
            (!version.is_empty()).then_some(version)
        })
        .next()
        .unwrap_or_default()
}
