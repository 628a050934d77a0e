use serde::Serialize;
use url::Url;

/// Host patterns checked in order. A pattern ending in `.` matches that label
/// under any public suffix (`google.` matches `google.co.uk`).
const SEARCH_ENGINES: [(&str, &str); 7] = [
    ("google.com", "Google"),
    ("google.", "Google"),
    ("bing.com", "Bing"),
    ("yahoo.com", "Yahoo"),
    ("duckduckgo.com", "DuckDuckGo"),
    ("baidu.com", "Baidu"),
    ("yandex.com", "Yandex"),
];

const SOCIAL_PLATFORMS: [(&str, &str); 10] = [
    ("twitter.com", "Twitter"),
    ("x.com", "Twitter"),
    ("facebook.com", "Facebook"),
    ("linkedin.com", "LinkedIn"),
    ("reddit.com", "Reddit"),
    ("instagram.com", "Instagram"),
    ("youtube.com", "YouTube"),
    ("tiktok.com", "TikTok"),
    ("pinterest.com", "Pinterest"),
    ("github.com", "GitHub"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Direct,
    Search,
    Social,
    Referral,
    Unknown,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Direct => "direct",
            SourceType::Search => "search",
            SourceType::Social => "social",
            SourceType::Referral => "referral",
            SourceType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSource {
    pub source_type: SourceType,
    pub source: String,
    pub referrer_domain: Option<String>,
}

impl TrafficSource {
    fn direct() -> Self {
        Self {
            source_type: SourceType::Direct,
            source: "direct".to_string(),
            referrer_domain: None,
        }
    }

    fn unknown(referrer: &str) -> Self {
        Self {
            source_type: SourceType::Unknown,
            source: "unknown".to_string(),
            referrer_domain: Some(referrer.to_string()),
        }
    }
}

/// Classify a `Referer` value into a traffic source.
pub fn classify_referrer(referrer: Option<&str>) -> TrafficSource {
    let referrer = match referrer.map(str::trim) {
        None | Some("") | Some("direct") => return TrafficSource::direct(),
        Some(value) => value,
    };

    let Ok(url) = Url::parse(referrer) else {
        return TrafficSource::unknown(referrer);
    };
    let Some(host) = url.host_str().filter(|host| !host.is_empty()) else {
        return TrafficSource::unknown(referrer);
    };

    let domain = host.strip_prefix("www.").unwrap_or(host).to_string();

    if let Some(name) = lookup(&SEARCH_ENGINES, &domain) {
        return TrafficSource {
            source_type: SourceType::Search,
            source: name.to_string(),
            referrer_domain: Some(domain),
        };
    }

    if let Some(name) = lookup(&SOCIAL_PLATFORMS, &domain) {
        return TrafficSource {
            source_type: SourceType::Social,
            source: name.to_string(),
            referrer_domain: Some(domain),
        };
    }

    TrafficSource {
        source_type: SourceType::Referral,
        source: domain.clone(),
        referrer_domain: Some(domain),
    }
}

fn lookup(table: &[(&'static str, &'static str)], domain: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(pattern, _)| host_matches(domain, pattern))
        .map(|(_, name)| *name)
}

fn host_matches(domain: &str, pattern: &str) -> bool {
    if let Some(label) = pattern.strip_suffix('.') {
        let mut labels: Vec<&str> = domain.split('.').collect();
        // The last label is the TLD; `google` itself is never a suffix.
        labels.pop();
        return labels.contains(&label);
    }

    domain == pattern
        || domain
            .strip_suffix(pattern)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
