use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::settings::PauseSettings;

/// Where a page load is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub url: String,
    /// Hostname exactly as the browser reports it.
    pub hostname: String,
    /// `hostname` without a leading `www.`; the key for stats and matching.
    pub domain: String,
}

impl PageLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("invalid page URL {raw:?}"))?;
        let hostname = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| anyhow!("page URL {raw:?} has no host"))?
            .to_string();

        Ok(Self {
            url: url.to_string(),
            domain: normalize_host(&hostname).to_string(),
            hostname,
        })
    }
}

pub fn normalize_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Does `host` (already stripped of `www.`) match any rule?
///
/// The match is a substring test in both directions: `mail.example.com`
/// matches the rule `example.com`, and `example.com` matches the rule
/// `www.example.com`.
pub fn matches_any<S: AsRef<str>>(host: &str, rules: &[S]) -> bool {
    if host.is_empty() {
        return false;
    }

    rules
        .iter()
        .map(|rule| rule.as_ref().trim())
        .filter(|rule| !rule.is_empty())
        .any(|rule| host.contains(rule) || rule.contains(host))
}

pub fn should_intercept(settings: &PauseSettings, domain: &str) -> bool {
    settings.enable_pauses && matches_any(domain, &settings.distracting_sites)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(sites: &[&str]) -> PauseSettings {
        PauseSettings {
            distracting_sites: sites.iter().map(|s| s.to_string()).collect(),
            ..PauseSettings::default()
        }
    }

    #[test]
    fn parse_strips_www_for_the_domain() {
        let location = PageLocation::parse("https://www.example.com/watch?v=1").unwrap();
        assert_eq!(location.hostname, "www.example.com");
        assert_eq!(location.domain, "example.com");
        assert_eq!(location.url, "https://www.example.com/watch?v=1");
    }

    #[test]
    fn unparseable_urls_are_rejected() {
        assert!(PageLocation::parse("not a url").is_err());
        assert!(PageLocation::parse("about:blank").is_err());
        assert!(PageLocation::parse("").is_err());
    }

    #[test]
    fn host_containing_rule_matches() {
        assert!(matches_any("mail.example.com", &["example.com"]));
        assert!(matches_any("example.com", &["example.com"]));
    }

    #[test]
    fn rule_containing_host_matches() {
        assert!(matches_any("example.com", &["www.example.com"]));
    }

    #[test]
    fn unrelated_hosts_do_not_match() {
        assert!(!matches_any("docs.rs", &["example.com", "news.site"]));
        assert!(!matches_any("example.org", &["example.com"]));
    }

    #[test]
    fn empty_rules_and_hosts_never_match() {
        assert!(!matches_any("example.com", &["", "   "]));
        assert!(!matches_any("", &["example.com"]));
        assert!(!matches_any::<&str>("example.com", &[]));
    }

    #[test]
    fn disabled_settings_never_intercept() {
        let mut s = settings(&["example.com"]);
        assert!(should_intercept(&s, "example.com"));
        s.enable_pauses = false;
        assert!(!should_intercept(&s, "example.com"));
        assert!(!should_intercept(&PauseSettings::disabled(), "example.com"));
    }
}
