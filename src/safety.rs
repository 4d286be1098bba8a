//! URL checks that run before any network access.
//!
//! Two independent layers guard the fetcher against server-side request
//! forgery:
//!
//! - [`is_url_safe`] rejects non-https schemes, embedded credentials,
//!   loopback/private/link-local literals and cloud metadata hostnames.
//! - [`is_domain_allowed`] limits fetch targets to an exact-match allowlist
//!   of recipe sites.
//!
//! Neither check resolves DNS. A public hostname that resolves to a private
//! address at fetch time is not caught here.

use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Recipe sites accepted when no allowlist is configured.
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "allrecipes.com",
    "bbcgoodfood.com",
    "bonappetit.com",
    "budgetbytes.com",
    "cooking.nytimes.com",
    "delish.com",
    "epicurious.com",
    "food.com",
    "food52.com",
    "foodnetwork.com",
    "jamieoliver.com",
    "kingarthurbaking.com",
    "loveandlemons.com",
    "minimalistbaker.com",
    "natashaskitchen.com",
    "recipetineats.com",
    "seriouseats.com",
    "simplyrecipes.com",
    "smittenkitchen.com",
    "tasteofhome.com",
    "thekitchn.com",
];

const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "0.0.0.0"];

const METADATA_HOSTNAMES: &[&str] = &[
    "metadata.google.internal",
    "metadata.goog",
    "metadata.azure.com",
    "instance-data",
    "instance-data.ec2.internal",
    "100.100.100.200",
];

/// (network, prefix length)
const BLOCKED_V4_RANGES: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(0, 0, 0, 0), 8),
];

/// Returns `true` if the URL may be fetched at all.
///
/// # Example
///
/// ```
/// use recipe_gateway::safety::is_url_safe;
///
/// assert!(is_url_safe("https://www.allrecipes.com/recipe/1"));
/// assert!(!is_url_safe("https://169.254.169.254/latest/meta-data"));
/// ```
pub fn is_url_safe(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if parsed.scheme() != "https" {
        return false;
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return false;
    }

    match parsed.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            let domain = domain.trim_end_matches('.');
            !BLOCKED_HOSTNAMES.contains(&domain) && !METADATA_HOSTNAMES.contains(&domain)
        }
        Some(Host::Ipv4(addr)) => {
            !is_blocked_ipv4(addr) && !METADATA_HOSTNAMES.contains(&addr.to_string().as_str())
        }
        Some(Host::Ipv6(addr)) => addr != Ipv6Addr::LOCALHOST,
        None => false,
    }
}

/// Returns `true` if the URL's host, minus one leading `www.`, is an exact
/// entry of `allowlist`.
pub fn is_domain_allowed<S: AsRef<str>>(url: &str, allowlist: &[S]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    allowlist
        .iter()
        .any(|allowed| allowed.as_ref().eq_ignore_ascii_case(host))
}

fn is_blocked_ipv4(addr: Ipv4Addr) -> bool {
    let bits = u32::from(addr);
    BLOCKED_V4_RANGES.iter().any(|(network, prefix)| {
        let mask = u32::MAX << (32 - u32::from(*prefix));
        bits & mask == u32::from(*network) & mask
    })
}
