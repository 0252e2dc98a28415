//! Contact enrichment — fills contact fields the model missed straight from
//! the resume text. Never overwrites a value the model produced.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::models::resume::{is_na, PersonalInfo};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
});
static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:https?://)?(?:[a-z]{2,3}\.)?(?:www\.)?linkedin\.com/(?:in|pub|profile)/[^\s,;)\]>"'|]+"#,
    )
    .expect("valid regex")
});
static GITHUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)(?:^|[\s(/<\[:,;])(?:https?://)?(?:www\.)?github\.com/([A-Za-z0-9](?:[A-Za-z0-9-]{0,38}))",
    )
    .expect("valid regex")
});
static WEB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https://[^\s<>"')\]|]+"#).expect("valid regex")
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Fills `email`, `linkedin`, `github` and `website` when they are missing.
pub fn enrich_contacts(info: &mut PersonalInfo, raw_text: &str) {
    fill(&mut info.email, || find_email(raw_text), "email");
    fill(&mut info.linkedin, || find_linkedin(raw_text), "linkedin");
    fill(&mut info.github, || find_github(raw_text), "github");
    fill(&mut info.website, || find_website(raw_text), "website");
}

fn fill(slot: &mut String, find: impl FnOnce() -> Option<String>, field: &str) {
    if !is_na(slot) {
        return;
    }
    if let Some(found) = find() {
        debug!("Filled {field} from resume text");
        *slot = found;
    }
}

pub fn find_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_lowercase())
}

pub fn find_linkedin(text: &str) -> Option<String> {
    LINKEDIN
        .find(text)
        .and_then(|m| canonical_url(m.as_str().trim_end_matches(TRAILING_PUNCTUATION)))
}

pub fn find_github(text: &str) -> Option<String> {
    GITHUB
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|handle| format!("https://github.com/{}", handle.as_str()))
}

/// First https URL that is not a LinkedIn or GitHub profile.
pub fn find_website(text: &str) -> Option<String> {
    WEB_URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
        .filter_map(|candidate| Url::parse(candidate).ok())
        .find(|url| {
            url.host_str()
                .map(|host| {
                    let host = host.to_ascii_lowercase();
                    !host.ends_with("linkedin.com") && !host.ends_with("github.com")
                })
                .unwrap_or(false)
        })
        .map(|url| url.to_string().trim_end_matches('/').to_string())
}

/// `https://` scheme, no fragment, no `utm_*` params, no trailing slash.
fn canonical_url(candidate: &str) -> Option<String> {
    let with_scheme = if candidate.contains("://") {
        candidate.to_string()
    } else {
        format!("https://{candidate}")
    };
    let mut url = Url::parse(&with_scheme).ok()?;
    if url.scheme() != "https" {
        url.set_scheme("https").ok()?;
    }
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.starts_with("utm_"))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);

    Some(url.to_string().trim_end_matches('/').to_string())
}
