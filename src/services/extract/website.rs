//! Website page email miner (stage 2).
//!
//! Mines email addresses from a realtor's own website: `mailto:` links
//! first (most deliberate), then regex matches over the page text.
//! Emits nothing when no address is present; "checked, not found" is an
//! empty result, never an empty string.

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::Field;
use crate::services::extract::{Extraction, Extractor};
use crate::storage::FetchRecord;

/// File suffixes that regex matching tends to misread as email domains
/// (e.g. `logo@2x.png` style asset names).
const JUNK_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".css", ".js"];

pub struct WebsiteExtractor {
    mailto_link: Selector,
    email_re: Regex,
}

impl WebsiteExtractor {
    pub fn new() -> Self {
        Self {
            mailto_link: Selector::parse(r#"a[href^="mailto:"]"#)
                .expect("static selector is valid"),
            email_re: Regex::new(r"[A-Za-z0-9][A-Za-z0-9._%+\-]*@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")
                .expect("static regex is valid"),
        }
    }
}

impl Default for WebsiteExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for WebsiteExtractor {
    fn extract(&self, artifact: &FetchRecord) -> Result<Vec<Extraction>> {
        let doc = Html::parse_document(&artifact.body);

        let mut seen = Vec::new();
        let mut push = |candidate: String| {
            let email = candidate.trim().to_lowercase();
            if email.is_empty() || !is_plausible_email(&email) || seen.contains(&email) {
                return;
            }
            seen.push(email);
        };

        for link in doc.select(&self.mailto_link) {
            if let Some(href) = link.value().attr("href") {
                let address = href
                    .trim_start_matches("mailto:")
                    .split('?')
                    .next()
                    .unwrap_or("");
                push(address.to_string());
            }
        }

        let text: String = doc.root_element().text().collect::<Vec<_>>().join(" ");
        for m in self.email_re.find_iter(&text) {
            push(m.as_str().to_string());
        }

        Ok(seen
            .into_iter()
            .map(|email| Extraction {
                hint: None,
                field: Field::Email,
                value: email,
                confidence: None,
            })
            .collect())
    }
}

fn is_plausible_email(email: &str) -> bool {
    if JUNK_SUFFIXES.iter().any(|s| email.ends_with(s)) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn artifact(body: &str) -> FetchRecord {
        FetchRecord {
            key: "site_johnsmith.ca".into(),
            body: body.into(),
            content_type: "text/html".into(),
            fetched_at: Utc::now(),
            stage: "website".into(),
        }
    }

    #[test]
    fn mailto_links_come_first() {
        let html = r#"<html><body>
            <p>Reach me at Office@JohnSmith.ca for listings.</p>
            <a href="mailto:info@johnsmith.ca?subject=Hello">Contact</a>
        </body></html>"#;

        let extractions = WebsiteExtractor::new().extract(&artifact(html)).unwrap();
        let emails: Vec<&str> = extractions.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(emails, vec!["info@johnsmith.ca", "office@johnsmith.ca"]);
        assert!(extractions.iter().all(|e| e.confidence.is_none()));
        assert!(extractions.iter().all(|e| e.hint.is_none()));
    }

    #[test]
    fn duplicates_are_collapsed_case_insensitively() {
        let html = r#"<html><body>
            <a href="mailto:info@johnsmith.ca">a</a>
            <p>INFO@JOHNSMITH.CA</p>
        </body></html>"#;

        let extractions = WebsiteExtractor::new().extract(&artifact(html)).unwrap();
        assert_eq!(extractions.len(), 1);
    }

    #[test]
    fn asset_names_are_not_emails() {
        let html = r#"<html><body><p>logo@2x.png and real@person.ca</p></body></html>"#;
        let extractions = WebsiteExtractor::new().extract(&artifact(html)).unwrap();
        let emails: Vec<&str> = extractions.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(emails, vec!["real@person.ca"]);
    }

    #[test]
    fn page_without_emails_yields_nothing() {
        let html = "<html><body><p>No contact info here.</p></body></html>";
        let extractions = WebsiteExtractor::new().extract(&artifact(html)).unwrap();
        assert!(extractions.is_empty());
    }
}
