//! Listing batch response extractor (stage 1).
//!
//! The listing endpoint answers with a JSON envelope whose payload is an
//! HTML fragment of realtor cards, usually under the `d` key. Cards are
//! parsed with configurable CSS selectors. An envelope with zero cards is
//! a valid artifact: it terminates pagination for its segment.

use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Field, IdentityHint, ListingSelectors};
use crate::services::extract::{Extraction, Extractor};
use crate::storage::FetchRecord;

/// JSON keys probed for the embedded HTML payload, most common first.
const HTML_KEYS: &[&str] = &["d", "html", "content", "result", "data"];

pub struct ListingExtractor {
    card: Selector,
    name: Selector,
    phone: Selector,
    website: Selector,
    tel_link: Selector,
    mailto_link: Selector,
}

impl ListingExtractor {
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            card: parse_selector(&selectors.card)?,
            name: parse_selector(&selectors.name)?,
            phone: parse_selector(&selectors.phone)?,
            website: parse_selector(&selectors.website)?,
            tel_link: parse_selector(r#"a[href^="tel:"]"#)?,
            mailto_link: parse_selector(r#"a[href^="mailto:"]"#)?,
        })
    }

    fn card_extractions(&self, card: scraper::ElementRef<'_>) -> Option<Vec<Extraction>> {
        let name = text_of(card, &self.name)?;

        let phone = text_of(card, &self.phone).or_else(|| {
            // Fallback: a tel: link when the number is not in plain text.
            attr_of(card, &self.tel_link, "href")
                .map(|href| href.trim_start_matches("tel:").trim().to_string())
        });
        let website = attr_of(card, &self.website, "href");
        let email = attr_of(card, &self.mailto_link, "href")
            .map(|href| strip_mailto(&href))
            .filter(|e| !e.is_empty());

        let hint = IdentityHint {
            name: name.clone(),
            phone: phone.clone().unwrap_or_default(),
            website: website.clone().unwrap_or_default(),
        };

        let mut extractions = vec![Extraction {
            hint: Some(hint.clone()),
            field: Field::Name,
            value: name,
            confidence: None,
        }];
        let mut push = |field: Field, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                extractions.push(Extraction {
                    hint: Some(hint.clone()),
                    field,
                    value,
                    confidence: None,
                });
            }
        };
        push(Field::Phone, phone);
        push(Field::Website, website);
        push(Field::Email, email);

        Some(extractions)
    }
}

impl Extractor for ListingExtractor {
    fn extract(&self, artifact: &FetchRecord) -> Result<Vec<Extraction>> {
        let envelope: serde_json::Value = serde_json::from_str(&artifact.body)
            .map_err(|e| AppError::malformed(&artifact.key, e))?;

        let html = HTML_KEYS
            .iter()
            .filter_map(|key| envelope.get(key).and_then(|v| v.as_str()))
            .find(|s| s.contains('<') && s.contains('>'))
            .ok_or_else(|| {
                AppError::malformed(&artifact.key, "no HTML payload in listing envelope")
            })?;

        let doc = Html::parse_fragment(html);
        let mut extractions = Vec::new();
        for card in doc.select(&self.card) {
            if let Some(card_fields) = self.card_extractions(card) {
                extractions.extend(card_fields);
            }
        }
        Ok(extractions)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn text_of(card: scraper::ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn attr_of(card: scraper::ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    card.select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn strip_mailto(href: &str) -> String {
    let stripped = href.trim_start_matches("mailto:");
    // Drop ?subject=... style parameters.
    stripped
        .split('?')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn artifact(body: &str) -> FetchRecord {
        FetchRecord {
            key: "listing_a_p001".into(),
            body: body.into(),
            content_type: "application/json".into(),
            fetched_at: Utc::now(),
            stage: "listing".into(),
        }
    }

    fn extractor() -> ListingExtractor {
        ListingExtractor::new(&ListingSelectors::default()).unwrap()
    }

    fn envelope(html: &str) -> String {
        serde_json::json!({ "d": html }).to_string()
    }

    const TWO_CARDS: &str = r#"
        <span id="RealtorResults">
          <div class="realtorCard">
            <span class="realtorCardName">John Smith</span>
            <span class="TelephoneNumber">306-555-0000</span>
            <a class="realtorCardWebsite" href="http://johnsmith.ca">Website</a>
          </div>
          <div class="realtorCard">
            <span class="realtorCardName">Jane Doe</span>
            <a href="tel:306-555-1111">Call</a>
            <a href="mailto:jane@x.com?subject=hi">Email</a>
          </div>
        </span>"#;

    #[test]
    fn extracts_cards_from_envelope() {
        let extractions = extractor().extract(&artifact(&envelope(TWO_CARDS))).unwrap();

        let names: Vec<&str> = extractions
            .iter()
            .filter(|e| e.field == Field::Name)
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(names, vec!["John Smith", "Jane Doe"]);

        let john_website = extractions
            .iter()
            .find(|e| e.field == Field::Website)
            .unwrap();
        assert_eq!(john_website.value, "http://johnsmith.ca");
        assert_eq!(
            john_website.hint.as_ref().unwrap().name,
            "John Smith"
        );

        // Jane's phone came from the tel: fallback, her email from mailto:
        // with the subject parameter stripped.
        let jane_phone = extractions
            .iter()
            .find(|e| e.field == Field::Phone && e.hint.as_ref().unwrap().name == "Jane Doe")
            .unwrap();
        assert_eq!(jane_phone.value, "306-555-1111");
        let jane_email = extractions.iter().find(|e| e.field == Field::Email).unwrap();
        assert_eq!(jane_email.value, "jane@x.com");
    }

    #[test]
    fn listing_confidence_is_implicit() {
        let extractions = extractor().extract(&artifact(&envelope(TWO_CARDS))).unwrap();
        assert!(extractions.iter().all(|e| e.confidence.is_none()));
    }

    #[test]
    fn empty_page_yields_no_extractions() {
        let extractions = extractor()
            .extract(&artifact(&envelope("<span id=\"RealtorResults\"></span>")))
            .unwrap();
        assert!(extractions.is_empty());
    }

    #[test]
    fn nameless_card_is_skipped() {
        let html = r#"<div class="realtorCard"><span class="TelephoneNumber">306-555-2222</span></div>"#;
        let extractions = extractor().extract(&artifact(&envelope(html))).unwrap();
        assert!(extractions.is_empty());
    }

    #[test]
    fn non_json_artifact_is_malformed() {
        let err = extractor().extract(&artifact("<html>not json</html>"));
        assert!(matches!(err, Err(AppError::Malformed { .. })));
    }

    #[test]
    fn envelope_without_html_is_malformed() {
        let err = extractor().extract(&artifact(r#"{"d": "plain text"}"#));
        assert!(matches!(err, Err(AppError::Malformed { .. })));
    }

    #[test]
    fn alternate_envelope_keys_are_probed() {
        let body = serde_json::json!({
            "html": "<div class=\"realtorCard\"><span class=\"realtorCardName\">A B</span></div>"
        })
        .to_string();
        let extractions = extractor().extract(&artifact(&body)).unwrap();
        assert_eq!(extractions.len(), 1);
        assert_eq!(extractions[0].value, "A B");
    }
}
