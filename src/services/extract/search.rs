//! Search-result miner (stage 3).
//!
//! The search capability answers a batched query with a JSON array of
//! hits, each carrying the realtor name it matched and a correctness
//! likelihood. Typical source tiers: 1.0 official website, 0.8
//! professional directory, 0.6 business listing, 0.4 social media.
//!
//! Every emitted value carries a confidence in [0,1]; a hit with no
//! contact fields contributes nothing.

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Field, IdentityHint};
use crate::services::extract::{Extraction, Extractor};
use crate::storage::FetchRecord;

/// One search hit as served by the search capability.
#[derive(Debug, Deserialize)]
struct SearchHit {
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    website: String,
    confidence: f64,
}

#[derive(Debug, Default)]
pub struct SearchExtractor;

impl SearchExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for SearchExtractor {
    fn extract(&self, artifact: &FetchRecord) -> Result<Vec<Extraction>> {
        let hits: Vec<SearchHit> = serde_json::from_str(&artifact.body)
            .map_err(|e| AppError::malformed(&artifact.key, e))?;

        let mut extractions = Vec::new();
        for hit in hits {
            if hit.name.trim().is_empty() {
                continue;
            }
            let hint = IdentityHint::named(hit.name.trim());
            let confidence = hit.confidence.clamp(0.0, 1.0);
            for (field, value) in [
                (Field::Phone, &hit.phone),
                (Field::Email, &hit.email),
                (Field::Website, &hit.website),
            ] {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                extractions.push(Extraction {
                    hint: Some(hint.clone()),
                    field,
                    value: value.to_string(),
                    confidence: Some(confidence),
                });
            }
        }
        Ok(extractions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn artifact(body: &str) -> FetchRecord {
        FetchRecord {
            key: "search_001".into(),
            body: body.into(),
            content_type: "application/json".into(),
            fetched_at: Utc::now(),
            stage: "search".into(),
        }
    }

    #[test]
    fn every_value_carries_confidence() {
        let body = serde_json::json!([
            { "name": "Jane Doe", "email": "jane@directory.ca", "confidence": 0.8 },
            { "name": "John Smith", "phone": "306-555-0000",
              "website": "http://johnsmith.ca", "confidence": 0.6 }
        ])
        .to_string();

        let extractions = SearchExtractor::new().extract(&artifact(&body)).unwrap();
        assert_eq!(extractions.len(), 3);
        assert!(extractions.iter().all(|e| e.confidence.is_some()));
        assert_eq!(extractions[0].confidence, Some(0.8));
        assert_eq!(
            extractions[0].hint.as_ref().unwrap().name,
            "Jane Doe"
        );
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let body = serde_json::json!([
            { "name": "A", "email": "a@x.com", "confidence": 1.7 },
            { "name": "B", "email": "b@x.com", "confidence": -0.2 }
        ])
        .to_string();

        let extractions = SearchExtractor::new().extract(&artifact(&body)).unwrap();
        assert_eq!(extractions[0].confidence, Some(1.0));
        assert_eq!(extractions[1].confidence, Some(0.0));
    }

    #[test]
    fn empty_fields_emit_nothing() {
        let body = serde_json::json!([
            { "name": "Nobody Found", "confidence": 0.0 }
        ])
        .to_string();

        let extractions = SearchExtractor::new().extract(&artifact(&body)).unwrap();
        assert!(extractions.is_empty());
    }

    #[test]
    fn non_json_artifact_is_malformed() {
        let err = SearchExtractor::new().extract(&artifact("not json"));
        assert!(matches!(err, Err(AppError::Malformed { .. })));
    }
}
