//! Sentiment results and batch-response parsing.

use crate::error::EnrichmentError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Document-level sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub fn label(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Mixed => "mixed",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Per-class confidence. The three values need not sum to exactly 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl ConfidenceScores {
    fn all_in_unit_range(&self) -> bool {
        [self.positive, self.negative, self.neutral]
            .iter()
            .all(|s| (0.0..=1.0).contains(s))
    }
}

/// Sentiment of one utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: SentimentLabel,
    pub confidence_scores: ConfidenceScores,
}

impl SentimentResult {
    /// Stand-in used when the sentiment call failed and the pipeline substitutes.
    pub fn unknown() -> Self {
        Self {
            sentiment: SentimentLabel::Neutral,
            confidence_scores: ConfidenceScores {
                positive: 0.0,
                negative: 0.0,
                neutral: 0.0,
            },
        }
    }
}

/// Wire shape of a batch sentiment response.
#[derive(Debug, Deserialize)]
pub struct SentimentResponse {
    #[serde(default)]
    pub documents: Vec<DocumentSentiment>,
    #[serde(default)]
    pub errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentSentiment {
    pub id: String,
    pub sentiment: SentimentLabel,
    #[serde(rename = "confidenceScores", alias = "confidence_scores")]
    pub confidence_scores: ConfidenceScores,
}

#[derive(Debug, Deserialize)]
pub struct DocumentError {
    pub id: String,
    #[serde(default)]
    pub error: serde_json::Value,
}

impl SentimentResponse {
    /// Results for documents `id_offset .. id_offset + expected`, in id order.
    ///
    /// Any per-document error, missing document or out-of-range score fails the batch.
    pub fn into_ordered_results(
        self,
        id_offset: usize,
        expected: usize,
    ) -> Result<Vec<SentimentResult>, EnrichmentError> {
        if let Some(first) = self.errors.first() {
            return Err(EnrichmentError::SentimentUnavailable(format!(
                "document {} failed: {}",
                first.id, first.error
            )));
        }

        let mut by_id: HashMap<String, DocumentSentiment> = self
            .documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();

        (id_offset..id_offset + expected)
            .map(|index| {
                let doc = by_id.remove(&index.to_string()).ok_or_else(|| {
                    EnrichmentError::SentimentUnavailable(format!(
                        "no result for document {}",
                        index
                    ))
                })?;
                if !doc.confidence_scores.all_in_unit_range() {
                    return Err(EnrichmentError::SentimentUnavailable(format!(
                        "document {} has confidence scores outside [0, 1]",
                        index
                    )));
                }
                Ok(SentimentResult {
                    sentiment: doc.sentiment,
                    confidence_scores: doc.confidence_scores,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> SentimentResponse {
        serde_json::from_value(value).expect("valid sentiment response")
    }

    #[test]
    fn test_results_follow_id_order() {
        let response = parse(json!({
            "documents": [
                { "id": "1", "sentiment": "negative",
                  "confidenceScores": { "positive": 0.01, "neutral": 0.04, "negative": 0.95 } },
                { "id": "0", "sentiment": "positive",
                  "confidenceScores": { "positive": 0.98, "neutral": 0.01, "negative": 0.01 } }
            ],
            "errors": []
        }));

        let results = response.into_ordered_results(0, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sentiment, SentimentLabel::Positive);
        assert_eq!(results[1].sentiment, SentimentLabel::Negative);
        assert!((results[1].confidence_scores.negative - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snake_case_scores_accepted() {
        let response = parse(json!({
            "documents": [
                { "id": "0", "sentiment": "mixed",
                  "confidence_scores": { "positive": 0.4, "neutral": 0.2, "negative": 0.4 } }
            ]
        }));

        let results = response.into_ordered_results(0, 1).unwrap();
        assert_eq!(results[0].sentiment, SentimentLabel::Mixed);
    }

    #[test]
    fn test_document_error_fails_batch() {
        let response = parse(json!({
            "documents": [],
            "errors": [ { "id": "0", "error": { "code": "InvalidArgument" } } ]
        }));

        let err = response.into_ordered_results(0, 1).unwrap_err();
        assert!(matches!(err, EnrichmentError::SentimentUnavailable(msg) if msg.contains("InvalidArgument")));
    }

    #[test]
    fn test_missing_document_fails_batch() {
        let response = parse(json!({ "documents": [] }));
        assert!(response.into_ordered_results(0, 1).is_err());
    }

    #[test]
    fn test_out_of_range_scores_rejected() {
        let response = parse(json!({
            "documents": [
                { "id": "0", "sentiment": "positive",
                  "confidenceScores": { "positive": 1.2, "neutral": 0.0, "negative": 0.0 } }
            ]
        }));
        assert!(response.into_ordered_results(0, 1).is_err());
    }

    #[test]
    fn test_offset_ids() {
        let response = parse(json!({
            "documents": [
                { "id": "10", "sentiment": "neutral",
                  "confidenceScores": { "positive": 0.1, "neutral": 0.8, "negative": 0.1 } }
            ]
        }));
        let results = response.into_ordered_results(10, 1).unwrap();
        assert_eq!(results[0].sentiment, SentimentLabel::Neutral);
    }

    #[test]
    fn test_unknown_label_is_rejected_by_serde() {
        let value = json!({
            "documents": [
                { "id": "0", "sentiment": "ecstatic",
                  "confidenceScores": { "positive": 1.0, "neutral": 0.0, "negative": 0.0 } }
            ]
        });
        assert!(serde_json::from_value::<SentimentResponse>(value).is_err());
    }
}
