//! Intent results and prediction-response parsing.
//!
//! The classification itself happens remotely; this module only turns the
//! prediction JSON into an [`IntentResult`].

use crate::error::EnrichmentError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Label used when the classifier returns no intents at all.
pub const NO_INTENT: &str = "None";

/// Classifier sentiment label used when the real one is unavailable.
pub const UNKNOWN_SENTIMENT: &str = "unknown";

/// Result of intent classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Top intent label, taken verbatim from the classifier's taxonomy
    pub intent: String,
    /// Confidence of the top intent only (0.0 - 1.0)
    pub score: f64,
    /// Sentiment label produced by the same classifier call
    pub sentiment: String,
}

impl IntentResult {
    /// Result for a prediction that carried no intents.
    pub fn no_intent(sentiment: impl Into<String>) -> Self {
        Self {
            intent: NO_INTENT.to_string(),
            score: 0.0,
            sentiment: sentiment.into(),
        }
    }

    /// Stand-in used when the classifier call failed and the pipeline substitutes.
    pub fn unknown() -> Self {
        Self::no_intent(UNKNOWN_SENTIMENT)
    }

    /// Parses a prediction response (`prediction.intents.*.score`, `prediction.sentiment.label`).
    ///
    /// The top intent is the one with the highest score; on a tie the entry
    /// the classifier listed first wins.
    pub fn from_prediction(response: &Value) -> Result<Self, EnrichmentError> {
        let prediction = response
            .get("prediction")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed("missing 'prediction' object"))?;

        let intents = prediction
            .get("intents")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed("missing 'prediction.intents' mapping"))?;

        let sentiment = prediction
            .get("sentiment")
            .and_then(|s| s.get("label"))
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing 'prediction.sentiment.label'"))?
            .to_string();

        let Some((intent, score)) = top_intent(intents)? else {
            return Ok(Self::no_intent(sentiment));
        };

        if let Some(reported) = prediction.get("topIntent").and_then(Value::as_str) {
            if reported != intent {
                debug!(reported, selected = %intent, "topIntent differs from highest-scoring intent");
            }
        }

        Ok(Self {
            intent,
            score,
            sentiment,
        })
    }
}

impl fmt::Display for IntentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0}%)", self.intent, self.score * 100.0)
    }
}

fn malformed(detail: &str) -> EnrichmentError {
    EnrichmentError::ClassifierMalformedResponse(detail.to_string())
}

fn top_intent(intents: &Map<String, Value>) -> Result<Option<(String, f64)>, EnrichmentError> {
    let mut best: Option<(&String, f64)> = None;

    for (name, entry) in intents {
        let score = entry
            .get("score")
            .and_then(Value::as_f64)
            .ok_or_else(|| malformed(&format!("intent '{}' has no numeric score", name)))?;
        if !(0.0..=1.0).contains(&score) {
            return Err(malformed(&format!(
                "intent '{}' score {} outside [0, 1]",
                name, score
            )));
        }
        // Strictly greater keeps the first of equal scores.
        if best.map_or(true, |(_, current)| score > current) {
            best = Some((name, score));
        }
    }

    Ok(best.map(|(name, score)| (name.clone(), score)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prediction(intents: Value) -> Value {
        json!({
            "query": "I love flying to Paris next Friday",
            "prediction": {
                "topIntent": "BookFlight",
                "intents": intents,
                "sentiment": { "label": "positive", "score": 0.93 },
                "entities": {}
            }
        })
    }

    #[test]
    fn test_picks_highest_score() {
        let response = prediction(json!({
            "BookFlight": { "score": 0.91 },
            "GetWeather": { "score": 0.04 },
            "None": { "score": 0.02 }
        }));

        let result = IntentResult::from_prediction(&response).unwrap();
        assert_eq!(result.intent, "BookFlight");
        assert!((result.score - 0.91).abs() < f64::EPSILON);
        assert_eq!(result.sentiment, "positive");
    }

    #[test]
    fn test_highest_score_not_listed_first() {
        let response = prediction(json!({
            "Cancel": { "score": 0.10 },
            "GetWeather": { "score": 0.75 }
        }));

        let result = IntentResult::from_prediction(&response).unwrap();
        assert_eq!(result.intent, "GetWeather");
    }

    #[test]
    fn test_tie_goes_to_first_listed() {
        let response = prediction(json!({
            "Cancel": { "score": 0.5 },
            "BookFlight": { "score": 0.5 }
        }));

        let result = IntentResult::from_prediction(&response).unwrap();
        assert_eq!(result.intent, "Cancel");
    }

    #[test]
    fn test_empty_intents_is_no_intent() {
        let response = prediction(json!({}));

        let result = IntentResult::from_prediction(&response).unwrap();
        assert_eq!(result.intent, NO_INTENT);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.sentiment, "positive");
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let no_prediction = json!({ "query": "hi" });
        assert!(matches!(
            IntentResult::from_prediction(&no_prediction),
            Err(EnrichmentError::ClassifierMalformedResponse(_))
        ));

        let no_sentiment = json!({ "prediction": { "intents": {} } });
        assert!(matches!(
            IntentResult::from_prediction(&no_sentiment),
            Err(EnrichmentError::ClassifierMalformedResponse(_))
        ));

        let no_score = prediction(json!({ "BookFlight": {} }));
        assert!(matches!(
            IntentResult::from_prediction(&no_score),
            Err(EnrichmentError::ClassifierMalformedResponse(_))
        ));
    }

    #[test]
    fn test_out_of_range_score_is_malformed() {
        let response = prediction(json!({ "BookFlight": { "score": 1.5 } }));
        assert!(IntentResult::from_prediction(&response).is_err());
    }

    #[test]
    fn test_display() {
        let result = IntentResult {
            intent: "BookFlight".to_string(),
            score: 0.9,
            sentiment: "neutral".to_string(),
        };
        assert_eq!(result.to_string(), "BookFlight (90%)");
    }
}
