//! Enrichment Record - the persisted unit of the pipeline.
//!
//! Merges the utterance, its tokens, the intent and the sentiment into one
//! flat document. Every build draws a fresh random key.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intent::IntentResult;
use super::sentiment::SentimentResult;
use super::tokenizer::TokenizedUtterance;
use crate::models::Utterance;

/// Enriched, storable form of one utterance.
///
/// Field names are the document's stored keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    /// Storage key, a random UUID v4
    pub id: String,
    pub message: String,
    pub timestamp: String,
    pub sentiment: String,
    pub negative_score: f64,
    pub positive_score: f64,
    pub neutral_score: f64,
    pub luis_sentiment: String,
    pub luis_intent: String,
    pub luis_intent_score: f64,
    pub channel_name: String,
    pub message_tokenized: String,
    /// Set when one of the analysis results is a substitute for a failed call.
    #[serde(default)]
    pub degraded: bool,
}

impl EnrichmentRecord {
    /// Merge all four inputs into a record under a newly generated key.
    pub fn build(
        utterance: &Utterance,
        tokenized: &TokenizedUtterance,
        intent: &IntentResult,
        sentiment: &SentimentResult,
    ) -> Self {
        let scores = sentiment.confidence_scores;
        Self {
            id: Uuid::new_v4().to_string(),
            message: utterance.text.clone(),
            timestamp: utterance.timestamp.clone(),
            sentiment: sentiment.sentiment.label().to_string(),
            negative_score: scores.negative,
            positive_score: scores.positive,
            neutral_score: scores.neutral,
            luis_sentiment: intent.sentiment.clone(),
            luis_intent: intent.intent.clone(),
            luis_intent_score: intent.score,
            channel_name: utterance.channel_id.clone(),
            message_tokenized: tokenized.joined(),
            degraded: false,
        }
    }

    pub fn into_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.id
    }

    /// Field values in stored order, rendered as a bracketed list.
    pub fn field_list(&self) -> String {
        let values = [
            quote(&self.message),
            quote(&self.timestamp),
            quote(&self.sentiment),
            score(self.negative_score),
            score(self.positive_score),
            score(self.neutral_score),
            quote(&self.luis_sentiment),
            quote(&self.luis_intent),
            score(self.luis_intent_score),
            quote(&self.channel_name),
            quote(&self.message_tokenized),
        ];
        format!("[{}]", values.join(", "))
    }

    /// Reply text echoed back to the user after enrichment.
    pub fn render_reply(&self) -> String {
        format!("{}: The list is now: {}", self.channel_name, self.field_list())
    }
}

/// Scores always keep a fractional part, so `0` renders as `0.0`.
fn score(value: f64) -> String {
    format!("{:?}", value)
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::sentiment::{ConfidenceScores, SentimentLabel};
    use crate::brain::tokenizer::Tokenizer;

    fn inputs() -> (Utterance, TokenizedUtterance, IntentResult, SentimentResult) {
        let utterance = Utterance::new(
            "I love flying to Paris next Friday",
            "msteams",
            "03:04:05 PM, Friday, March 22 of 2024",
        );
        let tokenized = Tokenizer::default().tokenize_utterance(&utterance.text);
        let intent = IntentResult {
            intent: "BookFlight".to_string(),
            score: 0.91,
            sentiment: "positive".to_string(),
        };
        let sentiment = SentimentResult {
            sentiment: SentimentLabel::Positive,
            confidence_scores: ConfidenceScores {
                positive: 0.98,
                negative: 0.01,
                neutral: 0.01,
            },
        };
        (utterance, tokenized, intent, sentiment)
    }

    #[test]
    fn test_build_merges_fields() {
        let (utterance, tokenized, intent, sentiment) = inputs();
        let record = EnrichmentRecord::build(&utterance, &tokenized, &intent, &sentiment);

        assert_eq!(record.message, "I love flying to Paris next Friday");
        assert_eq!(record.timestamp, "03:04:05 PM, Friday, March 22 of 2024");
        assert_eq!(record.sentiment, "positive");
        assert_eq!(record.positive_score, 0.98);
        assert_eq!(record.luis_intent, "BookFlight");
        assert_eq!(record.luis_sentiment, "positive");
        assert_eq!(record.channel_name, "msteams");
        assert_eq!(record.message_tokenized, "love flying Paris Friday");
        assert!(!record.degraded);
        assert!(Uuid::parse_str(record.key()).is_ok());
    }

    #[test]
    fn test_keys_never_repeat_for_same_inputs() {
        let (utterance, tokenized, intent, sentiment) = inputs();
        let first = EnrichmentRecord::build(&utterance, &tokenized, &intent, &sentiment);
        let second = EnrichmentRecord::build(&utterance, &tokenized, &intent, &sentiment);

        assert_ne!(first.id, second.id);
        assert_eq!(first.message, second.message);
    }

    #[test]
    fn test_render_reply_lists_fields_in_order() {
        let (utterance, tokenized, intent, sentiment) = inputs();
        let record = EnrichmentRecord::build(&utterance, &tokenized, &intent, &sentiment);

        assert_eq!(
            record.render_reply(),
            "msteams: The list is now: ['I love flying to Paris next Friday', \
             '03:04:05 PM, Friday, March 22 of 2024', 'positive', 0.01, 0.98, 0.01, \
             'positive', 'BookFlight', 0.91, 'msteams', 'love flying Paris Friday']"
        );
    }

    #[test]
    fn test_zero_scores_keep_fractional_part() {
        let (utterance, tokenized, _, _) = inputs();
        let record = EnrichmentRecord::build(
            &utterance,
            &tokenized,
            &IntentResult::unknown(),
            &SentimentResult::unknown(),
        );

        let reply = record.render_reply();
        assert!(reply.contains("'neutral', 0.0, 0.0, 0.0, "), "{}", reply);
        assert!(!reply.contains(" 0,"), "{}", reply);
        assert_eq!(score(1.0), "1.0");
        assert_eq!(score(0.25), "0.25");
    }

    #[test]
    fn test_quotes_are_escaped() {
        assert_eq!(quote("it's"), "'it\\'s'");
    }

    #[test]
    fn test_serialized_field_names() {
        let (utterance, tokenized, intent, sentiment) = inputs();
        let record = EnrichmentRecord::build(&utterance, &tokenized, &intent, &sentiment);
        let value = serde_json::to_value(&record).unwrap();

        for field in [
            "message",
            "timestamp",
            "sentiment",
            "negative_score",
            "positive_score",
            "neutral_score",
            "luis_sentiment",
            "luis_intent",
            "luis_intent_score",
            "channel_name",
            "message_tokenized",
        ] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
    }
}
