//! Enrichment Pipeline - main orchestrator for the Brain module.
//!
//! Tokenizes the utterance, then queries the intent classifier and the
//! sentiment analyzer concurrently (the two calls are independent) and merges
//! everything into an [`EnrichmentRecord`].
//!
//! A failed analysis call is never hidden inside a client: it reaches this
//! module as an [`EnrichmentError`] and the configured [`FailurePolicy`]
//! decides what happens to the record.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use super::intent::IntentResult;
use super::record::EnrichmentRecord;
use super::sentiment::SentimentResult;
use super::tokenizer::Tokenizer;
use crate::actors::traits::{IntentRecognizer, SentimentAnalyzer};
use crate::error::EnrichmentError;
use crate::models::Utterance;

/// What to do when the classifier or the sentiment call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Build nothing and surface the error.
    #[default]
    Abort,
    /// Use sentinel results for the failed part and mark the record degraded.
    Substitute,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "substitute" => Ok(FailurePolicy::Substitute),
            other => Err(format!(
                "unknown failure policy '{}' (expected 'abort' or 'substitute')",
                other
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Substitute => write!(f, "substitute"),
        }
    }
}

/// Runs one utterance through tokenizer, classifier and sentiment analyzer.
///
/// Stateless between calls; safe to share across tasks.
pub struct EnrichmentPipeline<I, S>
where
    I: IntentRecognizer,
    S: SentimentAnalyzer,
{
    tokenizer: Tokenizer,
    classifier: Arc<I>,
    sentiment: Arc<S>,
    policy: FailurePolicy,
}

impl<I, S> EnrichmentPipeline<I, S>
where
    I: IntentRecognizer,
    S: SentimentAnalyzer,
{
    pub fn new(tokenizer: Tokenizer, classifier: Arc<I>, sentiment: Arc<S>, policy: FailurePolicy) -> Self {
        Self {
            tokenizer,
            classifier,
            sentiment,
            policy,
        }
    }

    /// Enrich a single utterance into a record ready to be written.
    ///
    /// With [`FailurePolicy::Abort`] the first analysis failure is returned
    /// (classifier before sentiment). With [`FailurePolicy::Substitute`] a
    /// record is always built.
    #[instrument(skip(self, utterance), fields(channel = %utterance.channel_id, policy = %self.policy))]
    pub async fn enrich(&self, utterance: &Utterance) -> Result<EnrichmentRecord, EnrichmentError> {
        let start = Instant::now();

        // 1. Tokenize (pure, cannot fail)
        let tokenized = self.tokenizer.tokenize_utterance(&utterance.text);

        // 2. Classify and score sentiment concurrently
        let texts = [utterance.text.clone()];
        let (intent, sentiment) = tokio::join!(
            self.classifier.classify(&utterance.text),
            self.sentiment.analyze_sentiment(&texts),
        );
        let sentiment = sentiment.and_then(|results| {
            results.into_iter().next().ok_or_else(|| {
                EnrichmentError::SentimentUnavailable(
                    "no result returned for the utterance".to_string(),
                )
            })
        });

        // 3. Apply the partial-failure policy
        let (intent, sentiment, degraded) = self.resolve(intent, sentiment)?;

        // 4. Merge
        let mut record = EnrichmentRecord::build(utterance, &tokenized, &intent, &sentiment);
        if degraded {
            record = record.into_degraded();
        }

        info!(
            key = %record.id,
            intent = %record.luis_intent,
            sentiment = %record.sentiment,
            tokens = tokenized.tokens().len(),
            degraded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Utterance enriched"
        );
        Ok(record)
    }

    fn resolve(
        &self,
        intent: Result<IntentResult, EnrichmentError>,
        sentiment: Result<SentimentResult, EnrichmentError>,
    ) -> Result<(IntentResult, SentimentResult, bool), EnrichmentError> {
        match self.policy {
            FailurePolicy::Abort => {
                let intent = intent.inspect_err(|e| error!("Aborting enrichment: {}", e))?;
                let sentiment = sentiment.inspect_err(|e| error!("Aborting enrichment: {}", e))?;
                Ok((intent, sentiment, false))
            }
            FailurePolicy::Substitute => {
                let mut degraded = false;
                let intent = intent.unwrap_or_else(|e| {
                    warn!("Substituting unknown intent: {}", e);
                    degraded = true;
                    IntentResult::unknown()
                });
                let sentiment = sentiment.unwrap_or_else(|e| {
                    warn!("Substituting unknown sentiment: {}", e);
                    degraded = true;
                    SentimentResult::unknown()
                });
                Ok((intent, sentiment, degraded))
            }
        }
    }
}
