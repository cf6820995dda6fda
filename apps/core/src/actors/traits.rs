use crate::actors::messages::AppError;
use crate::brain::intent::IntentResult;
use crate::brain::record::EnrichmentRecord;
use crate::brain::sentiment::SentimentResult;
use crate::error::EnrichmentError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Defines the public interface for a remote intent classifier.
///
/// Implementations make one outbound call per invocation (plus configured retries)
/// and never swallow failures.
#[async_trait]
pub trait IntentRecognizer: Send + Sync + 'static {
    /// Classifies one utterance, returning its top intent and the classifier's sentiment label.
    async fn classify(&self, utterance: &str) -> Result<IntentResult, EnrichmentError>;
}

/// Defines the public interface for a remote sentiment analyzer.
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync + 'static {
    /// Returns exactly one result per input, in input order. Empty input yields an empty result.
    async fn analyze_sentiment(
        &self,
        utterances: &[String],
    ) -> Result<Vec<SentimentResult>, EnrichmentError>;
}

/// Defines the public interface for a keyed, partitioned document store.
///
/// The store is append-only: writing under an existing key is an error.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Writes every entry of `changes` or none of them.
    async fn write(&self, changes: HashMap<String, EnrichmentRecord>) -> Result<(), AppError>;

    /// Reads the records stored under `keys`; absent keys are simply missing from the map.
    async fn read(&self, keys: &[String]) -> Result<HashMap<String, EnrichmentRecord>, AppError>;
}
