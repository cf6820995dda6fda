use crate::actors::http::send_with_retry;
use crate::actors::traits::SentimentAnalyzer;
use crate::brain::sentiment::{SentimentResponse, SentimentResult};
use crate::config::{RetryPolicy, TextAnalyticsConfig};
use crate::error::EnrichmentError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const SERVICE: &str = "Text Analytics";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Maximum documents the sentiment endpoint accepts per request.
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Serialize)]
struct SentimentRequest<'a> {
    documents: Vec<RequestDocument<'a>>,
}

#[derive(Serialize)]
struct RequestDocument<'a> {
    id: String,
    language: &'a str,
    text: &'a str,
}

/// HTTP client for the Text Analytics v3.1 sentiment endpoint.
#[derive(Clone)]
pub struct TextAnalyticsClient {
    client: Client,
    sentiment_url: Url,
    key: String,
    language: String,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl TextAnalyticsClient {
    pub fn new(
        config: &TextAnalyticsConfig,
        retry: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        let mut base = config.endpoint.trim_end_matches('/').to_string();
        base.push('/');
        Ok(Self {
            client: Client::new(),
            sentiment_url: Url::parse(&base)?.join("text/analytics/v3.1/sentiment")?,
            key: config.key.clone(),
            language: config.language.clone(),
            retry,
            request_timeout,
        })
    }

    /// Scores one batch; document ids are the global input positions.
    async fn analyze_batch(
        &self,
        offset: usize,
        batch: &[String],
    ) -> Result<Vec<SentimentResult>, EnrichmentError> {
        let request = SentimentRequest {
            documents: batch
                .iter()
                .enumerate()
                .map(|(i, text)| RequestDocument {
                    id: (offset + i).to_string(),
                    language: &self.language,
                    text,
                })
                .collect(),
        };

        let body = send_with_retry(SERVICE, self.retry, self.request_timeout, || {
            self.client
                .post(self.sentiment_url.clone())
                .header(SUBSCRIPTION_KEY_HEADER, &self.key)
                .json(&request)
        })
        .await
        .map_err(|failure| {
            debug!(attempts = failure.attempts, "Sentiment request gave up");
            EnrichmentError::SentimentUnavailable(failure.message)
        })?;

        let response: SentimentResponse = serde_json::from_slice(&body).map_err(|e| {
            EnrichmentError::SentimentUnavailable(format!("invalid response body: {}", e))
        })?;

        response.into_ordered_results(offset, batch.len())
    }
}

#[async_trait]
impl SentimentAnalyzer for TextAnalyticsClient {
    #[instrument(skip(self, utterances), fields(service = SERVICE, count = utterances.len()))]
    async fn analyze_sentiment(
        &self,
        utterances: &[String],
    ) -> Result<Vec<SentimentResult>, EnrichmentError> {
        let mut results = Vec::with_capacity(utterances.len());
        for (index, batch) in utterances.chunks(MAX_BATCH_SIZE).enumerate() {
            let offset = index * MAX_BATCH_SIZE;
            debug!(offset, size = batch.len(), "Scoring sentiment batch");
            results.extend(self.analyze_batch(offset, batch).await?);
        }
        Ok(results)
    }
}
