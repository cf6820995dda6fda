use crate::actors::http::send_with_retry;
use crate::actors::traits::IntentRecognizer;
use crate::brain::intent::IntentResult;
use crate::config::{LuisConfig, RetryPolicy};
use crate::error::EnrichmentError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const SERVICE: &str = "LUIS";

/// HTTP client for the LUIS v3 prediction endpoint.
///
/// Sends the utterance with fixed query options (no spell check, verbose,
/// all intents) and parses the top intent out of the prediction.
#[derive(Clone)]
pub struct LuisClient {
    client: Client,
    prediction_url: Url,
    prediction_key: String,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl LuisClient {
    pub fn new(
        config: &LuisConfig,
        retry: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: Client::new(),
            prediction_url: prediction_url(config)?,
            prediction_key: config.prediction_key.clone(),
            retry,
            request_timeout,
        })
    }

    fn query_params<'a>(&'a self, utterance: &'a str) -> [(&'static str, &'a str); 7] {
        [
            ("query", utterance),
            ("timezoneOffset", "0"),
            ("verbose", "true"),
            ("show-all-intents", "true"),
            ("spellCheck", "false"),
            ("staging", "false"),
            ("subscription-key", self.prediction_key.as_str()),
        ]
    }
}

fn prediction_url(config: &LuisConfig) -> Result<Url, url::ParseError> {
    let mut base = config.endpoint.trim_end_matches('/').to_string();
    base.push('/');
    Url::parse(&base)?.join(&format!(
        "luis/prediction/v3.0/apps/{}/slots/{}/predict",
        config.app_id, config.slot
    ))
}

#[async_trait]
impl IntentRecognizer for LuisClient {
    #[instrument(skip(self, utterance), fields(service = SERVICE))]
    async fn classify(&self, utterance: &str) -> Result<IntentResult, EnrichmentError> {
        let params = self.query_params(utterance);
        let body = send_with_retry(SERVICE, self.retry, self.request_timeout, || {
            self.client.get(self.prediction_url.clone()).query(&params)
        })
        .await
        .map_err(|failure| {
            debug!(attempts = failure.attempts, "Classifier request gave up");
            EnrichmentError::ClassifierUnavailable(failure.message)
        })?;

        let body: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
            EnrichmentError::ClassifierMalformedResponse(format!("invalid JSON body: {}", e))
        })?;

        let result = IntentResult::from_prediction(&body)?;
        info!(intent = %result.intent, score = result.score, "Intent classified");
        Ok(result)
    }
}
