//! Shared request execution for the cognitive-service clients.

use crate::config::RetryPolicy;
use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Why a request ultimately failed, as text for the caller's own error variant.
#[derive(Debug)]
pub struct RequestFailure {
    pub message: String,
    pub attempts: u32,
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
}

/// One request and its full response body. Errors carry whether they may be retried.
async fn exchange(service: &str, request: RequestBuilder) -> Result<Vec<u8>, (bool, String)> {
    let res = request
        .send()
        .await
        .map_err(|e| (true, format!("{} request failed: {}", service, e)))?;
    let status = res.status();
    let body = res
        .bytes()
        .await
        .map_err(|e| (true, format!("{} response body failed: {}", service, e)))?;

    if status.is_success() {
        Ok(body.to_vec())
    } else {
        Err((
            is_retryable(status),
            format!(
                "{} request failed with status {}: {}",
                service,
                status,
                String::from_utf8_lossy(&body)
            ),
        ))
    }
}

/// Sends the request built by `build` and returns the response body, retrying
/// transport errors, timeouts and 5xx responses up to `retry.max_retries` times.
/// Other statuses fail at once.
///
/// `request_timeout` bounds each attempt from sending until the last body byte.
pub async fn send_with_retry<F>(
    service: &str,
    retry: RetryPolicy,
    request_timeout: Duration,
    build: F,
) -> Result<Vec<u8>, RequestFailure>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let outcome = match timeout(request_timeout, exchange(service, build())).await {
            Err(_) => Err((
                true,
                format!("{} request timed out after {:?}", service, request_timeout),
            )),
            Ok(result) => result,
        };

        match outcome {
            Ok(body) => return Ok(body),
            Err((retryable, message)) if retryable && attempt <= retry.max_retries => {
                let delay = retry.delay_for(attempt);
                warn!(service, attempt, ?delay, "{}; retrying", message);
                sleep(delay).await;
            }
            Err((_, message)) => {
                return Err(RequestFailure {
                    message,
                    attempts: attempt,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/flaky", mock_server.uri());
        let body = send_with_retry("test", policy(2), Duration::from_secs(5), || client.get(&url))
            .await
            .expect("third attempt should succeed");
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_fail_fast_without_retries() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = mock_server.uri();
        let failure = send_with_retry("test", policy(0), Duration::from_secs(5), || client.get(&url))
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert!(failure.message.contains("500"));
        assert!(failure.message.contains("boom"));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = mock_server.uri();
        let failure = send_with_retry("test", policy(3), Duration::from_secs(5), || client.get(&url))
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_responses_are_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = mock_server.uri();
        let failure = send_with_retry("test", policy(2), Duration::from_secs(5), || client.get(&url))
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert!(failure.message.contains("429"));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = mock_server.uri();
        let failure =
            send_with_retry("test", policy(0), Duration::from_millis(50), || client.get(&url))
                .await
                .unwrap_err();
        assert!(failure.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let url = stalled_body_server().await;

        let client = reqwest::Client::new();
        let started = Instant::now();
        let failure =
            send_with_retry("test", policy(1), Duration::from_millis(200), || client.get(&url))
                .await
                .unwrap_err();

        assert!(failure.message.contains("timed out"), "{}", failure.message);
        assert_eq!(failure.attempts, 2);
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}

/// Serves connections that answer with headers and the first few body bytes, then go silent.
#[cfg(test)]
pub(crate) async fn stalled_body_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"pre",
                    )
                    .await;
                sleep(Duration::from_secs(30)).await;
            });
        }
    });
    format!("http://{}/", addr)
}
