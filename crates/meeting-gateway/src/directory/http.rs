use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{DirectoryError, DirectoryLookup, Resolution};
use crate::errors::GatewayError;

/// Attempts made per lookup: the first request plus one retry
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Deserialize)]
struct MapperResponse {
    #[serde(default)]
    conference: Option<String>,
}

/// How a single request ended
#[derive(Debug)]
enum Attempt {
    /// 200 or 4xx: no retry
    Final(Result<Resolution, DirectoryError>),
    /// Timeout, transport error or any other status
    Retryable(DirectoryError),
}

/// Conference mapper client: `GET <base>?cid=<identifier>`
///
/// Status 200 carries `{"conference": "<address>"}`; 4xx means the identifier
/// is unknown. Anything else is retried once with the same timeout, so a
/// lookup never takes longer than twice the configured timeout.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: Client,
    base_url: String,
}

impl HttpDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::errors::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn attempt(&self, identifier: &str) -> Attempt {
        let response = match self
            .client
            .get(&self.base_url)
            .query(&[("cid", identifier)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(cid = %identifier, url = %self.base_url, "Directory request timed out");
                return Attempt::Retryable(DirectoryError::Timeout);
            }
            Err(e) => {
                warn!(
                    cid = %identifier,
                    url = %self.base_url,
                    error = %e,
                    "Directory request failed"
                );
                return Attempt::Retryable(DirectoryError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        let headers = format!("{:?}", response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Attempt::Retryable(DirectoryError::Timeout),
            Err(e) => return Attempt::Retryable(DirectoryError::Transport(e.to_string())),
        };

        if status != StatusCode::OK {
            warn!(
                cid = %identifier,
                status = status.as_u16(),
                body = %body,
                headers = %headers,
                "Conference lookup returned non-OK status"
            );
        }

        classify(status, &body)
    }
}

fn classify(status: StatusCode, body: &str) -> Attempt {
    if status == StatusCode::OK {
        let parsed = serde_json::from_str::<MapperResponse>(body)
            .map_err(|e| DirectoryError::MalformedResponse(e.to_string()))
            .map(|mapped| match mapped.conference {
                Some(address) if !address.is_empty() => Resolution::Resolved(address),
                _ => Resolution::NotFound,
            });
        return Attempt::Final(parsed);
    }
    if status.is_client_error() {
        return Attempt::Final(Ok(Resolution::NotFound));
    }
    Attempt::Retryable(DirectoryError::Status(status.as_u16()))
}

#[async_trait]
impl DirectoryLookup for HttpDirectory {
    async fn resolve(&self, identifier: &str) -> Result<Resolution, DirectoryError> {
        let mut last_error = DirectoryError::Timeout;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(identifier).await {
                Attempt::Final(outcome) => {
                    debug!(cid = %identifier, attempt, ?outcome, "Conference lookup finished");
                    return outcome;
                }
                Attempt::Retryable(error) => {
                    if attempt < MAX_ATTEMPTS {
                        warn!(cid = %identifier, %error, "Retrying conference lookup");
                    }
                    last_error = error;
                }
            }
        }
        warn!(cid = %identifier, error = %last_error, "Conference lookup failed after retry");
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn directory(server: &MockServer, timeout: Duration) -> HttpDirectory {
        HttpDirectory::new(format!("{}/conferenceMapper", server.uri()), timeout).unwrap()
    }

    #[tokio::test]
    async fn resolves_known_identifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conferenceMapper"))
            .and(query_param("cid", "123456"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"conference": "room@conference.meet.example"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = directory(&server, Duration::from_secs(3)).await.resolve("123456").await;
        assert_eq!(
            outcome,
            Ok(Resolution::Resolved("room@conference.meet.example".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_conference_field_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 42})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = directory(&server, Duration::from_secs(3)).await.resolve("42").await;
        assert_eq!(outcome, Ok(Resolution::NotFound));
    }

    #[tokio::test]
    async fn client_error_fails_fast_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = directory(&server, Duration::from_secs(3)).await.resolve("999").await;
        assert_eq!(outcome, Ok(Resolution::NotFound));
    }

    #[tokio::test]
    async fn server_error_is_retried_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let outcome = directory(&server, Duration::from_secs(3)).await.resolve("1").await;
        assert_eq!(outcome, Err(DirectoryError::Status(503)));
    }

    #[tokio::test]
    async fn retry_can_recover() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"conference": "room"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = directory(&server, Duration::from_secs(3)).await.resolve("7").await;
        assert_eq!(outcome, Ok(Resolution::Resolved("room".to_string())));
    }

    #[tokio::test]
    async fn timeouts_are_bounded_to_two_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(2)
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let outcome = directory(&server, Duration::from_millis(100)).await.resolve("1").await;
        assert_eq!(outcome, Err(DirectoryError::Timeout));
        assert!(started.elapsed() < Duration::from_millis(450));
    }

    #[tokio::test]
    async fn invalid_json_is_a_lookup_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = directory(&server, Duration::from_secs(3)).await.resolve("1").await;
        assert!(matches!(outcome, Err(DirectoryError::MalformedResponse(_))));
    }
}
