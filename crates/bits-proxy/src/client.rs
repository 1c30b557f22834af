//! GitHub contents API client

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::credential::CredentialProvider;
use crate::error::ProxyError;

/// Media type asking GitHub for the raw file body instead of the JSON envelope
const RAW_CONTENT_TYPE: &str = "application/vnd.github.raw+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
/// GitHub rejects requests without a User-Agent
const CLIENT_ID: &str = "plugin-bits";

/// Source of the raw endpoint registry text
#[async_trait]
pub trait EndpointSource: Send + Sync {
    /// Retrieve the whole delimited file as text
    async fn fetch(&self) -> Result<String, ProxyError>;
}

/// GitHub client configuration
#[derive(Clone, Debug)]
pub struct GithubClientConfig {
    /// Base URL of the GitHub API
    pub api_url: String,
    /// Repository owner (organisation)
    pub owner: String,
    /// Repository name
    pub repository: String,
    /// Path of the registry file inside the repository
    pub resource_path: String,
    /// Name of the access token to request from the credential provider
    pub token_name: String,
    /// Per-request deadline
    pub timeout: Duration,
    /// Pause before the single retry
    pub retry_backoff: Duration,
    pub breaker: BreakerConfig,
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: "data-altinn-no".to_string(),
            repository: "bits".to_string(),
            resource_path: "endpoints.csv".to_string(),
            token_name: "GITHUB_PAT".to_string(),
            timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_millis(500),
            breaker: BreakerConfig::default(),
        }
    }
}

/// Client for the GitHub repository contents endpoint
pub struct GithubClient {
    config: GithubClientConfig,
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    breaker: CircuitBreaker,
}

impl GithubClient {
    /// Create a new GitHub client
    pub fn new(
        config: GithubClientConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ProxyError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        info!(
            "Created GitHub client for {}/{} ({})",
            config.owner, config.repository, config.resource_path
        );

        let breaker = CircuitBreaker::new(config.breaker.clone());

        Ok(Self {
            config,
            client,
            credentials,
            breaker,
        })
    }

    /// URL of the registry file in the contents API
    pub fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repository,
            self.config.resource_path.trim_start_matches('/')
        )
    }

    /// Build the request for one fetch. Every header is set on the request
    /// itself, nothing is mutated on the shared client.
    fn build_request(&self, token: &str) -> Result<Request, ProxyError> {
        Ok(self
            .client
            .get(self.contents_url())
            .header(ACCEPT, RAW_CONTENT_TYPE)
            .bearer_auth(token)
            .header(API_VERSION_HEADER, API_VERSION)
            .header(USER_AGENT, CLIENT_ID)
            .build()?)
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn fetch_with_retry(&self, token: &str) -> Result<String, ProxyError> {
        match self.fetch_once(token).await {
            Err(e) if e.is_retryable() => {
                warn!(
                    "Endpoint registry fetch failed ({}), retrying in {:?}",
                    e, self.config.retry_backoff
                );
                tokio::time::sleep(self.config.retry_backoff).await;
                self.fetch_once(token).await
            }
            result => result,
        }
    }

    async fn fetch_once(&self, token: &str) -> Result<String, ProxyError> {
        let request = self.build_request(token)?;
        debug!("Fetching endpoint registry: {}", request.url());

        let response = self.client.execute(request).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            error!(
                "GitHub retrieval failed for banking endpoints, status code: {}, reason: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Not Found")
            );
            return Err(ProxyError::NotFound(self.config.resource_path.clone()));
        }

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            error!(
                "GitHub retrieval failed for banking endpoints, status code: {}, reason: {}",
                status.as_u16(),
                reason
            );
            return Err(ProxyError::UpstreamError {
                status: status.as_u16(),
                message: reason,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl EndpointSource for GithubClient {
    async fn fetch(&self) -> Result<String, ProxyError> {
        let token = self
            .credentials
            .get_credential(&self.config.token_name)
            .await?;

        self.breaker.acquire().inspect_err(|e| warn!("Skipping registry fetch: {}", e))?;

        let result = self.fetch_with_retry(&token).await;
        // Only transport errors and 5xx count against the circuit
        match &result {
            Err(e) if e.is_retryable() => self.breaker.record_failure(),
            _ => self.breaker.record_success(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::CircuitState;
    use crate::credential::StaticCredential;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTENTS_PATH: &str = "/repos/data-altinn-no/bits/contents/endpoints.csv";

    fn create_test_client(api_url: &str) -> GithubClient {
        create_test_client_with_breaker(api_url, BreakerConfig::default())
    }

    fn create_test_client_with_breaker(api_url: &str, breaker: BreakerConfig) -> GithubClient {
        let config = GithubClientConfig {
            api_url: api_url.to_string(),
            timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(10),
            breaker,
            ..GithubClientConfig::default()
        };
        GithubClient::new(config, Arc::new(StaticCredential::new("test-token"))).unwrap()
    }

    #[test]
    fn test_contents_url() {
        let client = create_test_client("https://api.github.com/");
        assert_eq!(
            client.contents_url(),
            "https://api.github.com/repos/data-altinn-no/bits/contents/endpoints.csv"
        );
    }

    #[test]
    fn test_build_request_headers() {
        let client = create_test_client("https://api.github.com");
        let request = client.build_request("abc").unwrap();
        let headers = request.headers();

        assert_eq!(headers[ACCEPT], RAW_CONTENT_TYPE);
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers[API_VERSION_HEADER], API_VERSION);
        assert_eq!(headers[USER_AGENT], CLIENT_ID);
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .and(header("accept", RAW_CONTENT_TYPE))
            .and(header("authorization", "Bearer test-token"))
            .and(header("x-github-api-version", API_VERSION))
            .and(header("user-agent", CLIENT_ID))
            .respond_with(ResponseTemplate::new(200).set_body_string("OrgNummer,Navn,Url,Version\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_test_client(&server.uri());
        let body = client.fetch().await.unwrap();
        assert_eq!(body, "OrgNummer,Navn,Url,Version\n");
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_test_client(&server.uri());
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, ProxyError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_server_error_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = create_test_client(&server.uri());
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_recovers_on_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("header\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_test_client(&server.uri());
        assert_eq!(client.fetch().await.unwrap(), "header\n");
    }

    #[tokio::test]
    async fn test_fetch_without_credential_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = GithubClientConfig {
            api_url: server.uri(),
            ..GithubClientConfig::default()
        };
        let client = GithubClient::new(config, Arc::new(StaticCredential::new(""))).unwrap();
        assert!(matches!(
            client.fetch().await,
            Err(ProxyError::Credential(_))
        ));
    }

    #[tokio::test]
    async fn test_open_circuit_skips_upstream() {
        let server = MockServer::start().await;
        // Two fetches, each with one retry
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(4)
            .mount(&server)
            .await;

        let client = create_test_client_with_breaker(
            &server.uri(),
            BreakerConfig {
                failure_threshold: 2,
                open_duration: Duration::from_secs(60),
            },
        );

        assert!(client.fetch().await.is_err());
        assert!(client.fetch().await.is_err());
        assert!(matches!(
            client.breaker().state(),
            CircuitState::Open { .. }
        ));

        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, ProxyError::CircuitOpen { .. }));
    }

    #[tokio::test]
    async fn test_circuit_closes_after_successful_trial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("header\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_test_client_with_breaker(
            &server.uri(),
            BreakerConfig {
                failure_threshold: 1,
                open_duration: Duration::from_millis(100),
            },
        );

        assert!(client.fetch().await.is_err());
        assert!(matches!(
            client.fetch().await,
            Err(ProxyError::CircuitOpen { .. })
        ));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(client.fetch().await.unwrap(), "header\n");
        assert_eq!(client.breaker().state(), CircuitState::Closed { failures: 0 });
    }

    #[tokio::test]
    async fn test_not_found_does_not_trip_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS_PATH))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let client = create_test_client_with_breaker(
            &server.uri(),
            BreakerConfig {
                failure_threshold: 1,
                open_duration: Duration::from_secs(60),
            },
        );

        for _ in 0..3 {
            assert!(matches!(client.fetch().await, Err(ProxyError::NotFound(_))));
        }
    }
}
