//! Network transport: retrieve a location as a stream of body chunks
//!
//! The fetcher only depends on the [`Transport`] trait, so tests and embedders can
//! plug in their own retrieval (object stores, signed-URL clients, fakes).

use crate::config::FetchConfig;
use crate::error::{ArchiveError, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;

/// Response body as a stream of chunks
///
/// An `Err` item means the connection failed after the response started.
pub type BodyStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Retrieves a location and hands back its body
///
/// # Example
///
/// ```
/// use archive_bundler::transport::{BodyStream, Transport};
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use futures::StreamExt;
///
/// struct Static;
///
/// #[async_trait]
/// impl Transport for Static {
///     async fn retrieve(&self, _location: &str) -> archive_bundler::Result<BodyStream> {
///         Ok(futures::stream::iter(vec![Ok(Bytes::from_static(b"hello"))]).boxed())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start retrieving `location`
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::RetrievalFailed`] if the location cannot be reached or
    /// does not answer with content.
    async fn retrieve(&self, location: &str) -> Result<BodyStream>;
}

/// [`Transport`] over HTTP(S) using `reqwest`
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from fetch settings
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create HTTP client: {}",
                e
            )))
        })?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn retrieve(&self, location: &str) -> Result<BodyStream> {
        let response = self.client.get(location).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("request timed out: {}", e)
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                e.to_string()
            };
            ArchiveError::RetrievalFailed {
                location: location.to_string(),
                reason,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::RetrievalFailed {
                location: location.to_string(),
                reason: format!("HTTP status {}", status),
            }
            .into());
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use futures::TryStreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collect(body: BodyStream) -> Vec<u8> {
        body.try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn streams_successful_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"alpha".to_vec()))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&FetchConfig::default()).unwrap();
        let body = transport
            .retrieve(&format!("{}/a.txt", server.uri()))
            .await
            .unwrap();
        assert_eq!(collect(body).await, b"alpha");
    }

    #[tokio::test]
    async fn non_success_status_is_retrieval_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&FetchConfig::default()).unwrap();
        let err = transport
            .retrieve(&format!("{}/missing.txt", server.uri()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), FailureKind::RetrievalFailed);
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn unreachable_host_is_retrieval_failure() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let transport = HttpTransport::new(&FetchConfig::default()).unwrap();
        let err = transport
            .retrieve("http://127.0.0.1:9/a.txt")
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), FailureKind::RetrievalFailed);
    }

    #[tokio::test]
    async fn sends_configured_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::header("user-agent", "bundler-test"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let config = FetchConfig {
            user_agent: "bundler-test".to_string(),
            ..FetchConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let body = transport
            .retrieve(&format!("{}/x", server.uri()))
            .await
            .unwrap();
        assert_eq!(collect(body).await, b"ok");
    }
}
