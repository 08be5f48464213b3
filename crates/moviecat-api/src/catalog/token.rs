//! Bearer token cache with deduplicated acquisition.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::error::{CatalogError, Result};

/// A token fetch that any number of callers can await.
type Acquisition = Shared<BoxFuture<'static, Result<String>>>;

/// Body of `auth/token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// Bearer token.
    token: String,
}

/// Mutable token state.
///
/// `pending` is set while a fetch is in flight and cleared when it settles,
/// so at most one fetch runs at a time.
#[derive(Default)]
struct TokenState {
    cached: Option<String>,
    pending: Option<Acquisition>,
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("cached", &self.cached.is_some())
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

/// Owns the cached bearer token and the in-flight acquisition.
#[derive(Debug)]
pub(crate) struct TokenManager {
    /// HTTP client (shared with the executor).
    http_client: Client,
    /// Absolute URL of the token endpoint.
    token_url: Url,
    /// Shared state, also settled from inside the acquisition future.
    state: Arc<Mutex<TokenState>>,
}

impl TokenManager {
    /// Creates a manager with no cached token.
    pub(crate) fn new(http_client: Client, token_url: Url) -> Self {
        Self {
            http_client,
            token_url,
            state: Arc::new(Mutex::new(TokenState::default())),
        }
    }

    /// Returns a usable token.
    ///
    /// Uses the cached token if present, otherwise joins the in-flight
    /// acquisition or starts one.
    ///
    /// # Errors
    ///
    /// - `AuthFailure` if the token endpoint is unreachable or returns non-2xx.
    /// - `InvalidResponseShape` if the body has no string `token` field.
    pub(crate) async fn token(&self) -> Result<String> {
        let acquisition = {
            let mut state = lock(&self.state);
            if let Some(token) = &state.cached {
                return Ok(token.clone());
            }
            self.join_or_start(&mut state)
        };
        acquisition.await
    }

    /// Returns a token that did not come from the cache.
    ///
    /// Joins the in-flight acquisition if there is one.
    ///
    /// # Errors
    ///
    /// Same as [`Self::token`].
    pub(crate) async fn refresh(&self) -> Result<String> {
        let acquisition = {
            let mut state = lock(&self.state);
            self.join_or_start(&mut state)
        };
        acquisition.await
    }

    /// Drops the cached token. An in-flight acquisition keeps running.
    pub(crate) fn invalidate(&self) {
        lock(&self.state).cached = None;
    }

    /// Returns the pending acquisition, starting one if the slot is empty.
    fn join_or_start(&self, state: &mut TokenState) -> Acquisition {
        if let Some(pending) = &state.pending {
            tracing::debug!("joining in-flight token acquisition");
            return pending.clone();
        }

        let acquisition = acquire(
            self.http_client.clone(),
            self.token_url.clone(),
            Arc::downgrade(&self.state),
        )
        .boxed()
        .shared();
        state.pending = Some(acquisition.clone());
        acquisition
    }
}

/// Locks the state, recovering from poisoning (the state stays consistent).
fn lock(state: &Mutex<TokenState>) -> MutexGuard<'_, TokenState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fetches a token and settles the shared state.
async fn acquire(
    http_client: Client,
    token_url: Url,
    state: Weak<Mutex<TokenState>>,
) -> Result<String> {
    let result = fetch_token(&http_client, token_url).await;

    if let Some(state) = state.upgrade() {
        let mut state = lock(&state);
        state.pending = None;
        if let Ok(token) = &result {
            state.cached = Some(token.clone());
        }
    }

    result
}

/// Sends `GET auth/token` and extracts the token.
#[instrument(skip_all)]
async fn fetch_token(http_client: &Client, token_url: Url) -> Result<String> {
    tracing::debug!(url = %token_url, "Requesting auth token");

    let response = http_client
        .get(token_url)
        .send()
        .await
        .map_err(|e| CatalogError::AuthFailure {
            status: None,
            body: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::AuthFailure {
            status: Some(status),
            body: body_or_reason(body, status),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| CatalogError::AuthFailure {
            status: Some(status),
            body: e.to_string(),
        })?;
    let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        CatalogError::InvalidResponseShape(format!("auth token missing from response: {e}"))
    })?;

    tracing::debug!("Auth token acquired");
    Ok(parsed.token)
}

/// Falls back to the status reason phrase when the body is empty.
pub(crate) fn body_or_reason(body: String, status: StatusCode) -> String {
    if body.is_empty() {
        String::from(status.canonical_reason().unwrap_or_default())
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn manager_for(server: &MockServer) -> TokenManager {
        let token_url = Url::parse(&format!("{}/auth/token", server.uri())).unwrap();
        TokenManager::new(Client::new(), token_url)
    }

    fn token_body(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "token": token }))
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(token_body("t1"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        let first = manager.token().await.unwrap();
        let second = manager.token().await.unwrap();

        // Assert
        assert_eq!(first, "t1");
        assert_eq!(second, "t1");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(token_body("shared").set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        let results = futures::future::join_all((0..10).map(|_| manager.token())).await;

        // Assert (mock expect(1) verifies a single token request)
        assert_eq!(results.len(), 10);
        for result in results {
            assert_eq!(result.unwrap(), "shared");
        }
    }

    #[tokio::test]
    async fn test_failure_reaches_all_waiters_and_clears_pending() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_string("unavailable")
                    .set_delay(Duration::from_millis(100)),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(token_body("recovered"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        let results = futures::future::join_all((0..5).map(|_| manager.token())).await;
        let retry = manager.token().await;

        // Assert
        for result in results {
            let err = result.unwrap_err();
            assert_eq!(
                err,
                CatalogError::AuthFailure {
                    status: Some(StatusCode::SERVICE_UNAVAILABLE),
                    body: String::from("unavailable"),
                }
            );
        }
        assert_eq!(retry.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn test_empty_error_body_uses_reason_phrase() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        let err = manager.token().await.unwrap_err();

        // Assert
        assert_eq!(
            err,
            CatalogError::AuthFailure {
                status: Some(StatusCode::FORBIDDEN),
                body: String::from("Forbidden"),
            }
        );
    }

    #[tokio::test]
    async fn test_token_field_must_be_a_string() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": 42 })))
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        let result = manager.token().await;

        // Assert
        assert!(matches!(result, Err(CatalogError::InvalidResponseShape(_))));
    }

    #[tokio::test]
    async fn test_missing_token_field() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        let result = manager.token().await;

        // Assert
        assert!(matches!(result, Err(CatalogError::InvalidResponseShape(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_auth_failure() {
        // Arrange (nothing listens on port 1)
        let token_url = Url::parse("http://127.0.0.1:1/auth/token").unwrap();
        let manager = TokenManager::new(Client::new(), token_url);

        // Act
        let result = manager.token().await;

        // Assert
        assert!(matches!(
            result,
            Err(CatalogError::AuthFailure { status: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalidate_forces_fresh_fetch() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(token_body("old"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(token_body("new"))
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        let before = manager.token().await.unwrap();
        manager.invalidate();
        let after = manager.token().await.unwrap();

        // Assert
        assert_eq!(before, "old");
        assert_eq!(after, "new");
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(token_body("first"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(token_body("second"))
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        manager.token().await.unwrap();
        let refreshed = manager.refresh().await.unwrap();
        let cached = manager.token().await.unwrap();

        // Assert
        assert_eq!(refreshed, "second");
        assert_eq!(cached, "second");
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_does_not_cancel_in_flight_fetch() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/token"))
            .respond_with(token_body("late").set_delay(Duration::from_millis(150)))
            .expect(1)
            .mount(&mock_server)
            .await;
        let manager = manager_for(&mock_server);

        // Act
        let (result, ()) = tokio::join!(manager.token(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            manager.invalidate();
        });
        let cached = manager.token().await.unwrap();

        // Assert (mock expect(1): the settled fetch populated the cache)
        assert_eq!(result.unwrap(), "late");
        assert_eq!(cached, "late");
    }

    #[test]
    fn test_debug_hides_token_value() {
        // Arrange
        let state = TokenState {
            cached: Some(String::from("secret-token")),
            pending: None,
        };

        // Act
        let rendered = format!("{state:?}");

        // Assert
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("cached: true"));
    }
}
