//! `CatalogClient` - movie catalog API client implementation.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::api::LocalCatalogApi;
use super::error::{CatalogError, Result};
use super::normalize;
use super::token::{TokenManager, body_or_reason};
use super::types::{GenreListing, Movie, MoviesPage, SearchMoviesParams};

/// Default base URL of the catalog API.
pub const DEFAULT_BASE_URL: &str = "https://0kadddxyh3.execute-api.us-east-1.amazonaws.com/";

/// Path segments of the token endpoint.
const TOKEN_PATH: [&str; 2] = ["auth", "token"];

/// A request relative to the catalog base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    method: Method,
    /// Path segments, percent-encoded individually when joined.
    segments: Vec<String>,
    /// Query pairs.
    query: Vec<(String, String)>,
    /// Headers applied on top of the defaults.
    headers: HeaderMap,
}

impl ApiRequest {
    /// Creates a `GET` request for the given path segments.
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: Method::GET,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    /// Appends query pairs.
    #[must_use]
    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets a header, replacing any default with the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the slash-joined path, for logging.
    fn path(&self) -> String {
        self.segments.join("/")
    }
}

/// Which attempt of a request is being sent.
///
/// A request is sent once, and a second time only after a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// First attempt with the current token.
    First,
    /// Single retry with a freshly acquired token.
    Retry,
}

impl Attempt {
    const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Retry => "retry",
        }
    }
}

/// Movie catalog API client.
///
/// Construct once and share by reference; the bearer token is cached
/// inside and fetched at most once at a time.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct CatalogClient {
    /// HTTP client.
    http_client: Client,
    /// Base URL for API requests.
    base_url: Url,
    /// Headers added to every catalog request.
    default_headers: HeaderMap,
    /// Token cache.
    tokens: TokenManager,
}

/// Builder for `CatalogClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct CatalogClientBuilder {
    base_url: Option<Url>,
    user_agent: Option<String>,
    headers: Vec<(String, String)>,
}

impl CatalogClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            user_agent: None,
            headers: Vec::new(),
        }
    }

    /// Overrides the base URL (for wiremock in tests).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Adds a header sent with every catalog request.
    ///
    /// Overrides the default `Content-Type` when named so.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `user_agent` is not set.
    /// - The base URL cannot carry a path.
    /// - A header name or value is invalid.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<CatalogClient> {
        let user_agent = self
            .user_agent
            .ok_or_else(|| CatalogError::Setup(String::from("user_agent is required")))?;

        let base_url = if let Some(url) = self.base_url {
            url
        } else {
            Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| CatalogError::Setup(format!("invalid default base URL: {e}")))?
        };
        let token_url = join_segments(&base_url, &TOKEN_PATH)?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| CatalogError::Setup(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| CatalogError::Setup(format!("invalid header value for {name}: {e}")))?;
            default_headers.append(name, value);
        }

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .gzip(true)
            .build()
            .map_err(|e| CatalogError::Setup(format!("failed to build HTTP client: {e}")))?;

        Ok(CatalogClient {
            tokens: TokenManager::new(http_client.clone(), token_url),
            http_client,
            base_url,
            default_headers,
        })
    }
}

/// Appends path segments to `base`, percent-encoding each one.
fn join_segments<S: AsRef<str>>(base: &Url, segments: &[S]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| CatalogError::Setup(format!("base URL cannot carry a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl CatalogClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::new()
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends an authenticated request and returns the parsed JSON body.
    ///
    /// A 401 on the first attempt invalidates the token, acquires a fresh
    /// one and resends exactly once. Any other status is final.
    ///
    /// # Errors
    ///
    /// - `AuthFailure` / `InvalidResponseShape` from token acquisition.
    /// - `RequestFailure` on a transport error, a final non-2xx status,
    ///   or a body that is not JSON.
    #[instrument(skip_all, fields(path = %request.path()))]
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value> {
        let url = join_segments(&self.base_url, &request.segments)?;

        let token = self.tokens.token().await?;
        let response = self.send(&url, request, &token, Attempt::First).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Catalog API returned 401. Refreshing token and retrying once...");
            self.tokens.invalidate();
            let token = self.tokens.refresh().await?;
            self.send(&url, request, &token, Attempt::Retry).await?
        } else {
            response
        };

        Self::read_json(response).await
    }

    /// Sends one attempt with the given token.
    async fn send(
        &self,
        url: &Url,
        request: &ApiRequest,
        token: &str,
        attempt: Attempt,
    ) -> Result<Response> {
        let mut auth = HeaderValue::try_from(format!("Bearer {token}")).map_err(|_| {
            CatalogError::InvalidResponseShape(String::from(
                "auth token contains characters not allowed in a header",
            ))
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(self.default_headers.clone());
        headers.extend(request.headers.clone());

        let http_request = self
            .http_client
            .request(request.method.clone(), url.clone())
            .headers(headers)
            .query(&request.query)
            .build()
            .map_err(|e| CatalogError::RequestFailure {
                status: None,
                body: format!("failed to build request: {e}"),
            })?;

        tracing::debug!(
            url = %http_request.url(),
            attempt = attempt.as_str(),
            "Catalog API request"
        );

        self.http_client
            .execute(http_request)
            .await
            .map_err(|e| CatalogError::RequestFailure {
                status: None,
                body: e.to_string(),
            })
    }

    /// Turns a final response into JSON or a `RequestFailure`.
    async fn read_json(response: Response) -> Result<Value> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::RequestFailure {
                status: Some(status),
                body: body_or_reason(body, status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::RequestFailure {
                status: Some(status),
                body: format!("failed to read response body: {e}"),
            })?;
        serde_json::from_str(&body).map_err(|e| CatalogError::RequestFailure {
            status: Some(status),
            body: format!("failed to decode JSON response: {e}"),
        })
    }
}

impl LocalCatalogApi for CatalogClient {
    #[instrument(skip_all, fields(page = params.page, limit = params.limit))]
    async fn search_movies(&self, params: &SearchMoviesParams) -> Result<MoviesPage> {
        let request = ApiRequest::get(["movies"]).query(params.to_query());
        let raw = self.execute(&request).await?;
        normalize::movies_page(raw)
    }

    #[instrument(skip_all)]
    async fn movie_details(&self, id: &str) -> Result<Movie> {
        let id = normalize::movie_id(id)?;
        let raw = self.execute(&ApiRequest::get(["movies", id])).await?;
        normalize::movie(raw)
    }

    #[instrument(skip_all)]
    async fn genres_with_movies(&self) -> Result<GenreListing> {
        let raw = self.execute(&ApiRequest::get(["genres", "movies"])).await?;
        normalize::genre_listing(raw)
    }
}
