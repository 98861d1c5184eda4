use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use urlencoding::encode;

use crate::error::{Error, Result};

/// One API response unit. Implementors expose the continuation token that
/// drives pagination: token present means another page must be fetched.
pub trait Page {
    fn next_page_token(&self) -> Option<&str>;
}

/// Thin client over a shared `reqwest::Client` that drains paginated
/// endpoints into an ordered page sequence.
///
/// Header contract: `Authorization`, `Accept` and (for JSON bodies)
/// `Content-Type` are applied after any caller-supplied headers, so callers
/// cannot override the authorization or content-negotiation defaults. All
/// other caller headers pass through untouched.
pub struct ApiClient {
    inner: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        ApiClient {
            inner: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Issue a request and return the ordered sequence of pages.
    ///
    /// With `paginate` false the first page is returned alone. With it true
    /// the client loops, attaching the previous page's continuation token as
    /// a `pageToken` query parameter, until a page arrives without a token.
    ///
    /// Each response body is parsed as JSON regardless of HTTP status so the
    /// caller can inspect remote error payloads; only transport failures and
    /// non-parseable bodies abort, and they stop pagination immediately.
    /// Nothing is retried.
    pub async fn execute<P>(
        &self,
        path: &str,
        body: Option<&Value>,
        method: Method,
        headers: HeaderMap,
        paginate: bool,
    ) -> Result<Vec<P>>
    where
        P: DeserializeOwned + Page,
    {
        let endpoint = format!("{}{}", self.base_url, path);
        let headers = self.merged_headers(headers, body.is_some())?;
        let mut pages: Vec<P> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = paged_url(&endpoint, page_token.as_deref());
            let mut request = self.inner.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }
            // headers() replaces per key, so the defaults inserted last in
            // merged_headers stay authoritative.
            let request = request.headers(headers.clone());

            let response = request.send().await.map_err(Error::Transport)?;
            let bytes = response.bytes().await.map_err(Error::Transport)?;
            let page: P = serde_json::from_slice(&bytes).map_err(Error::Decode)?;

            if !paginate {
                pages.push(page);
                return Ok(pages);
            }

            let token = page.next_page_token().map(str::to_owned);
            pages.push(page);
            match token {
                Some(token) => page_token = Some(token),
                None => return Ok(pages),
            }
        }
    }

    /// Caller headers first, then the non-negotiable defaults inserted over
    /// them: callers cannot replace `Authorization`, `Accept` or (when a JSON
    /// body is present) `Content-Type`.
    fn merged_headers(&self, caller: HeaderMap, has_body: bool) -> Result<HeaderMap> {
        let mut headers = caller;
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if has_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        let mut auth = HeaderValue::try_from(format!("Bearer {}", self.access_token))
            .map_err(|_| Error::config("access token contains invalid header characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }
}

fn paged_url(endpoint: &str, page_token: Option<&str>) -> String {
    match page_token {
        Some(token) if endpoint.contains('?') => {
            format!("{endpoint}&pageToken={}", encode(token))
        }
        Some(token) => format!("{endpoint}?pageToken={}", encode(token)),
        None => endpoint.to_string(),
    }
}
