//! HTTP access to the content origin.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use scripturekit_shared::{FetchConfig, FetchError, Language, Result, ScripturekitError};

/// User-Agent string for origin requests.
const USER_AGENT: &str = concat!("scripturekit/", env!("CARGO_PKG_VERSION"));

/// A content origin plus the client used to talk to it.
///
/// Cheap to clone: the underlying client is reference-counted.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    /// Build a source for `base` with the given per-request limits.
    pub fn new(base: Url, timeout: Duration, max_redirects: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .timeout(timeout)
            .build()
            .map_err(|e| ScripturekitError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base })
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout, config.max_redirects)
    }

    /// Absolute URL of `uri` in language `lang`.
    pub fn page_url(&self, uri: &str, lang: &Language) -> std::result::Result<Url, FetchError> {
        let mut url = self.base.join(uri).map_err(|e| FetchError::Request {
            url: uri.to_string(),
            message: format!("invalid uri: {e}"),
        })?;
        url.query_pairs_mut().append_pair("lang", lang.as_str());
        Ok(url)
    }

    /// GET the page at `uri` and return its body.
    pub async fn get(&self, uri: &str, lang: &Language) -> std::result::Result<String, FetchError> {
        let url = self.page_url(uri, lang)?;
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Map a transport error onto the retry-relevant categories.
fn classify(url: &Url, err: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if err.is_timeout() {
        FetchError::Timeout { url }
    } else if err.is_connect() || err.is_request() {
        FetchError::Connect {
            url,
            message: err.to_string(),
        }
    } else {
        FetchError::Request {
            url,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn eng() -> Language {
        "eng".parse().unwrap()
    }

    async fn source_for(server: &MockServer, timeout: Duration) -> HttpSource {
        HttpSource::new(Url::parse(&server.uri()).unwrap(), timeout, 5).unwrap()
    }

    #[test]
    fn page_url_appends_language() {
        let source = HttpSource::new(
            Url::parse("https://www.example.org").unwrap(),
            Duration::from_secs(5),
            5,
        )
        .unwrap();
        let url = source.page_url("/study/scriptures/bofm/1-ne/1", &eng()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.example.org/study/scriptures/bofm/1-ne/1?lang=eng"
        );
    }

    #[tokio::test]
    async fn get_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/study/scriptures/bofm"))
            .and(query_param("lang", "eng"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let source = source_for(&server, Duration::from_secs(5)).await;
        let body = source.get("/study/scriptures/bofm", &eng()).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = source_for(&server, Duration::from_secs(5)).await;
        let err = source.get("/missing", &eng()).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let source = source_for(&server, Duration::from_millis(200)).await;
        let err = source.get("/slow", &eng()).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
        assert!(err.is_transient());
    }
}
