//! Resolution by following HTTP redirects without a browser.

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use super::{needs_resolution, LinkResolver, Resolution, ResolutionCache};
use crate::error::Result;
use crate::links::is_shortener;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// HTTP redirects followed per request.
const MAX_REDIRECTS: usize = 10;
/// HTML refresh hops followed on shortener interstitials.
const MAX_PAGE_HOPS: usize = 3;

static META_REFRESH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[http-equiv]").expect("Invalid meta selector"));
static LOCATION_REPLACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"location\.replace\(\s*["']([^"']+)["']\s*\)"#).expect("Invalid location pattern")
});

/// Follows redirects with reqwest, including the HTML refresh pages t.co serves.
pub struct HttpResolver {
    client: Client,
    cache: ResolutionCache,
}

impl HttpResolver {
    /// Create a resolver with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Self::client_builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            cache: ResolutionCache::new(),
        }
    }

    /// Client settings the resolver expects: browser user agent, bounded redirects.
    pub fn client_builder() -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(MAX_REDIRECTS))
    }

    async fn follow(&self, url: &str) -> Resolution {
        let mut current = url.to_string();

        for hop in 0..=MAX_PAGE_HOPS {
            let response = match self.client.get(&current).send().await {
                Ok(r) => r,
                Err(e) if hop == 0 => {
                    tracing::warn!(url, error = %e, "Could not resolve link");
                    return Resolution::failed(url, e.to_string());
                }
                Err(e) => {
                    tracing::debug!(url, current, error = %e, "Refresh target unreachable");
                    break;
                }
            };

            let landed = response.url().to_string();
            let is_html = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.contains("text/html"));

            current = landed;
            // Only shorteners serve refresh interstitials; real pages may carry
            // conditional redirect scripts that must not be followed.
            if !is_html || hop == MAX_PAGE_HOPS || !is_shortener(&current) {
                break;
            }

            let body = response.text().await.unwrap_or_default();
            match meta_refresh_target(&body, &current) {
                Some(next) if next != current => {
                    tracing::debug!(from = %current, to = %next, "Following page refresh");
                    current = next;
                }
                _ => break,
            }
        }

        Resolution::resolved(url, current)
    }
}

#[async_trait]
impl LinkResolver for HttpResolver {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn resolve(&mut self, url: &str) -> Resolution {
        if let Some(hit) = self.cache.get(url) {
            return hit.clone();
        }

        let resolution = if needs_resolution(url) {
            self.follow(url).await
        } else {
            Resolution::unchanged(url)
        };

        self.cache.insert(resolution.clone());
        resolution
    }
}

/// Destination of an HTML-level redirect: `<meta http-equiv="refresh">` or
/// `location.replace(...)`, resolved against `base`.
pub fn meta_refresh_target(html: &str, base: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let from_meta = document
        .select(&META_REFRESH)
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|m| m.value().attr("content"))
        .find_map(refresh_url);

    let target = from_meta.or_else(|| {
        LOCATION_REPLACE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().replace("\\/", "/"))
    })?;

    let base = Url::parse(base).ok()?;
    base.join(&target).ok().map(String::from)
}

/// The URL part of a refresh header value like `0;URL=https://example.com`.
fn refresh_url(content: &str) -> Option<String> {
    let lower = content.to_ascii_lowercase();
    let start = lower.find("url=")? + "url=".len();
    let url = content[start..]
        .trim()
        .trim_matches(|c| c == '\'' || c == '"');
    (!url.is_empty()).then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_meta_refresh_target() {
        let html = r#"<html><head><meta http-equiv="Refresh" content="0; URL='https://github.com/a/b'"></head></html>"#;
        assert_eq!(
            meta_refresh_target(html, "https://t.co/x"),
            Some("https://github.com/a/b".to_string())
        );
    }

    #[test]
    fn test_location_replace_target() {
        let html = r#"<script>window.opener = null; location.replace("https:\/\/example.com\/page")</script>"#;
        assert_eq!(
            meta_refresh_target(html, "https://t.co/x"),
            Some("https://example.com/page".to_string())
        );
    }

    #[test]
    fn test_relative_refresh_and_none() {
        let html = r#"<meta http-equiv="refresh" content="5;url=/next">"#;
        assert_eq!(
            meta_refresh_target(html, "https://example.com/start"),
            Some("https://example.com/next".to_string())
        );
        assert_eq!(meta_refresh_target("<p>hi</p>", "https://example.com"), None);
    }

    #[tokio::test]
    async fn test_follows_shortener_interstitial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/short"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!(
                    r#"<meta http-equiv="refresh" content="0;URL={}/final">"#,
                    server.uri()
                ),
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/final"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .mount(&server)
            .await;

        // Route t.co to the mock server so the interstitial sits on a shortener host.
        let client = HttpResolver::client_builder()
            .resolve("t.co", *server.address())
            .build()
            .unwrap();
        let mut resolver = HttpResolver::with_client(client);
        let short = format!("http://t.co:{}/short", server.address().port());
        let res = resolver.resolve(&short).await;

        assert!(res.is_ok());
        assert!(res.redirected);
        assert_eq!(res.final_url, format!("{}/final", server.uri()));
    }

    #[tokio::test]
    async fn test_destination_scripts_are_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/short"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("Location", format!("{}/article", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<script>if (!window.fetch) { location.replace("/unsupported-browser") }</script>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let mut resolver = HttpResolver::new(Duration::from_secs(5)).unwrap();
        let res = resolver.resolve(&format!("{}/short", server.uri())).await;

        assert!(res.is_ok());
        assert_eq!(res.final_url, format!("{}/article", server.uri()));
    }

    #[tokio::test]
    async fn test_unreachable_link_is_recorded() {
        let mut resolver = HttpResolver::new(Duration::from_millis(500)).unwrap();
        let res = resolver.resolve("http://127.0.0.1:9/nothing").await;
        assert!(!res.is_ok());
        assert_eq!(res.final_url, "http://127.0.0.1:9/nothing");
    }
}
