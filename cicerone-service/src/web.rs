//! Web search and encyclopedia lookups used when the document has nothing
//! relevant to say.
//!
//! Both lookups are best effort: any failure is logged and produces an empty
//! string, so a broken fallback never fails a chat request.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FallbackConfig;
use crate::error::{FetchError, format_error_chain};

/// HTTP client for the fallback lookups
pub struct WebLookup {
    client: Client,
}

impl WebLookup {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Titles and snippets from a search results page, cut to `max_chars`.
    pub async fn web_search(&self, config: &FallbackConfig, query: &str) -> String {
        match self.fetch_search_results(config, query).await {
            Ok(text) => truncate_chars(&text, config.max_chars),
            Err(e) => {
                warn!(error = %format_error_chain(&e), "Web search failed");
                String::new()
            }
        }
    }

    /// Lead summary of the encyclopedia article for `topic`.
    pub async fn wikipedia_summary(&self, config: &FallbackConfig, topic: &str) -> String {
        match self.fetch_summary(config, topic).await {
            Ok(extract) => extract,
            Err(e) => {
                warn!(error = %format_error_chain(&e), "Wikipedia lookup failed");
                String::new()
            }
        }
    }

    async fn fetch_search_results(
        &self,
        config: &FallbackConfig,
        query: &str,
    ) -> Result<String, FetchError> {
        let url = format!("{}?q={}", config.search_url, urlencoding::encode(query));
        let html = self.get_text(config, &url).await?;

        let results = parse_search_results(&html, config).map_err(|message| FetchError::Parse {
            url: config.search_url.clone(),
            message,
        })?;
        debug!(
            bytes = html.len(),
            results = results.len(),
            "Parsed search results page"
        );

        Ok(results.join("\n\n"))
    }

    async fn fetch_summary(
        &self,
        config: &FallbackConfig,
        topic: &str,
    ) -> Result<String, FetchError> {
        let url = format!(
            "{}/api/rest_v1/page/summary/{}",
            config.wikipedia_url.trim_end_matches('/'),
            urlencoding::encode(topic)
        );
        let body = self.get_text(config, &url).await?;

        let summary: PageSummary = serde_json::from_str(&body).map_err(|e| FetchError::Parse {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(summary.extract.unwrap_or_default())
    }

    async fn get_text(&self, config: &FallbackConfig, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &config.user_agent)
            .timeout(config.timeout())
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })
    }
}

impl Default for WebLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    extract: Option<String>,
}

/// One `"{title}\n{snippet}"` entry per result block; blocks with neither are skipped.
fn parse_search_results(html: &str, config: &FallbackConfig) -> Result<Vec<String>, String> {
    let result = parse_selector(&config.result_selector)?;
    let title = parse_selector(&config.title_selector)?;
    let snippet = parse_selector(&config.snippet_selector)?;

    let document = Html::parse_document(html);
    Ok(document
        .select(&result)
        .filter_map(|block| {
            let title = select_text(block, &title);
            let snippet = select_text(block, &snippet);
            if title.is_empty() && snippet.is_empty() {
                None
            } else {
                Some(format!("{}\n{}", title, snippet))
            }
        })
        .collect())
}

fn parse_selector(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|e| format!("invalid selector '{}': {:?}", selector, e))
}

/// Text of every match inside `block`, concatenated
fn select_text(block: ElementRef<'_>, selector: &Selector) -> String {
    block
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DynamicConfig;
    use crate::test_support::spawn_mock_server;
    use axum::{Json, Router, extract::Query, http::HeaderMap, routing::get};
    use std::collections::HashMap;

    const RESULTS_PAGE: &str = r#"
<html><body>
  <div class="g"><h3>Mangalore - Wikipedia</h3><div class="VwiC3b">A port city in Karnataka.</div></div>
  <div class="g"><h3>Things to do</h3><div class="VwiC3b">Beaches and temples.</div></div>
  <div class="g"><span>ad</span></div>
</body></html>
"#;

    fn fallback_config(base_url: &str) -> FallbackConfig {
        FallbackConfig {
            search_url: format!("{}/search", base_url),
            wikipedia_url: base_url.to_string(),
            ..DynamicConfig::default().fallback
        }
    }

    #[test]
    fn test_parse_search_results() {
        let config = DynamicConfig::default().fallback;
        let results = parse_search_results(RESULTS_PAGE, &config).unwrap();
        assert_eq!(
            results,
            vec![
                "Mangalore - Wikipedia\nA port city in Karnataka.".to_string(),
                "Things to do\nBeaches and temples.".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let config = FallbackConfig {
            result_selector: "<<".to_string(),
            ..DynamicConfig::default().fallback
        };
        assert!(parse_search_results(RESULTS_PAGE, &config).is_err());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ಮಂಗಳೂರು", 2), "ಮಂ");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn test_web_search_against_mock() {
        let app = Router::new().route(
            "/search",
            get(
                |headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params.get("q").map(String::as_str), Some("Mangalore food"));
                    assert!(headers.get("user-agent").is_some());
                    axum::response::Html(RESULTS_PAGE)
                },
            ),
        );
        let base_url = spawn_mock_server(app).await;
        let mut config = fallback_config(&base_url);
        config.max_chars = 21;

        let text = WebLookup::new().web_search(&config, "Mangalore food").await;
        assert_eq!(text, "Mangalore - Wikipedia");
    }

    #[tokio::test]
    async fn test_wikipedia_summary_against_mock() {
        let app = Router::new().route(
            "/api/rest_v1/page/summary/{title}",
            get(|axum::extract::Path(title): axum::extract::Path<String>| async move {
                Json(serde_json::json!({
                    "title": title,
                    "extract": "Mangalore is a major port city.",
                }))
            }),
        );
        let base_url = spawn_mock_server(app).await;

        let summary = WebLookup::new()
            .wikipedia_summary(&fallback_config(&base_url), "Mangalore")
            .await;
        assert_eq!(summary, "Mangalore is a major port city.");
    }

    #[tokio::test]
    async fn test_failures_yield_empty_text() {
        let app = Router::new().route(
            "/search",
            get(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base_url = spawn_mock_server(app).await;
        let config = fallback_config(&base_url);
        let lookup = WebLookup::new();

        assert_eq!(lookup.web_search(&config, "anything").await, "");
        // No summary route on the mock server
        assert_eq!(lookup.wikipedia_summary(&config, "Mangalore").await, "");
    }
}
