//! Web search backends
//!
//! The default backend asks the DuckDuckGo instant answer API first. Most
//! full-sentence questions have no instant answer, so an empty answer falls
//! back to the result list of DuckDuckGo's HTML page. Neither needs an API
//! key. Results are flattened into a plain-text snippet list; an empty string
//! means the query produced nothing usable.

use async_trait::async_trait;
use delve_core::{config_error, search_error, DelveResult, SearchConfig, SearchProvider};
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DUCKDUCKGO_ENDPOINT: &str = "https://api.duckduckgo.com/";
const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo search: instant answers, then web results
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    html_endpoint: String,
    max_results: usize,
    html: HtmlResultParser,
}

impl DuckDuckGoSearch {
    pub fn new(config: &SearchConfig) -> DelveResult<Self> {
        Self::with_endpoints(config, DUCKDUCKGO_ENDPOINT, DUCKDUCKGO_HTML_ENDPOINT)
    }

    /// Point the backend at other hosts serving the same JSON and HTML shapes
    pub fn with_endpoints(
        config: &SearchConfig,
        endpoint: &str,
        html_endpoint: &str,
    ) -> DelveResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| search_error!("Failed to create HTTP client", "web_search", e))?;

        let html = HtmlResultParser::new()
            .map_err(|e| search_error!("Failed to compile result pattern", "web_search", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            html_endpoint: html_endpoint.to_string(),
            max_results: config.max_results,
            html,
        })
    }

    fn query_url(&self, query: &str) -> String {
        format!(
            "{}?q={}&format=json&no_html=1&skip_disambig=1",
            self.endpoint,
            urlencoding::encode(query)
        )
    }

    fn html_query_url(&self, query: &str) -> String {
        format!("{}?q={}", self.html_endpoint, urlencoding::encode(query))
    }

    async fn get(&self, url: &str) -> DelveResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| search_error!(format!("Search request failed: {}", e), "web_search", e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Search backend returned an error status");
            return Err(search_error!(
                format!("Search backend returned HTTP {}", status),
                "web_search"
            ));
        }
        Ok(response)
    }

    async fn instant_answers(&self, query: &str) -> DelveResult<Vec<String>> {
        let body: Value = self.get(&self.query_url(query)).await?.json().await.map_err(|e| {
            search_error!(
                format!("Failed to parse search response: {}", e),
                "web_search",
                e
            )
        })?;
        Ok(extract_snippets(&body, self.max_results))
    }

    async fn web_results(&self, query: &str) -> DelveResult<Vec<String>> {
        let page = self
            .get(&self.html_query_url(query))
            .await?
            .text()
            .await
            .map_err(|e| search_error!(format!("Failed to read results page: {}", e), "web_search", e))?;
        Ok(self.html.parse(&page, self.max_results))
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> DelveResult<String> {
        debug!(query = %query, "Sending search request");

        let snippets = match self.instant_answers(query).await {
            Ok(snippets) if !snippets.is_empty() => snippets,
            Ok(_) => {
                debug!(query = %query, "No instant answer, using web results");
                self.web_results(query).await?
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Instant answer lookup failed, using web results");
                self.web_results(query).await?
            }
        };

        debug!(query = %query, snippets = snippets.len(), "Search completed");
        Ok(snippets.join("\n\n"))
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

/// Pulls title, target and snippet out of each entry of the HTML result list
struct HtmlResultParser {
    result: Regex,
    tag: Regex,
}

impl HtmlResultParser {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            result: Regex::new(
                r#"(?s)class="result__a"[^>]*href="([^"]*)"[^>]*>(.*?)</a>.*?class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#,
            )?,
            tag: Regex::new(r"<[^>]+>")?,
        })
    }

    fn parse(&self, page: &str, max_results: usize) -> Vec<String> {
        self.result
            .captures_iter(page)
            .filter_map(|caps| {
                let snippet = self.text(&caps[3]);
                if snippet.is_empty() {
                    return None;
                }
                Some(format!(
                    "- {}: {}\n  URL: {}",
                    self.text(&caps[2]),
                    snippet,
                    result_target(&caps[1])
                ))
            })
            .take(max_results)
            .collect()
    }

    fn text(&self, fragment: &str) -> String {
        decode_entities(self.tag.replace_all(fragment, "").trim())
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Result links go through a redirect carrying the real address in `uddg`
fn result_target(href: &str) -> String {
    let href = decode_entities(href);
    let target = href
        .split_once("uddg=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
        .and_then(|encoded| urlencoding::decode(encoded).ok())
        .map(Cow::into_owned);
    target.unwrap_or(href)
}

/// Pull up to `max_results` readable snippets out of an instant answer body.
///
/// The abstract comes first, then related topics (including those nested in
/// topic groups), then direct results.
pub fn extract_snippets(body: &Value, max_results: usize) -> Vec<String> {
    let mut snippets = Vec::new();

    if let Some(abstract_text) = body.get("AbstractText").and_then(Value::as_str) {
        if !abstract_text.trim().is_empty() && max_results > 0 {
            let source = body
                .get("AbstractSource")
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            let url = body
                .get("AbstractURL")
                .and_then(Value::as_str)
                .unwrap_or("");
            snippets.push(format!("[{}] {}\n  URL: {}", source, abstract_text, url));
        }
    }

    let topics = body
        .get("RelatedTopics")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .flat_map(|topic| match topic.get("Topics").and_then(Value::as_array) {
            Some(group) => group.iter().collect::<Vec<_>>(),
            None => vec![topic],
        });
    let results = body
        .get("Results")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();

    for entry in topics.chain(results) {
        if snippets.len() >= max_results {
            break;
        }
        if let Some(text) = entry.get("Text").and_then(Value::as_str) {
            if text.trim().is_empty() {
                continue;
            }
            let url = entry.get("FirstURL").and_then(Value::as_str).unwrap_or("");
            snippets.push(format!("- {}\n  URL: {}", text, url));
        }
    }

    snippets
}

/// Build the search backend named in the configuration
pub fn create_search_provider(config: &SearchConfig) -> DelveResult<Arc<dyn SearchProvider>> {
    match config.provider.as_str() {
        "duckduckgo" => Ok(Arc::new(DuckDuckGoSearch::new(config)?)),
        provider => Err(config_error!(
            format!("Unsupported search provider: {}", provider),
            "web_search"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_abstract_and_topics() {
        let body = json!({
            "AbstractText": "Rust is a systems programming language.",
            "AbstractSource": "Wikipedia",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
            "RelatedTopics": [
                { "Text": "Cargo - the Rust package manager", "FirstURL": "https://duckduckgo.com/Cargo" },
                { "Text": "Ferris - the unofficial mascot", "FirstURL": "https://duckduckgo.com/Ferris" }
            ],
            "Results": []
        });

        let snippets = extract_snippets(&body, 5);
        assert_eq!(snippets.len(), 3);
        assert!(snippets[0].starts_with("[Wikipedia] Rust is a systems"));
        assert!(snippets[1].contains("Cargo"));
        assert!(snippets[2].contains("URL: https://duckduckgo.com/Ferris"));
    }

    #[test]
    fn test_extract_respects_max_results() {
        let topics: Vec<Value> = (0..10)
            .map(|i| json!({ "Text": format!("Topic {i}"), "FirstURL": "" }))
            .collect();
        let body = json!({ "AbstractText": "", "RelatedTopics": topics });

        let snippets = extract_snippets(&body, 4);
        assert_eq!(snippets.len(), 4);
        assert!(snippets[3].contains("Topic 3"));

        assert!(extract_snippets(&body, 0).is_empty());
    }

    #[test]
    fn test_extract_nested_topic_groups() {
        let body = json!({
            "RelatedTopics": [
                { "Name": "See also", "Topics": [
                    { "Text": "Nested one", "FirstURL": "https://a" },
                    { "Text": "Nested two", "FirstURL": "https://b" }
                ]},
                { "Text": "Flat topic", "FirstURL": "https://c" }
            ],
            "Results": [
                { "Text": "Official site", "FirstURL": "https://d" }
            ]
        });

        let snippets = extract_snippets(&body, 10);
        assert_eq!(snippets.len(), 4);
        assert!(snippets[0].contains("Nested one"));
        assert!(snippets[2].contains("Flat topic"));
        assert!(snippets[3].contains("Official site"));
    }

    #[test]
    fn test_extract_empty_body() {
        assert!(extract_snippets(&json!({}), 5).is_empty());
        assert!(extract_snippets(&json!({ "AbstractText": "   " }), 5).is_empty());
    }

    #[test]
    fn test_query_url_encoding() {
        let search = DuckDuckGoSearch::new(&SearchConfig::default()).unwrap();
        let url = search.query_url("rust & async");
        assert!(url.starts_with("https://api.duckduckgo.com/?q=rust%20%26%20async"));
        assert!(url.ends_with("&format=json&no_html=1&skip_disambig=1"));
    }

    const RESULTS_PAGE: &str = r#"
<div class="result results_links results_links_deep web-result ">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust <b>Programming</b> Language</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F">A language empowering everyone to build <b>reliable</b> &amp; efficient software.</a>
</div>
<div class="result results_links results_links_deep web-result ">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
  </h2>
  <a class="result__snippet" href="https://doc.rust-lang.org/book/">Learn Rust &quot;the hard way&quot;.</a>
</div>
<div class="result results_links results_links_deep web-result ">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://example.com/">Third</a>
  </h2>
  <a class="result__snippet" href="https://example.com/">Third snippet.</a>
</div>
"#;

    #[test]
    fn test_parse_html_results() {
        let parser = HtmlResultParser::new().unwrap();
        let snippets = parser.parse(RESULTS_PAGE, 5);

        assert_eq!(snippets.len(), 3);
        assert_eq!(
            snippets[0],
            "- Rust Programming Language: A language empowering everyone to build reliable & efficient software.\n  URL: https://www.rust-lang.org/"
        );
        assert!(snippets[1].contains("Learn Rust \"the hard way\"."));
        assert!(snippets[1].ends_with("URL: https://doc.rust-lang.org/book/"));
    }

    #[test]
    fn test_parse_html_results_respects_max_results() {
        let parser = HtmlResultParser::new().unwrap();
        assert_eq!(parser.parse(RESULTS_PAGE, 2).len(), 2);
        assert!(parser.parse("<html><body>No results.</body></html>", 5).is_empty());
    }

    #[test]
    fn test_result_target_unwraps_redirect() {
        assert_eq!(
            result_target("//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.example%2Fx%3Fy%3D1&amp;rut=z"),
            "https://a.example/x?y=1"
        );
        assert_eq!(result_target("https://b.example/"), "https://b.example/");
    }

    #[test]
    fn test_html_query_url() {
        let search = DuckDuckGoSearch::new(&SearchConfig::default()).unwrap();
        assert_eq!(
            search.html_query_url("why is the sky blue?"),
            "https://html.duckduckgo.com/html/?q=why%20is%20the%20sky%20blue%3F"
        );
    }

    #[test]
    fn test_unknown_search_provider() {
        let config = SearchConfig {
            provider: "altavista".to_string(),
            ..SearchConfig::default()
        };
        assert!(create_search_provider(&config).is_err());
        assert!(create_search_provider(&SearchConfig::default()).is_ok());
    }
}
