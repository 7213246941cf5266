//! Best-effort web snippets about a product from a public search results page.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

use crate::config::Config;

/// Result containers on the search page whose visible text is collected.
pub const RESULT_SNIPPET_SELECTOR: &str = "div.BNeawe.s3v9rd.AP7Wnd";

/// Maximum number of snippets joined into the web text.
pub const MAX_SNIPPETS: usize = 5;

const QUERY_SUFFIX: &str = "+environmental+impact";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("invalid search endpoint `{url}`: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Search query for `product`: spaces become `+` and the impact suffix is appended.
pub fn search_query(product: &str) -> String {
    format!("{}{}", product.replace(' ', "+"), QUERY_SUFFIX)
}

/// Joins the visible text of the first [`MAX_SNIPPETS`] result containers with single spaces.
///
/// Returns an empty string when nothing matches.
pub fn extract_snippets(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(RESULT_SNIPPET_SELECTOR) else {
        return String::new();
    };

    document
        .select(&selector)
        .take(MAX_SNIPPETS)
        .map(|element| element.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fetches the search results page for a product and extracts its snippets.
pub struct WebEnricher {
    client: Client,
    search_url: String,
}

impl WebEnricher {
    pub fn new(search_url: impl Into<String>, timeout: Duration) -> Result<Self, EnrichError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            search_url: search_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, EnrichError> {
        Self::new(config.search_url.clone(), config.http_timeout)
    }

    /// Full request URL for `product`.
    ///
    /// The query is placed verbatim so the `+` separators reach the endpoint unescaped.
    pub fn search_url_for(&self, product: &str) -> Result<Url, EnrichError> {
        let mut url = Url::parse(&self.search_url).map_err(|source| EnrichError::InvalidEndpoint {
            url: self.search_url.clone(),
            source,
        })?;
        url.set_query(Some(&format!("q={}", search_query(product))));
        Ok(url)
    }

    /// Issues one GET and returns the joined snippets.
    ///
    /// The response status is not inspected; whatever body arrives is parsed.
    pub fn enrich(&self, product: &str) -> Result<String, EnrichError> {
        let url = self.search_url_for(product)?;
        debug!("Fetching web snippets from {}", url);

        let body = self.client.get(url).send()?.text()?;
        let snippets = extract_snippets(&body);
        debug!(
            "Extracted {} characters of web text for `{}`",
            snippets.len(),
            product
        );
        Ok(snippets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = include_str!("../tests/fixtures/search_results.html");

    #[test]
    fn query_replaces_spaces_and_appends_suffix() {
        assert_eq!(
            search_query("Electric Toothbrush"),
            "Electric+Toothbrush+environmental+impact"
        );
        assert_eq!(search_query(""), "+environmental+impact");
    }

    #[test]
    fn extracts_first_five_matching_blocks() {
        let text = extract_snippets(RESULTS_PAGE);
        assert_eq!(
            text,
            "Toothbrushes produce plastic waste. Battery production dominates impacts. \
             Charging uses little energy. Bristles are nylon. Recycling is limited."
        );
        assert!(!text.contains("sixth"));
        assert!(!text.contains("Sponsored"));
    }

    #[test]
    fn no_matches_yield_empty_text() {
        assert_eq!(extract_snippets("<html><body><p>nothing</p></body></html>"), "");
        assert_eq!(extract_snippets(""), "");
    }

    #[test]
    fn url_keeps_plus_separators() {
        let enricher = WebEnricher::new("https://search.example/search", Duration::from_secs(1)).unwrap();
        let url = enricher.search_url_for("Reusable Cup").unwrap();
        assert_eq!(
            url.as_str(),
            "https://search.example/search?q=Reusable+Cup+environmental+impact"
        );
    }

    #[test]
    fn invalid_endpoint_is_an_error() {
        let enricher = WebEnricher::new("not a url", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            enricher.enrich("Cup"),
            Err(EnrichError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn unreachable_endpoint_is_an_error() {
        let enricher = WebEnricher::new("http://127.0.0.1:9/search", Duration::from_secs(2)).unwrap();
        assert!(matches!(enricher.enrich("Cup"), Err(EnrichError::Http(_))));
    }
}
