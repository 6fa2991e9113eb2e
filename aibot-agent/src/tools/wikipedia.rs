// ABOUTME: Encyclopedia lookup tool using the MediaWiki search API.
// ABOUTME: Returns intro extracts of the top matching pages.

use anyhow::{Context, Result};
use serde::Deserialize;

const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const MAX_PAGES: &str = "3";
const MAX_TOTAL_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    query: Option<Query>,
}

#[derive(Debug, Deserialize)]
struct Query {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    index: u32,
}

pub async fn lookup(http: &reqwest::Client, query: &str) -> Result<String> {
    tracing::debug!(query = %query, "Looking up Wikipedia");

    let response: QueryResponse = http
        .get(WIKIPEDIA_API_URL)
        .query(&[
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrlimit", MAX_PAGES),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
        ])
        .send()
        .await
        .context("Wikipedia request failed")?
        .error_for_status()
        .context("Wikipedia returned an error")?
        .json()
        .await
        .context("Wikipedia returned invalid JSON")?;

    Ok(format_pages(response))
}

/// Join page extracts in search-rank order, capped at MAX_TOTAL_CHARS
pub fn format_pages(response: QueryResponse) -> String {
    let mut pages = response.query.map(|q| q.pages).unwrap_or_default();
    pages.retain(|p| !p.extract.trim().is_empty());
    if pages.is_empty() {
        return "No good Wikipedia search result was found".to_string();
    }
    pages.sort_by_key(|p| p.index);

    let text = pages
        .iter()
        .map(|p| format!("Page: {}\nSummary: {}", p.title, p.extract.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    text.chars().take(MAX_TOTAL_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> QueryResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_pages_sorted_by_rank() {
        let response = parse(json!({
            "query": {"pages": [
                {"title": "Second", "extract": "two", "index": 2},
                {"title": "First", "extract": "one", "index": 1}
            ]}
        }));
        let text = format_pages(response);
        assert!(text.starts_with("Page: First\nSummary: one"));
        assert!(text.contains("Page: Second"));
    }

    #[test]
    fn test_empty_extracts_skipped() {
        let response = parse(json!({
            "query": {"pages": [{"title": "Blank", "extract": "  ", "index": 1}]}
        }));
        assert_eq!(format_pages(response), "No good Wikipedia search result was found");
    }

    #[test]
    fn test_no_query_block() {
        assert_eq!(
            format_pages(parse(json!({"batchcomplete": true}))),
            "No good Wikipedia search result was found"
        );
    }

    #[test]
    fn test_output_is_capped() {
        let response = parse(json!({
            "query": {"pages": [{"title": "Long", "extract": "x".repeat(10_000), "index": 1}]}
        }));
        assert_eq!(format_pages(response).chars().count(), MAX_TOTAL_CHARS);
    }
}
