// ABOUTME: Web search tool backed by SerpAPI.
// ABOUTME: Reduces the result JSON to the single most useful snippet.

use anyhow::{Context, Result};
use serde_json::Value;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";

pub async fn search(http: &reqwest::Client, api_key: &str, query: &str) -> Result<String> {
    tracing::debug!(query = %query, "Performing web search");

    let response = http
        .get(SERPAPI_URL)
        .query(&[("engine", "google"), ("q", query), ("api_key", api_key)])
        .send()
        .await
        .context("Search request failed")?
        .error_for_status()
        .context("Search API returned an error")?;

    let body: Value = response
        .json()
        .await
        .context("Search API returned invalid JSON")?;

    Ok(best_snippet(&body))
}

/// Pick the most direct answer SerpAPI offers, in the order a person would read them
pub fn best_snippet(body: &Value) -> String {
    let answer_box = &body["answer_box"];
    let candidates = [
        &answer_box["answer"],
        &answer_box["snippet"],
        &answer_box["snippet_highlighted_words"][0],
        &body["sports_results"]["game_spotlight"],
        &body["knowledge_graph"]["description"],
        &body["organic_results"][0]["snippet"],
    ];

    candidates
        .iter()
        .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "No good search result found".to_string())
}
