// ABOUTME: Direct client-server API calls the SDK does not expose the way the bot needs them.
// ABOUTME: Typing with an explicit timeout, room account data, and single-event lookup.

use aibot_core::traits::AccountDataStore;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use matrix_sdk::Client;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated access to the homeserver's client-server API
#[derive(Clone)]
pub struct Homeserver {
    http: reqwest::Client,
    base: Url,
    user_id: String,
    access_token: String,
}

impl fmt::Debug for Homeserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Homeserver")
            .field("base", &self.base.as_str())
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct EventSummary {
    sender: String,
}

impl Homeserver {
    pub fn new(
        homeserver: &str,
        user_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        let base = Url::parse(homeserver)
            .with_context(|| format!("Invalid homeserver URL: {}", homeserver))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Homeserver URL cannot be used as a base: {}", homeserver);
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build homeserver HTTP client")?;
        Ok(Self {
            http,
            base,
            user_id: user_id.into(),
            access_token: access_token.into(),
        })
    }

    /// Build from a logged-in SDK client, reusing its session
    pub fn from_client(client: &Client) -> Result<Self> {
        let user_id = client
            .user_id()
            .context("Homeserver access requires a logged-in client")?
            .to_string();
        let access_token = client
            .access_token()
            .context("Logged-in client has no access token")?;
        Self::new(client.homeserver().as_str(), user_id, access_token)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// `/_matrix/client/v3/...` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Homeserver URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(["_matrix", "client", "v3"])
            .extend(segments);
        Ok(url)
    }

    fn typing_url(&self, room_id: &str) -> Result<Url> {
        self.endpoint(&["rooms", room_id, "typing", &self.user_id])
    }

    fn account_data_url(&self, room_id: &str, kind: &str) -> Result<Url> {
        self.endpoint(&["user", &self.user_id, "rooms", room_id, "account_data", kind])
    }

    fn event_url(&self, room_id: &str, event_id: &str) -> Result<Url> {
        self.endpoint(&["rooms", room_id, "event", event_id])
    }

    pub async fn set_typing(&self, room_id: &str, typing: bool, timeout: Duration) -> Result<()> {
        let url = self.typing_url(room_id)?;
        self.http
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&typing_body(typing, timeout))
            .send()
            .await
            .context("Typing request failed")?
            .error_for_status()
            .context("Homeserver rejected typing update")?;
        Ok(())
    }

    /// `Ok(None)` when the entry was never written
    pub async fn get_room_account_data(&self, room_id: &str, kind: &str) -> Result<Option<Value>> {
        let url = self.account_data_url(room_id, kind)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Account data request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value = response
            .error_for_status()
            .context("Homeserver rejected account data read")?
            .json::<Value>()
            .await
            .context("Account data is not valid JSON")?;
        Ok(Some(value))
    }

    pub async fn put_room_account_data(&self, room_id: &str, kind: &str, value: &Value) -> Result<()> {
        let url = self.account_data_url(room_id, kind)?;
        self.http
            .put(url)
            .bearer_auth(&self.access_token)
            .json(value)
            .send()
            .await
            .context("Account data request failed")?
            .error_for_status()
            .context("Homeserver rejected account data write")?;
        Ok(())
    }

    /// Sender of one event, fetched from the server
    pub async fn event_sender(&self, room_id: &str, event_id: &str) -> Result<String> {
        let url = self.event_url(room_id, event_id)?;
        let event = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Event lookup failed")?
            .error_for_status()
            .with_context(|| format!("Homeserver rejected lookup of {}", event_id))?
            .json::<EventSummary>()
            .await
            .context("Event has no sender")?;
        Ok(event.sender)
    }
}

fn typing_body(typing: bool, timeout: Duration) -> Value {
    if typing {
        json!({ "typing": true, "timeout": timeout.as_millis() as u64 })
    } else {
        json!({ "typing": false, "timeout": 0 })
    }
}

#[async_trait]
impl AccountDataStore for Homeserver {
    async fn get_room_data(&self, room_id: &str, key: &str) -> Result<Option<Value>> {
        self.get_room_account_data(room_id, key).await
    }

    async fn set_room_data(&self, room_id: &str, key: &str, value: Value) -> Result<()> {
        self.put_room_account_data(room_id, key, &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn homeserver(base: &str) -> Homeserver {
        Homeserver::new(base, "@aibot:example.com", "secret-token").unwrap()
    }

    #[test]
    fn test_typing_url() {
        let url = homeserver("https://matrix.example.com")
            .typing_url("!room:example.com")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://matrix.example.com/_matrix/client/v3/rooms/!room:example.com/typing/@aibot:example.com"
        );
    }

    #[test]
    fn test_account_data_url_keeps_base_path() {
        let url = homeserver("https://example.com/matrix/")
            .account_data_url("!room:example.com", "aibot.join_message_sent")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/matrix/_matrix/client/v3/user/@aibot:example.com/rooms/!room:example.com/account_data/aibot.join_message_sent"
        );
    }

    #[test]
    fn test_segments_are_escaped() {
        let url = homeserver("https://matrix.example.com")
            .event_url("!room:example.com", "$abc/def?x")
            .unwrap();
        assert!(url.as_str().ends_with("/event/$abc%2Fdef%3Fx"));
    }

    #[test]
    fn test_typing_body() {
        assert_eq!(
            typing_body(true, Duration::from_millis(60000)),
            json!({"typing": true, "timeout": 60000})
        );
        assert_eq!(
            typing_body(false, Duration::from_millis(60000)),
            json!({"typing": false, "timeout": 0})
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(Homeserver::new("not a url", "@aibot:example.com", "t").is_err());
        assert!(Homeserver::new("mailto:bot@example.com", "@aibot:example.com", "t").is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", homeserver("https://matrix.example.com"));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
