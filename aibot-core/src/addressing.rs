// ABOUTME: Detects whether a message addresses the bot and extracts the addressed text.
// ABOUTME: Two strategies: a leading AI/@AI (or #AI anywhere) prefix, or an HTML mention link.

use crate::html::{decode_entities, html_to_plain};
use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the bot recognizes that a group message is meant for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressingStrategy {
    /// `AI ...`, `@AI ...` at the start, or `#AI` anywhere
    #[default]
    Prefix,
    /// A rich-text link to the bot's account in the formatted body
    Mention,
}

impl fmt::Display for AddressingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressingStrategy::Prefix => write!(f, "prefix"),
            AddressingStrategy::Mention => write!(f, "mention"),
        }
    }
}

impl FromStr for AddressingStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "prefix" => Ok(AddressingStrategy::Prefix),
            "mention" => Ok(AddressingStrategy::Mention),
            other => bail!("Unknown addressing strategy '{}' (expected prefix or mention)", other),
        }
    }
}

/// Compiled matcher for one strategy
#[derive(Debug, Clone)]
pub struct Addressing {
    strategy: AddressingStrategy,
    prefix: Regex,
    anchor: Regex,
}

impl Addressing {
    pub fn new(strategy: AddressingStrategy) -> Result<Self> {
        let prefix = Regex::new(r"(?i)^@?ai\b|#ai\b").context("Invalid prefix pattern")?;
        let anchor = Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>.*?</a>"#)
            .context("Invalid anchor pattern")?;
        Ok(Self {
            strategy,
            prefix,
            anchor,
        })
    }

    pub fn strategy(&self) -> AddressingStrategy {
        self.strategy
    }

    /// Addressed text from the message content alone.
    ///
    /// Reply-to-bot detection needs a host lookup and lives in the router.
    pub fn extract(
        &self,
        body: &str,
        formatted_body: Option<&str>,
        bot_user_id: &str,
    ) -> Option<String> {
        match self.strategy {
            AddressingStrategy::Prefix => self.match_prefix(body),
            AddressingStrategy::Mention => {
                formatted_body.and_then(|html| self.match_mention(html, bot_user_id))
            }
        }
    }

    /// Text after a leading `AI`/`@AI` or the first `#AI`, trimmed
    pub fn match_prefix(&self, body: &str) -> Option<String> {
        let body = body.trim();
        self.prefix
            .find(body)
            .map(|m| body[m.end()..].trim().to_string())
    }

    /// Text after the first link whose target names the bot, as plain text
    pub fn match_mention(&self, html: &str, bot_user_id: &str) -> Option<String> {
        self.anchor
            .captures_iter(html)
            .find(|caps| {
                caps.get(1)
                    .is_some_and(|href| links_to_user(href.as_str(), bot_user_id))
            })
            .and_then(|caps| caps.get(0))
            .map(|anchor| html_to_plain(&html[anchor.end()..]).trim().to_string())
    }
}

/// Whether a user permalink names exactly `user_id`.
///
/// Accepts `https://matrix.to/#/@user:server`, client routes such as
/// `#/user/@user:server`, and `matrix:u/user:server`, in raw or
/// percent-encoded form.
fn links_to_user(href: &str, user_id: &str) -> bool {
    let href = decode_entities(href);
    let Ok(href) = urlencoding::decode(&href) else {
        return false;
    };

    if let Some(rest) = href.strip_prefix("matrix:u/") {
        let target = rest.split(['?', '#']).next().unwrap_or_default();
        return user_id.strip_prefix('@') == Some(target);
    }

    href.split_once("#/").is_some_and(|(_, fragment)| {
        fragment
            .split('?')
            .next()
            .unwrap_or_default()
            .split('/')
            .any(|segment| segment == user_id)
    })
}
