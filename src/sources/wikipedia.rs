//! Wikipedia article reader

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Url};

use super::EncyclopediaSource;
use crate::config::SourcesConfig;
use crate::errors::{AnalysisError, Result};

const SOURCE_NAME: &str = "wikipedia";

/// Paragraphs taken from the top of an article
const INTRO_PARAGRAPHS: usize = 3;

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([a-zA-Z]+));").unwrap());

/// Encyclopedia source reading article HTML
#[derive(Debug, Clone)]
pub struct Wikipedia {
    client: Client,
    base_url: String,
}

impl Wikipedia {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(client: Client, config: &SourcesConfig) -> Self {
        Self::new(client, config.encyclopedia_url.clone())
    }

    fn article_url(&self, slug: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AnalysisError::ConfigError(format!("bad encyclopedia url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AnalysisError::ConfigError("encyclopedia url cannot hold a path".into()))?
            .pop_if_empty()
            .push(slug);
        Ok(url)
    }
}

/// Article slug: spaces become underscores
pub fn slug(ingredient: &str) -> String {
    ingredient.replace(' ', "_")
}

/// Plain text of the first paragraphs of an article page
pub fn intro_text(html: &str) -> String {
    PARAGRAPH
        .captures_iter(html)
        .take(INTRO_PARAGRAPHS)
        .map(|caps| {
            let text = TAG.replace_all(&caps[1], "");
            let text = CITATION.replace_all(&text, "");
            decode_entities(text.trim())
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Decode HTML character references in one pass; unknown names stay as written
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                caps.get(3).and_then(|name| named_entity(name.as_str()))
            };

            match decoded {
                Some('\u{a0}') => " ".to_string(),
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "deg" => '\u{b0}',
        "micro" => '\u{b5}',
        _ => return None,
    })
}

#[async_trait]
impl EncyclopediaSource for Wikipedia {
    async fn article_intro(&self, slug: &str) -> Result<String> {
        let url = self.article_url(slug)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::degraded(SOURCE_NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::degraded(
                SOURCE_NAME,
                format!("HTTP {} for {}", response.status(), slug),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AnalysisError::degraded(SOURCE_NAME, e.to_string()))?;

        Ok(intro_text(&html))
    }
}
