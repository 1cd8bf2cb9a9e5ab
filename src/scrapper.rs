use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::analyzer::{HTMLTagFilter, clean_scraped_text};
use crate::config::Config;

const USER_AGENT: &str = concat!("dossier/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn html(body: impl Into<String>) -> FetchedPage {
        FetchedPage {
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
        }
    }

    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.to_ascii_lowercase().contains("html"),
            None => self.body.trim_start().starts_with('<'),
        }
    }
}

/// Downloads raw page content.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<HttpFetcher> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build page fetch client")?;
        Ok(HttpFetcher { client, max_bytes })
    }

    pub fn from_config(config: &Config) -> Result<HttpFetcher> {
        Self::new(config.fetch_timeout, config.max_page_bytes)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let mut res = self.client.get(url).send().await?.error_for_status()?;
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // bodies past max_bytes are cut off
        let mut body = Vec::new();
        while let Some(chunk) = res.chunk().await? {
            let room = self.max_bytes.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.max_bytes {
                log::warn!("page body truncated at {} bytes: {url}", self.max_bytes);
                break;
            }
        }

        Ok(FetchedPage {
            content_type,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Fetches pages one at a time and turns them into cleaned plain text.
pub struct Scrapper {
    fetcher: Arc<dyn PageFetcher>,
}

impl Scrapper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Scrapper {
        Scrapper { fetcher }
    }

    /// Cleaned main text of `url`, or an empty string when the page can't be fetched
    /// or has no readable content.
    pub async fn scrape(&self, url: &str) -> String {
        match self.fetcher.fetch(url).await {
            Ok(page) => {
                let text = Self::extract_text(&page);
                let cleaned = clean_scraped_text(&text);
                log::info!("scraped {url}: {} chars", cleaned.len());
                cleaned
            }
            Err(e) => {
                log::error!("scraping failed for {url}, error: {:#}", e);
                String::new()
            }
        }
    }

    /// One entry per url, in the same order.
    pub async fn scrape_all(&self, urls: &[String]) -> Vec<String> {
        let mut texts = Vec::with_capacity(urls.len());
        for url in urls {
            texts.push(self.scrape(url).await);
        }
        texts
    }

    pub fn extract_text(page: &FetchedPage) -> String {
        if page.is_html() {
            HTMLTagFilter::extract(&page.body).body
        } else {
            page.body.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapFetcher(HashMap<String, FetchedPage>);

    #[async_trait]
    impl PageFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("404 for {url}"))
        }
    }

    fn scrapper(pages: &[(&str, FetchedPage)]) -> Scrapper {
        let map = pages
            .iter()
            .map(|(url, page)| (url.to_string(), page.clone()))
            .collect();
        Scrapper::new(Arc::new(MapFetcher(map)))
    }

    #[test]
    fn test_is_html_sniffs_body_without_content_type() {
        let page = FetchedPage {
            content_type: None,
            body: "  <html><body>x</body></html>".into(),
        };
        assert!(page.is_html());

        let page = FetchedPage {
            content_type: Some("text/plain".into()),
            body: "<not html>".into(),
        };
        assert!(!page.is_html());
    }

    #[tokio::test]
    async fn test_scrape_extracts_and_cleans() {
        let html = r#"<html><head><title>T</title><script>var x = 1;</script></head>
            <body><nav>Home | About</nav><p>OpenAI raised &amp; grew.</p>
            <p>Caf&eacute; news</p><footer>copyright</footer></body></html>"#;
        let s = scrapper(&[("https://a.example", FetchedPage::html(html))]);

        let text = s.scrape("https://a.example").await;
        assert_eq!(text, "OpenAI raised & grew. Caf news");
    }

    #[tokio::test]
    async fn test_scrape_failure_is_empty() {
        let s = scrapper(&[]);
        assert_eq!(s.scrape("https://missing.example").await, "");
    }

    #[tokio::test]
    async fn test_scrape_all_preserves_order_and_length() {
        let s = scrapper(&[
            ("https://a.example", FetchedPage::html("<p>first</p>")),
            (
                "https://c.example",
                FetchedPage {
                    content_type: Some("text/plain".into()),
                    body: "third\n   page".into(),
                },
            ),
        ]);
        let urls = vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
            "https://c.example".to_string(),
        ];
        assert_eq!(s.scrape_all(&urls).await, vec!["first", "", "third page"]);
    }
}
