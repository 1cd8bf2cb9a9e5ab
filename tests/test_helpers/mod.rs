#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dossier::llm::{LanguageModel, LlmError};
use dossier::pipeline::{Pipeline, ResearchAgent};
use dossier::report::ReportWriter;
use dossier::scrapper::{FetchedPage, PageFetcher};
use dossier::search::SearchProvider;

pub const FUNDING_QUERY: &str = "recent fundings of openai and gemini";

pub struct FakeSearch {
    urls: Vec<String>,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn new(urls: &[&str]) -> Self {
        Self {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, _query: &str, limit: usize) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.iter().take(limit).cloned().collect()
    }
}

pub struct FakeFetcher {
    pages: HashMap<String, FetchedPage>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), FetchedPage::html(*html)))
                .collect(),
            fetched: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("connection refused: {url}"))
    }
}

/// Answers by prompt kind: summary prompts, JSON-mapping prompts and filter prompts.
pub struct ScriptedModel {
    pub summary: Result<String, String>,
    pub mapping: String,
    pub filter: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(summary: &str, mapping: &str) -> Self {
        Self {
            summary: Ok(summary.to_string()),
            mapping: mapping.to_string(),
            filter: "[]".to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_summary(message: &str) -> Self {
        Self {
            summary: Err(message.to_string()),
            ..Self::new("", "{}")
        }
    }

    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = filter.to_string();
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.starts_with("Summarize") {
            self.summary.clone().map_err(LlmError::Network)
        } else if prompt.contains("Respond only with JSON") {
            Ok(self.mapping.clone())
        } else {
            Ok(self.filter.clone())
        }
    }
}

/// Three pages worth of funding news.
pub fn funding_fetcher() -> FakeFetcher {
    FakeFetcher::new(&[
        (
            "https://news.example/openai",
            "<html><body><article><p>OpenAI raised $6.6 billion &amp; more.</p></article></body></html>",
        ),
        (
            "https://news.example/gemini",
            "<html><body><nav>Menu</nav><p>Google funds Gemini work.</p></body></html>",
        ),
        (
            "https://news.example/roundup",
            "<html><body><main><p>Funding roundup | week 42 |</p></main></body></html>",
        ),
    ])
}

pub fn funding_urls() -> Vec<&'static str> {
    vec![
        "https://news.example/openai",
        "https://news.example/gemini",
        "https://news.example/roundup",
    ]
}

pub fn agent(
    search: Arc<FakeSearch>,
    fetcher: Arc<FakeFetcher>,
    model: Arc<ScriptedModel>,
    reports: ReportWriter,
) -> ResearchAgent {
    ResearchAgent::new(Pipeline::standard(search, fetcher, model, 3), reports)
}

pub fn report_files(dir: &std::path::Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
