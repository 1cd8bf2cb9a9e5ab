//! The research pipeline: an ordered list of stages, each taking the whole
//! [`PipelineState`] and handing back a (possibly unchanged) one.
//!
//! ```text
//!     search -> scrape -> summarize -> map_to_schema [-> filter_results]
//! ```
//!
//! A stage whose input is missing passes the state through untouched. External
//! failures never abort the chain: search and scrape failures show up as empty
//! data, model failures are logged and recorded in `stage_errors`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::data_models::{PipelineState, ResearchOutcome};
use crate::llm::{LanguageModel, OpenAIClient};
use crate::report::ReportWriter;
use crate::result_filter::summarize_or_filter;
use crate::schema_mapper::map_to_schema;
use crate::scrapper::{HttpFetcher, PageFetcher, Scrapper};
use crate::search::{SearchProvider, SerperClient};
use crate::summarizer::{combine_texts, summarize_text};

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: PipelineState) -> PipelineState;
}

pub struct SearchStage {
    provider: Arc<dyn SearchProvider>,
    limit: usize,
}

impl SearchStage {
    pub fn new(provider: Arc<dyn SearchProvider>, limit: usize) -> Self {
        Self { provider, limit }
    }
}

#[async_trait]
impl Stage for SearchStage {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let urls = self.provider.search(state.query(), self.limit).await;
        info!(count = urls.len(), "search stage found urls");
        state.urls = Some(urls);
        state
    }
}

pub struct ScrapeStage {
    scrapper: Scrapper,
}

impl ScrapeStage {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            scrapper: Scrapper::new(fetcher),
        }
    }
}

#[async_trait]
impl Stage for ScrapeStage {
    fn name(&self) -> &'static str {
        "scrape"
    }

    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let Some(urls) = state.urls.as_ref().filter(|u| !u.is_empty()) else {
            return state;
        };
        let texts = self.scrapper.scrape_all(urls).await;
        state.scraped_texts = Some(texts);
        state
    }
}

pub struct SummarizeStage {
    llm: Arc<dyn LanguageModel>,
}

impl SummarizeStage {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    fn name(&self) -> &'static str {
        "summarize"
    }

    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let Some(texts) = state.scraped_texts.as_ref() else {
            return state;
        };
        // every page came back empty: nothing worth a model call
        if texts.iter().all(|t| t.trim().is_empty()) {
            return state;
        }

        let combined = combine_texts(texts);
        match summarize_text(self.llm.as_ref(), &combined, state.query()).await {
            Ok(summary) => state.summaries = Some(vec![summary]),
            Err(e) => {
                error!(error = %e, "summarize stage failed");
                state.record_error(self.name(), e);
            }
        }
        state
    }
}

pub struct MapToSchemaStage {
    llm: Arc<dyn LanguageModel>,
}

impl MapToSchemaStage {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Stage for MapToSchemaStage {
    fn name(&self) -> &'static str {
        "map_to_schema"
    }

    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let Some(summary) = state
            .summaries
            .as_ref()
            .and_then(|s| s.first())
            .filter(|s| !s.trim().is_empty())
        else {
            return state;
        };

        match map_to_schema(self.llm.as_ref(), summary, state.query()).await {
            Ok(mapped) => state.mapped_results = Some(vec![mapped]),
            Err(e) => {
                error!(error = %e, "map_to_schema stage failed");
                state.record_error(self.name(), e);
            }
        }
        state
    }
}

/// Optional last stage: lets the model trim and deduplicate the mapped results.
pub struct FilterResultsStage {
    llm: Arc<dyn LanguageModel>,
}

impl FilterResultsStage {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Stage for FilterResultsStage {
    fn name(&self) -> &'static str {
        "filter_results"
    }

    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let Some(mapped) = state.mapped_results.as_ref().and_then(|m| m.first()).cloned() else {
            return state;
        };

        match summarize_or_filter(self.llm.as_ref(), mapped, state.query()).await {
            Ok(filtered) => state.filtered_result = Some(filtered),
            Err(e) => {
                error!(error = %e, "filter_results stage failed");
                state.record_error(self.name(), e);
            }
        }
        state
    }
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// search -> scrape -> summarize -> map_to_schema
    pub fn standard(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        llm: Arc<dyn LanguageModel>,
        num_results: usize,
    ) -> Self {
        Self::new(vec![
            Box::new(SearchStage::new(search, num_results)),
            Box::new(ScrapeStage::new(fetcher)),
            Box::new(SummarizeStage::new(llm.clone())),
            Box::new(MapToSchemaStage::new(llm)),
        ])
    }

    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage exactly once, in order.
    pub async fn run(&self, mut state: PipelineState) -> PipelineState {
        for stage in self.stages.iter() {
            debug!(stage = stage.name(), "running stage");
            state = stage.run(state).await;
        }
        state
    }
}

/// Drives one query through the pipeline and writes the report.
pub struct ResearchAgent {
    pipeline: Pipeline,
    reports: ReportWriter,
}

impl ResearchAgent {
    pub fn new(pipeline: Pipeline, reports: ReportWriter) -> Self {
        Self { pipeline, reports }
    }

    /// Wires the Serper, page-fetch and chat-completion clients from configuration.
    pub fn from_config(config: &Config, enable_filter: bool) -> Result<Self> {
        let search = SerperClient::from_config(config)?;
        let fetcher = HttpFetcher::from_config(config)?;
        let llm = OpenAIClient::from_config(config)?;

        let mut pipeline = Pipeline::standard(
            Arc::new(search),
            Arc::new(fetcher),
            Arc::new(llm.clone()),
            config.num_results,
        );
        if enable_filter || config.enable_result_filter {
            let filter_llm = llm.with_model(&config.filter_model);
            pipeline = pipeline.with_stage(Box::new(FilterResultsStage::new(Arc::new(filter_llm))));
        }

        Ok(Self::new(pipeline, ReportWriter::new(&config.reports_dir)))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub async fn run(&self, query: &str) -> Result<ResearchOutcome> {
        info!(query, "research run started");
        let state = self.pipeline.run(PipelineState::new(query)).await;

        let Some(data) = state.final_result().cloned() else {
            info!(query, "pipeline produced no result, skipping report");
            return Ok(ResearchOutcome::empty(state));
        };

        let reports = self.reports.clone();
        let query = state.query().to_string();
        let to_render = data.clone();
        let (path, link) = tokio::task::spawn_blocking(move || reports.write(Some(&to_render), &query))
            .await
            .context("Report rendering task failed")??;

        Ok(ResearchOutcome {
            state,
            data: Some(data),
            report_path: Some(path),
            report_link: Some(link),
            generated_at: Utc::now(),
        })
    }
}
