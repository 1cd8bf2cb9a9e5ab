use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docx_rs::{Docx, Paragraph, Run, Style, StyleType};
use nanoid::nanoid;
use serde_json::Value;

use crate::data_models::{SchemaOutput, StructuredResult};

pub const REPORT_EXTENSION: &str = "docx";
pub const NO_RESULTS_TEXT: &str = "No results found.";
const MAX_STEM_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: usize, text: String },
    Paragraph(String),
}

/// Layout of a report, independent of the file format it ends up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    blocks: Vec<Block>,
}

impl ReportDocument {
    /// Heading for the query, then one "Result N" section per item with a
    /// `key: value` line per field, or a single "No results found." paragraph.
    pub fn build(result: Option<&StructuredResult>, query: &str) -> ReportDocument {
        let mut blocks = vec![Block::Heading {
            level: 1,
            text: format!("Report for query: {query}"),
        }];

        match result.and_then(StructuredResult::results) {
            Some(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    blocks.push(Block::Heading {
                        level: 2,
                        text: format!("Result {}", i + 1),
                    });
                    match item {
                        Value::Object(fields) => {
                            for (key, value) in fields {
                                blocks.push(Block::Paragraph(format!(
                                    "{key}: {}",
                                    display_value(value)
                                )));
                            }
                        }
                        other => blocks.push(Block::Paragraph(display_value(other))),
                    }
                    blocks.push(Block::Paragraph(String::new()));
                }
            }
            _ => blocks.push(Block::Paragraph(NO_RESULTS_TEXT.to_string())),
        }

        ReportDocument { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Titles of the numbered result sections.
    pub fn section_titles(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { level: 2, text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn to_docx(&self) -> Docx {
        let mut docx = Docx::new()
            .add_style(
                Style::new("Heading1", StyleType::Paragraph)
                    .name("Heading 1")
                    .size(32)
                    .bold(),
            )
            .add_style(
                Style::new("Heading2", StyleType::Paragraph)
                    .name("Heading 2")
                    .size(26)
                    .bold(),
            );

        for block in &self.blocks {
            let paragraph = match block {
                Block::Heading { level, text } => Paragraph::new()
                    .add_run(Run::new().add_text(text.as_str()))
                    .style(&format!("Heading{level}")),
                Block::Paragraph(text) if text.is_empty() => Paragraph::new(),
                Block::Paragraph(text) => Paragraph::new().add_run(Run::new().add_text(text.as_str())),
            };
            docx = docx.add_paragraph(paragraph);
        }
        docx
    }

    /// Writes the document as `.docx`, creating missing parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        self.to_docx()
            .build()
            .pack(file)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders whatever the pipeline produced. Raw fallbacks have no result list and end
/// up as a "No results found." report.
pub fn render_report(data: Option<&SchemaOutput>, query: &str, path: &Path) -> Result<()> {
    let structured = data.and_then(SchemaOutput::as_structured);
    ReportDocument::build(structured, query).save(path)
}

/// File-name-safe stem for a query: whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_-]` is dropped, at most 30 characters.
pub fn sanitize_query(query: &str) -> String {
    let stem: String = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_STEM_CHARS)
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "report".to_string()
    } else {
        stem.to_string()
    }
}

/// Sanitized query plus a random token, so two runs of one query never share a file.
pub fn report_file_name(query: &str) -> String {
    format!("{}_{}.{REPORT_EXTENSION}", sanitize_query(query), nanoid!(8))
}

/// Places reports in one directory and hands out links under which they are served.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    reports_dir: PathBuf,
    link_prefix: String,
}

impl ReportWriter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> ReportWriter {
        ReportWriter {
            reports_dir: reports_dir.into(),
            link_prefix: "/reports".to_string(),
        }
    }

    pub fn with_link_prefix(mut self, prefix: impl Into<String>) -> ReportWriter {
        self.link_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Writes the report and returns its path and link.
    pub fn write(&self, data: Option<&SchemaOutput>, query: &str) -> Result<(PathBuf, String)> {
        let file_name = report_file_name(query);
        let path = self.reports_dir.join(&file_name);
        render_report(data, query, &path)?;
        tracing::info!(path = %path.display(), "report written");
        Ok((path, format!("{}/{file_name}", self.link_prefix)))
    }
}
