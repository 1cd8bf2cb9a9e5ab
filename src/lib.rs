pub mod analyzer;
pub mod api;
pub mod config;
pub mod data_models;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod result_filter;
pub mod schema_mapper;
pub mod scrapper;
pub mod search;
pub mod summarizer;
