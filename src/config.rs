use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SERPER_URL: &str = "https://google.serper.dev/search";
pub const DEFAULT_NUM_RESULTS: usize = 3;
pub const DEFAULT_REPORTS_DIR: &str = "static/reports";

#[derive(Debug, Clone)]
pub struct Config {
    pub serper_api_key: String,
    pub serper_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub filter_model: String,
    pub num_results: usize,
    pub reports_dir: PathBuf,
    pub http_timeout: Duration,
    pub fetch_timeout: Duration,
    pub max_page_bytes: usize,
    pub enable_result_filter: bool,
    pub bind_addr: String,
}

impl Config {
    /// Reads the configuration from the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Config> {
        dotenv().ok();
        let model = get_env_or_default("MODEL", DEFAULT_MODEL);
        Ok(Config {
            serper_api_key: get_env("SERPER_API_KEY")?,
            serper_url: get_env_or_default("SERPER_URL", DEFAULT_SERPER_URL),
            openai_api_key: get_env("OPENAI_API_KEY")?,
            openai_base_url: get_env_or_default("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            filter_model: get_env_or_default("FILTER_MODEL", &model),
            model,
            num_results: get_env_parsed("NUM_RESULTS", DEFAULT_NUM_RESULTS)?,
            reports_dir: PathBuf::from(get_env_or_default("REPORTS_DIR", DEFAULT_REPORTS_DIR)),
            http_timeout: Duration::from_secs(get_env_parsed("HTTP_TIMEOUT_SECS", 30)?),
            fetch_timeout: Duration::from_secs(get_env_parsed("FETCH_TIMEOUT_SECS", 15)?),
            max_page_bytes: get_env_parsed("MAX_PAGE_BYTES", 2 * 1024 * 1024)?,
            enable_result_filter: get_env_parsed("ENABLE_RESULT_FILTER", false)?,
            bind_addr: get_env_or_default("BIND_ADDR", "0.0.0.0:3000"),
        })
    }
}

fn get_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("Missing required environment variable: {key}"))
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
