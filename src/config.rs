use crate::error::ProbeError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HISTORY_PATH: &str = "prompt_history.json";
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Settings resolved once at startup and handed to the API client.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub history_path: PathBuf,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ProbeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProbeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("PROMPT_API_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.set_base_url(&url);
        }
        if let Some(raw) = lookup("PROMPT_API_TIMEOUT_SECS") {
            let secs = parse_positive("PROMPT_API_TIMEOUT_SECS", &raw)?;
            config.request_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(path) = lookup("PROMPT_HISTORY_PATH").filter(|p| !p.trim().is_empty()) {
            config.history_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("PROMPT_HISTORY_LIMIT") {
            config.history_limit = parse_positive("PROMPT_HISTORY_LIMIT", &raw)?;
        }

        Ok(config)
    }

    pub fn set_base_url(&mut self, url: &str) {
        self.api_base_url = url.trim().trim_end_matches('/').to_string();
    }

    pub fn api_url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.api_base_url, path)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, ProbeError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ProbeError::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
