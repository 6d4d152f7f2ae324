// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Run-wide settings. Every field has a default so a config file only needs the overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub base_url: String,
    pub page_size: usize,
    /// Postings bound used when the first page does not advertise a parseable count.
    pub default_total: usize,
    /// Hard ceiling on the postings bound.
    pub max_total: usize,
    pub timeout_secs: u64,
    pub workers: usize,
    pub user_agent: String,
    pub selectors: Selectors,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.indeed.com".to_string(),
            page_size: 10,
            default_total: 100,
            max_total: 5000,
            timeout_secs: 30,
            workers: 1,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            selectors: Selectors::default(),
        }
    }
}

/// CSS selectors for the result and detail pages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub card: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub link: String,
    pub search_count: String,
    pub description: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            card: ".jobsearch-SerpJobCard".to_string(),
            title: ".jobtitle".to_string(),
            company: ".company".to_string(),
            location: ".location".to_string(),
            salary: ".salarySnippet".to_string(),
            link: ".title a".to_string(),
            search_count: "#searchCount".to_string(),
            description: ".jobsearch-JobComponent-description".to_string(),
        }
    }
}

impl ScoutConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ScoutConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.default_total > self.max_total {
            anyhow::bail!(
                "default_total ({}) exceeds max_total ({})",
                self.default_total,
                self.max_total
            );
        }
        reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.base_url))?;
        Ok(())
    }
}
