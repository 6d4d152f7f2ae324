use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::matcher::{match_keywords, KeywordMatch};

/// Something that can hand back the HTML of a page.
pub trait PageSource: Sync {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP page source with a per-request timeout.
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Transport {
                url: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ScrapeError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|e| ScrapeError::from_reqwest(url, e))
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| ScrapeError::Selector(selector.to_string()))
}

/// Text of the first match of `selector` under `element`, whitespace-collapsed.
/// Empty when nothing matches.
pub fn element_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|found| clean_text(&found.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default()
}

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Description text and score of one posting.
#[derive(Debug, Clone)]
pub struct JobDetail {
    pub description: String,
    pub matches: KeywordMatch,
}

/// Fetches posting pages and scores their descriptions.
pub struct DetailFetcher<'a> {
    source: &'a dyn PageSource,
    description: Selector,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(source: &'a dyn PageSource, description_selector: &str) -> Result<Self> {
        Ok(Self {
            source,
            description: parse_selector(description_selector)?,
        })
    }

    pub fn fetch(&self, url: &str, keywords: &[String]) -> Result<JobDetail> {
        let html = self.source.fetch(url)?;
        let description = self.extract_description(&html);
        if description.is_empty() {
            debug!("No description region found on {}", url);
        }
        let matches = match_keywords(&description, keywords);
        Ok(JobDetail {
            description,
            matches,
        })
    }

    fn extract_description(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        element_text(document.root_element(), &self.description)
    }
}
