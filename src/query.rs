use reqwest::Url;

use crate::criteria::SearchCriteria;
use crate::error::{Result, ScrapeError};

/// Builds the search results URL for one page, e.g.
/// `/jobs?q=software+engineer+75000&l=San+Diego%2C+CA&radius=10&jt=fulltime&explvl=entry_level&start=20`
pub fn results_page_url(base: &Url, criteria: &SearchCriteria, offset: usize) -> Result<Url> {
    let mut url = base.join("/jobs").map_err(|e| ScrapeError::InvalidUrl {
        url: base.to_string(),
        message: e.to_string(),
    })?;

    let mut query = criteria.title.clone();
    if !criteria.salary.is_empty() {
        query.push(' ');
        query.push_str(&criteria.salary);
    }
    let location = format!(
        "{}, {}",
        title_case(&criteria.city),
        criteria.state.to_uppercase()
    );

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", &query);
        pairs.append_pair("l", &location);
        pairs.append_pair("radius", &criteria.radius.to_string());
        if let Some(jt) = criteria.job_type.query_value() {
            pairs.append_pair("jt", jt);
        }
        if let Some(level) = criteria.experience.query_value() {
            pairs.append_pair("explvl", level);
        }
        pairs.append_pair("start", &offset.to_string());
    }

    Ok(url)
}

/// Resolves a listing's `href` against the board's base URL.
pub fn resolve_link(base: &Url, href: &str) -> Result<Url> {
    base.join(href.trim()).map_err(|e| ScrapeError::InvalidUrl {
        url: href.to_string(),
        message: e.to_string(),
    })
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
