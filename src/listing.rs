use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::ScoutConfig;
use crate::criteria::SearchCriteria;
use crate::error::{Result, ScrapeError};
use crate::fetch::{element_text, parse_selector, DetailFetcher, JobDetail, PageSource};
use crate::query::resolve_link;
use crate::ranking::{JobListing, RankingStore};

/// Summary fields of one result card, before the detail page is read.
#[derive(Debug, Clone, Default, PartialEq)]
struct CardSummary {
    employer: String,
    title: String,
    location: String,
    salary: String,
    href: Option<String>,
}

/// What happened to the cards of one results page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOutcome {
    /// Postings bound advertised by the page, after fallback and clamping.
    /// Only set when discovery was requested.
    pub declared_total: Option<usize>,
    pub cards: usize,
    pub admitted: usize,
    pub below_threshold: usize,
    pub without_link: usize,
    pub detail_failures: usize,
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    salary: Selector,
    link: Selector,
    search_count: Selector,
}

/// Reads one page of search results and queues the listings that clear the threshold.
pub struct ListingPageFetcher<'a> {
    source: &'a dyn PageSource,
    details: DetailFetcher<'a>,
    base: Url,
    selectors: CardSelectors,
    search_count: SearchCountParser,
    /// Only built when more than one worker is configured.
    pool: Option<ThreadPool>,
    default_total: usize,
    max_total: usize,
}

impl<'a> ListingPageFetcher<'a> {
    pub fn new(source: &'a dyn PageSource, config: &ScoutConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| ScrapeError::InvalidUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;
        let s = &config.selectors;
        let selectors = CardSelectors {
            card: parse_selector(&s.card)?,
            title: parse_selector(&s.title)?,
            company: parse_selector(&s.company)?,
            location: parse_selector(&s.location)?,
            salary: parse_selector(&s.salary)?,
            link: parse_selector(&s.link)?,
            search_count: parse_selector(&s.search_count)?,
        };

        let pool = match config.workers {
            0 | 1 => None,
            workers => Some(
                ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("detail-{i}"))
                    .build()
                    .map_err(|e| ScrapeError::WorkerPool {
                        workers,
                        message: e.to_string(),
                    })?,
            ),
        };

        Ok(Self {
            source,
            details: DetailFetcher::new(source, &s.description)?,
            base,
            selectors,
            search_count: SearchCountParser::new()?,
            pool,
            default_total: config.default_total.min(config.max_total),
            max_total: config.max_total,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Fetches `url`, scores every linked card and pushes the ones scoring above
    /// `criteria.min_matches` into `store`.
    ///
    /// Failing to fetch the page itself is an error; a failing detail page only
    /// drops that card.
    pub fn fetch_page(
        &self,
        url: &str,
        criteria: &SearchCriteria,
        discover_total: bool,
        store: &mut RankingStore,
    ) -> Result<PageOutcome> {
        let html = self.source.fetch(url)?;
        let (cards, declared_total) = {
            let document = Html::parse_document(&html);
            let total = discover_total.then(|| self.declared_total(&document));
            (self.read_cards(&document), total)
        };

        let mut outcome = PageOutcome {
            declared_total,
            cards: cards.len(),
            ..Default::default()
        };

        let mut linked = Vec::new();
        for card in cards {
            let Some(href) = card.href.as_deref() else {
                debug!("Dropping '{}' at '{}': no detail link", card.title, card.employer);
                outcome.without_link += 1;
                continue;
            };
            match resolve_link(&self.base, href) {
                Ok(link) => linked.push((card, link.to_string())),
                Err(e) => {
                    warn!("Skipping '{}' at '{}': {}", card.title, card.employer, e);
                    outcome.detail_failures += 1;
                }
            }
        }

        let links: Vec<String> = linked.iter().map(|(_, link)| link.clone()).collect();
        let details = self.fetch_details(&links, &criteria.keywords);

        for ((card, link), detail) in linked.into_iter().zip(details) {
            let detail = match detail {
                Ok(detail) => detail,
                Err(e) if e.is_recoverable_for_listing() => {
                    warn!("Skipping '{}' at '{}': {}", card.title, card.employer, e);
                    outcome.detail_failures += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let count = detail.matches.count();
            if count <= criteria.min_matches {
                debug!(
                    "Discarding '{}' at '{}': {} of {} keywords",
                    card.title,
                    card.employer,
                    count,
                    criteria.keywords.len()
                );
                outcome.below_threshold += 1;
                continue;
            }

            debug!(
                "Queueing '{}' at '{}': {} of {} keywords",
                card.title,
                card.employer,
                count,
                criteria.keywords.len()
            );
            store.push(JobListing {
                employer: card.employer,
                title: card.title,
                location: card.location,
                salary: card.salary,
                link,
                description: detail.description,
                matches: detail.matches,
            });
            outcome.admitted += 1;
        }

        Ok(outcome)
    }

    fn read_cards(&self, document: &Html) -> Vec<CardSummary> {
        let s = &self.selectors;
        document
            .select(&s.card)
            .map(|card| CardSummary {
                employer: element_text(card, &s.company),
                title: element_text(card, &s.title),
                location: element_text(card, &s.location),
                salary: element_text(card, &s.salary),
                href: card
                    .select(&s.link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .filter(|href| !href.trim().is_empty())
                    .map(String::from),
            })
            .collect()
    }

    fn declared_total(&self, document: &Html) -> usize {
        let text = element_text(document.root_element(), &self.selectors.search_count);
        match self.search_count.parse(&text) {
            Some(total) if total > self.max_total => {
                debug!("Clamping advertised total {} to {}", total, self.max_total);
                self.max_total
            }
            Some(total) => total,
            None => {
                warn!(
                    "Could not read the number of postings from '{}', searching {}",
                    text, self.default_total
                );
                self.default_total
            }
        }
    }

    /// Fetches detail pages, on the worker pool when there is one. Results line up with `links`.
    fn fetch_details(&self, links: &[String], keywords: &[String]) -> Vec<Result<JobDetail>> {
        match &self.pool {
            Some(pool) if links.len() > 1 => pool.install(|| {
                links
                    .par_iter()
                    .map(|link| self.details.fetch(link, keywords))
                    .collect()
            }),
            _ => links
                .iter()
                .map(|link| self.details.fetch(link, keywords))
                .collect(),
        }
    }
}

/// Reads the advertised number of postings from text such as "Page 1 of 1,234 jobs".
pub struct SearchCountParser {
    patterns: Vec<Regex>,
}

impl SearchCountParser {
    pub fn new() -> Result<Self> {
        let patterns = [r"(?i)\bof\s+([0-9,]+)", r"(?i)([0-9,]+)\s+jobs?\b"]
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ScrapeError::Pattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Counts too large for `usize` saturate so the caller's clamp still applies.
    pub fn parse(&self, text: &str) -> Option<usize> {
        self.patterns.iter().find_map(|re| {
            let digits = re.captures(text)?.get(1)?.as_str().replace(',', "");
            if digits.is_empty() {
                return None;
            }
            Some(digits.parse::<usize>().unwrap_or(usize::MAX))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::CriteriaInput;
    use crate::fetch::testing::StaticPages;

    const BASE: &str = "https://board.test";
    const PAGE: &str = "https://board.test/jobs?start=0";

    fn card(title: &str, company: &str, href: Option<&str>) -> String {
        let link = match href {
            Some(href) => format!(r#"<h2 class="title"><a href="{href}">{title}</a></h2>"#),
            None => format!(r#"<h2 class="title">{title}</h2>"#),
        };
        format!(
            r#"<div class="jobsearch-SerpJobCard">
                {link}
                <span class="jobtitle"> {title} </span>
                <span class="company">
                    {company}
                </span>
                <div class="location">Denver, CO</div>
                <span class="salarySnippet">$80,000 a year</span>
            </div>"#
        )
    }

    fn results_page(count: &str, cards: &[String]) -> String {
        format!(
            r#"<html><body><div id="searchCount">{count}</div>{}</body></html>"#,
            cards.join("\n")
        )
    }

    fn detail(text: &str) -> String {
        format!(
            r#"<html><body><div class="jobsearch-JobComponent-description">{text}</div></body></html>"#
        )
    }

    fn criteria(min_matches: usize) -> SearchCriteria {
        SearchCriteria::new(CriteriaInput {
            title: "engineer".into(),
            city: "denver".into(),
            state: "co".into(),
            keywords: "rust, sql, docker".into(),
            min_matches: Some(min_matches),
            ..Default::default()
        })
        .unwrap()
    }

    fn config() -> ScoutConfig {
        ScoutConfig::default().with_base_url(BASE.to_string())
    }

    #[test]
    fn queues_cards_above_threshold() {
        let pages = StaticPages::default()
            .with(
                PAGE,
                &results_page(
                    "Page 1 of 1,234 jobs",
                    &[
                        card("Backend Engineer", "Acme", Some("/viewjob?jk=1")),
                        card("Data Engineer", "Globex", Some("/viewjob?jk=2")),
                    ],
                ),
            )
            .with(
                "https://board.test/viewjob?jk=1",
                &detail("Rust services backed by SQL, shipped in Docker"),
            )
            .with("https://board.test/viewjob?jk=2", &detail("Mostly SQL"));

        let fetcher = ListingPageFetcher::new(&pages, &config()).unwrap();
        let mut store = RankingStore::new();
        let outcome = fetcher
            .fetch_page(PAGE, &criteria(1), true, &mut store)
            .unwrap();

        assert_eq!(outcome.declared_total, Some(1234));
        assert_eq!(outcome.cards, 2);
        assert_eq!(outcome.admitted, 1);
        assert_eq!(outcome.below_threshold, 1);

        let top = store.pop_max().unwrap();
        assert_eq!(top.employer, "Acme");
        assert_eq!(top.title, "Backend Engineer");
        assert_eq!(top.location, "Denver, CO");
        assert_eq!(top.salary, "$80,000 a year");
        assert_eq!(top.link, "https://board.test/viewjob?jk=1");
        assert_eq!(top.matched_keywords(), ["rust", "sql", "docker"]);
        assert!(store.is_empty());
    }

    #[test]
    fn threshold_is_exclusive() {
        let pages = StaticPages::default()
            .with(
                PAGE,
                &results_page("", &[card("Engineer", "Acme", Some("/viewjob?jk=1"))]),
            )
            .with("https://board.test/viewjob?jk=1", &detail("rust and sql"));

        let fetcher = ListingPageFetcher::new(&pages, &config()).unwrap();
        let mut store = RankingStore::new();
        let outcome = fetcher
            .fetch_page(PAGE, &criteria(2), false, &mut store)
            .unwrap();

        assert_eq!(outcome.declared_total, None);
        assert_eq!(outcome.below_threshold, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn cards_without_links_are_dropped_unfetched() {
        let pages = StaticPages::default().with(
            PAGE,
            &results_page("Page 1 of 3 jobs", &[card("Engineer", "Acme", None)]),
        );

        let fetcher = ListingPageFetcher::new(&pages, &config()).unwrap();
        let mut store = RankingStore::new();
        let outcome = fetcher
            .fetch_page(PAGE, &criteria(0), true, &mut store)
            .unwrap();

        assert_eq!(outcome.without_link, 1);
        assert_eq!(pages.requested(), vec![PAGE.to_string()]);
        assert!(store.is_empty());
    }

    #[test]
    fn missing_summary_fields_stay_empty() {
        let html = r#"<html><body><div class="jobsearch-SerpJobCard">
                <h2 class="title"><a href="/viewjob?jk=9">x</a></h2>
            </div></body></html>"#;
        let pages = StaticPages::default()
            .with(PAGE, html)
            .with("https://board.test/viewjob?jk=9", &detail("rust"));

        let fetcher = ListingPageFetcher::new(&pages, &config()).unwrap();
        let mut store = RankingStore::new();
        fetcher
            .fetch_page(PAGE, &criteria(0), false, &mut store)
            .unwrap();

        let listing = store.pop_max().unwrap();
        assert!(listing.employer.is_empty());
        assert!(listing.title.is_empty());
        assert!(listing.salary.is_empty());
        assert_eq!(listing.match_count(), 1);
    }

    #[test]
    fn dead_detail_links_skip_only_that_card() {
        let pages = StaticPages::default()
            .with(
                PAGE,
                &results_page(
                    "Page 1 of 2 jobs",
                    &[
                        card("Gone", "Acme", Some("/viewjob?jk=404")),
                        card("Alive", "Globex", Some("/viewjob?jk=2")),
                    ],
                ),
            )
            .with("https://board.test/viewjob?jk=2", &detail("rust"));

        let fetcher = ListingPageFetcher::new(&pages, &config()).unwrap();
        let mut store = RankingStore::new();
        let outcome = fetcher
            .fetch_page(PAGE, &criteria(0), true, &mut store)
            .unwrap();

        assert_eq!(outcome.detail_failures, 1);
        assert_eq!(outcome.admitted, 1);
        assert_eq!(store.pop_max().unwrap().title, "Alive");
    }

    #[test]
    fn page_fetch_failure_is_an_error() {
        let pages = StaticPages::default();
        let fetcher = ListingPageFetcher::new(&pages, &config()).unwrap();
        let mut store = RankingStore::new();
        assert!(fetcher
            .fetch_page(PAGE, &criteria(0), true, &mut store)
            .is_err());
    }

    #[test]
    fn unreadable_count_falls_back_and_large_counts_clamp() {
        let pages = StaticPages::default()
            .with(PAGE, &results_page("lots of postings", &[]))
            .with(
                "https://board.test/jobs?start=10",
                &results_page("Page 1 of 98,765 jobs", &[]),
            );
        let fetcher = ListingPageFetcher::new(&pages, &config()).unwrap();
        let mut store = RankingStore::new();

        let outcome = fetcher
            .fetch_page(PAGE, &criteria(0), true, &mut store)
            .unwrap();
        assert_eq!(outcome.declared_total, Some(100));

        let outcome = fetcher
            .fetch_page("https://board.test/jobs?start=10", &criteria(0), true, &mut store)
            .unwrap();
        assert_eq!(outcome.declared_total, Some(5000));
    }

    #[test]
    fn worker_pool_keeps_card_order() {
        let cards: Vec<String> = (0..6)
            .map(|i| card(&format!("Role {i}"), "Acme", Some(format!("/viewjob?jk={i}").as_str())))
            .collect();
        let mut pages = StaticPages::default().with(PAGE, &results_page("Page 1 of 6 jobs", &cards));
        for i in 0..6 {
            pages = pages.with(&format!("https://board.test/viewjob?jk={i}"), &detail("rust sql"));
        }

        let fetcher = ListingPageFetcher::new(&pages, &config().with_workers(3)).unwrap();
        let mut store = RankingStore::new();
        let outcome = fetcher
            .fetch_page(PAGE, &criteria(0), true, &mut store)
            .unwrap();
        assert_eq!(outcome.admitted, 6);

        let titles: Vec<String> = std::iter::from_fn(|| store.pop_max())
            .map(|l| l.title)
            .collect();
        let expected: Vec<String> = (0..6).map(|i| format!("Role {i}")).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn search_count_formats() {
        let parser = SearchCountParser::new().unwrap();
        assert_eq!(parser.parse("Page 1 of 1,234 jobs"), Some(1234));
        assert_eq!(parser.parse("Page 3 of 57 jobs"), Some(57));
        assert_eq!(parser.parse("812 jobs"), Some(812));
        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("no results here"), None);
        assert_eq!(parser.parse("Page 1 of , jobs"), None);
    }

    #[test]
    fn oversized_counts_saturate() {
        let parser = SearchCountParser::new().unwrap();
        assert_eq!(
            parser.parse("Page 1 of 99,999,999,999,999,999,999,999 jobs"),
            Some(usize::MAX)
        );
    }

    #[test]
    fn oversized_advertised_total_clamps_to_the_ceiling() {
        let pages = StaticPages::default().with(
            PAGE,
            &results_page("Page 1 of 99,999,999,999,999,999,999,999 jobs", &[]),
        );
        let fetcher = ListingPageFetcher::new(&pages, &config()).unwrap();
        let mut store = RankingStore::new();

        let outcome = fetcher
            .fetch_page(PAGE, &criteria(0), true, &mut store)
            .unwrap();
        assert_eq!(outcome.declared_total, Some(5000));
    }
}
