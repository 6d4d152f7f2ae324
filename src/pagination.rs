use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::criteria::SearchCriteria;
use crate::error::ScrapeError;
use crate::listing::ListingPageFetcher;
use crate::query::results_page_url;
use crate::ranking::{JobListing, RankingStore};

/// Number of postings the search covers. Unknown until the first page has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalBound {
    Unknown,
    Known(usize),
}

/// Offsets of the result pages still to request.
#[derive(Debug, Clone)]
pub struct Pagination {
    offset: usize,
    page_size: usize,
    bound: TotalBound,
    pages_requested: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size: page_size.max(1),
            bound: TotalBound::Unknown,
            pages_requested: 0,
        }
    }

    /// Offset of the next page, or `None` once the bound has been reached.
    pub fn next_offset(&self) -> Option<usize> {
        match self.bound {
            TotalBound::Unknown => (self.offset == 0).then_some(0),
            TotalBound::Known(total) => (self.offset < total).then_some(self.offset),
        }
    }

    pub fn needs_bound(&self) -> bool {
        self.bound == TotalBound::Unknown
    }

    /// Sets the bound. Only the first report counts.
    pub fn record_bound(&mut self, total: usize) {
        if self.bound == TotalBound::Unknown {
            self.bound = TotalBound::Known(total);
        }
    }

    pub fn advance(&mut self) {
        self.offset += self.page_size;
        self.pages_requested += 1;
    }

    pub fn bound(&self) -> TotalBound {
        self.bound
    }

    pub fn pages_requested(&self) -> usize {
        self.pages_requested
    }
}

/// Result of one search run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Best listing per employer, highest match count first.
    pub listings: Vec<JobListing>,
    /// Listings queued before employer de-duplication.
    pub queued: usize,
    pub postings_bound: usize,
    pub pages_requested: usize,
    /// Set when a page could not be fetched and the search stopped early.
    pub aborted: Option<ScrapeError>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Walks the result pages of a search and ranks what it finds.
pub struct PaginationDriver<'a> {
    pages: ListingPageFetcher<'a>,
    page_size: usize,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(pages: ListingPageFetcher<'a>, page_size: usize) -> Self {
        Self { pages, page_size }
    }

    pub fn run(&self, criteria: &SearchCriteria) -> RunOutcome {
        let mut store = RankingStore::new();
        let mut pagination = Pagination::new(self.page_size);
        let mut aborted = None;

        while let Some(offset) = pagination.next_offset() {
            let url = match results_page_url(self.pages.base(), criteria, offset) {
                Ok(url) => url,
                Err(e) => {
                    error!("Could not build the results URL for offset {}: {}", offset, e);
                    aborted = Some(e);
                    break;
                }
            };

            match self
                .pages
                .fetch_page(url.as_str(), criteria, pagination.needs_bound(), &mut store)
            {
                Ok(outcome) => {
                    if let Some(total) = outcome.declared_total {
                        pagination.record_bound(total);
                    }
                    pagination.advance();
                    if let TotalBound::Known(total) = pagination.bound() {
                        info!("Postings searched: {} out of {}", offset, total);
                    }
                    debug!(
                        "Page at {}: {} cards, {} queued, {} below threshold, {} without link, {} failed",
                        offset,
                        outcome.cards,
                        outcome.admitted,
                        outcome.below_threshold,
                        outcome.without_link,
                        outcome.detail_failures
                    );
                }
                Err(e) => {
                    error!("Stopping search at offset {}: {}", offset, e);
                    aborted = Some(e);
                    break;
                }
            }
        }

        if store.is_empty() {
            info!("No listing cleared the threshold of {} keywords", criteria.min_matches);
        }
        let queued = store.len();
        let listings = drain_best_per_employer(&mut store);
        info!(
            "{} listings queued, {} after keeping the best per employer",
            queued,
            listings.len()
        );

        RunOutcome {
            listings,
            queued,
            postings_bound: match pagination.bound() {
                TotalBound::Known(total) => total,
                TotalBound::Unknown => 0,
            },
            pages_requested: pagination.pages_requested(),
            aborted,
        }
    }
}

/// Empties `store`, keeping only the first (highest ranked) listing of each employer.
pub fn drain_best_per_employer(store: &mut RankingStore) -> Vec<JobListing> {
    let mut seen_employers = HashSet::new();
    let mut best = Vec::new();
    while let Some(listing) = store.pop_max() {
        if seen_employers.insert(listing.employer.clone()) {
            best.push(listing);
        } else {
            debug!(
                "Skipping '{}': '{}' already has a better match",
                listing.title, listing.employer
            );
        }
    }
    best
}
