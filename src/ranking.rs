use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::matcher::KeywordMatch;

/// A scored posting. The match count is always the number of matched keywords.
#[derive(Debug, Clone)]
pub struct JobListing {
    pub employer: String,
    pub title: String,
    pub location: String,
    pub salary: String,
    pub link: String,
    pub description: String,
    pub matches: KeywordMatch,
}

impl JobListing {
    pub fn match_count(&self) -> usize {
        self.matches.count()
    }

    pub fn matched_keywords(&self) -> &[String] {
        self.matches.keywords()
    }
}

struct Ranked {
    listing: JobListing,
    seq: u64,
}

// Higher match count ranks first; equal counts rank by arrival, earliest first.
impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.listing
            .match_count()
            .cmp(&other.listing.match_count())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Max-heap of listings ordered by match count.
///
/// No de-duplication happens here; one employer may have several queued postings.
#[derive(Default)]
pub struct RankingStore {
    heap: BinaryHeap<Ranked>,
    next_seq: u64,
}

impl RankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listing: JobListing) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Ranked { listing, seq });
    }

    pub fn pop_max(&mut self) -> Option<JobListing> {
        self.heap.pop().map(|ranked| ranked.listing)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_listing(employer: &str, title: &str, matched: &[&str]) -> JobListing {
    let keywords: Vec<String> = matched.iter().map(|k| k.to_string()).collect();
    JobListing {
        employer: employer.to_string(),
        title: title.to_string(),
        location: "Denver, CO".to_string(),
        salary: String::new(),
        link: format!("https://board.test/{}/{}", employer, title),
        description: keywords.join(" "),
        matches: crate::matcher::match_keywords(&keywords.join(" "), &keywords),
    }
}
