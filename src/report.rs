use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::criteria::SearchCriteria;
use crate::pagination::RunOutcome;
use crate::ranking::JobListing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Text,
    Csv,
    Json,
}

/// One emitted listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub title: String,
    pub employer: String,
    pub location: String,
    pub link: String,
    pub salary: String,
    pub match_count: usize,
    pub total_keywords: usize,
    pub matched_keywords: Vec<String>,
    /// Full detail-page text. Only the JSON report carries it.
    pub description: String,
}

impl ReportRecord {
    pub fn from_listing(listing: &JobListing, total_keywords: usize) -> Self {
        Self {
            title: listing.title.clone(),
            employer: listing.employer.clone(),
            location: listing.location.clone(),
            link: listing.link.clone(),
            salary: listing.salary.clone(),
            match_count: listing.match_count(),
            total_keywords,
            matched_keywords: listing.matched_keywords().to_vec(),
            description: listing.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Local>,
    pub criteria: SearchCriteria,
    pub postings_searched: usize,
    pub pages_requested: usize,
    pub queued: usize,
    /// Listings left after keeping the best per employer.
    pub emitted: usize,
    /// Why the search stopped early, if it did.
    pub incomplete: Option<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a RunSummary,
    records: &'a [ReportRecord],
}

/// CSV row layout, shared with the report viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Salary")]
    pub salary: String,
    #[serde(rename = "Matches")]
    pub matches: usize,
    #[serde(rename = "TotalKeywords")]
    pub total_keywords: usize,
    #[serde(rename = "Keywords")]
    pub keywords: String,
    #[serde(rename = "Status")]
    pub status: String,
}

pub struct Report {
    pub summary: RunSummary,
    pub records: Vec<ReportRecord>,
}

impl Report {
    pub fn new(criteria: &SearchCriteria, outcome: &RunOutcome) -> Self {
        let total_keywords = criteria.keywords.len();
        Self {
            summary: RunSummary {
                generated_at: Local::now(),
                criteria: criteria.clone(),
                postings_searched: outcome.postings_bound,
                pages_requested: outcome.pages_requested,
                queued: outcome.queued,
                emitted: outcome.listings.len(),
                incomplete: outcome.aborted.as_ref().map(|e| e.to_string()),
            },
            records: outcome
                .listings
                .iter()
                .map(|listing| ReportRecord::from_listing(listing, total_keywords))
                .collect(),
        }
    }

    pub fn write<W: Write>(&self, writer: W, format: ReportFormat) -> Result<()> {
        match format {
            ReportFormat::Text => self.write_text(writer),
            ReportFormat::Csv => self.write_csv(writer),
            ReportFormat::Json => self.write_json(writer),
        }
    }

    fn write_text<W: Write>(&self, mut out: W) -> Result<()> {
        let s = &self.summary;
        let c = &s.criteria;
        writeln!(out, "Parameters:")?;
        writeln!(out, "Title: {}", c.title)?;
        writeln!(out, "Salary: {}", c.salary)?;
        writeln!(out, "Location: {} {}", c.city, c.state)?;
        writeln!(out, "Radius: {} miles", c.radius)?;
        writeln!(out, "Job Type: {}", c.job_type)?;
        writeln!(out, "Experience: {}", c.experience)?;
        writeln!(out, "Jobs searched: {}", s.postings_searched)?;
        writeln!(out, "Job matches: {}", s.queued)?;
        writeln!(out, "Best per employer: {}", s.emitted)?;
        writeln!(out, "Keywords: {}", c.keywords.join(", "))?;
        writeln!(out, "Generated: {}", s.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        if let Some(reason) = &s.incomplete {
            writeln!(out, "Status: INCOMPLETE ({})", reason)?;
        }
        writeln!(out, "Job Matches:")?;

        for record in &self.records {
            writeln!(out, "Title: {}", record.title)?;
            writeln!(out, "Company: {}", record.employer)?;
            writeln!(out, "Location: {}", record.location)?;
            writeln!(out, "Link: {}", record.link)?;
            writeln!(out, "Salary: {}", record.salary)?;
            writeln!(
                out,
                "Matches: {} out of {} keywords matched",
                record.match_count, record.total_keywords
            )?;
            writeln!(out, "Keywords: {}", record.matched_keywords.join(", "))?;
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }

    fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let status = match &self.summary.incomplete {
            Some(_) => "incomplete",
            None => "complete",
        };
        let mut wtr = WriterBuilder::new().has_headers(true).from_writer(out);
        for record in &self.records {
            wtr.serialize(CsvRow {
                title: record.title.clone(),
                company: record.employer.clone(),
                location: record.location.clone(),
                link: record.link.clone(),
                salary: record.salary.clone(),
                matches: record.match_count,
                total_keywords: record.total_keywords,
                keywords: record.matched_keywords.join("; "),
                status: status.to_string(),
            })
            .context("Failed to write CSV row")?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_json<W: Write>(&self, mut out: W) -> Result<()> {
        let report = JsonReport {
            summary: &self.summary,
            records: &self.records,
        };
        serde_json::to_writer_pretty(&mut out, &report).context("Failed to write JSON report")?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::CriteriaInput;
    use crate::error::ScrapeError;
    use crate::ranking::sample_listing;

    fn criteria() -> SearchCriteria {
        SearchCriteria::new(CriteriaInput {
            title: "software engineer".into(),
            city: "Denver".into(),
            state: "CO".into(),
            keywords: "rust, sql, docker, aws".into(),
            ..Default::default()
        })
        .unwrap()
    }

    fn outcome(aborted: Option<ScrapeError>) -> RunOutcome {
        RunOutcome {
            listings: vec![
                sample_listing("Acme", "Backend", &["rust", "sql", "docker"]),
                sample_listing("Globex", "Platform", &["rust", "aws"]),
            ],
            queued: 3,
            postings_bound: 40,
            pages_requested: 4,
            aborted,
        }
    }

    fn render(report: &Report, format: ReportFormat) -> String {
        let mut buf = Vec::new();
        report.write(&mut buf, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn records_carry_the_keyword_totals() {
        let report = Report::new(&criteria(), &outcome(None));
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].match_count, 3);
        assert_eq!(report.records[0].total_keywords, 4);
        assert_eq!(report.records[1].matched_keywords, vec!["rust", "aws"]);
    }

    #[test]
    fn text_report_lists_each_match() {
        let text = render(&Report::new(&criteria(), &outcome(None)), ReportFormat::Text);
        assert!(text.starts_with("Parameters:\nTitle: software engineer\n"));
        assert!(text.contains("Jobs searched: 40\n"));
        assert!(text.contains("Job matches: 3\nBest per employer: 2\n"));
        assert!(text.contains("Company: Acme\n"));
        assert!(text.contains("Matches: 3 out of 4 keywords matched\n"));
        assert!(text.contains("Keywords: rust, sql, docker\n"));
        assert!(!text.contains("INCOMPLETE"));
        assert!(!text.contains("Description"));
    }

    #[test]
    fn incomplete_runs_are_marked() {
        let aborted = ScrapeError::Timeout {
            url: "https://board.test/jobs?start=40".into(),
        };
        let report = Report::new(&criteria(), &outcome(Some(aborted)));

        let text = render(&report, ReportFormat::Text);
        assert!(text.contains("Status: INCOMPLETE (request to https://board.test/jobs?start=40 timed out)"));

        let csv = render(&report, ReportFormat::Csv);
        assert!(csv.lines().skip(1).all(|line| line.ends_with(",incomplete")));

        let json: serde_json::Value =
            serde_json::from_str(&render(&report, ReportFormat::Json)).unwrap();
        assert!(json["summary"]["incomplete"].is_string());
    }

    #[test]
    fn csv_rows_read_back() {
        let csv = render(&Report::new(&criteria(), &outcome(None)), ReportFormat::Csv);
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<CsvRow> = rdr
            .deserialize::<CsvRow>()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].company, "Acme");
        assert_eq!(rows[0].keywords, "rust; sql; docker");
        assert_eq!(rows[0].status, "complete");
        assert_eq!(rows[1].matches, 2);
    }

    #[test]
    fn json_report_has_summary_and_records() {
        let json: serde_json::Value = serde_json::from_str(&render(
            &Report::new(&criteria(), &outcome(None)),
            ReportFormat::Json,
        ))
        .unwrap();
        assert_eq!(json["summary"]["criteria"]["min_matches"], 2);
        assert_eq!(json["summary"]["queued"], 3);
        assert_eq!(json["summary"]["emitted"], 2);
        assert_eq!(json["records"][0]["employer"], "Acme");
        assert_eq!(json["records"][0]["description"], "rust sql docker");
        assert!(json["summary"]["incomplete"].is_null());
    }
}
