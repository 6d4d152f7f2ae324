use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CriteriaError;

pub const DEFAULT_RADIUS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    Internship,
    PartTime,
    #[default]
    Unspecified,
}

impl JobType {
    /// Value of the `jt` query parameter, if any.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            JobType::FullTime => Some("fulltime"),
            JobType::Internship => Some("internship"),
            JobType::PartTime => Some("parttime"),
            JobType::Unspecified => None,
        }
    }
}

impl FromStr for JobType {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        match compact.as_str() {
            "" => Ok(JobType::Unspecified),
            "fulltime" => Ok(JobType::FullTime),
            "internship" => Ok(JobType::Internship),
            "parttime" => Ok(JobType::PartTime),
            _ => Err(CriteriaError::JobType(s.trim().to_string())),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobType::FullTime => "full time",
            JobType::Internship => "internship",
            JobType::PartTime => "part time",
            JobType::Unspecified => "",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Experience {
    Entry,
    Mid,
    Senior,
    #[default]
    Unspecified,
}

impl Experience {
    /// Value of the `explvl` query parameter, if any.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            Experience::Entry => Some("entry_level"),
            Experience::Mid => Some("mid_level"),
            Experience::Senior => Some("senior_level"),
            Experience::Unspecified => None,
        }
    }
}

impl FromStr for Experience {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let level = lowered
            .trim_end_matches("level")
            .trim_end_matches(|c: char| c.is_whitespace() || c == '_' || c == '-');
        match level {
            "" => Ok(Experience::Unspecified),
            "entry" => Ok(Experience::Entry),
            "mid" => Ok(Experience::Mid),
            "senior" => Ok(Experience::Senior),
            _ => Err(CriteriaError::Experience(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Experience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Experience::Entry => "entry level",
            Experience::Mid => "mid level",
            Experience::Senior => "senior level",
            Experience::Unspecified => "",
        };
        f.write_str(label)
    }
}

/// Raw, unvalidated criteria as typed by the user or passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct CriteriaInput {
    pub title: String,
    pub city: String,
    pub state: String,
    pub salary: String,
    pub radius: Option<u32>,
    pub job_type: JobType,
    pub experience: Experience,
    pub keywords: String,
    pub min_matches: Option<usize>,
}

/// Validated search parameters, read-only for the duration of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchCriteria {
    pub title: String,
    pub city: String,
    pub state: String,
    pub salary: String,
    pub radius: u32,
    pub job_type: JobType,
    pub experience: Experience,
    pub keywords: Vec<String>,
    pub min_matches: usize,
}

impl SearchCriteria {
    pub fn new(input: CriteriaInput) -> Result<Self, CriteriaError> {
        let title = required(&input.title, "job title")?;
        let city = required(&input.city, "city")?;
        let state = required(&input.state, "state")?;
        let keywords = parse_keywords(&input.keywords);
        let min_matches = input.min_matches.unwrap_or(keywords.len() / 2);

        Ok(Self {
            title,
            city,
            state,
            salary: input.salary.trim().to_string(),
            radius: input.radius.unwrap_or(DEFAULT_RADIUS),
            job_type: input.job_type,
            experience: input.experience,
            keywords,
            min_matches,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, CriteriaError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CriteriaError::Missing(field));
    }
    Ok(value.to_string())
}

/// Splits a comma separated phrase into distinct keywords, keeping the first spelling seen.
pub fn parse_keywords(phrase: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    phrase
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .map(String::from)
        .collect()
}

/// Parses an optional count straight into `T`, so values out of range are rejected.
pub fn parse_count<T: FromStr>(value: &str) -> Result<Option<T>, CriteriaError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| CriteriaError::Number(value.to_string()))
}
