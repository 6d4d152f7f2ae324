use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod criteria;
mod dashboard;
mod error;
mod fetch;
mod listing;
mod matcher;
mod pagination;
mod prompt;
mod query;
mod ranking;
mod report;

use config::ScoutConfig;
use criteria::{CriteriaInput, Experience, JobType, SearchCriteria};
use fetch::HttpPageSource;
use listing::ListingPageFetcher;
use pagination::PaginationDriver;
use prompt::{Asked, Prompter};
use report::{Report, ReportFormat};

#[derive(Parser)]
#[command(name = "job-scout", version, about = "Find the job postings that best match your keywords")]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the board and write a ranked report
    Search(SearchArgs),
    /// Browse a CSV report in the terminal
    View {
        /// Report written with --format csv
        report: PathBuf,
    },
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    /// Salary filter appended to the query, e.g. 75000
    #[arg(long)]
    salary: Option<String>,
    /// Search radius in miles
    #[arg(long)]
    radius: Option<u32>,
    /// full time, internship or part time
    #[arg(long)]
    job_type: Option<JobType>,
    /// entry level, mid level or senior level
    #[arg(long)]
    experience: Option<Experience>,
    /// Comma separated keywords to look for in descriptions
    #[arg(long)]
    keywords: Option<String>,
    /// Listings need more than this many keyword matches (default: half the keywords)
    #[arg(long)]
    min_matches: Option<usize>,

    #[arg(short, long, default_value = "output.txt")]
    output: PathBuf,
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// TOML file overriding the default board settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Detail pages fetched in parallel
    #[arg(long)]
    workers: Option<usize>,
    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long)]
    base_url: Option<String>,

    /// Fail instead of prompting when required criteria are missing
    #[arg(long)]
    no_prompt: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Search(args) => search(args),
        Command::View { report } => dashboard::run_dashboard(&report),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn search(args: SearchArgs) -> Result<()> {
    let config = load_config(&args)?;
    let criteria = read_criteria(&args)?;
    if criteria.keywords.is_empty() {
        warn!("No keywords given; no listing can clear the threshold");
    }

    info!(
        "Searching '{}' in {}, {} for {} keywords (more than {} must match)",
        criteria.title,
        criteria.city,
        criteria.state,
        criteria.keywords.len(),
        criteria.min_matches
    );

    let source = HttpPageSource::new(&config.user_agent, config.timeout())?;
    let pages = ListingPageFetcher::new(&source, &config)?;
    let outcome = PaginationDriver::new(pages, config.page_size).run(&criteria);

    let report = Report::new(&criteria, &outcome);
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    report.write(BufWriter::new(file), args.format)?;
    info!(
        "Wrote {} matches to {}",
        report.records.len(),
        args.output.display()
    );

    if outcome.is_complete() {
        return Ok(());
    }
    let reason = outcome
        .aborted
        .map(|e| e.to_string())
        .unwrap_or_default();
    anyhow::bail!(
        "Search stopped early ({}); {} is incomplete",
        reason,
        args.output.display()
    )
}

fn load_config(args: &SearchArgs) -> Result<ScoutConfig> {
    let mut config = match &args.config {
        Some(path) => ScoutConfig::load(path)?,
        None => ScoutConfig::default(),
    };
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout_secs(secs);
    }
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url.clone());
    }
    config.validate()?;
    Ok(config)
}

fn read_criteria(args: &SearchArgs) -> Result<SearchCriteria> {
    let given = CriteriaInput {
        title: args.title.clone().unwrap_or_default(),
        city: args.city.clone().unwrap_or_default(),
        state: args.state.clone().unwrap_or_default(),
        salary: args.salary.clone().unwrap_or_default(),
        radius: args.radius,
        job_type: args.job_type.unwrap_or_default(),
        experience: args.experience.unwrap_or_default(),
        keywords: args.keywords.clone().unwrap_or_default(),
        min_matches: args.min_matches,
    };

    let missing_required = [&given.title, &given.city, &given.state]
        .iter()
        .any(|v| v.trim().is_empty());

    let input = if missing_required && !args.no_prompt {
        let asked = Asked {
            salary: args.salary.is_some(),
            radius: args.radius.is_some(),
            job_type: args.job_type.is_some(),
            experience: args.experience.is_some(),
            keywords: args.keywords.is_some(),
            min_matches: args.min_matches.is_some(),
        };
        let stdin = io::stdin();
        Prompter::new(stdin.lock(), io::stdout()).complete(given, &asked)?
    } else {
        given
    };

    Ok(SearchCriteria::new(input)?)
}
