mod cache;
mod config;
mod election;
mod export;
mod fetch;
mod join;
mod normalize;
mod parser;
mod records;
mod scrape;
mod store;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::fetch::HttpFetcher;
use crate::join::{embedded_documents, embedded_members, JoinSources};
use crate::normalize::OutcomeMapping;
use crate::records::ElectionRecord;
use crate::scrape::document::{attach_documents, scrape_documents, DocumentCache};
use crate::scrape::member::{attach_members, scrape_members, MemberCache};
use crate::scrape::voting::scrape_votings;

const DEFAULT_VOTINGS: &str = "data/raw/voting.json";

#[derive(Parser)]
#[command(
    name = "nrsr_scraper",
    about = "Voting, member and document scraper for the Slovak National Council"
)]
struct Cli {
    /// Log file, truncated on every run
    #[arg(long, global = true, default_value = "scraper.log")]
    log_file: PathBuf,
    /// How voting results are read: negation-first or affirmation-first
    #[arg(long, global = true)]
    outcome_mapping: Option<OutcomeMapping>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a range of voting ids
    Voting {
        #[arg(long, default_value_t = 51426)]
        start_id: u64,
        #[arg(long, default_value_t = 51427)]
        end_id: u64,
        /// Default: data/raw/voting_{start}-{end}.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scrape every member appearing in a votings file
    Member {
        #[arg(short, long, default_value = DEFAULT_VOTINGS)]
        input: PathBuf,
        #[arg(short, long, default_value = "data/raw/member.json")]
        output: PathBuf,
        /// Members saved by an earlier run; these are not fetched again
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Read the election candidate results spreadsheet
    Election {
        /// Local .xlsx path or URL
        #[arg(short, long, default_value = election::DEFAULT_SOURCE)]
        input: String,
        #[arg(short, long, default_value = "data/interim/election_member_votes.json")]
        output: PathBuf,
        /// Keep candidates that were not elected
        #[arg(long)]
        all: bool,
    },
    /// Find the press print behind every voting in a votings file
    Document {
        #[arg(short, long, default_value = DEFAULT_VOTINGS)]
        input: PathBuf,
        #[arg(short, long, default_value = "data/raw/document.json")]
        output: PathBuf,
        /// Documents saved by an earlier run; these are not fetched again
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Scrape votings and attach documents and/or members in one pass
    Run {
        #[arg(long, default_value_t = 51426)]
        start_id: u64,
        #[arg(long, default_value_t = 51427)]
        end_id: u64,
        /// Attach the voted document to each voting
        #[arg(long)]
        documents: bool,
        /// Attach member details to each ballot
        #[arg(long)]
        members: bool,
        /// Default: data/raw/voting_{start}-{end}.json
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        member_seed: Option<PathBuf>,
        #[arg(long)]
        document_seed: Option<PathBuf>,
    },
    /// Join votings with members, election results and documents into CSV
    Export {
        #[arg(long)]
        votings: PathBuf,
        #[arg(long)]
        members: Option<PathBuf>,
        /// Election results: raw .xlsx sheet or JSON from the election command
        #[arg(long)]
        election: Option<PathBuf>,
        #[arg(long)]
        documents: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_logging(log_file: &Path) -> Result<()> {
    let file = File::create(log_file)
        .with_context(|| format!("Failed to create log file {:?}", log_file))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let t0 = Instant::now();
    let result = Settings::load().and_then(|mut settings| {
        if cli.outcome_mapping.is_some() {
            settings.outcome_mapping = cli.outcome_mapping;
        }
        execute(cli.command, &settings)
    });

    if let Err(e) = &result {
        error!("An error occurred: {:#}", e);
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {}", format_duration(elapsed));
    }

    result
}

fn execute(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Voting {
            start_id,
            end_id,
            output,
        } => {
            let mapping = settings.require_outcome_mapping()?;
            let output = output.unwrap_or_else(|| voting_output(start_id, end_id));
            info!(
                "Scraping data for IDs {} to {} and saving to {:?}",
                start_id, end_id, output
            );
            let fetcher = HttpFetcher::new(settings)?;
            let (votings, _) = scrape_votings(&fetcher, settings, mapping, start_id, end_id)?;
            store::save_json(&output, &votings)?;
            info!("Saved {} votings", votings.len());
            Ok(())
        }
        Commands::Member {
            input,
            output,
            seed,
        } => {
            let votings = store::load_votings(&input)?;
            let mut cache = match seed {
                Some(path) => MemberCache::seeded(store::load_members(&path)?),
                None => MemberCache::new(),
            };
            let fetcher = HttpFetcher::new(settings)?;
            let members = scrape_members(&fetcher, settings, &votings, &mut cache)?;
            store::save_json(&output, &members)?;
            info!("Saved {} members", members.len());
            Ok(())
        }
        Commands::Election { input, output, all } => {
            let fetcher = HttpFetcher::new(settings)?;
            let rows = election::load_sheet(&fetcher, &input)?;
            let records = election::records_from_rows(&rows, !all)?;
            store::save_json(&output, &records)?;
            info!("Saved {} election records", records.len());
            Ok(())
        }
        Commands::Document {
            input,
            output,
            seed,
        } => {
            let votings = store::load_votings(&input)?;
            let mut cache = match seed {
                Some(path) => DocumentCache::seeded(store::documents_by_key(store::load_documents(&path)?)),
                None => DocumentCache::new(),
            };
            let fetcher = HttpFetcher::new(settings)?;
            let documents = scrape_documents(&fetcher, settings, &votings, &mut cache)?;
            store::save_json(&output, &documents)?;
            info!("Saved {} documents", documents.len());
            Ok(())
        }
        Commands::Run {
            start_id,
            end_id,
            documents,
            members,
            output,
            member_seed,
            document_seed,
        } => {
            let mapping = settings.require_outcome_mapping()?;
            let output = output.unwrap_or_else(|| voting_output(start_id, end_id));
            let fetcher = HttpFetcher::new(settings)?;

            let t_scrape = Instant::now();
            let (mut votings, stats) = scrape_votings(&fetcher, settings, mapping, start_id, end_id)?;
            info!(
                "Scraped {} votings ({} ok, {} skipped) in {}",
                stats.total,
                stats.ok,
                stats.skipped,
                format_duration(t_scrape.elapsed())
            );

            if documents {
                let mut cache = match document_seed {
                    Some(path) => DocumentCache::seeded(store::documents_by_key(store::load_documents(&path)?)),
                    None => DocumentCache::new(),
                };
                attach_documents(&fetcher, settings, &mut votings, &mut cache)?;
                info!("Added documents to {} votings", votings.len());
            }
            if members {
                let mut cache = match member_seed {
                    Some(path) => MemberCache::seeded(store::load_members(&path)?),
                    None => MemberCache::new(),
                };
                attach_members(&fetcher, settings, &mut votings, &mut cache);
                info!("Added member info to {} votings", votings.len());
            }

            store::save_json(&output, &votings)?;
            info!("Saved {} votings to {:?}", votings.len(), output);
            Ok(())
        }
        Commands::Export {
            votings,
            members,
            election,
            documents,
            output,
        } => {
            let mapping = settings.require_outcome_mapping()?;
            let votings = store::load_votings(&votings)?;

            let members = match members {
                Some(path) => Some(store::load_members(&path)?),
                None => Some(embedded_members(&votings)).filter(|m| !m.is_empty()),
            };
            let election = election
                .map(|path| load_election_table(settings, &path))
                .transpose()?;
            let documents: Option<Vec<_>> = match documents {
                Some(path) => Some(store::load_documents(&path)?.into_values().collect()),
                None => Some(embedded_documents(&votings))
                    .filter(|d| !d.is_empty())
                    .map(|d| d.into_values().collect()),
            };

            let sources = JoinSources {
                members: members.as_ref(),
                election: election.as_deref(),
                documents: documents.as_deref(),
            };
            let rows = join::join_votings(&votings, &sources, mapping)?;
            export::write_csv(&output, &rows)?;
            info!("Data saved to {:?}", output);
            Ok(())
        }
    }
}

fn voting_output(start_id: u64, end_id: u64) -> PathBuf {
    PathBuf::from(format!("data/raw/voting_{}-{}.json", start_id, end_id))
}

/// Election table for export: the raw spreadsheet (elected candidates only)
/// or records saved by the election command.
fn load_election_table(settings: &Settings, path: &Path) -> Result<Vec<ElectionRecord>> {
    let is_xlsx = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        let fetcher = HttpFetcher::new(settings)?;
        let rows = election::load_sheet(&fetcher, &path.to_string_lossy())?;
        election::records_from_rows(&rows, true)
    } else {
        store::load_election(path)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
