use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use tracing::{error, info};

use super::member::log_cache;
use super::progress_bar;
use crate::cache::RecordCache;
use crate::config::Settings;
use crate::fetch::PageSource;
use crate::normalize::parse_voting_time;
use crate::parser::document::{parse_press_details, parse_search_results};
use crate::parser::parse_page;
use crate::records::{DocumentKey, DocumentRecord};
use crate::store::{Documents, Votings};

pub type DocumentCache = RecordCache<DocumentKey, DocumentRecord>;

const SEARCH_TIME_FORMAT: &str = "%Y-%m-%d%%20%H:%M:%S";

/// The search is keyed by time, one minute either side of the voting.
fn search_window(at: NaiveDateTime) -> (String, String) {
    let fmt = |t: NaiveDateTime| t.format(SEARCH_TIME_FORMAT).to_string();
    (fmt(at - Duration::minutes(1)), fmt(at + Duration::minutes(1)))
}

/// Find the press print a voting was about and fetch its details.
///
/// `timestamp` is the raw voting time text. Returns `None` when the time does
/// not parse, a page is missing, no search hit matches the key, or the hit
/// has no press number.
pub fn lookup_document(
    source: &impl PageSource,
    settings: &Settings,
    key: &DocumentKey,
    timestamp: &str,
) -> Option<DocumentRecord> {
    let Some(at) = parse_voting_time(timestamp) else {
        error!("Unparsable voting time {:?} for {}", timestamp, key);
        return None;
    };
    let (from, to) = search_window(at);
    let raw = source.fetch(&settings.document_search_url(&key.meeting_number, &from, &to))?;
    let hits = parse_search_results(&parse_page(&raw))
        .map_err(|e| error!("Failed to read voting search for {}: {}", key, e))
        .ok()?;

    let Some(hit) = hits
        .into_iter()
        .find(|h| h.meeting_number == key.meeting_number && h.sequence_number == key.sequence_number)
    else {
        info!("No document found for voting {}", key);
        return None;
    };
    if hit.press_number.is_empty() {
        info!("Voting {} has no press number", key);
        return None;
    }

    let url = settings.press_url(&hit.press_number);
    let raw = source.fetch(&url)?;
    let details = parse_press_details(&parse_page(&raw))
        .map_err(|e| error!("Error parsing document details of {}: {}", hit.press_number, e))
        .ok()?;

    Some(DocumentRecord {
        meeting_number: key.meeting_number.clone(),
        sequence_number: key.sequence_number.clone(),
        press_number: hit.press_number,
        url,
        kind: details.kind,
        received: details.received,
        title: details.title,
        attachments: details.attachments,
    })
}

/// Attach the matching document to every voting in place.
pub fn attach_documents(
    source: &impl PageSource,
    settings: &Settings,
    votings: &mut Votings,
    cache: &mut DocumentCache,
) -> Result<()> {
    let pb = progress_bar(votings.len())?;
    for voting in votings.values_mut() {
        info!("Looking up document for voting ID {}", voting.voting_id);
        let timestamp = &voting.timestamp;
        let document = voting.document_key().and_then(|key| {
            cache
                .get_or_build(&key, |key| lookup_document(source, settings, key, timestamp))
                .cloned()
        });
        voting.document = document;
        pb.inc(1);
    }
    pb.finish_and_clear();
    log_cache("document", cache);
    Ok(())
}

/// Build the document table for `votings`, keyed by `"{meeting}:{sequence}"`.
pub fn scrape_documents(
    source: &impl PageSource,
    settings: &Settings,
    votings: &Votings,
    cache: &mut DocumentCache,
) -> Result<Documents> {
    let pb = progress_bar(votings.len())?;
    let mut documents = Documents::new();
    for voting in votings.values() {
        if let Some(key) = voting.document_key() {
            let found = cache
                .get_or_build(&key, |key| lookup_document(source, settings, key, &voting.timestamp));
            if let Some(document) = found {
                documents.insert(key.to_string(), document.clone());
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    log_cache("document", cache);
    Ok(documents)
}

// ── Tests ──
