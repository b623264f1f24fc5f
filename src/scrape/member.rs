use std::collections::BTreeSet;

use anyhow::Result;
use tracing::info;

use super::progress_bar;
use crate::cache::RecordCache;
use crate::config::Settings;
use crate::fetch::PageSource;
use crate::parser::{member::parse_member, parse_page};
use crate::records::MemberRecord;
use crate::store::{Members, Votings};

pub type MemberCache = RecordCache<String, MemberRecord>;

/// Fetch and parse one member page.
pub fn fetch_member(
    source: &impl PageSource,
    settings: &Settings,
    member_id: &str,
) -> Option<MemberRecord> {
    info!("Scraping data for member ID {}", member_id);
    let raw = source.fetch(&settings.member_url(member_id))?;
    parse_member(member_id, &parse_page(&raw))
}

/// Every member that cast a ballot in any of the votings.
pub fn member_ids(votings: &Votings) -> BTreeSet<String> {
    votings
        .values()
        .flat_map(|v| v.ballots.iter().map(|b| b.member_id.clone()))
        .collect()
}

/// Build the member table for everyone appearing in `votings`.
pub fn scrape_members(
    source: &impl PageSource,
    settings: &Settings,
    votings: &Votings,
    cache: &mut MemberCache,
) -> Result<Members> {
    let ids = member_ids(votings);
    let pb = progress_bar(ids.len())?;
    let mut members = Members::new();

    for id in ids {
        if let Some(member) = cache.get_or_build(&id, |id| fetch_member(source, settings, id)) {
            members.insert(id, member.clone());
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    log_cache("member", cache);
    Ok(members)
}

/// Attach the member record to every ballot in place. Ballots whose member
/// cannot be built are left without one.
pub fn attach_members(
    source: &impl PageSource,
    settings: &Settings,
    votings: &mut Votings,
    cache: &mut MemberCache,
) {
    for ballot in votings.values_mut().flat_map(|v| v.ballots.iter_mut()) {
        ballot.member = cache
            .get_or_build(&ballot.member_id, |id| fetch_member(source, settings, id))
            .cloned();
    }
    log_cache("member", cache);
}

pub(super) fn log_cache<K, V>(kind: &str, cache: &RecordCache<K, V>)
where
    K: Eq + std::hash::Hash + Clone + std::fmt::Debug,
{
    info!(
        "{} cache: {} entries, {} hits, {} misses",
        kind,
        cache.len(),
        cache.hits(),
        cache.misses()
    );
}

// ── Tests ──
