use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{error, warn};

use super::fields::{
    extract_fields, find_container, selector, text_of, ExtractError, FieldSpec, Fields, Locate,
};
use crate::normalize::{meeting_number, OutcomeMapping, Vote};
use crate::records::{BallotEntry, VotingRecord, VotingStats};

const SUMMARY_PANEL: &str = "div.voting_stats_summary_panel";
const STATS_PANEL: &str = "div[id='_sectionLayoutContainer_ctl01_ctl00__resultsTablePanel']";
const RESULTS_TABLE: &str = "table[id='_sectionLayoutContainer_ctl01__resultsTable']";
const CAUCUS_HEADER: &str = "td.hpo_result_block_title";

static MEMBER_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"PoslanecID=(\d+)").unwrap());

const SUMMARY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("meeting", Locate::Text("a[id$='__schodzaLink']")),
    FieldSpec::required("timestamp", Locate::SiblingSpan("div.grid_4")),
    FieldSpec::required("sequence_number", Locate::Span("div.grid_4.omega")),
    FieldSpec::required("title", Locate::Span("div.grid_12.alpha.omega")),
    FieldSpec::required("outcome", Locate::Span("div[id$='__votingResultCell']")),
];

const STATS_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("present", Locate::Label("Prítomní")),
    FieldSpec::required("voting", Locate::Label("Hlasujúcich")),
    FieldSpec::required("for", Locate::Label("[Z] Za hlasovalo")),
    FieldSpec::required("against", Locate::Label("[P] Proti hlasovalo")),
    FieldSpec::required("abstain", Locate::Label("[?] Zdržalo sa hlasovania")),
    FieldSpec::required("not_voted", Locate::Label("[N] Nehlasovalo")),
    FieldSpec::required("absent", Locate::Label("[0] Neprítomní")),
    FieldSpec::or_default("invalid", Locate::Label("[X] Neplatných hlasov"), "0"),
];

/// Header block of a voting page: meeting, time, number, title, result.
pub fn parse_summary(html: &Html) -> Result<Fields, ExtractError> {
    extract_fields(html, SUMMARY_PANEL, SUMMARY_FIELDS)
}

pub fn parse_stats(html: &Html) -> Result<VotingStats, ExtractError> {
    let mut f = extract_fields(html, STATS_PANEL, STATS_FIELDS)?;
    Ok(VotingStats {
        present: Some(f.take("present")),
        voting: Some(f.take("voting")),
        votes_for: Some(f.take("for")),
        against: Some(f.take("against")),
        abstain: Some(f.take("abstain")),
        not_voted: Some(f.take("not_voted")),
        absent: Some(f.take("absent")),
        invalid: Some(f.take("invalid")),
    })
}

/// Per-member ballots. Rows are folded left to right; a caucus header row
/// sets the caucus for every ballot row after it until the next header.
pub fn parse_results(html: &Html) -> Result<Vec<BallotEntry>, ExtractError> {
    let table = find_container(html, RESULTS_TABLE)?;
    let tr = selector("tr")?;
    let td = selector("td")?;
    let header = selector(CAUCUS_HEADER)?;
    let link = selector("a")?;

    let (_, ballots) = table.select(&tr).enumerate().try_fold(
        (None::<String>, Vec::new()),
        |(caucus, mut ballots), (nr, row)| {
            if let Some(title) = row.select(&header).next() {
                return Ok((Some(text_of(title)), ballots));
            }
            for cell in row.select(&td) {
                match read_ballot(cell, &link, caucus.as_deref(), nr)? {
                    Some(ballot) => ballots.push(ballot),
                    None => break,
                }
            }
            Ok::<_, ExtractError>((caucus, ballots))
        },
    )?;
    Ok(ballots)
}

/// One member cell, e.g. `[Z] <a href="...PoslanecID=1102&...">Novák, Ján</a>`.
/// `None` ends the row: legend cells and empty padding cells carry no code.
fn read_ballot(
    cell: ElementRef<'_>,
    link: &Selector,
    caucus: Option<&str>,
    row: usize,
) -> Result<Option<BallotEntry>, ExtractError> {
    let text = text_of(cell);
    let code = text.split_whitespace().next().unwrap_or("");
    if code == "Poslanci," || !code.contains('[') || !code.contains(']') {
        return Ok(None);
    }

    let malformed = |reason: &str| ExtractError::MalformedRow {
        row,
        reason: reason.to_string(),
    };
    let a = cell
        .select(link)
        .next()
        .ok_or_else(|| malformed("ballot without member link"))?;
    let member_id = a
        .value()
        .attr("href")
        .and_then(|href| MEMBER_ID.captures(href))
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str())
        .ok_or_else(|| malformed("member link without PoslanecID"))?;

    Ok(Some(BallotEntry {
        member_id: member_id.to_string(),
        member_name: text_of(a),
        caucus: caucus.map(str::to_string),
        vote_code: code.to_string(),
        vote: Vote::from_code(Some(code)),
        member: None,
    }))
}

/// Build a voting record from one page. Summary, stats and ballots must all
/// parse; a record is never emitted with one of them missing.
pub fn parse_voting(
    voting_id: u64,
    url: &str,
    html: &Html,
    mapping: OutcomeMapping,
) -> Option<VotingRecord> {
    let summary = parse_summary(html)
        .map_err(|e| error!("Error parsing voting summary of {}: {}", voting_id, e))
        .ok();
    let stats = parse_stats(html)
        .map_err(|e| error!("Error parsing voting stats of {}: {}", voting_id, e))
        .ok();
    let ballots = parse_results(html)
        .map_err(|e| error!("Error parsing voting results of {}: {}", voting_id, e))
        .ok();

    let (mut summary, stats, ballots) = (summary?, stats?, ballots?);

    if let Some(diff) = stats.tally_discrepancy().filter(|d| *d != 0) {
        warn!("Voting {} tallies off by {} against the voting count", voting_id, diff);
    }

    let meeting = summary.take("meeting");
    let outcome = summary.take("outcome");
    Some(VotingRecord {
        voting_id,
        url: url.to_string(),
        timestamp: summary.take("timestamp"),
        meeting_number: meeting_number(&meeting),
        meeting,
        sequence_number: summary.take("sequence_number"),
        title: summary.take("title"),
        outcome_normalized: mapping.classify(Some(&outcome)),
        outcome,
        stats,
        ballots,
        document: None,
    })
}

// ── Tests ──
