use std::collections::BTreeMap;
use std::fmt::Debug;

use thiserror::Error;
use tracing::info;

use crate::normalize::{last_token, normalize_affiliation, OutcomeMapping};
use crate::records::{DocumentRecord, ElectionRecord, JoinedVotingRow, MemberRecord};
use crate::store::{Documents, Members, Votings};

#[derive(Debug, Error, PartialEq)]
pub enum JoinError {
    #[error("{table} key {key} matches {count} rows, expected at most one")]
    Cardinality {
        table: &'static str,
        key: String,
        count: usize,
    },

    #[error("{table} key {value:?} is not a number")]
    NonNumericKey { table: &'static str, value: String },

    #[error("joins changed the row count from {expected} to {actual}")]
    RowCountChanged { expected: usize, actual: usize },
}

/// Secondary tables joined onto the voting×ballot rows. Absent tables leave
/// their columns empty.
#[derive(Default)]
pub struct JoinSources<'a> {
    pub members: Option<&'a Members>,
    pub election: Option<&'a [ElectionRecord]>,
    pub documents: Option<&'a [DocumentRecord]>,
}

type ElectionKey = (String, String, String);

/// Index a secondary table, failing if any key occurs more than once.
fn unique_index<K, V>(
    table: &'static str,
    items: impl IntoIterator<Item = (K, V)>,
) -> Result<BTreeMap<K, V>, JoinError>
where
    K: Ord + Debug,
{
    let mut groups: BTreeMap<K, Vec<V>> = BTreeMap::new();
    for (key, value) in items {
        groups.entry(key).or_default().push(value);
    }
    groups
        .into_iter()
        .map(|(key, mut values)| match values.len() {
            1 => Ok((key, values.remove(0))),
            count => Err(JoinError::Cardinality {
                table,
                key: format!("{:?}", key),
                count,
            }),
        })
        .collect()
}

fn numeric_key(table: &'static str, value: Option<&str>) -> Result<u64, JoinError> {
    let value = value.unwrap_or("").trim();
    value.parse().map_err(|_| JoinError::NonNumericKey {
        table,
        value: value.to_string(),
    })
}

fn election_key(affiliation: &str, given_name: &str, surname: &str) -> ElectionKey {
    (
        normalize_affiliation(affiliation.trim()),
        given_name.trim().to_string(),
        last_token(surname).unwrap_or("").to_string(),
    )
}

/// Member table with its election result, one entry per member.
fn members_with_election<'a>(
    members: &'a Members,
    election: Option<&'a [ElectionRecord]>,
) -> Result<Vec<(&'a MemberRecord, Option<&'a ElectionRecord>)>, JoinError> {
    let index = match election {
        Some(records) => unique_index(
            "election",
            records
                .iter()
                .map(|r| (election_key(&r.affiliation, &r.given_name, &r.surname), r)),
        )?,
        None => BTreeMap::new(),
    };
    Ok(members
        .values()
        .map(|m| {
            let key = election_key(&m.candidacy, &m.given_name, &m.surname);
            (m, index.get(&key).copied())
        })
        .collect())
}

/// One row per ballot, voting columns repeated.
fn ballot_rows(votings: &Votings, mapping: OutcomeMapping) -> Vec<JoinedVotingRow> {
    votings
        .values()
        .flat_map(|v| {
            v.ballots.iter().map(move |b| JoinedVotingRow {
                voting_id: v.voting_id,
                timestamp: v.timestamp.clone(),
                meeting: v.meeting.clone(),
                meeting_number: v.meeting_number.clone(),
                sequence_number: v.sequence_number.clone(),
                title: v.title.clone(),
                outcome: v.outcome.clone(),
                outcome_normalized: mapping.classify(Some(&v.outcome)).as_str(),
                present: v.stats.present.clone(),
                voting: v.stats.voting.clone(),
                votes_for: v.stats.votes_for.clone(),
                against: v.stats.against.clone(),
                abstain: v.stats.abstain.clone(),
                not_voted: v.stats.not_voted.clone(),
                absent: v.stats.absent.clone(),
                invalid: v.stats.invalid.clone(),
                caucus: b.caucus.clone(),
                member_name: b.member_name.clone(),
                member_id: b.member_id.clone(),
                vote_code: b.vote_code.clone(),
                vote: b.vote.as_str(),
                ..JoinedVotingRow::default()
            })
        })
        .collect()
}

fn fill_member(row: &mut JoinedVotingRow, member: &MemberRecord, election: Option<&ElectionRecord>) {
    row.given_name = Some(member.given_name.clone());
    row.surname = Some(member.surname.clone());
    row.titles = Some(member.titles.clone());
    row.title_count = Some(member.title_count());
    row.candidacy = Some(member.candidacy.clone());
    row.born = Some(member.born.clone());
    row.nationality = Some(member.nationality.clone());
    row.residence = Some(member.residence.clone());
    row.region = Some(member.region.clone());
    row.email = Some(member.email.clone());
    row.website = Some(member.website.clone());
    row.photo = member.photo.clone();
    row.memberships = Some(member.memberships.join(";"));
    if let Some(e) = election {
        row.election_votes = e.votes;
        row.election_vote_share = e.vote_share;
        row.election_rank = e.rank;
        row.election_ballot_rank = e.ballot_rank;
    }
}

fn fill_document(row: &mut JoinedVotingRow, doc: &DocumentRecord) {
    row.press_number = Some(doc.press_number.clone());
    row.press_url = Some(doc.url.clone());
    row.press_kind = Some(doc.kind.clone());
    row.press_received = Some(doc.received.clone());
    row.press_title = Some(doc.title.clone());
    row.press_attachments = Some(
        doc.attachments
            .iter()
            .map(|a| format!("{} <{}>", a.description, a.link))
            .collect::<Vec<_>>()
            .join(";"),
    );
}

/// Flatten votings into ballot rows and left-join the secondary tables.
///
/// Any join key matching more than one secondary row, a non-numeric document
/// key, or a changed row count aborts the whole join.
pub fn join_votings(
    votings: &Votings,
    sources: &JoinSources<'_>,
    mapping: OutcomeMapping,
) -> Result<Vec<JoinedVotingRow>, JoinError> {
    let mut rows = ballot_rows(votings, mapping);
    let expected = rows.len();

    if let Some(members) = sources.members {
        let members = members_with_election(members, sources.election)?;
        let index = unique_index(
            "member",
            members.into_iter().map(|(m, e)| (m.member_id.clone(), (m, e))),
        )?;
        for row in rows.iter_mut() {
            if let Some((member, election)) = index.get(&row.member_id) {
                fill_member(row, member, *election);
            }
        }
    }

    if let Some(documents) = sources.documents {
        let keyed = documents
            .iter()
            .map(|d| {
                let meeting = numeric_key("document", Some(d.meeting_number.as_str()))?;
                let sequence = numeric_key("document", Some(d.sequence_number.as_str()))?;
                Ok(((meeting, sequence), d))
            })
            .collect::<Result<Vec<_>, JoinError>>()?;
        let index = unique_index("document", keyed)?;
        for row in rows.iter_mut() {
            let meeting = numeric_key("voting", row.meeting_number.as_deref())?;
            let sequence = numeric_key("voting", Some(row.sequence_number.as_str()))?;
            if let Some(doc) = index.get(&(meeting, sequence)) {
                fill_document(row, doc);
            }
        }
    }

    check_row_count(expected, &rows)?;
    info!("Joined {} rows", rows.len());
    Ok(rows)
}

/// Guard on the finished table. The joins above fill rows in place, so this
/// only trips if a later join starts adding or dropping rows.
fn check_row_count(expected: usize, rows: &[JoinedVotingRow]) -> Result<(), JoinError> {
    if rows.len() != expected {
        return Err(JoinError::RowCountChanged {
            expected,
            actual: rows.len(),
        });
    }
    Ok(())
}

/// Members attached to ballots by an enrichment pass, keyed by id.
pub fn embedded_members(votings: &Votings) -> Members {
    let mut members = Members::new();
    for ballot in votings.values().flat_map(|v| v.ballots.iter()) {
        if let Some(member) = &ballot.member {
            members
                .entry(ballot.member_id.clone())
                .or_insert_with(|| member.clone());
        }
    }
    members
}

/// Documents attached to votings by an enrichment pass, one per key.
pub fn embedded_documents(votings: &Votings) -> Documents {
    votings
        .values()
        .filter_map(|v| v.document.as_ref())
        .map(|d| (d.key().to_string(), d.clone()))
        .collect()
}

// ── Tests ──
