use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::{count_academic_titles, Outcome, Vote};

// ── Votings ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingRecord {
    pub voting_id: u64,
    pub url: String,
    pub timestamp: String,
    pub meeting: String,
    pub meeting_number: Option<String>,
    pub sequence_number: String,
    pub title: String,
    pub outcome: String,
    pub outcome_normalized: Outcome,
    pub stats: VotingStats,
    pub ballots: Vec<BallotEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRecord>,
}

impl VotingRecord {
    pub fn document_key(&self) -> Option<DocumentKey> {
        Some(DocumentKey::new(
            self.meeting_number.clone()?,
            self.sequence_number.clone(),
        ))
    }
}

/// Aggregate tallies as printed on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingStats {
    pub present: Option<String>,
    pub voting: Option<String>,
    #[serde(rename = "for")]
    pub votes_for: Option<String>,
    pub against: Option<String>,
    pub abstain: Option<String>,
    pub not_voted: Option<String>,
    pub absent: Option<String>,
    pub invalid: Option<String>,
}

impl VotingStats {
    /// Difference between the voting count and the sum of the cast categories,
    /// `None` when any of the numbers is missing or unparsable.
    pub fn tally_discrepancy(&self) -> Option<i64> {
        let n = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        let cast = n(&self.votes_for)? + n(&self.against)? + n(&self.abstain)? + n(&self.invalid)?;
        Some(n(&self.voting)? - cast)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallotEntry {
    pub member_id: String,
    pub member_name: String,
    pub caucus: Option<String>,
    pub vote_code: String,
    pub vote: Vote,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberRecord>,
}

// ── Members ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub member_id: String,
    pub given_name: String,
    pub surname: String,
    pub titles: String,
    pub candidacy: String,
    pub born: String,
    pub nationality: String,
    pub residence: String,
    pub region: String,
    pub email: String,
    pub website: String,
    pub photo: Option<String>,
    #[serde(default)]
    pub memberships: Vec<String>,
}

impl MemberRecord {
    pub fn title_count(&self) -> usize {
        count_academic_titles(&self.titles)
    }
}

// ── Election ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionRecord {
    pub affiliation: String,
    pub given_name: String,
    pub surname: String,
    pub votes: Option<u64>,
    pub vote_share: Option<f64>,
    pub rank: Option<u32>,
    pub ballot_rank: Option<u32>,
}

// ── Documents ──

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    pub meeting_number: String,
    pub sequence_number: String,
}

impl DocumentKey {
    pub fn new(meeting_number: impl Into<String>, sequence_number: impl Into<String>) -> Self {
        DocumentKey {
            meeting_number: meeting_number.into(),
            sequence_number: sequence_number.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.meeting_number, self.sequence_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub meeting_number: String,
    pub sequence_number: String,
    pub press_number: String,
    pub url: String,
    pub kind: String,
    pub received: String,
    pub title: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl DocumentRecord {
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.meeting_number.clone(), self.sequence_number.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub link: String,
    pub description: String,
}

// ── Joined export ──

/// One ballot of one voting, with everything known about the member and the
/// voted document spread into columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinedVotingRow {
    pub voting_id: u64,
    pub timestamp: String,
    pub meeting: String,
    pub meeting_number: Option<String>,
    pub sequence_number: String,
    pub title: String,
    pub outcome: String,
    pub outcome_normalized: &'static str,
    pub present: Option<String>,
    pub voting: Option<String>,
    pub votes_for: Option<String>,
    pub against: Option<String>,
    pub abstain: Option<String>,
    pub not_voted: Option<String>,
    pub absent: Option<String>,
    pub invalid: Option<String>,
    pub caucus: Option<String>,
    pub member_name: String,
    pub member_id: String,
    pub vote_code: String,
    pub vote: &'static str,

    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub titles: Option<String>,
    pub title_count: Option<usize>,
    pub candidacy: Option<String>,
    pub born: Option<String>,
    pub nationality: Option<String>,
    pub residence: Option<String>,
    pub region: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub photo: Option<String>,
    pub memberships: Option<String>,

    pub election_votes: Option<u64>,
    pub election_vote_share: Option<f64>,
    pub election_rank: Option<u32>,
    pub election_ballot_rank: Option<u32>,

    pub press_number: Option<String>,
    pub press_url: Option<String>,
    pub press_kind: Option<String>,
    pub press_received: Option<String>,
    pub press_title: Option<String>,
    pub press_attachments: Option<String>,
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(voting: &str, f: &str, a: &str, ab: &str, inv: &str) -> VotingStats {
        VotingStats {
            present: Some("150".into()),
            voting: Some(voting.into()),
            votes_for: Some(f.into()),
            against: Some(a.into()),
            abstain: Some(ab.into()),
            not_voted: Some("2".into()),
            absent: Some("0".into()),
            invalid: Some(inv.into()),
        }
    }

    #[test]
    fn consistent_tallies_have_no_discrepancy() {
        assert_eq!(stats("148", "80", "60", "8", "0").tally_discrepancy(), Some(0));
    }

    #[test]
    fn inconsistent_tallies_are_reported() {
        assert_eq!(stats("148", "80", "60", "5", "0").tally_discrepancy(), Some(3));
    }

    #[test]
    fn missing_tally_gives_no_report() {
        let mut s = stats("148", "80", "60", "8", "0");
        s.abstain = None;
        assert_eq!(s.tally_discrepancy(), None);
    }

    #[test]
    fn document_key_text_form() {
        let key = DocumentKey::new("15", "23");
        assert_eq!(key.to_string(), "15:23");
        assert!(key < DocumentKey::new("15", "24"));
    }

    #[test]
    fn voting_stats_use_short_json_keys() {
        let json = serde_json::to_value(stats("1", "1", "0", "0", "0")).unwrap();
        assert_eq!(json["for"], "1");
        let back: VotingStats = serde_json::from_str(r#"{"voting":"3"}"#).unwrap();
        assert_eq!(back.voting.as_deref(), Some("3"));
        assert!(back.invalid.is_none());
    }
}
