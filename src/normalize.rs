use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format shown on a voting page, e.g. `"12. 9. 2024 11:02"`.
pub const VOTING_TIME_FORMAT: &str = "%d. %m. %Y %H:%M";

/// Academic titles recognized when counting a member's degrees.
const ACADEMIC_TITLES: &[&str] = &[
    "Bc.", "Mgr.", "Ing.", "MUDr.", "MVDr.", "JUDr.", "PhDr.", "Ph.D", "RNDr.", "RSDr.",
    "ThDr.", "PharmDr.", "PaedDr.", "Dr.", "PhD.", "D.Phil.", "ThLic.", "ThDr.", "DrSc.",
    "doc.", "prof.", "Dr. med.", "MBA", "MSc", "M.A.", "MIM", "Dis.art.", "ArtD.", "Mgr. art.",
];

/// Spelling variants rewritten before tokenizing a title string.
const TITLE_FIXUPS: &[(&str, &str)] = &[
    ("M. A.", "M.A."),
    ("MSc.", "MSc"),
    ("Ph.D.", "Ph.D"),
    ("Dis. art", "Dis.art"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    For,
    Against,
    Abstain,
    DidNotVote,
    Absent,
    Invalid,
    Unknown,
}

impl Vote {
    /// Map a bracketed ballot token (`[Z]`, `[P]`, ...) to a vote.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("[Z]") => Vote::For,
            Some("[P]") => Vote::Against,
            Some("[?]") => Vote::Abstain,
            Some("[N]") => Vote::DidNotVote,
            Some("[0]") => Vote::Absent,
            Some("[X]") => Vote::Invalid,
            _ => Vote::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vote::For => "for",
            Vote::Against => "against",
            Vote::Abstain => "abstain",
            Vote::DidNotVote => "did_not_vote",
            Vote::Absent => "absent",
            Vote::Invalid => "invalid",
            Vote::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Unknown,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Unknown => "unknown",
        }
    }
}

/// How the raw result text of a voting is read.
///
/// Two readings of the same keywords exist. `NegationFirst` tests for
/// "neprešiel" before "prešiel"; `AffirmationFirst` tests "prešiel" first, so a
/// text saying the motion did not pass is read as passed. Neither is assumed:
/// the mapping has to be chosen in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeMapping {
    NegationFirst,
    AffirmationFirst,
}

impl OutcomeMapping {
    pub fn classify(self, raw: Option<&str>) -> Outcome {
        let Some(raw) = raw else {
            return Outcome::Unknown;
        };
        let lower = raw.to_lowercase();
        match self {
            OutcomeMapping::NegationFirst => {
                if lower.contains("neprešiel") {
                    Outcome::Failed
                } else if lower.contains("prešiel") {
                    Outcome::Passed
                } else if lower.contains("nebol") {
                    // "nebol uznášaniaschopný": no quorum
                    Outcome::Failed
                } else {
                    Outcome::Unknown
                }
            }
            OutcomeMapping::AffirmationFirst => {
                if lower.contains("prešiel") {
                    Outcome::Passed
                } else if lower.contains("nebol") {
                    Outcome::Failed
                } else {
                    Outcome::Unknown
                }
            }
        }
    }
}

impl FromStr for OutcomeMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "negation-first" | "negation_first" => Ok(OutcomeMapping::NegationFirst),
            "affirmation-first" | "affirmation_first" => Ok(OutcomeMapping::AffirmationFirst),
            other => Err(format!(
                "unknown outcome mapping '{}' (expected negation-first or affirmation-first)",
                other
            )),
        }
    }
}

impl fmt::Display for OutcomeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeMapping::NegationFirst => f.write_str("negation-first"),
            OutcomeMapping::AffirmationFirst => f.write_str("affirmation-first"),
        }
    }
}

/// Count recognized academic titles in a free-text title string.
pub fn count_academic_titles(titles: &str) -> usize {
    if titles.chars().count() < 2 {
        return 0;
    }

    let prepared = TITLE_FIXUPS
        .iter()
        .fold(titles.to_string(), |acc, (from, to)| acc.replace(from, to));

    prepared
        .replace(',', " ")
        .split_whitespace()
        .filter(|token| ACADEMIC_TITLES.contains(token))
        .count()
}

/// The meeting number is the last token of the descriptor ("Schôdza č. 15").
pub fn meeting_number(descriptor: &str) -> Option<String> {
    descriptor.split_whitespace().last().map(str::to_string)
}

/// Candidacy labels use a spaced dash that the election sheet writes as a hyphen.
pub fn normalize_affiliation(label: &str) -> String {
    label.replace(" – ", " - ").replace(" — ", " - ")
}

pub fn last_token(s: &str) -> Option<&str> {
    s.split_whitespace().last()
}

pub fn parse_voting_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), VOTING_TIME_FORMAT).ok()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    #[test]
    fn vote_codes_map_exactly() {
        let cases = [
            ("[Z]", Vote::For),
            ("[P]", Vote::Against),
            ("[?]", Vote::Abstain),
            ("[N]", Vote::DidNotVote),
            ("[0]", Vote::Absent),
            ("[X]", Vote::Invalid),
        ];
        for (code, expected) in cases {
            assert_eq!(Vote::from_code(Some(code)), expected, "code {}", code);
        }
    }

    #[test]
    fn unrecognized_vote_codes_are_unknown() {
        for code in ["Z", "[z]", "[Y]", "", "[ Z ]", "Poslanci,"] {
            assert_eq!(Vote::from_code(Some(code)), Vote::Unknown);
        }
        assert_eq!(Vote::from_code(None), Vote::Unknown);
    }

    #[test]
    fn negation_first_mapping() {
        let m = OutcomeMapping::NegationFirst;
        assert_eq!(m.classify(Some("Návrh prešiel")), Outcome::Passed);
        assert_eq!(m.classify(Some("Návrh neprešiel")), Outcome::Failed);
        assert_eq!(m.classify(Some("NÁVRH NEPREŠIEL")), Outcome::Failed);
        assert_eq!(m.classify(Some("Parlament nebol uznášaniaschopný")), Outcome::Failed);
        assert_eq!(m.classify(Some("Hlasovanie zrušené")), Outcome::Unknown);
        assert_eq!(m.classify(None), Outcome::Unknown);
    }

    #[test]
    fn mappings_disagree_only_on_negated_text() {
        let a = OutcomeMapping::NegationFirst;
        let b = OutcomeMapping::AffirmationFirst;
        assert_eq!(b.classify(Some("Návrh neprešiel")), Outcome::Passed);
        assert_ne!(a.classify(Some("Návrh neprešiel")), b.classify(Some("Návrh neprešiel")));
        for text in ["Návrh prešiel", "Parlament nebol uznášaniaschopný", "iné"] {
            assert_eq!(a.classify(Some(text)), b.classify(Some(text)), "{}", text);
        }
    }

    #[test]
    fn outcome_mapping_parses_from_config_text() {
        assert_eq!("negation-first".parse::<OutcomeMapping>(), Ok(OutcomeMapping::NegationFirst));
        assert_eq!(" Affirmation_First ".parse::<OutcomeMapping>(), Ok(OutcomeMapping::AffirmationFirst));
        assert!("auto".parse::<OutcomeMapping>().is_err());
    }

    #[test]
    fn shuffled_titles_count_every_token() {
        // Multi-word titles would be split by the tokenizer, so only single tokens here.
        let singles: Vec<&str> = ACADEMIC_TITLES
            .iter()
            .copied()
            .filter(|t| !t.contains(' '))
            .collect();
        let mut rng = rand::thread_rng();
        for n in 1..=8 {
            for _ in 0..20 {
                let mut picked: Vec<&str> = singles.choose_multiple(&mut rng, n).copied().collect();
                picked.shuffle(&mut rng);
                let joined = picked
                    .iter()
                    .enumerate()
                    .map(|(i, t)| if i % 2 == 0 { format!("{},", t) } else { t.to_string() })
                    .collect::<Vec<_>>()
                    .join(" ");
                assert_eq!(count_academic_titles(&joined), n, "{}", joined);
            }
        }
    }

    #[test]
    fn spelling_variants_normalize_before_counting() {
        assert_eq!(count_academic_titles("Ing. Ph.D."), 2);
        assert_eq!(count_academic_titles("M. A."), 1);
        assert_eq!(count_academic_titles("Mgr., MSc."), 2);
        assert_eq!(count_academic_titles("Mgr. Dis. art."), 2);
    }

    #[test]
    fn titles_match_exactly_only() {
        assert_eq!(count_academic_titles("Ing"), 0);
        assert_eq!(count_academic_titles("ing."), 0);
        assert_eq!(count_academic_titles("x"), 0);
        assert_eq!(count_academic_titles(""), 0);
        assert_eq!(count_academic_titles("prof. Ing. CSc."), 2);
    }

    #[test]
    fn meeting_number_is_last_token() {
        assert_eq!(meeting_number("Schôdza č. 15").as_deref(), Some("15"));
        assert_eq!(meeting_number("  Schôdza č. 7 ").as_deref(), Some("7"));
        assert_eq!(meeting_number(""), None);
    }

    #[test]
    fn affiliation_dash_becomes_hyphen() {
        assert_eq!(
            normalize_affiliation("SMER – sociálna demokracia"),
            "SMER - sociálna demokracia"
        );
        assert_eq!(normalize_affiliation("PS"), "PS");
    }

    #[test]
    fn voting_time_parses() {
        let t = parse_voting_time("12. 9. 2024 11:02").unwrap();
        assert_eq!(t.format("%Y-%m-%d %H:%M").to_string(), "2024-09-12 11:02");
        assert!(parse_voting_time("2024-09-12").is_none());
    }
}
