use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::records::JoinedVotingRow;

/// Write the joined table as CSV with a header row.
pub fn write_csv(path: &Path, rows: &[JoinedVotingRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_written_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/votes.csv");
        let rows = vec![
            JoinedVotingRow {
                voting_id: 7,
                member_id: "1102".into(),
                member_name: "Novák, Ján".into(),
                vote: "for",
                outcome_normalized: "passed",
                memberships: Some("Výbor A;Klub A".into()),
                ..JoinedVotingRow::default()
            },
            JoinedVotingRow {
                voting_id: 7,
                member_id: "987".into(),
                vote: "unknown",
                outcome_normalized: "passed",
                ..JoinedVotingRow::default()
            },
        ];

        write_csv(&path, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "voting_id");
        let member_col = headers.iter().position(|h| h == "member_name").unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][member_col], "Novák, Ján");
        let memberships_col = headers.iter().position(|h| h == "memberships").unwrap();
        assert_eq!(&records[0][memberships_col], "Výbor A;Klub A");
        assert_eq!(&records[1][memberships_col], "");
    }
}
