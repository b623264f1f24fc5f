use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook, DataType, Reader, Xlsx};
use tracing::info;

use crate::fetch::PageSource;
use crate::records::ElectionRecord;

/// Candidate results table of the 2023 election.
pub const DEFAULT_SOURCE: &str =
    "https://volby.statistics.sk/nrsr/nrsr2023/files/xlsx/NRSR2023_SK_tab07a.xlsx";

/// Rows above the header: sheet title and a blank line.
const PREAMBLE_ROWS: usize = 2;

const AFFILIATION: &str = "Názov politického subjektu";
const GIVEN_NAME: &str = "Meno";
const SURNAME: &str = "Priezvisko";
const VOTES: &str = "Počet platných prednostných hlasov";
const VOTE_SHARE: &str = "Podiel platných prednostných hlasov v %";
const RANK: &str = "Poradie po zohľadnení prednostného hlasovania";
const BALLOT_RANK: &str = "Poradie na hlasovacom lístku";

/// Read the first sheet of the results workbook from a local path or a URL.
pub fn load_sheet(source: &impl PageSource, input: &str) -> Result<Vec<Vec<DataType>>> {
    let range = if input.starts_with("http://") || input.starts_with("https://") {
        let raw = source
            .fetch(input)
            .ok_or_else(|| anyhow!("Failed to download election results from {}", input))?;
        let mut book = Xlsx::new(Cursor::new(raw)).context("Not an xlsx workbook")?;
        book.worksheet_range_at(0)
            .ok_or_else(|| anyhow!("Workbook {} has no sheets", input))??
    } else {
        let mut book: Xlsx<_> = open_workbook(Path::new(input))
            .with_context(|| format!("Failed to open workbook {}", input))?;
        book.worksheet_range_at(0)
            .ok_or_else(|| anyhow!("Workbook {} has no sheets", input))??
    };
    Ok(range.rows().map(<[DataType]>::to_vec).collect())
}

/// Turn sheet rows into election records. The header row is located after
/// the preamble; columns are found by header text. With `elected_only`,
/// candidates without a final rank are dropped.
pub fn records_from_rows(rows: &[Vec<DataType>], elected_only: bool) -> Result<Vec<ElectionRecord>> {
    let mut iter = rows.iter().skip(PREAMBLE_ROWS);
    let headings = iter
        .next()
        .ok_or_else(|| anyhow!("Election sheet has no header row"))?;
    let hcol = |title: &str| {
        headings
            .iter()
            .position(|v| v.to_string().trim() == title)
            .ok_or_else(|| anyhow!("Could not find election column heading {}", title))
    };
    let col_affiliation = hcol(AFFILIATION)?;
    let col_given_name = hcol(GIVEN_NAME)?;
    let col_surname = hcol(SURNAME)?;
    let col_votes = hcol(VOTES)?;
    let col_vote_share = hcol(VOTE_SHARE)?;
    let col_rank = hcol(RANK)?;
    let col_ballot_rank = hcol(BALLOT_RANK)?;

    let records: Vec<ElectionRecord> = iter
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|row| {
            let cell = |col: usize| row.get(col).unwrap_or(&DataType::Empty);
            ElectionRecord {
                affiliation: text(cell(col_affiliation)),
                given_name: text(cell(col_given_name)),
                surname: text(cell(col_surname)),
                votes: number(cell(col_votes)).map(|n| n as u64),
                vote_share: number(cell(col_vote_share)),
                rank: number(cell(col_rank)).map(|n| n as u32),
                ballot_rank: number(cell(col_ballot_rank)).map(|n| n as u32),
            }
        })
        .filter(|r| !elected_only || r.rank.is_some())
        .collect();

    info!("Read {} election records", records.len());
    Ok(records)
}

fn text(cell: &DataType) -> String {
    cell.to_string().trim().to_string()
}

/// Numeric cell value. Text cells are parsed too, accepting a decimal comma.
fn number(cell: &DataType) -> Option<f64> {
    match cell {
        DataType::Int(n) => Some(*n as f64),
        DataType::Float(f) => Some(*f),
        DataType::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> DataType {
        DataType::String(v.to_string())
    }

    fn header() -> Vec<DataType> {
        vec![
            s("Číslo"),
            s(AFFILIATION),
            s("Poradové číslo"),
            s(GIVEN_NAME),
            s(SURNAME),
            s(VOTES),
            s(VOTE_SHARE),
            s(RANK),
            s(BALLOT_RANK),
        ]
    }

    fn sheet() -> Vec<Vec<DataType>> {
        vec![
            vec![s("Tabuľka 7a")],
            vec![DataType::Empty],
            header(),
            vec![
                DataType::Int(1),
                s("SMER - sociálna demokracia"),
                DataType::Int(1),
                s("Ján"),
                s("Novák Kováčik"),
                DataType::Float(12034.0),
                DataType::Float(4.52),
                DataType::Float(3.0),
                DataType::Int(5),
            ],
            vec![
                DataType::Int(1),
                s("SMER - sociálna demokracia"),
                DataType::Int(2),
                s("Eva"),
                s("Malá"),
                DataType::Int(850),
                s("0,31"),
                DataType::Empty,
                DataType::Int(40),
            ],
            vec![DataType::Empty, DataType::Empty],
        ]
    }

    #[test]
    fn headers_map_to_record_fields() {
        let records = records_from_rows(&sheet(), false).unwrap();
        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.affiliation, "SMER - sociálna demokracia");
        assert_eq!(first.given_name, "Ján");
        assert_eq!(first.surname, "Novák Kováčik");
        assert_eq!(first.votes, Some(12034));
        assert_eq!(first.vote_share, Some(4.52));
        assert_eq!(first.rank, Some(3));
        assert_eq!(first.ballot_rank, Some(5));
        assert_eq!(records[1].vote_share, Some(0.31));
        assert_eq!(records[1].rank, None);
    }

    #[test]
    fn elected_only_keeps_ranked_candidates() {
        let records = records_from_rows(&sheet(), true).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.given_name.as_str()).collect();
        assert_eq!(names, vec!["Ján"]);
    }

    #[test]
    fn missing_header_is_an_error() {
        let mut rows = sheet();
        rows[2].retain(|c| c.to_string() != RANK);
        let err = records_from_rows(&rows, true).unwrap_err();
        assert!(err.to_string().contains(RANK));
    }

    #[test]
    fn header_must_be_third_row() {
        let rows: Vec<Vec<DataType>> = sheet().into_iter().skip(1).collect();
        assert!(records_from_rows(&rows, true).is_err());
    }
}
