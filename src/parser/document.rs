use scraper::Html;

use super::fields::{
    extract_fields, find_container, label_value, links, selector, stripped_text, ExtractError,
    FieldSpec, Locate,
};
use crate::records::Attachment;

const SEARCH_TABLE: &str = "table.tab_zoznam";
const SEARCH_ROWS: &str = "tr.tab_zoznam_nonalt, tr.tab_zoznam_alt";
const DETAILS_PANEL: &str = "div.parliamentary_press_details";
const ATTACHMENTS_LABEL: &str = "Dokumenty";

const DETAIL_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("press_number", Locate::Label("Číslo")),
    FieldSpec::required("kind", Locate::Label("Typ")),
    FieldSpec::required("received", Locate::Label("Dátum doručenia")),
    FieldSpec::required("title", Locate::Label("Názov")),
];

/// One hit of the voting search: which press print a voting was about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub meeting_number: String,
    pub sequence_number: String,
    pub press_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PressDetails {
    pub press_number: String,
    pub kind: String,
    pub received: String,
    pub title: String,
    pub attachments: Vec<Attachment>,
}

/// Rows of the voting search results. Rows with fewer than six cells are
/// layout filler and skipped.
pub fn parse_search_results(html: &Html) -> Result<Vec<SearchHit>, ExtractError> {
    let table = find_container(html, SEARCH_TABLE)?;
    let rows = selector(SEARCH_ROWS)?;
    let td = selector("td")?;
    Ok(table
        .select(&rows)
        .filter_map(|row| {
            let cols: Vec<String> = row.select(&td).map(stripped_text).collect();
            if cols.len() < 6 {
                return None;
            }
            Some(SearchHit {
                meeting_number: cols[0].clone(),
                sequence_number: cols[2].clone(),
                press_number: cols[3].clone(),
            })
        })
        .collect())
}

/// Details of a parliamentary press print. Every labelled field, including the
/// attachment list, must be present.
pub fn parse_press_details(html: &Html) -> Result<PressDetails, ExtractError> {
    let mut f = extract_fields(html, DETAILS_PANEL, DETAIL_FIELDS)?;
    let panel = find_container(html, DETAILS_PANEL)?;
    let attachments = label_value(panel, ATTACHMENTS_LABEL)
        .ok_or(ExtractError::MissingField(ATTACHMENTS_LABEL))?;
    let attachments = links(attachments)?
        .into_iter()
        .map(|(link, description)| Attachment { link, description })
        .collect();

    Ok(PressDetails {
        press_number: f.take("press_number"),
        kind: f.take("kind"),
        received: f.take("received"),
        title: f.take("title"),
        attachments,
    })
}

// ── Tests ──
