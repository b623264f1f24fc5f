use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::records::{DocumentKey, DocumentRecord, ElectionRecord, MemberRecord, VotingRecord};

pub type Votings = BTreeMap<u64, VotingRecord>;
pub type Members = BTreeMap<String, MemberRecord>;
pub type Documents = BTreeMap<String, DocumentRecord>;

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))
}

/// Write the whole file at once, creating parent directories.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))
}

pub fn load_votings(path: &Path) -> Result<Votings> {
    load_json(path)
}

pub fn load_members(path: &Path) -> Result<Members> {
    load_json(path)
}

pub fn load_documents(path: &Path) -> Result<Documents> {
    load_json(path)
}

pub fn load_election(path: &Path) -> Result<Vec<ElectionRecord>> {
    load_json(path)
}

/// Key saved documents by their composite key for seeding a cache.
pub fn documents_by_key(documents: Documents) -> Vec<(DocumentKey, DocumentRecord)> {
    documents.into_values().map(|d| (d.key(), d)).collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Attachment;

    #[test]
    fn documents_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/documents.json");
        let doc = DocumentRecord {
            meeting_number: "15".into(),
            sequence_number: "23".into(),
            press_number: "300".into(),
            url: "https://example/cpt".into(),
            kind: "Návrh zákona".into(),
            received: "1. 2. 2024".into(),
            title: "Zákon".into(),
            attachments: vec![Attachment {
                link: "/doc.pdf".into(),
                description: "Dôvodová správa".into(),
            }],
        };
        let mut docs = Documents::new();
        docs.insert(doc.key().to_string(), doc.clone());
        save_json(&path, &docs).unwrap();

        let loaded = load_documents(&path).unwrap();
        let seeded = documents_by_key(loaded);
        assert_eq!(seeded, vec![(DocumentKey::new("15", "23"), doc)]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_votings(&dir.path().join("absent.json")).is_err());
    }
}
