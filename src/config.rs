use anyhow::{anyhow, Context, Result};
use config::Config;
use serde::Deserialize;

use crate::normalize::OutcomeMapping;

const DEFAULT_BASE_URL: &str = "https://www.nrsr.sk/web/Default.aspx";
const DEFAULT_NOT_FOUND_MARKER: &str = "unexpected error";

/// Runtime settings: built-in defaults, then `nrsr.toml` if present, then
/// `NRSR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub throttle_ms: u64,
    pub not_found_marker: String,
    pub user_agent: String,
    #[serde(default)]
    pub outcome_mapping: Option<OutcomeMapping>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: DEFAULT_BASE_URL.to_string(),
            throttle_ms: 100,
            not_found_marker: DEFAULT_NOT_FOUND_MARKER.to_string(),
            user_agent: concat!("nrsr_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            outcome_mapping: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let defaults = Settings::default();
        Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("throttle_ms", defaults.throttle_ms)?
            .set_default("not_found_marker", defaults.not_found_marker)?
            .set_default("user_agent", defaults.user_agent)?
            .add_source(config::File::with_name("nrsr").required(false))
            .add_source(config::Environment::with_prefix("NRSR"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// The outcome reading has no default; callers building or exporting
    /// voting records must have picked one.
    pub fn require_outcome_mapping(&self) -> Result<OutcomeMapping> {
        self.outcome_mapping.ok_or_else(|| {
            anyhow!(
                "No outcome mapping selected: pass --outcome-mapping or set NRSR_OUTCOME_MAPPING \
                 (negation-first | affirmation-first)"
            )
        })
    }

    pub fn voting_url(&self, voting_id: u64) -> String {
        format!("{}?sid=schodze/hlasovanie/hlasklub&ID={}", self.base_url, voting_id)
    }

    pub fn member_url(&self, member_id: &str) -> String {
        format!("{}?sid=poslanci/poslanec&PoslanecID={}", self.base_url, member_id)
    }

    pub fn document_search_url(&self, meeting: &str, from: &str, to: &str) -> String {
        format!(
            "{}?sid=schodze/hlasovanie/vyhladavanie_vysledok&Text=&CPT=&CisSchodze={}&DatumOd={}&DatumDo={}",
            self.base_url, meeting, from, to
        )
    }

    pub fn press_url(&self, press_number: &str) -> String {
        format!("{}?sid=zakony/cpt&ID={}", self.base_url, press_number)
    }
}

// ── Tests ──
