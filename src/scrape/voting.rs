use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::info;

use super::progress_bar;
use crate::config::Settings;
use crate::fetch::PageSource;
use crate::normalize::OutcomeMapping;
use crate::parser::{parse_page, voting::parse_voting};
use crate::store::Votings;

/// Scrape stats returned after completion.
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub skipped: usize,
}

/// Scrape every voting id in `start..=end`, one request at a time.
///
/// Ids whose page is missing, fails, or does not parse are skipped. After each
/// record built the loop sleeps `throttle_ms`.
pub fn scrape_votings(
    source: &impl PageSource,
    settings: &Settings,
    mapping: OutcomeMapping,
    start: u64,
    end: u64,
) -> Result<(Votings, ScrapeStats)> {
    let total = match end.checked_sub(start) {
        None => 0,
        Some(span) => span
            .checked_add(1)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| anyhow!("Voting id range {}..={} is too large", start, end))?,
    };
    let pb = progress_bar(total)?;
    let throttle = Duration::from_millis(settings.throttle_ms);
    let mut data = Votings::new();

    for voting_id in start..=end {
        info!("Scraping data for voting ID {}", voting_id);
        let url = settings.voting_url(voting_id);
        if let Some(raw) = source.fetch(&url) {
            let html = parse_page(&raw);
            if let Some(record) = parse_voting(voting_id, &url, &html, mapping) {
                data.insert(voting_id, record);
                if !throttle.is_zero() {
                    thread::sleep(throttle);
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    let stats = ScrapeStats {
        total,
        ok: data.len(),
        skipped: total - data.len(),
    };
    info!(
        "Scraped {} votings ({} ok, {} skipped)",
        stats.total, stats.ok, stats.skipped
    );
    Ok((data, stats))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FixtureSource;

    fn settings() -> Settings {
        Settings {
            throttle_ms: 0,
            ..Settings::default()
        }
    }

    #[test]
    fn skips_missing_and_broken_pages() {
        let s = settings();
        let page = std::fs::read_to_string("tests/fixtures/voting.html").unwrap();
        let source = FixtureSource::default()
            .with_page(s.voting_url(10), page.clone())
            .with_page(s.voting_url(12), "<html><body>maintenance</body></html>");

        let (data, stats) = scrape_votings(&source, &s, OutcomeMapping::NegationFirst, 10, 12).unwrap();
        assert_eq!(data.keys().copied().collect::<Vec<_>>(), vec![10]);
        assert_eq!((stats.total, stats.ok, stats.skipped), (3, 1, 2));
        assert_eq!(data[&10].voting_id, 10);
        assert_eq!(data[&10].url, s.voting_url(10));
        assert_eq!(source.requests.borrow().len(), 3);
    }

    #[test]
    fn empty_range_fetches_nothing() {
        let source = FixtureSource::default();
        let (data, stats) = scrape_votings(&source, &settings(), OutcomeMapping::NegationFirst, 5, 4).unwrap();
        assert!(data.is_empty());
        assert_eq!(stats.total, 0);
        assert!(source.requests.borrow().is_empty());
    }

    #[test]
    fn throttle_follows_built_records_only() {
        let s = Settings {
            throttle_ms: 200,
            ..Settings::default()
        };
        let source = FixtureSource::default()
            .with_page(s.voting_url(1), std::fs::read_to_string("tests/fixtures/voting.html").unwrap())
            .with_page(s.voting_url(2), "<html><body>broken</body></html>");

        let t0 = std::time::Instant::now();
        let (data, _) = scrape_votings(&source, &s, OutcomeMapping::NegationFirst, 1, 3).unwrap();
        let elapsed = t0.elapsed();

        assert_eq!(data.len(), 1);
        assert!(elapsed >= Duration::from_millis(200), "slept {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "slept {:?}", elapsed);
    }

    #[test]
    fn oversized_range_is_rejected() {
        let source = FixtureSource::default();
        assert!(scrape_votings(&source, &settings(), OutcomeMapping::NegationFirst, 0, u64::MAX).is_err());
        assert!(source.requests.borrow().is_empty());
    }
}
