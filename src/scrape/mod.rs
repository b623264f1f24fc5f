pub mod document;
pub mod member;
pub mod voting;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar shared by the scrape loops.
fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );
    Ok(pb)
}
