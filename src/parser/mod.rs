pub mod document;
pub mod fields;
pub mod member;
pub mod voting;

use scraper::Html;

/// Raw page bytes → DOM. The site serves UTF-8; stray bytes are replaced.
pub fn parse_page(raw: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(raw))
}
