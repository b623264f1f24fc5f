use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("container '{0}' not found")]
    MissingContainer(&'static str),
    #[error("field '{0}' not found")]
    MissingField(&'static str),
    #[error("invalid selector '{0}'")]
    BadSelector(String),
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// Where a field's value sits relative to its container.
#[derive(Debug, Clone, Copy)]
pub enum Locate {
    /// `<strong>label</strong>` followed by the first `<span>` after it.
    Label(&'static str),
    /// As `Label`, but the value is the text of the link inside that span.
    LabelLink(&'static str),
    /// First `<span>` inside the first match of the selector.
    Span(&'static str),
    /// First `<span>` inside the `<div>` sibling that follows the selector match.
    SiblingSpan(&'static str),
    /// Text of the first match of the selector.
    Text(&'static str),
}

impl Locate {
    fn describe(&self) -> &'static str {
        match *self {
            Locate::Label(l) | Locate::LabelLink(l) => l,
            Locate::Span(s) | Locate::SiblingSpan(s) | Locate::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub locate: Locate,
    pub fallback: Option<&'static str>,
}

impl FieldSpec {
    pub const fn required(key: &'static str, locate: Locate) -> Self {
        FieldSpec { key, locate, fallback: None }
    }

    pub const fn or_default(key: &'static str, locate: Locate, fallback: &'static str) -> Self {
        FieldSpec { key, locate, fallback: Some(fallback) }
    }
}

/// Extracted values by output key.
#[derive(Debug, Default)]
pub struct Fields(BTreeMap<&'static str, String>);

impl Fields {
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Take a value out, leaving an empty string for keys that were never set.
    pub fn take(&mut self, key: &str) -> String {
        self.0.remove(key).unwrap_or_default()
    }
}

pub fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::BadSelector(css.to_string()))
}

pub fn find_container<'a>(html: &'a Html, css: &'static str) -> Result<ElementRef<'a>, ExtractError> {
    html.select(&selector(css)?)
        .next()
        .ok_or(ExtractError::MissingContainer(css))
}

/// Pull every listed field out of one container. All or nothing: the first
/// required field that cannot be found fails the whole section.
pub fn extract_fields(
    html: &Html,
    container: &'static str,
    specs: &[FieldSpec],
) -> Result<Fields, ExtractError> {
    let root = find_container(html, container)?;
    let mut fields = Fields::default();
    for spec in specs {
        let value = match (locate(root, spec.locate)?, spec.fallback) {
            (Some(v), _) => v,
            (None, Some(default)) => default.to_string(),
            (None, None) => return Err(ExtractError::MissingField(spec.locate.describe())),
        };
        fields.0.insert(spec.key, value);
    }
    Ok(fields)
}

fn locate(root: ElementRef<'_>, how: Locate) -> Result<Option<String>, ExtractError> {
    let span = selector("span")?;
    let link = selector("a")?;
    let found = match how {
        Locate::Label(label) => label_value(root, label).map(text_of),
        Locate::LabelLink(label) => label_value(root, label)
            .and_then(|v| v.select(&link).next())
            .map(text_of),
        Locate::Span(css) => root
            .select(&selector(css)?)
            .next()
            .and_then(|el| el.select(&span).next())
            .map(text_of),
        Locate::SiblingSpan(css) => root
            .select(&selector(css)?)
            .next()
            .and_then(next_sibling_div)
            .and_then(|el| el.select(&span).next())
            .map(text_of),
        Locate::Text(css) => root.select(&selector(css)?).next().map(text_of),
    };
    Ok(found)
}

/// The first `<span>` after `<strong>label</strong>`, in document order.
pub fn label_value<'a>(container: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    let mut seen_label = false;
    for node in container.descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if seen_label {
            if el.value().name() == "span" {
                return Some(el);
            }
        } else if el.value().name() == "strong" && text_of(el) == label {
            seen_label = true;
        }
    }
    None
}

fn next_sibling_div(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sib| sib.value().name() == "div")
}

/// All descendant text, trimmed at the ends.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Each text piece trimmed, then concatenated.
pub fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// `(href, text)` of every link with an `href` under `el`.
pub fn links(el: ElementRef<'_>) -> Result<Vec<(String, String)>, ExtractError> {
    let a = selector("a[href]")?;
    Ok(el
        .select(&a)
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            Some((href.to_string(), stripped_text(link)))
        })
        .collect())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="card">
            <div class="row"><strong>Name</strong><span> Alice </span></div>
            <div class="row"><strong>Mail</strong><span><a href="mailto:a@x">a@x</a></span></div>
            <div class="grid_4">Date</div><div class="grid_8"><span>1. 2. 2024</span></div>
            <div class="box"><span>boxed</span></div>
          </div>
        </body></html>"#;

    #[test]
    fn extracts_each_locator_kind() {
        let html = Html::parse_document(PAGE);
        let specs = [
            FieldSpec::required("name", Locate::Label("Name")),
            FieldSpec::required("mail", Locate::LabelLink("Mail")),
            FieldSpec::required("date", Locate::SiblingSpan("div.grid_4")),
            FieldSpec::required("boxed", Locate::Span("div.box")),
            FieldSpec::required("raw", Locate::Text("div.grid_4")),
        ];
        let fields = extract_fields(&html, "div.card", &specs).unwrap();
        assert_eq!(fields.get("name"), Some("Alice"));
        assert_eq!(fields.get("mail"), Some("a@x"));
        assert_eq!(fields.get("date"), Some("1. 2. 2024"));
        assert_eq!(fields.get("boxed"), Some("boxed"));
        assert_eq!(fields.get("raw"), Some("Date"));
    }

    #[test]
    fn missing_required_field_fails_section() {
        let html = Html::parse_document(PAGE);
        let specs = [
            FieldSpec::required("name", Locate::Label("Name")),
            FieldSpec::required("phone", Locate::Label("Phone")),
        ];
        let err = extract_fields(&html, "div.card", &specs).unwrap_err();
        assert_eq!(err, ExtractError::MissingField("Phone"));
    }

    #[test]
    fn optional_field_takes_fallback() {
        let html = Html::parse_document(PAGE);
        let specs = [FieldSpec::or_default("phone", Locate::Label("Phone"), "0")];
        let fields = extract_fields(&html, "div.card", &specs).unwrap();
        assert_eq!(fields.get("phone"), Some("0"));
    }

    #[test]
    fn label_text_must_match_exactly() {
        let html = Html::parse_document(PAGE);
        let specs = [FieldSpec::required("name", Locate::Label("Nam"))];
        assert!(extract_fields(&html, "div.card", &specs).is_err());
    }

    #[test]
    fn missing_container() {
        let html = Html::parse_document(PAGE);
        let err = extract_fields(&html, "div.absent", &[]).unwrap_err();
        assert_eq!(err, ExtractError::MissingContainer("div.absent"));
    }
}
