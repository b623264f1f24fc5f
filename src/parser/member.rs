use scraper::Html;
use tracing::error;

use super::fields::{extract_fields, find_container, selector, text_of, ExtractError, FieldSpec, Fields, Locate};
use crate::normalize::normalize_affiliation;
use crate::records::MemberRecord;

const PERSONAL_PANEL: &str = "div.mp_personal_data";
const PHOTO_IMG: &str = "div.mp_foto img";
const MEMBERSHIP_PANEL: &str = "div.box";

const PERSONAL_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("given_name", Locate::Label("Meno")),
    FieldSpec::required("titles", Locate::Label("Titul")),
    FieldSpec::required("surname", Locate::Label("Priezvisko")),
    FieldSpec::required("candidacy", Locate::Label("Kandidoval(a) za")),
    FieldSpec::required("born", Locate::Label("Narodený(á)")),
    FieldSpec::required("nationality", Locate::Label("Národnosť")),
    FieldSpec::required("residence", Locate::Label("Bydlisko")),
    FieldSpec::required("region", Locate::Label("Kraj")),
    FieldSpec::required("email", Locate::LabelLink("E-mail")),
    FieldSpec::required("website", Locate::Label("WWW")),
];

pub fn parse_personal_data(html: &Html) -> Result<Fields, ExtractError> {
    extract_fields(html, PERSONAL_PANEL, PERSONAL_FIELDS)
}

pub fn parse_photo(html: &Html) -> Result<Option<String>, ExtractError> {
    Ok(html
        .select(&selector(PHOTO_IMG)?)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string))
}

/// Committee and caucus memberships, in page order.
pub fn parse_memberships(html: &Html) -> Result<Vec<String>, ExtractError> {
    let panel = find_container(html, MEMBERSHIP_PANEL)?;
    let li = selector("li")?;
    Ok(panel.select(&li).map(text_of).collect())
}

/// Member page → record. Personal data is required; a missing memberships
/// panel only leaves the list empty.
pub fn parse_member(member_id: &str, html: &Html) -> Option<MemberRecord> {
    let mut info = match parse_personal_data(html) {
        Ok(f) => f,
        Err(e) => {
            error!("Error parsing member info of {}: {}", member_id, e);
            return None;
        }
    };
    let memberships = parse_memberships(html).unwrap_or_else(|e| {
        error!("Failed to find memberships of {}: {}", member_id, e);
        Vec::new()
    });
    let photo = parse_photo(html).unwrap_or_else(|e| {
        error!("Failed to read photo of {}: {}", member_id, e);
        None
    });

    Some(MemberRecord {
        member_id: member_id.to_string(),
        given_name: info.take("given_name"),
        surname: info.take("surname"),
        titles: info.take("titles"),
        candidacy: normalize_affiliation(&info.take("candidacy")),
        born: info.take("born"),
        nationality: info.take("nationality"),
        residence: info.take("residence"),
        region: info.take("region"),
        email: info.take("email"),
        website: info.take("website"),
        photo,
        memberships,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/member.html").unwrap()
    }

    #[test]
    fn member_page() {
        let html = Html::parse_document(&fixture());
        let m = parse_member("1102", &html).unwrap();
        assert_eq!(m.given_name, "Ján");
        assert_eq!(m.surname, "Novák Kováčik");
        assert_eq!(m.titles, "Ing. Mgr. art., PhD.");
        assert_eq!(m.candidacy, "SMER - sociálna demokracia");
        assert_eq!(m.email, "jan_novak@nrsr.sk");
        assert_eq!(m.region, "Bratislavský");
        assert_eq!(m.photo.as_deref(), Some("/web/Dynamic/PoslanecPhoto.aspx?PoslanecID=1102"));
        assert_eq!(m.memberships.len(), 2);
        assert_eq!(m.memberships[0], "Výbor NR SR pre financie a rozpočet, člen");
        assert_eq!(m.title_count(), 3);
    }

    #[test]
    fn email_without_link_drops_member() {
        let raw = fixture().replace(
            r#"<a href="mailto:jan_novak@nrsr.sk">jan_novak@nrsr.sk</a>"#,
            "jan_novak@nrsr.sk",
        );
        let html = Html::parse_document(&raw);
        assert!(parse_member("1102", &html).is_none());
    }

    #[test]
    fn missing_membership_panel_is_empty_list() {
        let raw = fixture().replace(r#"class="box""#, r#"class="other""#);
        let html = Html::parse_document(&raw);
        let m = parse_member("1102", &html).unwrap();
        assert!(m.memberships.is_empty());
    }

    #[test]
    fn missing_photo_is_none() {
        let raw = fixture().replace("mp_foto", "no_photo");
        let m = parse_member("1102", &Html::parse_document(&raw)).unwrap();
        assert!(m.photo.is_none());
    }
}
