//! Field extraction from raw event-page HTML.
//!
//! Every pattern here is carried over field-for-field from the upstream
//! scraping service's regex table rather than reinvented: same exclusion
//! list, same discipline code table, same "first non-empty match wins"
//! ordering.

use equiwatch_core::EventStatus;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::snapshot::Snapshot;

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)([A-ZÀ-Ÿ][^<\n]{10,80}?)\s*Organis[ée]\s+par").unwrap(),
        Regex::new(r"(?i)>([^<]*(?:Championnat|Grand Prix|Derby|Challenge)[^<]{5,50})<").unwrap(),
        Regex::new(r"(?i)Intitul[ée][^:]*:\s*([^<\n]+)").unwrap(),
    ]
});

static NAME_EXCLUSIONS: &[&str] = &["ffe compet", "ffecompet", "fiche concours"];

static VENUE_FROM_TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)<title>[^-]+-\s*([A-ZÀ-Ÿ][A-Za-zÀ-ÿ\s\-']+?)(?:\s*-|\s*<|\s*$)").unwrap(),
        Regex::new(r"(?i)Fiche Concours[^-]+-\s*([A-ZÀ-Ÿ][A-Za-zÀ-ÿ\s\-']+)").unwrap(),
    ]
});

static ADDRESS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(\d{5}\s+[A-ZÀ-Ÿ][A-Za-zÀ-ÿ\s\-']+)").unwrap(),
        Regex::new(r#"(?i)<span[^>]*class="[^"]*adresse[^"]*"[^>]*>([^<]+)</span>"#).unwrap(),
    ]
});

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap());

static ORGANISATEUR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)Organisateur[^:]*:\s*([^<\n]+)").unwrap(),
        Regex::new(r"(?i)>([A-ZÀ-Ÿ][A-Za-zÀ-ÿ\s\-']+)\s*\(\d+\)").unwrap(),
    ]
});

static DISCIPLINE_LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Discipline[^:]*:\s*([^<\n]+)").unwrap());

static DISCIPLINE_CODES: &[(&str, &str)] = &[
    ("AT", "Attelage"),
    ("CSO", "CSO"),
    ("CCE", "CCE"),
    ("DR", "Dressage"),
    ("HU", "Hunter"),
    ("EN", "Endurance"),
    ("WE", "Western"),
    ("VO", "Voltige"),
    ("EQ", "Équitation"),
    ("PO", "Pony Games"),
];

static DISCIPLINE_NAMES: &[&str] =
    &["Attelage", "Dressage", "Hunter", "Endurance", "Western", "Voltige"];

static OPEN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)[Oo]uvert(?:e)?(?:s)?\s+aux\s+engagements").unwrap(),
        Regex::new(r"(?i)[Ee]ngagements?\s+ouverts?").unwrap(),
        Regex::new(r"(?i)[Ii]nscriptions?\s+ouvertes?").unwrap(),
    ]
});

static DEMANDE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)demande\s+de\s+participation").unwrap());

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn extract_name(html: &str) -> Option<String> {
    for pattern in NAME_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            let Some(m) = caps.get(1) else { continue };
            let mut name = collapse_whitespace(m.as_str());
            name = name.replace("&amp;", "&").replace("&#39;", "'");
            if name.len() > 10 {
                let lower = name.to_lowercase();
                if !NAME_EXCLUSIONS.iter().any(|excl| lower.contains(excl)) {
                    return Some(name);
                }
            }
        }
    }
    None
}

fn extract_venue(html: &str) -> Option<String> {
    for pattern in VENUE_FROM_TITLE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(html) {
            if let Some(m) = caps.get(1) {
                let venue = collapse_whitespace(m.as_str());
                if venue.len() > 3 {
                    return Some(venue);
                }
            }
        }
    }
    for pattern in ADDRESS_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(html) {
            if let Some(m) = caps.get(1) {
                let venue = collapse_whitespace(m.as_str());
                if venue.len() > 5 {
                    return Some(venue);
                }
            }
        }
    }
    None
}

/// `DD/MM/YYYY -> YYYY-MM-DD`. Invalid shapes yield `None`.
fn normalize_date(raw: &str) -> Option<String> {
    if raw.len() == 10 && raw.as_bytes().get(4) == Some(&b'-') {
        return Some(raw.to_string());
    }
    let parts: Vec<&str> = raw.split('/').collect();
    let [day, month, year] = parts[..] else {
        return None;
    };
    if day.len() > 2 || month.len() != 2 || year.len() != 4 {
        return None;
    }
    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some(format!("{year}-{month:02}-{day:02}"))
}

fn extract_dates(html: &str) -> (Option<String>, Option<String>) {
    let all: Vec<&str> = DATE_PATTERN.find_iter(html).map(|m| m.as_str()).collect();
    match all.len() {
        0 => (None, None),
        1 => {
            let d = normalize_date(all[0]);
            (d.clone(), d)
        }
        _ => (normalize_date(all[0]), normalize_date(all[1])),
    }
}

fn extract_first_match(patterns: &[Regex], html: &str) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(html) {
            if let Some(m) = caps.get(1) {
                let value = collapse_whitespace(m.as_str());
                if value.len() > 2 {
                    return Some(value);
                }
            }
        }
    }
    None
}

fn extract_discipline(html: &str) -> Option<String> {
    for (code, name) in DISCIPLINE_CODES {
        let pattern = Regex::new(&format!(r"(?i)\b{code}\s+(?:Amateur|Club|Pro|Poney)")).ok()?;
        if pattern.is_match(html) {
            return Some((*name).to_string());
        }
    }
    let lower = html.to_lowercase();
    for name in DISCIPLINE_NAMES {
        if lower.contains(&name.to_lowercase()) {
            return Some((*name).to_string());
        }
    }
    None
}

fn check_is_open(html: &str) -> bool {
    OPEN_PATTERNS.iter().any(|p| p.is_match(html))
}

/// Derives the canonical status from openness alone: `engagement`, unless
/// the page evidences a "demande de participation" variant, in which case
/// `demande`; closed pages are reported `previsional` (spec §4.2).
fn derive_status(html: &str, is_open: bool) -> EventStatus {
    if !is_open {
        return EventStatus::Previsional;
    }
    if DEMANDE_PATTERN.is_match(html) {
        EventStatus::Demande
    } else {
        EventStatus::Engagement
    }
}

/// Extracts every field from a page's raw HTML, following the upstream
/// "first non-empty match wins" policy per field, with the discipline +
/// location fallback for a missing name (spec §4.2).
pub fn extract(html: &str) -> Snapshot {
    let name = extract_name(html);
    let venue = extract_venue(html);
    let (start_date, end_date) = extract_dates(html);
    let organisateur = extract_first_match(&ORGANISATEUR_PATTERNS, html);
    let discipline = extract_discipline(html).or_else(|| {
        DISCIPLINE_LABEL_PATTERN
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| collapse_whitespace(m.as_str()))
    });

    let name = name.or_else(|| {
        let mut parts = Vec::new();
        if let Some(d) = &discipline {
            parts.push(d.clone());
        }
        if let Some(v) = &venue {
            parts.push(v.clone());
        }
        (!parts.is_empty()).then(|| parts.join(" - "))
    });

    let is_open = check_is_open(html);
    let status = derive_status(html, is_open);

    Snapshot {
        name,
        venue,
        organisateur,
        start_date,
        end_date,
        discipline,
        status,
        is_open,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_slash_date() {
        assert_eq!(normalize_date("05/06/2026"), Some("2026-06-05".to_string()));
    }

    #[test]
    fn rejects_malformed_date() {
        assert_eq!(normalize_date("not-a-date"), None);
    }

    #[test]
    fn extracts_name_and_rejects_boilerplate_title() {
        let html = "<title>FFE Compet - Fiche Concours</title>Grand Prix de Paris Organisé par Club Hippique";
        let snapshot = extract(html);
        assert_eq!(snapshot.name.as_deref(), Some("Grand Prix de Paris"));
    }

    #[test]
    fn detects_open_for_engagement() {
        let html = "<p>Ouvert aux engagements jusqu'au 01/01/2026</p>";
        assert!(check_is_open(html));
    }

    #[test]
    fn detects_two_dates_as_start_and_end() {
        let html = "Du 05/06/2026 au 07/06/2026";
        let (start, end) = extract_dates(html);
        assert_eq!(start.as_deref(), Some("2026-06-05"));
        assert_eq!(end.as_deref(), Some("2026-06-07"));
    }

    #[test]
    fn maps_discipline_code_to_full_name() {
        let html = "<span>CSO Amateur</span>";
        assert_eq!(extract_discipline(html).as_deref(), Some("CSO"));
    }

    #[test]
    fn empty_html_yields_empty_snapshot() {
        let snapshot = extract("");
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn open_page_derives_engagement_status() {
        let html = "<p>Ouvert aux engagements</p>";
        assert_eq!(extract(html).status, EventStatus::Engagement);
    }

    #[test]
    fn open_page_with_demande_wording_derives_demande_status() {
        let html = "<p>Ouvert aux engagements - demande de participation</p>";
        assert_eq!(extract(html).status, EventStatus::Demande);
    }

    #[test]
    fn closed_page_derives_previsional_status() {
        assert_eq!(extract("<p>rien</p>").status, EventStatus::Previsional);
    }
}
