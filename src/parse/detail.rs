//! Case-status detail page parser: a label/value table document plus the
//! case-history and interim-order tables.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::formats::{CaseRecord, HistoryEntry, ListedWhen};

use super::{cells, doc_tables, element_text, find_labeled_value, parse_day_first_date, rows};

static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

static SERIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*-\s*(.*)$").unwrap());
static JUDGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)judge").unwrap());

/// Parse a case-status detail document into a normalized record.
///
/// `today` anchors the today/tomorrow classification of the hearing date;
/// callers pass the current local date. Missing labels degrade to `None`,
/// never to an error: a partial record beats no record.
pub fn parse(html: &str, today: NaiveDate) -> CaseRecord {
    let doc = Html::parse_document(html);

    let cnr = find_labeled_value(&doc, "CNR Number").or_else(|| find_labeled_value(&doc, "CNR"));
    let court_name = find_labeled_value(&doc, "Court Number and Judge")
        .or_else(|| find_labeled_value(&doc, "Court"));
    let (serial_number, court_name_clean, judge_and_address) = match court_name.as_deref() {
        Some(raw) => split_court_name(raw),
        None => (None, None, None),
    };

    let first_hearing_date = find_labeled_value(&doc, "First Hearing Date");
    let next_hearing_date = find_labeled_value(&doc, "Next Hearing Date");
    let next_hearing_date_parsed = next_hearing_date
        .as_deref()
        .and_then(parse_day_first_date)
        .or_else(|| first_hearing_date.as_deref().and_then(parse_day_first_date));
    let listed = next_hearing_date_parsed.is_some();
    let listed_when = match next_hearing_date_parsed {
        Some(date) => classify_hearing_date(date, today),
        None => ListedWhen::None,
    };

    CaseRecord {
        cnr,
        case_type: find_labeled_value(&doc, "Case Type"),
        filing_date: find_labeled_value(&doc, "Filing Date"),
        registration_number: find_labeled_value(&doc, "Registration Number"),
        first_hearing_date,
        next_hearing_date,
        case_stage: find_labeled_value(&doc, "Case Stage"),
        court_name,
        serial_number,
        court_name_clean,
        judge_and_address,
        next_hearing_date_parsed,
        listed,
        listed_when,
        case_history: parse_history(&doc),
        interim_orders: parse_interim_orders(&doc),
        pdf_url: super::pdf_anchor(&doc),
        pdf_path: None,
    }
}

pub fn classify_hearing_date(date: NaiveDate, today: NaiveDate) -> ListedWhen {
    if date == today {
        ListedWhen::Today
    } else if today.succ_opt() == Some(date) {
        ListedWhen::Tomorrow
    } else {
        ListedWhen::Other
    }
}

/// Split the raw court string `"<digits>-<NAME> JUDGE <address>"` into its
/// serial number, title-cased court name, and the judge-and-address tail.
/// Without a "JUDGE" token the whole remainder is the court name.
fn split_court_name(raw: &str) -> (Option<String>, Option<String>, Option<String>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (None, None, None);
    }

    let (serial, remainder) = match SERIAL_RE.captures(raw) {
        Some(caps) => (
            Some(caps[1].to_owned()),
            caps.get(2).map_or("", |m| m.as_str()).to_owned(),
        ),
        None => (None, raw.to_owned()),
    };

    match JUDGE_RE.find(&remainder) {
        Some(m) => {
            let clean = title_case(remainder[..m.start()].trim());
            let judge = remainder[m.start()..].trim().to_owned();
            (serial, Some(clean), Some(judge))
        }
        None => (serial, Some(remainder.trim().to_owned()), None),
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_history(doc: &Html) -> Vec<HistoryEntry> {
    let Some(table) = doc_tables(doc).find(|t| {
        t.value()
            .attr("class")
            .is_some_and(|c| c.to_lowercase().contains("history"))
    }) else {
        return Vec::new();
    };

    rows(table)
        .into_iter()
        .filter_map(|row| {
            let columns: Vec<String> = cells(row).into_iter().map(element_text).collect();
            if columns.len() < 3 {
                return None;
            }
            Some(HistoryEntry {
                judge: columns[0].clone(),
                business_on_date: columns[1].clone(),
                hearing_date: columns[2].clone(),
                purpose: columns.get(3).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

fn parse_interim_orders(doc: &Html) -> Vec<Vec<String>> {
    let Some(heading) = doc
        .select(&HEADING)
        .find(|h| element_text(*h).to_lowercase().contains("interim orders"))
    else {
        return Vec::new();
    };

    let Some(table) = table_after(heading) else {
        return Vec::new();
    };

    rows(table)
        .into_iter()
        .filter_map(|row| {
            let columns: Vec<String> = row.select(&TD).map(element_text).collect();
            (!columns.is_empty()).then_some(columns)
        })
        .collect()
}

fn table_after<'a>(heading: ElementRef<'a>) -> Option<ElementRef<'a>> {
    for sibling in heading.next_siblings() {
        let Some(el) = ElementRef::wrap(sibling) else {
            continue;
        };
        if el.value().name() == "table" {
            return Some(el);
        }
        if let Some(nested) = el.select(&TABLE).next() {
            return Some(nested);
        }
    }
    None
}
