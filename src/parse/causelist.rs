//! Cause-list document parser: result tables scanned top to bottom into
//! named sections of case rows.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::formats::{CauseListCase, CauseListDocument, RawFragments, Section};

use super::{doc_tables, element_text, rows, text_with_breaks};

static DISP_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table#dispTable").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

static VERSUS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bversus\b").unwrap());

/// Inline style the portal puts on section title rows.
const HEADER_STYLE_MARKER: &str = "color:#3880d4";

/// Header texts that are visual spacers, not sections.
const FILLER_HEADERS: [&str; 2] = ["-", "hr"];

/// Parse a cause-list document.
///
/// A row with a single cell (or the portal's header style) starts a new
/// section; a row with four or more cells and a numeric first cell is a
/// case; everything else is ignored. Sections that end up with no cases are
/// dropped from the output.
pub fn parse(html: &str) -> CauseListDocument {
    let doc = Html::parse_document(html);
    let mut tables: Vec<ElementRef<'_>> = doc.select(&DISP_TABLE).collect();
    if tables.is_empty() {
        tables = doc_tables(&doc).collect();
    }

    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for table in tables {
        for row in rows(table) {
            let row_cells: Vec<ElementRef<'_>> = row.select(&TD).collect();
            if row_cells.is_empty() {
                continue;
            }

            let first_text = element_text(row_cells[0]);
            if row_cells.len() == 1 || row.html().contains(HEADER_STYLE_MARKER) {
                if first_text.is_empty()
                    || FILLER_HEADERS.contains(&first_text.to_lowercase().as_str())
                {
                    continue;
                }
                flush(&mut sections, current.take());
                current = Some(Section {
                    name: first_text,
                    cases: Vec::new(),
                });
                continue;
            }

            if row_cells.len() >= 4 && is_numeric(&first_text) {
                if let Some(section) = current.as_mut() {
                    section.cases.push(parse_case_row(&row_cells));
                }
            }
        }
    }

    flush(&mut sections, current.take());
    CauseListDocument { sections }
}

fn flush(sections: &mut Vec<Section>, pending: Option<Section>) {
    if let Some(section) = pending
        && !section.cases.is_empty()
    {
        sections.push(section);
    }
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

fn parse_case_row(cells: &[ElementRef<'_>]) -> CauseListCase {
    let serial = element_text(cells[0]);
    let case_number = element_text(cells[1]).replace("View", "").trim().to_owned();

    let party_raw = text_with_breaks(cells[2]);
    let advocate_raw = text_with_breaks(cells[3]);

    let (party_for, party_against) = split_parties(&party_raw);
    let advocates = advocate_raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();

    CauseListCase {
        serial,
        case_number,
        party_for,
        party_against,
        advocates,
        raw_fragments: RawFragments {
            party: party_raw.trim().to_owned(),
            advocates: advocate_raw.trim().to_owned(),
        },
    }
}

fn split_parties(raw: &str) -> (String, String) {
    let mut parts = VERSUS_RE.splitn(raw, 2);
    let party_for = normalize(parts.next().unwrap_or(""));
    match parts.next() {
        Some(rest) => (party_for, normalize(rest)),
        None => (party_for, String::new()),
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
