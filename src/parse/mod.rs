//! Narrow DOM query primitives shared by the document parsers.
//!
//! The portal's markup is not stable; every heuristic lookup (label text to
//! adjacent cell, select option lists, captcha image, anti-forgery token)
//! lives here so a markup change means revising one primitive, not every
//! field extractor.

pub mod causelist;
pub mod detail;

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::formats::SelectOption;

static TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());
static SELECT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("select").unwrap());
static OPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());
static ANY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("*").unwrap());
static TOKEN_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"input[name="app_token"]"#).unwrap());

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"app_token['"]?\s*[:=]\s*['"]([0-9a-fA-F]+)['"]"#).unwrap()
});
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)(?:st|nd|rd|th)\b").unwrap());

/// Element text with all whitespace runs collapsed to single spaces.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Element text with `<br>` rendered as a newline, for cells where line
/// breaks carry meaning (party names, advocate lists).
pub fn text_with_breaks(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    out
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) if element.name() == "br" => out.push('\n'),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn own_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in el.children() {
        if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
    out
}

pub(crate) fn rows<'a>(el: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    el.select(&TR).collect()
}

pub(crate) fn cells<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.select(&CELL).collect()
}

pub(crate) fn doc_tables<'a>(doc: &'a Html) -> impl Iterator<Item = ElementRef<'a>> {
    doc.select(&TABLE)
}

/// Find the value cell adjacent to a label cell, case-insensitively.
///
/// Scans table rows for a cell whose text contains the label and returns the
/// next cell's text; falls back to the next sibling element of whatever node
/// carries the label text. `None` when the label is absent — never an error.
pub fn find_labeled_value(doc: &Html, label: &str) -> Option<String> {
    let needle = label.to_lowercase();

    for row in doc.select(&TR) {
        let row_cells = cells(row);
        for (i, cell) in row_cells.iter().enumerate() {
            if element_text(*cell).to_lowercase().contains(&needle) {
                if let Some(next) = row_cells.get(i + 1) {
                    let value = element_text(*next);
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
    }

    for el in doc.select(&ANY) {
        if !own_text(el).to_lowercase().contains(&needle) {
            continue;
        }
        for sibling in el.next_siblings() {
            let Some(sibling_el) = ElementRef::wrap(sibling) else {
                continue;
            };
            let value = element_text(sibling_el);
            if !value.is_empty() {
                return Some(value);
            }
            break;
        }
    }

    None
}

/// Parse the options of the first `<select>` matching one of the candidate
/// names or ids. Placeholder entries (empty, "0", "Select", "null" values)
/// are dropped.
pub fn parse_select_options(doc: &Html, names: &[&str]) -> Vec<SelectOption> {
    for &name in names {
        for select_el in doc.select(&SELECT) {
            let element = select_el.value();
            if element.attr("name") != Some(name) && element.attr("id") != Some(name) {
                continue;
            }
            let options: Vec<SelectOption> = select_el
                .select(&OPTION)
                .filter_map(|o| {
                    let code = o.value().attr("value").unwrap_or("").trim().to_owned();
                    if code.is_empty()
                        || matches!(code.to_lowercase().as_str(), "0" | "select" | "null")
                    {
                        return None;
                    }
                    Some(SelectOption {
                        code,
                        label: element_text(o),
                    })
                })
                .collect();
            if !options.is_empty() {
                return options;
            }
        }
    }
    Vec::new()
}

/// First anchor pointing at a `.pdf` resource, raw href as written.
pub fn pdf_anchor(doc: &Html) -> Option<String> {
    doc.select(&ANCHOR).find_map(|a| {
        let href = a.value().attr("href")?;
        href.to_lowercase()
            .ends_with(".pdf")
            .then(|| href.to_owned())
    })
}

pub fn has_table(doc: &Html) -> bool {
    doc.select(&TABLE).next().is_some()
}

/// Anti-forgery token: hidden `app_token` input, with a fallback regex for
/// the token assigned in inline script.
pub fn extract_app_token(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    if let Some(input) = doc.select(&TOKEN_INPUT).next()
        && let Some(value) = input.value().attr("value")
        && !value.trim().is_empty()
    {
        return Some(value.trim().to_owned());
    }
    TOKEN_RE.captures(html).map(|c| c[1].to_owned())
}

/// The captcha `<img>` is recognized by the portal's `securimage_show`
/// endpoint in its src.
pub fn captcha_image_src(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&IMG).find_map(|img| {
        let src = img.value().attr("src")?;
        src.contains("securimage_show").then(|| src.to_owned())
    })
}

/// Day-first date parse across the formats the portal has been seen to use,
/// after stripping ordinal suffixes ("21st" -> "21").
pub fn parse_day_first_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = ORDINAL_RE.replace_all(raw.trim(), "$1");
    let cleaned = cleaned.trim();
    const FORMATS: [&str; 7] = [
        "%d-%m-%Y",
        "%d/%m/%Y",
        "%d.%m.%Y",
        "%d %B %Y",
        "%d %b %Y",
        "%Y-%m-%d",
        "%d-%m-%y",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cleaned, format).ok())
}
