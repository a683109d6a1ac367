//! Response classification for captcha-gated submissions.
//!
//! The portal answers one POST with any of: JSON carrying a PDF link, JSON
//! carrying escaped HTML, plain HTML with a PDF anchor, plain HTML result
//! tables, or an error banner. The check order below is a contract: the
//! JSON PDF key is checked before banner detection because a successful JSON
//! response can contain banner-like text in unrelated fields.

use scraper::Html;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::parse;

/// JSON keys the portal has been seen to put a PDF link under.
const PDF_KEYS: [&str; 4] = ["pdfUrl", "pdf_url", "cause_list_pdf", "pdf"];

/// Preferred JSON keys for an embedded HTML payload, in order.
const HTML_KEYS: [&str; 4] = ["raw_html_snippet", "html", "data", "result"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A PDF resource, absolute URL.
    Pdf(String),
    /// An HTML document containing result tables, unwrapped from JSON if
    /// the portal sent it that way.
    Html(String),
    /// A recognized blocking banner; carries the matched marker.
    Blocked(String),
    Unparseable,
}

pub fn classify(body: &str, content_type: Option<&str>, config: &EngineConfig) -> Classification {
    let json_like = content_type.is_some_and(|c| c.to_lowercase().contains("application/json"))
        || body.trim_start().starts_with('{');

    let mut html_body = body.to_owned();
    if json_like && let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(url) = pdf_link(&value) {
            return Classification::Pdf(absolutize(url, config));
        }
        if let Some(embedded) = embedded_html(&value) {
            html_body = embedded.to_owned();
        }
    }

    let lowered = html_body.to_lowercase();
    if let Some(marker) = config
        .banner_markers
        .iter()
        .find(|marker| lowered.contains(&marker.to_lowercase()))
    {
        return Classification::Blocked(marker.clone());
    }

    let doc = Html::parse_document(&html_body);
    if let Some(href) = parse::pdf_anchor(&doc) {
        return Classification::Pdf(absolutize(&href, config));
    }
    if parse::has_table(&doc) {
        return Classification::Html(html_body);
    }

    Classification::Unparseable
}

fn pdf_link(value: &Value) -> Option<&str> {
    PDF_KEYS
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|url| !url.trim().is_empty())
}

fn embedded_html(value: &Value) -> Option<&str> {
    for key in HTML_KEYS {
        if let Some(text) = value.get(key).and_then(Value::as_str)
            && !text.trim().is_empty()
        {
            return Some(text);
        }
    }
    value.as_object()?.values().find_map(|v| {
        v.as_str()
            .filter(|s| s.contains("<table") || s.contains("<div") || s.contains("<h3"))
    })
}

fn absolutize(href: &str, config: &EngineConfig) -> String {
    match config.base().and_then(|base| {
        base.join(href)
            .map_err(|err| anyhow::anyhow!("join pdf url: {err}"))
    }) {
        Ok(url) => url.to_string(),
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), href, "could not absolutize pdf url");
            href.to_owned()
        }
    }
}
