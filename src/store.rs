//! Persistence for parsed records and fetched documents. Formats and
//! locations are decided by the callers; this module only writes what it is
//! handed.

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn save_json<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value).context("serialize record")?;
    std::fs::write(path, json).with_context(|| format!("write json: {}", path.display()))?;
    tracing::info!(path = %path.display(), "saved json");
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read json: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse json: {}", path.display()))
}

pub fn write_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, contents).with_context(|| format!("write file: {}", path.display()))?;
    Ok(())
}

/// Best-effort PDF download outside the portal session; callers treat a
/// failure as a missing artifact, not a failed query.
pub fn download_file(url: &str, dest: &Path) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("build download client")?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;
    let bytes = response.bytes().context("read download body")?;

    ensure_parent(dest)?;
    std::fs::write(dest, &bytes).with_context(|| format!("write file: {}", dest.display()))?;
    tracing::info!(path = %dest.display(), bytes = bytes.len(), "downloaded file");
    Ok(())
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::formats::{
        CaseRecord, CauseListCase, CauseListDocument, HistoryEntry, ListedWhen, RawFragments,
        Section,
    };

    fn sample_case() -> CaseRecord {
        CaseRecord {
            cnr: Some("MHPU050000272025".to_owned()),
            case_type: Some("Civil Suit".to_owned()),
            filing_date: Some("03-01-2025".to_owned()),
            registration_number: None,
            first_hearing_date: Some("10-01-2025".to_owned()),
            next_hearing_date: Some("15-02-2025".to_owned()),
            case_stage: Some("Evidence".to_owned()),
            court_name: Some("1-CIVIL JUDGE J.D. AND J.M.F.C. PMC PUNE".to_owned()),
            serial_number: Some("1".to_owned()),
            court_name_clean: Some("Civil".to_owned()),
            judge_and_address: Some("JUDGE J.D. AND J.M.F.C. PMC PUNE".to_owned()),
            next_hearing_date_parsed: NaiveDate::from_ymd_opt(2025, 2, 15),
            listed: true,
            listed_when: ListedWhen::Other,
            case_history: vec![HistoryEntry {
                judge: "Shri A B".to_owned(),
                business_on_date: "01-02-2025".to_owned(),
                hearing_date: "15-02-2025".to_owned(),
                purpose: "Evidence".to_owned(),
            }],
            interim_orders: vec![vec!["1".to_owned(), "Order on Exhibit 5".to_owned()]],
            pdf_url: Some("orders/order1.pdf".to_owned()),
            pdf_path: None,
        }
    }

    #[test]
    fn case_record_round_trips_through_json() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("case.json");
        let record = sample_case();

        save_json(&record, &path)?;
        let loaded: CaseRecord = load_json(&path)?;
        assert_eq!(loaded, record);
        Ok(())
    }

    #[test]
    fn cause_list_round_trips_through_json() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("nested").join("causelist.json");
        let document = CauseListDocument {
            sections: vec![Section {
                name: "Civil Cases".to_owned(),
                cases: vec![CauseListCase {
                    serial: "1".to_owned(),
                    case_number: "RCS/12/2024".to_owned(),
                    party_for: "Ramesh".to_owned(),
                    party_against: "Suresh".to_owned(),
                    advocates: vec!["A. Advocate".to_owned()],
                    raw_fragments: RawFragments {
                        party: "Ramesh versus Suresh".to_owned(),
                        advocates: "A. Advocate".to_owned(),
                    },
                }],
            }],
        };

        save_json(&document, &path)?;
        let loaded: CauseListDocument = load_json(&path)?;
        assert_eq!(loaded, document);
        Ok(())
    }
}
