use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One entry of a portal `<select>` list. `code` is the machine value the
/// form posts; `label` is the visible text the operator types against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub code: String,
    pub label: String,
}

/// Where the hearing date of a case falls relative to the query day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListedWhen {
    Today,
    Tomorrow,
    Other,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub judge: String,
    pub business_on_date: String,
    pub hearing_date: String,
    #[serde(default)]
    pub purpose: String,
}

/// Normalized single-case record produced from the case-status detail page.
///
/// Every field the portal might omit is optional; a missing label degrades
/// to `None` rather than failing the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_hearing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hearing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_stage: Option<String>,
    /// Raw court string as printed, e.g. "1-CIVIL JUDGE J.D. AND J.M.F.C. PMC PUNE".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court_name_clean: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_and_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hearing_date_parsed: Option<NaiveDate>,
    pub listed: bool,
    pub listed_when: ListedWhen,
    pub case_history: Vec<HistoryEntry>,
    pub interim_orders: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
}

/// Untouched cell markup kept alongside the derived fields so a bad split
/// can be diagnosed from the saved record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFragments {
    pub party: String,
    pub advocates: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseListCase {
    pub serial: String,
    pub case_number: String,
    pub party_for: String,
    pub party_against: String,
    pub advocates: Vec<String>,
    pub raw_fragments: RawFragments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub cases: Vec<CauseListCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseListDocument {
    pub sections: Vec<Section>,
}

/// One line of the per-court download index: what (if anything) was saved
/// for each side of the cause list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedListing {
    pub court: String,
    pub side: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<String>,
}
