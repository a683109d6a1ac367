//! Human-readable case report, written next to the JSON record.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::formats::CaseRecord;

pub fn case_summary(record: &CaseRecord) -> String {
    let mut out = String::new();
    let dash = "-";

    let line = |out: &mut String, label: &str, value: Option<&str>| {
        let _ = writeln!(out, "{label:<18}: {}", value.unwrap_or(dash));
    };

    let _ = writeln!(out, "Case Summary");
    let _ = writeln!(out, "{}", "-".repeat(48));
    line(&mut out, "CNR Number", record.cnr.as_deref());
    line(
        &mut out,
        "Court Name",
        record
            .court_name_clean
            .as_deref()
            .or(record.court_name.as_deref()),
    );
    line(&mut out, "Serial Number", record.serial_number.as_deref());
    line(&mut out, "Judge & Address", record.judge_and_address.as_deref());
    line(&mut out, "Next Hearing", record.next_hearing_date.as_deref());
    line(&mut out, "Case Stage", record.case_stage.as_deref());
    let listed_when = format!("{:?}", record.listed_when).to_lowercase();
    line(&mut out, "Listed When", Some(&listed_when));
    let _ = writeln!(out, "{}", "-".repeat(48));

    match record.pdf_path.as_deref() {
        Some(path) => {
            let _ = writeln!(out, "PDF downloaded at: {path}");
        }
        None => {
            let _ = writeln!(out, "No PDF available for this case.");
        }
    }

    out
}

pub fn write_case_report(record: &CaseRecord, path: &Path) -> anyhow::Result<()> {
    let mut out = String::new();
    out.push_str("eCourts Case Report\n");
    out.push_str(&"=".repeat(48));
    out.push('\n');
    out.push_str(&case_summary(record));

    if record.case_history.is_empty() {
        out.push_str("\nNo case history available.\n");
    } else {
        out.push_str("\nCASE HISTORY\n");
        out.push_str(&"-".repeat(48));
        out.push('\n');
        let _ = writeln!(
            out,
            "{:<40} {:<15} {:<15} {:<20}",
            "Judge", "Business Date", "Hearing Date", "Purpose"
        );
        for entry in &record.case_history {
            let _ = writeln!(
                out,
                "{:<40} {:<15} {:<15} {:<20}",
                clip(&entry.judge, 38),
                clip(&entry.business_on_date, 15),
                clip(&entry.hearing_date, 15),
                clip(&entry.purpose, 20),
            );
        }
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create report dir: {}", parent.display()))?;
    }
    std::fs::write(path, out).with_context(|| format!("write report: {}", path.display()))?;
    tracing::info!(path = %path.display(), "text report generated");
    Ok(())
}

fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
