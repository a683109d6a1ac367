//! CNR case-status flow: captcha-gated search POST, detail-page parse,
//! JSON record plus text report, best-effort order PDF download.

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Local;

use crate::attempt::{self, AttemptOutcome, PayloadTemplate, ResultArtifact};
use crate::cli::CaseArgs;
use crate::config::EngineConfig;
use crate::parse::detail;
use crate::portal::{CaptchaPrompt, FixedCaptcha, HttpPortal, StdinPrompt};
use crate::{report, store};

pub fn run(args: CaseArgs) -> anyhow::Result<()> {
    let config = EngineConfig::load(args.config.as_deref()).context("load config")?;
    let out_dir = PathBuf::from(&args.out);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    let mut portal = HttpPortal::new(&config, config.search_url()?, &out_dir)
        .context("build portal session")?;
    let prompt: Box<dyn CaptchaPrompt> = match &args.captcha {
        Some(value) => Box::new(FixedCaptcha(value.clone())),
        None => Box::new(StdinPrompt),
    };

    let template = PayloadTemplate::new("fcaptcha_code")
        .field("cino", &args.cnr)
        .field("ajax_req", "true");

    match attempt::run(&mut portal, prompt.as_ref(), &template, &config) {
        AttemptOutcome::Success(ResultArtifact::Html(html)) => {
            let mut record = detail::parse(&html, Local::now().date_naive());
            if let Some(href) = record.pdf_url.clone() {
                record.pdf_path = fetch_order_pdf(&config, &href, &out_dir, &args.cnr);
            }

            let json_path = out_dir.join(format!("{}.json", args.cnr));
            store::save_json(&record, &json_path)?;
            report::write_case_report(&record, &out_dir.join(format!("{}.txt", args.cnr)))?;

            println!("{}", report::case_summary(&record));
            Ok(())
        }
        AttemptOutcome::Success(ResultArtifact::Pdf(url)) => {
            let dest = out_dir.join(format!("{}.pdf", args.cnr));
            store::download_file(&url, &dest)
                .with_context(|| format!("download case pdf: {url}"))?;
            println!("Saved PDF to {}", dest.display());
            Ok(())
        }
        AttemptOutcome::Blocked { banner } => {
            anyhow::bail!("portal rejected the query: {banner}")
        }
        AttemptOutcome::Transient { error } => {
            anyhow::bail!("query failed after retries: {error}")
        }
        AttemptOutcome::Unparseable { raw } => {
            anyhow::bail!("unrecognized portal response: {raw}")
        }
    }
}

/// A missing order PDF never fails the query; the record just carries no
/// local path.
fn fetch_order_pdf(
    config: &EngineConfig,
    href: &str,
    out_dir: &std::path::Path,
    cnr: &str,
) -> Option<String> {
    let url = match config.base().and_then(|base| {
        base.join(href)
            .map_err(|err| anyhow::anyhow!("resolve pdf url: {err}"))
    }) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_owned(),
    };

    let name = url.rsplit('/').next().unwrap_or("order.pdf");
    let dest = out_dir.join(format!("{cnr}_{name}"));
    match store::download_file(&url, &dest) {
        Ok(()) => Some(dest.display().to_string()),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), url = %url, "order pdf download failed");
            None
        }
    }
}
