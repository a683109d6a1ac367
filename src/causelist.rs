//! Cause-list flow: resolve the select cascade, then run one captcha-gated
//! submission per list side and persist whatever comes back.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{Local, NaiveDate};

use crate::attempt::{self, AttemptOutcome, PayloadTemplate, ResultArtifact};
use crate::cascade::{CascadeState, Level};
use crate::cli::{CauselistArgs, ParseArgs, Side};
use crate::config::EngineConfig;
use crate::formats::{SavedListing, SelectOption};
use crate::parse;
use crate::portal::{CaptchaPrompt, FixedCaptcha, HttpPortal, StdinPrompt};
use crate::store;

pub fn run(args: CauselistArgs) -> anyhow::Result<()> {
    let config = EngineConfig::load(args.config.as_deref()).context("load config")?;
    let out_dir = PathBuf::from(&args.out);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    let list_date = match args.date.as_deref() {
        Some(raw) => parse::parse_day_first_date(raw)
            .ok_or_else(|| anyhow::anyhow!("could not parse cause-list date: {raw}"))?,
        None => Local::now().date_naive(),
    };

    let mut portal = HttpPortal::new(&config, config.causelist_submit_url()?, &out_dir)
        .context("build portal session")?;

    let mut cascade = CascadeState::new();
    cascade.commit(&mut portal, Level::State, &args.state)?;
    cascade.commit(&mut portal, Level::District, &args.district)?;
    cascade.commit(&mut portal, Level::Complex, &args.complex)?;
    let court = cascade.commit(&mut portal, Level::Court, &args.court)?;

    let committed: Vec<(String, String)> = Level::ALL
        .iter()
        .filter_map(|level| {
            cascade
                .selection(*level)
                .map(|s| (level.field_name().to_owned(), s.code.clone()))
        })
        .collect();

    let prompt: Box<dyn CaptchaPrompt> = match &args.captcha {
        Some(value) => Box::new(FixedCaptcha(value.clone())),
        None => Box::new(StdinPrompt),
    };

    let mut index = Vec::new();
    for &side in form_sides(args.side) {
        let saved = fetch_side(
            &config,
            &mut portal,
            prompt.as_ref(),
            &committed,
            &court,
            list_date,
            side,
            &out_dir,
        );
        index.push(SavedListing {
            court: court.label.clone(),
            side: side.to_owned(),
            saved,
        });
    }

    let index_path = out_dir.join(format!(
        "causelist_index_{}_{}.json",
        sanitize(&court.code),
        list_date.format("%Y-%m-%d"),
    ));
    store::save_json(&index, &index_path)?;
    println!("Index saved to {}", index_path.display());
    Ok(())
}

pub fn parse_file(args: ParseArgs) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(&args.input)
        .with_context(|| format!("read cause-list html: {}", args.input))?;
    let document = parse::causelist::parse(&html);
    store::save_json(&document, Path::new(&args.out))?;
    tracing::info!(
        sections = document.sections.len(),
        out = %args.out,
        "parsed cause list"
    );
    Ok(())
}

fn form_sides(side: Side) -> &'static [&'static str] {
    match side {
        Side::Both => &["civ", "cri"],
        Side::Civil => &["civ"],
        Side::Criminal => &["cri"],
    }
}

#[allow(clippy::too_many_arguments)]
fn fetch_side(
    config: &EngineConfig,
    portal: &mut HttpPortal,
    prompt: &dyn CaptchaPrompt,
    committed: &[(String, String)],
    court: &SelectOption,
    list_date: NaiveDate,
    side: &str,
    out_dir: &Path,
) -> Option<String> {
    let mut template = PayloadTemplate::new("cause_list_captcha_code");
    for (field, code) in committed {
        template = template.field(field, code);
    }
    let template = template
        .field("court_name_txt", &court.label)
        .field("causelist_date", &list_date.format("%d-%m-%Y").to_string())
        .field("cicri", side)
        .field("est_code", "")
        .field("ajax_req", "true");

    let stem = format!(
        "causelist_{}_{side}_{}",
        sanitize(&court.code),
        list_date.format("%Y-%m-%d"),
    );

    match attempt::run(portal, prompt, &template, config) {
        AttemptOutcome::Success(ResultArtifact::Pdf(url)) => {
            let dest = out_dir.join(format!("{stem}.pdf"));
            match store::download_file(&url, &dest) {
                Ok(()) => Some(dest.display().to_string()),
                Err(err) => {
                    tracing::warn!(error = %format!("{err:#}"), url = %url, "cause-list pdf download failed");
                    None
                }
            }
        }
        AttemptOutcome::Success(ResultArtifact::Html(html)) => {
            let html_path = out_dir.join(format!("{stem}.html"));
            if let Err(err) = store::write_text(&html_path, &html) {
                tracing::warn!(error = %format!("{err:#}"), "could not save cause-list html");
                return None;
            }

            let document = parse::causelist::parse(&html);
            let json_path = out_dir.join(format!("{stem}.json"));
            if let Err(err) = store::save_json(&document, &json_path) {
                tracing::warn!(error = %format!("{err:#}"), "could not save parsed cause list");
            }
            Some(html_path.display().to_string())
        }
        AttemptOutcome::Blocked { banner } => {
            tracing::error!(side, banner = %banner, "portal blocked the cause-list request");
            None
        }
        AttemptOutcome::Transient { error } => {
            tracing::error!(side, error = %error, "cause-list request failed after retries");
            None
        }
        AttemptOutcome::Unparseable { raw } => {
            tracing::error!(side, raw = %raw, "unrecognized cause-list response");
            None
        }
    }
}

/// Court codes can carry characters like `^`; keep file names tame.
fn sanitize(code: &str) -> String {
    code.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
