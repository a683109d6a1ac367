//! Dependent-select cascade: state, district, court complex, court.
//!
//! The dependency graph is a strict linear chain, so the state is an ordered
//! array of levels and invalidation is a truncation: committing a new code at
//! one level clears every selection and cached option list strictly below it.

use thiserror::Error;

use crate::formats::SelectOption;
use crate::portal::OptionSource;
use crate::resolve::{self, Resolution};

/// How many option labels an error carries for operator diagnosis.
const SAMPLE_LIMIT: usize = 30;

const LEVEL_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    State,
    District,
    Complex,
    Court,
}

impl Level {
    pub const ALL: [Level; LEVEL_COUNT] = [Level::State, Level::District, Level::Complex, Level::Court];

    pub fn name(self) -> &'static str {
        match self {
            Level::State => "state",
            Level::District => "district",
            Level::Complex => "court complex",
            Level::Court => "court",
        }
    }

    /// Form field the portal expects this level's code under.
    pub fn field_name(self) -> &'static str {
        match self {
            Level::State => "state_code",
            Level::District => "dist_code",
            Level::Complex => "court_complex_code",
            Level::Court => "CL_court_no",
        }
    }

    /// `<select>` names and ids this level has been observed under.
    fn select_names(self) -> &'static [&'static str] {
        match self {
            Level::State => &["sess_state_code", "state_code", "state", "ddl_state_code", "state_name"],
            Level::District => &["sess_dist_code", "dist_code", "district_code", "district", "ddl_dist_code"],
            Level::Complex => &["court_complex_code", "court_complex"],
            Level::Court => &["CL_court_no", "court_name", "court_name_txt"],
        }
    }

    fn index(self) -> usize {
        match self {
            Level::State => 0,
            Level::District => 1,
            Level::Complex => 2,
            Level::Court => 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("could not resolve {level} {input:?}; sample options: {}", .samples.join(", "))]
    Unresolved {
        level: &'static str,
        input: String,
        samples: Vec<String>,
    },
    #[error("{level} {input:?} is ambiguous; candidates: {}", .candidates.join(", "))]
    Ambiguous {
        level: &'static str,
        input: String,
        candidates: Vec<String>,
    },
    #[error("{missing} must be selected before {level}")]
    OutOfOrder {
        level: &'static str,
        missing: &'static str,
    },
    #[error("option list for {level} came back empty after refetch")]
    EmptyOptions { level: &'static str },
    #[error("fetch {level} options: {error:#}")]
    Fetch {
        level: &'static str,
        error: anyhow::Error,
    },
}

#[derive(Debug)]
struct FetchedList {
    upstream: Vec<(String, String)>,
    options: Vec<SelectOption>,
}

#[derive(Debug, Default)]
pub struct CascadeState {
    lists: [Option<FetchedList>; LEVEL_COUNT],
    selected: [Option<SelectOption>; LEVEL_COUNT],
    /// (level, upstream key) pairs that have yielded a non-empty list at
    /// least once. The site is assumed stateless for identical upstream
    /// codes, so an empty list for a remembered key is a transient anomaly.
    seen_nonempty: std::collections::HashSet<(usize, Vec<(String, String)>)>,
}

impl CascadeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self, level: Level) -> Option<&SelectOption> {
        self.selected[level.index()].as_ref()
    }

    /// Cached option list for a level, if one was fetched and not
    /// invalidated since.
    pub fn options(&self, level: Level) -> Option<&[SelectOption]> {
        self.lists[level.index()]
            .as_ref()
            .map(|list| list.options.as_slice())
    }

    /// Committed `(field, code)` pairs of all levels up to but excluding
    /// `level`, in chain order.
    fn upstream_key(&self, level: Level) -> Vec<(String, String)> {
        Level::ALL[..level.index()]
            .iter()
            .filter_map(|l| {
                self.selected[l.index()]
                    .as_ref()
                    .map(|s| (l.field_name().to_owned(), s.code.clone()))
            })
            .collect()
    }

    /// Resolve `input` at `level` and commit the selection.
    ///
    /// Fetches the level's option list through `source` when no cached list
    /// matches the current upstream codes. Committing a changed code clears
    /// every downstream selection and list; re-committing the same code
    /// leaves downstream state alone. On resolution failure the state is
    /// unchanged and the error carries a bounded label sample.
    pub fn commit(
        &mut self,
        source: &mut dyn OptionSource,
        level: Level,
        input: &str,
    ) -> Result<SelectOption, CascadeError> {
        let idx = level.index();
        for upstream in &Level::ALL[..idx] {
            if self.selected[upstream.index()].is_none() {
                return Err(CascadeError::OutOfOrder {
                    level: level.name(),
                    missing: upstream.name(),
                });
            }
        }

        let key = self.upstream_key(level);
        self.ensure_list(source, level, &key)?;
        let Some(list) = self.lists[idx].as_ref() else {
            return Err(CascadeError::EmptyOptions { level: level.name() });
        };
        let options = &list.options;

        let resolved = match resolve::resolve(options, input) {
            Resolution::Matched(option) => option.clone(),
            Resolution::Ambiguous(candidates) => {
                return Err(CascadeError::Ambiguous {
                    level: level.name(),
                    input: input.to_owned(),
                    candidates: sample_labels(&candidates),
                });
            }
            Resolution::NotFound => {
                let all: Vec<&SelectOption> = options.iter().collect();
                return Err(CascadeError::Unresolved {
                    level: level.name(),
                    input: input.to_owned(),
                    samples: sample_labels(&all),
                });
            }
        };

        let unchanged = self.selected[idx]
            .as_ref()
            .is_some_and(|current| current.code == resolved.code);
        self.selected[idx] = Some(resolved.clone());
        if !unchanged {
            self.truncate_below(level);
        }
        tracing::info!(level = level.name(), code = %resolved.code, label = %resolved.label, "selected");
        Ok(resolved)
    }

    fn ensure_list(
        &mut self,
        source: &mut dyn OptionSource,
        level: Level,
        key: &[(String, String)],
    ) -> Result<(), CascadeError> {
        let idx = level.index();
        if self.lists[idx]
            .as_ref()
            .is_some_and(|list| list.upstream == key)
        {
            return Ok(());
        }

        let mut options = self.fetch_options(source, level, key)?;
        if options.is_empty() && self.seen_nonempty.contains(&(idx, key.to_vec())) {
            tracing::warn!(
                level = level.name(),
                "option list came back empty for a previously non-empty key; refetching once"
            );
            options = self.fetch_options(source, level, key)?;
            if options.is_empty() {
                return Err(CascadeError::EmptyOptions { level: level.name() });
            }
        }

        if !options.is_empty() {
            self.seen_nonempty.insert((idx, key.to_vec()));
        }
        self.lists[idx] = Some(FetchedList {
            upstream: key.to_vec(),
            options,
        });
        Ok(())
    }

    fn fetch_options(
        &self,
        source: &mut dyn OptionSource,
        level: Level,
        key: &[(String, String)],
    ) -> Result<Vec<SelectOption>, CascadeError> {
        let html = source.options_page(key).map_err(|error| CascadeError::Fetch {
            level: level.name(),
            error,
        })?;
        let doc = scraper::Html::parse_document(&html);
        Ok(crate::parse::parse_select_options(&doc, level.select_names()))
    }

    fn truncate_below(&mut self, level: Level) {
        for downstream in &Level::ALL[level.index() + 1..] {
            self.lists[downstream.index()] = None;
            self.selected[downstream.index()] = None;
        }
    }
}

fn sample_labels(options: &[&SelectOption]) -> Vec<String> {
    options
        .iter()
        .take(SAMPLE_LIMIT)
        .map(|o| o.label.clone())
        .collect()
}
