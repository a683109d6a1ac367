use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use url::Url;

/// Engine configuration. Everything here has a working default for the
/// public eCourts portal; a YAML file can override any subset of fields,
/// which the tests use to point the engine at a stub server.
///
/// The banner marker list is configuration on purpose: the portal's
/// blocking texts are an observed, not published, set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Portal base, trailing slash included so relative links resolve under it.
    pub base_url: String,
    pub search_path: String,
    pub causelist_path: String,
    pub causelist_submit_path: String,
    pub user_agent: String,
    /// Case-insensitive substrings that mark a blocking banner response.
    pub banner_markers: Vec<String>,
    /// Total submission attempts per query (first try included).
    pub max_retries: u32,
    /// Backoff between attempts grows linearly: `base_delay_ms * attempt`.
    pub base_delay_ms: u64,
    /// Bounded retries for downloading the captcha image itself.
    pub captcha_fetch_tries: u32,
    /// Submit with an empty captcha when the image cannot be fetched,
    /// instead of failing the query.
    pub allow_missing_captcha: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://services.ecourts.gov.in/ecourtindia_v6/".to_owned(),
            search_path: "?p=cnr_status/searchByCNR/".to_owned(),
            causelist_path: "?p=cause_list".to_owned(),
            causelist_submit_path: "?p=cause_list/submitCauseList".to_owned(),
            user_agent: "courtfetch/0.1".to_owned(),
            banner_markers: vec![
                "invalid request".to_owned(),
                "oops".to_owned(),
                "try once again".to_owned(),
                "please try again".to_owned(),
                "access denied".to_owned(),
            ],
            max_retries: 3,
            base_delay_ms: 600,
            captcha_fetch_tries: 4,
            allow_missing_captcha: false,
        }
    }
}

impl EngineConfig {
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read config: {path}"))?;
        serde_yaml::from_str(&text).with_context(|| format!("parse config: {path}"))
    }

    pub fn base(&self) -> anyhow::Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("parse base url: {}", self.base_url))
    }

    pub fn search_url(&self) -> anyhow::Result<Url> {
        self.join(&self.search_path)
    }

    pub fn causelist_url(&self) -> anyhow::Result<Url> {
        self.join(&self.causelist_path)
    }

    pub fn causelist_submit_url(&self) -> anyhow::Result<Url> {
        self.join(&self.causelist_submit_path)
    }

    fn join(&self, path: &str) -> anyhow::Result<Url> {
        self.base()?
            .join(path)
            .with_context(|| format!("join portal url: {path}"))
    }
}
