//! Collaborator seams for the engine, plus the blocking HTTP implementation.
//!
//! The engine never talks to the network directly: the cascade pulls option
//! pages through [`OptionSource`], the attempt loop pulls captcha artifacts
//! and posts payloads through [`SubmitPortal`], and the human captcha read is
//! an injected [`CaptchaPrompt`]. Tests substitute deterministic stubs for
//! all three.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::config::EngineConfig;
use crate::parse;

#[derive(Debug)]
pub struct RawResponse {
    pub body: String,
    pub content_type: Option<String>,
}

/// A freshly captured captcha image tied to the current session, plus the
/// anti-forgery token the same page carried.
#[derive(Debug, Clone)]
pub struct CaptchaArtifact {
    pub image_path: PathBuf,
    pub token: Option<String>,
}

/// Returns the raw HTML of the option page for a set of committed upstream
/// `(field, code)` pairs. An empty set means the landing page.
pub trait OptionSource {
    fn options_page(&mut self, upstream: &[(String, String)]) -> anyhow::Result<String>;
}

/// Captcha capture and form submission against one session context.
///
/// One context, one in-flight attempt at a time: the implementation mutates
/// session state (cookies, token) in place and must not be shared across
/// concurrent queries.
pub trait SubmitPortal {
    fn fresh_captcha(&mut self) -> anyhow::Result<CaptchaArtifact>;
    fn submit(&mut self, payload: &[(String, String)]) -> anyhow::Result<RawResponse>;
}

/// Blocking call that produces the text a human read off the captcha image.
/// No timeout is imposed here; bounding the wait is the caller's concern.
pub trait CaptchaPrompt {
    fn read(&self, artifact: Option<&CaptchaArtifact>) -> anyhow::Result<String>;
}

pub struct StdinPrompt;

impl CaptchaPrompt for StdinPrompt {
    fn read(&self, artifact: Option<&CaptchaArtifact>) -> anyhow::Result<String> {
        match artifact {
            Some(artifact) => eprintln!(
                "Captcha saved to {} - open it and enter the text:",
                artifact.image_path.display()
            ),
            None => eprintln!("Captcha image unavailable - press Enter to submit without one:"),
        }
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("read captcha from stdin")?;
        Ok(line.trim().to_owned())
    }
}

/// Fixed captcha value, for stub portals and non-interactive runs.
pub struct FixedCaptcha(pub String);

impl CaptchaPrompt for FixedCaptcha {
    fn read(&self, _artifact: Option<&CaptchaArtifact>) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

/// One logical portal session: cookie jar, anti-forgery token, and the
/// directory captcha images get written to.
pub struct HttpPortal {
    client: reqwest::blocking::Client,
    config: EngineConfig,
    submit_url: Url,
    captcha_dir: PathBuf,
    app_token: Option<String>,
    captcha_seq: u32,
}

impl HttpPortal {
    pub fn new(
        config: &EngineConfig,
        submit_url: Url,
        captcha_dir: &Path,
    ) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .user_agent(config.user_agent.clone())
            .build()
            .context("build portal http client")?;

        Ok(Self {
            client,
            config: config.clone(),
            submit_url,
            captcha_dir: captcha_dir.to_owned(),
            app_token: None,
            captcha_seq: 0,
        })
    }

    pub fn app_token(&self) -> Option<&str> {
        self.app_token.as_deref()
    }

    fn refresh_token(&mut self, html: &str) {
        if let Some(token) = parse::extract_app_token(html) {
            tracing::debug!("refreshed app token");
            self.app_token = Some(token);
        }
    }

    fn download_captcha_image(&mut self, src: &str) -> anyhow::Result<PathBuf> {
        let base = self.config.base()?;
        let url = base
            .join(src)
            .with_context(|| format!("resolve captcha url: {src}"))?;

        std::fs::create_dir_all(&self.captcha_dir).with_context(|| {
            format!("create captcha dir: {}", self.captcha_dir.display())
        })?;
        self.captcha_seq += 1;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .captcha_dir
            .join(format!("captcha_{:03}_{stamp}.jpg", self.captcha_seq));

        let mut last_error = None;
        for attempt in 1..=self.config.captcha_fetch_tries {
            match self.fetch_bytes(&url) {
                Ok(bytes) => {
                    std::fs::write(&path, bytes)
                        .with_context(|| format!("write captcha image: {}", path.display()))?;
                    return Ok(path);
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %format!("{err:#}"), "captcha download failed");
                    last_error = Some(err);
                    std::thread::sleep(Duration::from_millis(
                        self.config.base_delay_ms * u64::from(attempt),
                    ));
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("captcha fetch tries set to zero")))
    }

    fn fetch_bytes(&self, url: &Url) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        Ok(response.bytes().context("read response bytes")?.to_vec())
    }

    fn fetch_text(&self, url: &Url) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        response.text().context("read response body")
    }
}

impl OptionSource for HttpPortal {
    fn options_page(&mut self, upstream: &[(String, String)]) -> anyhow::Result<String> {
        let url = self.config.causelist_url()?;
        let response = if upstream.is_empty() {
            self.client.get(url.clone()).send()
        } else {
            self.client.post(url.clone()).form(&upstream).send()
        }
        .with_context(|| format!("fetch options page: {url}"))?
        .error_for_status()
        .with_context(|| format!("fetch options page: {url}"))?;

        let body = response.text().context("read options page")?;
        self.refresh_token(&body);
        Ok(body)
    }
}

impl SubmitPortal for HttpPortal {
    fn fresh_captcha(&mut self) -> anyhow::Result<CaptchaArtifact> {
        let base = self.config.base()?;
        let html = self
            .fetch_text(&base)
            .context("load portal page for captcha")?;
        self.refresh_token(&html);

        let src = parse::captcha_image_src(&html)
            .ok_or_else(|| anyhow::anyhow!("captcha image not found on portal page"))?;
        let image_path = self.download_captcha_image(&src)?;
        tracing::info!(path = %image_path.display(), "captcha saved");

        Ok(CaptchaArtifact {
            image_path,
            token: self.app_token.clone(),
        })
    }

    fn submit(&mut self, payload: &[(String, String)]) -> anyhow::Result<RawResponse> {
        let url = self.submit_url.clone();
        let response = self
            .client
            .post(url.clone())
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&payload)
            .send()
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .with_context(|| format!("POST {url}"))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().context("read submission response")?;
        Ok(RawResponse { body, content_type })
    }
}
