//! Captcha-gated submission loop.
//!
//! Every attempt captures a fresh captcha and blocks on the injected human
//! prompt before submitting, because the portal rotates the captcha per
//! view; a stale value can never be resubmitted. Retries are bounded with
//! linearly increasing backoff, and an unclassifiable response is retried
//! exactly once before being surfaced.

use std::time::Duration;

use crate::classify::{self, Classification};
use crate::config::EngineConfig;
use crate::portal::{CaptchaPrompt, SubmitPortal};

/// How much of an unclassifiable body is kept for diagnosis.
const RAW_BODY_LIMIT: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultArtifact {
    Pdf(String),
    Html(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(ResultArtifact),
    /// The portal kept answering with a blocking banner through every retry.
    Blocked { banner: String },
    /// Network or captcha-acquisition failure, surfaced after retries.
    Transient { error: String },
    /// Unclassifiable response body, truncated.
    Unparseable { raw: String },
}

/// Committed form fields plus the name the captcha value is posted under.
/// The captcha text and anti-forgery token are appended per attempt, never
/// stored in the template.
#[derive(Debug, Clone)]
pub struct PayloadTemplate {
    fields: Vec<(String, String)>,
    captcha_field: String,
}

impl PayloadTemplate {
    pub fn new(captcha_field: &str) -> Self {
        Self {
            fields: Vec::new(),
            captcha_field: captcha_field.to_owned(),
        }
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_owned(), value.to_owned()));
        self
    }

    fn build(&self, captcha: &str, token: Option<&str>) -> Vec<(String, String)> {
        let mut payload = self.fields.clone();
        payload.push((self.captcha_field.clone(), captcha.to_owned()));
        if let Some(token) = token {
            payload.push(("app_token".to_owned(), token.to_owned()));
        }
        payload
    }
}

/// Run the submission loop until success, a terminal failure, or retry
/// exhaustion. Never loops unbounded: at most `config.max_retries`
/// submissions happen, whatever the portal answers.
pub fn run(
    portal: &mut dyn SubmitPortal,
    prompt: &dyn CaptchaPrompt,
    template: &PayloadTemplate,
    config: &EngineConfig,
) -> AttemptOutcome {
    let mut unparseable_retried = false;
    let mut last = AttemptOutcome::Transient {
        error: "no attempts were made".to_owned(),
    };

    for attempt in 1..=config.max_retries {
        let artifact = match portal.fresh_captcha() {
            Ok(artifact) => Some(artifact),
            Err(err) if config.allow_missing_captcha => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    "captcha unavailable; submitting without one"
                );
                None
            }
            // The portal already retried the image download internally;
            // a fresh captcha is a precondition for every submission, so
            // this is terminal.
            Err(err) => {
                return AttemptOutcome::Transient {
                    error: format!("fetch captcha: {err:#}"),
                };
            }
        };

        let captcha_value = match prompt.read(artifact.as_ref()) {
            Ok(value) => value,
            Err(err) => {
                return AttemptOutcome::Transient {
                    error: format!("read captcha value: {err:#}"),
                };
            }
        };

        let token = artifact.as_ref().and_then(|a| a.token.as_deref());
        let payload = template.build(&captcha_value, token);

        let response = match portal.submit(&payload) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(attempt, error = %format!("{err:#}"), "submission failed");
                last = AttemptOutcome::Transient {
                    error: format!("{err:#}"),
                };
                backoff(config, attempt);
                continue;
            }
        };

        match classify::classify(&response.body, response.content_type.as_deref(), config) {
            Classification::Pdf(url) => {
                return AttemptOutcome::Success(ResultArtifact::Pdf(url));
            }
            Classification::Html(body) => {
                return AttemptOutcome::Success(ResultArtifact::Html(body));
            }
            Classification::Blocked(banner) => {
                tracing::info!(attempt, banner = %banner, "blocking banner in response; retrying");
                last = AttemptOutcome::Blocked { banner };
                backoff(config, attempt);
            }
            Classification::Unparseable => {
                last = AttemptOutcome::Unparseable {
                    raw: truncate(&response.body),
                };
                if unparseable_retried {
                    return last;
                }
                unparseable_retried = true;
                tracing::warn!(attempt, "unclassifiable response; retrying once");
                backoff(config, attempt);
            }
        }
    }

    last
}

fn backoff(config: &EngineConfig, attempt: u32) {
    std::thread::sleep(Duration::from_millis(
        config.base_delay_ms * u64::from(attempt),
    ));
}

fn truncate(body: &str) -> String {
    if body.len() <= RAW_BODY_LIMIT {
        return body.to_owned();
    }
    let mut end = RAW_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::{CaptchaArtifact, RawResponse};

    struct StubPortal {
        responses: Vec<anyhow::Result<RawResponse>>,
        submissions: Vec<Vec<(String, String)>>,
        captchas_served: u32,
        captcha_fails: bool,
    }

    impl StubPortal {
        fn new(responses: Vec<anyhow::Result<RawResponse>>) -> Self {
            Self {
                responses,
                submissions: Vec::new(),
                captchas_served: 0,
                captcha_fails: false,
            }
        }

        fn html(body: &str) -> anyhow::Result<RawResponse> {
            Ok(RawResponse {
                body: body.to_owned(),
                content_type: Some("text/html".to_owned()),
            })
        }
    }

    impl SubmitPortal for StubPortal {
        fn fresh_captcha(&mut self) -> anyhow::Result<CaptchaArtifact> {
            if self.captcha_fails {
                anyhow::bail!("captcha endpoint down");
            }
            self.captchas_served += 1;
            Ok(CaptchaArtifact {
                image_path: format!("/tmp/captcha_{}.jpg", self.captchas_served).into(),
                token: Some(format!("token{}", self.captchas_served)),
            })
        }

        fn submit(&mut self, payload: &[(String, String)]) -> anyhow::Result<RawResponse> {
            self.submissions.push(payload.to_vec());
            if self.responses.is_empty() {
                anyhow::bail!("connection reset");
            }
            self.responses.remove(0)
        }
    }

    struct StubPrompt(&'static str);

    impl CaptchaPrompt for StubPrompt {
        fn read(&self, _artifact: Option<&CaptchaArtifact>) -> anyhow::Result<String> {
            Ok(self.0.to_owned())
        }
    }

    fn config(max_retries: u32) -> EngineConfig {
        EngineConfig {
            max_retries,
            base_delay_ms: 0,
            ..EngineConfig::default()
        }
    }

    fn template() -> PayloadTemplate {
        PayloadTemplate::new("fcaptcha_code")
            .field("cino", "MHPU050000272025")
            .field("ajax_req", "true")
    }

    #[test]
    fn success_on_first_attempt_submits_once() {
        let mut portal = StubPortal::new(vec![StubPortal::html(
            "<table><tr><td>CNR Number</td><td>X</td></tr></table>",
        )]);
        let outcome = run(&mut portal, &StubPrompt("AB12"), &template(), &config(3));

        assert!(matches!(outcome, AttemptOutcome::Success(ResultArtifact::Html(_))));
        assert_eq!(portal.submissions.len(), 1);

        let payload = &portal.submissions[0];
        assert!(payload.contains(&("fcaptcha_code".to_owned(), "AB12".to_owned())));
        assert!(payload.contains(&("app_token".to_owned(), "token1".to_owned())));
    }

    #[test]
    fn transient_failures_retry_exactly_max_retries_times() {
        let mut portal = StubPortal::new(Vec::new());
        let outcome = run(&mut portal, &StubPrompt("AB12"), &template(), &config(3));

        let AttemptOutcome::Transient { error } = outcome else {
            panic!("expected transient, got {outcome:?}");
        };
        assert!(error.contains("connection reset"));
        assert_eq!(portal.submissions.len(), 3);
    }

    #[test]
    fn every_attempt_gets_a_fresh_captcha() {
        let mut portal = StubPortal::new(Vec::new());
        run(&mut portal, &StubPrompt("AB12"), &template(), &config(3));
        assert_eq!(portal.captchas_served, 3);
    }

    #[test]
    fn banner_responses_retry_then_surface_as_blocked() {
        let banner = StubPortal::html("<div>Invalid Request</div>");
        let mut portal = StubPortal::new(vec![
            banner,
            StubPortal::html("<div>Invalid Request</div>"),
        ]);
        let outcome = run(&mut portal, &StubPrompt("AB12"), &template(), &config(2));

        let AttemptOutcome::Blocked { banner } = outcome else {
            panic!("expected blocked, got {outcome:?}");
        };
        assert_eq!(banner, "invalid request");
        assert_eq!(portal.submissions.len(), 2);
    }

    #[test]
    fn banner_then_success_recovers() {
        let mut portal = StubPortal::new(vec![
            StubPortal::html("<div>Oops</div>"),
            StubPortal::html("<table><tr><td>1</td></tr></table>"),
        ]);
        let outcome = run(&mut portal, &StubPrompt("AB12"), &template(), &config(3));
        assert!(matches!(outcome, AttemptOutcome::Success(_)));
        assert_eq!(portal.submissions.len(), 2);
    }

    #[test]
    fn unparseable_retries_once_then_surfaces_truncated_body() {
        let noise = "x".repeat(5000);
        let mut portal = StubPortal::new(vec![
            StubPortal::html(&noise),
            StubPortal::html(&noise),
            StubPortal::html("<table><tr><td>never reached</td></tr></table>"),
        ]);
        let outcome = run(&mut portal, &StubPrompt("AB12"), &template(), &config(5));

        let AttemptOutcome::Unparseable { raw } = outcome else {
            panic!("expected unparseable, got {outcome:?}");
        };
        assert_eq!(raw.len(), RAW_BODY_LIMIT);
        assert_eq!(portal.submissions.len(), 2);
    }

    #[test]
    fn captcha_fetch_failure_is_terminal_by_default() {
        let mut portal = StubPortal::new(vec![StubPortal::html("<table></table>")]);
        portal.captcha_fails = true;
        let outcome = run(&mut portal, &StubPrompt("AB12"), &template(), &config(3));

        let AttemptOutcome::Transient { error } = outcome else {
            panic!("expected transient, got {outcome:?}");
        };
        assert!(error.contains("captcha"));
        assert!(portal.submissions.is_empty());
    }

    #[test]
    fn captcha_fetch_failure_submits_anyway_when_opted_in() {
        let mut portal = StubPortal::new(vec![StubPortal::html(
            "<table><tr><td>1</td></tr></table>",
        )]);
        portal.captcha_fails = true;
        let config = EngineConfig {
            allow_missing_captcha: true,
            ..config(3)
        };
        let outcome = run(&mut portal, &StubPrompt(""), &template(), &config);

        assert!(matches!(outcome, AttemptOutcome::Success(_)));
        let payload = &portal.submissions[0];
        assert!(payload.contains(&("fcaptcha_code".to_owned(), String::new())));
        assert!(!payload.iter().any(|(k, _)| k == "app_token"));
    }
}
