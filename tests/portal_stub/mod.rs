use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A canned submission response: content type plus body.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub content_type: String,
    pub body: String,
}

impl StubResponse {
    pub fn html(body: &str) -> Self {
        Self {
            content_type: "text/html".to_owned(),
            body: body.to_owned(),
        }
    }

    pub fn json(body: &str) -> Self {
        Self {
            content_type: "application/json".to_owned(),
            body: body.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalStubConfig {
    /// Page served for the cause-list form (GET and upstream-code POSTs).
    pub options_page: String,
    /// Responses for submission POSTs, in order; the last one repeats.
    pub submit_responses: Vec<StubResponse>,
}

#[derive(Debug, Default)]
struct StubState {
    submit_bodies: Vec<String>,
    captcha_hits: usize,
    next_response: usize,
}

/// In-process portal lookalike: home page with token and captcha image,
/// option pages, and a scripted submission endpoint.
pub struct PortalStub {
    pub base_url: String,
    state: Arc<Mutex<StubState>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PortalStub {
    pub fn spawn(config: PortalStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start portal stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/");

        let state = Arc::new(Mutex::new(StubState::default()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_state = Arc::clone(&state);
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();

                if url.contains("securimage_show") {
                    thread_state.lock().expect("lock stub state").captcha_hits += 1;
                    let _ = request.respond(
                        tiny_http::Response::from_data(vec![0xff, 0xd8, 0xff, 0xe0])
                            .with_header(header("Content-Type", "image/jpeg")),
                    );
                    continue;
                }

                if url.contains("cause_list/submitCauseList") || url.contains("cnr_status") {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);

                    let response = {
                        let mut state = thread_state.lock().expect("lock stub state");
                        state.submit_bodies.push(body);
                        let idx = state.next_response.min(config.submit_responses.len() - 1);
                        state.next_response += 1;
                        config.submit_responses[idx].clone()
                    };

                    let _ = request.respond(
                        tiny_http::Response::from_string(response.body)
                            .with_header(header("Content-Type", &response.content_type)),
                    );
                    continue;
                }

                if url.contains("p=cause_list") {
                    let _ = request.respond(
                        tiny_http::Response::from_string(config.options_page.clone())
                            .with_header(header("Content-Type", "text/html")),
                    );
                    continue;
                }

                if url == "/" {
                    let _ = request.respond(
                        tiny_http::Response::from_string(home_page())
                            .with_header(header("Content-Type", "text/html")),
                    );
                    continue;
                }

                let _ = request
                    .respond(tiny_http::Response::from_string("not found").with_status_code(404));
            }
        });

        Self {
            base_url,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn submit_bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("lock stub state")
            .submit_bodies
            .clone()
    }

    pub fn captcha_hits(&self) -> usize {
        self.state.lock().expect("lock stub state").captcha_hits
    }
}

impl Drop for PortalStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn header(name: &str, value: &str) -> tiny_http::Header {
    tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("build header")
}

fn home_page() -> String {
    r#"<html><body>
        <input type="hidden" name="app_token" value="stubtoken1">
        <img src="securimage_show.php?sid=1">
    </body></html>"#
        .to_owned()
}

/// Option page with the full select cascade, the way the portal renders it
/// once every level is populated.
#[allow(dead_code)]
pub fn options_page() -> String {
    r#"<html><body>
        <input type="hidden" name="app_token" value="stubtoken2">
        <select name="sess_state_code">
            <option value="0">Select State</option>
            <option value="1">Maharashtra</option>
            <option value="2">Goa</option>
        </select>
        <select name="sess_dist_code">
            <option value="0">Select District</option>
            <option value="5">Pune</option>
        </select>
        <select name="court_complex_code">
            <option value="0">Select</option>
            <option value="9">Shivajinagar Court Complex</option>
        </select>
        <select id="CL_court_no">
            <option value="0">Select</option>
            <option value="18^1">Civil Judge Senior Division</option>
        </select>
    </body></html>"#
        .to_owned()
}

#[allow(dead_code)]
pub fn write_stub_config(dir: &std::path::Path, base_url: &str) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    let yaml = format!("base_url: \"{base_url}\"\nmax_retries: 2\nbase_delay_ms: 0\ncaptcha_fetch_tries: 1\n");
    std::fs::write(&path, yaml).expect("write stub config");
    path
}
