// src/browser/webdriver.rs

//! [`BrowserDriver`] over the W3C WebDriver HTTP protocol.
//!
//! A driver binary (`geckodriver`, `chromedriver`, ...) is located on the
//! PATH, started on a free local port, and a single session is opened on the
//! first `navigate`. Driver error messages are classified here into
//! [`BrowserError`] variants.

use std::net::TcpListener;
use std::process::Stdio;
use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{BrowserDriver, BrowserError};
use crate::types::{BoxFuture, BrowserKind};

const READY_POLL: Duration = Duration::from_millis(100);
const READY_TIMEOUT: Duration = Duration::from_secs(10);

const ERROR_PAGE_PROBE: &str =
    "return document.body !== null && document.body.classList.contains('neterror');";

#[derive(Debug)]
struct Session {
    driver: Child,
    base: String,
    id: String,
}

/// Browser driven through a locally spawned WebDriver server.
#[derive(Debug)]
pub struct WebDriverBrowser {
    kind: BrowserKind,
    http: Client,
    session: Mutex<Option<Session>>,
}

impl WebDriverBrowser {
    pub fn new(kind: BrowserKind) -> Self {
        Self {
            kind,
            http: Client::new(),
            session: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    async fn launch(&self) -> Result<Session, BrowserError> {
        let binary_name = self.kind.driver_binary();
        let binary = which::which(binary_name).map_err(|_| {
            BrowserError::BinaryNotFound(format!(
                "`{binary_name}` is not on the PATH; install it or configure another browser"
            ))
        })?;

        let port = free_port()?;
        let mut cmd = Command::new(&binary);
        match self.kind {
            BrowserKind::Chrome | BrowserKind::Edge => {
                cmd.arg(format!("--port={port}"));
            }
            BrowserKind::Firefox | BrowserKind::Safari => {
                cmd.arg("--port").arg(port.to_string());
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let driver = cmd.spawn().map_err(|e| {
            BrowserError::Other(format!("failed to start {}: {e}", binary.display()))
        })?;
        let base = format!("http://127.0.0.1:{port}");
        info!(driver = %binary.display(), %base, "webdriver started");

        self.wait_until_ready(&base).await?;

        let caps = json!({
            "capabilities": { "alwaysMatch": { "browserName": self.kind.capability_name() } }
        });
        let value = send(&self.http, Method::POST, &format!("{base}/session"), Some(caps)).await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Other("driver returned no sessionId".to_string()))?
            .to_string();

        debug!(session = %id, browser = %self.kind, "webdriver session created");
        Ok(Session { driver, base, id })
    }

    async fn wait_until_ready(&self, base: &str) -> Result<(), BrowserError> {
        let url = format!("{base}/status");
        let deadline = tokio::time::Instant::now() + READY_TIMEOUT;
        loop {
            if let Ok(resp) = self.http.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Other(format!(
                    "{} did not become ready within {READY_TIMEOUT:?}",
                    self.kind.driver_binary()
                )));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    /// Chrome, Edge and Safari render an error page instead of failing the
    /// command; its `<body>` carries the `neterror` class.
    async fn check_error_page(&self, session: &Session) -> Result<(), BrowserError> {
        if self.kind.reports_load_errors() {
            return Ok(());
        }
        let body = json!({ "script": ERROR_PAGE_PROBE, "args": [] });
        let url = format!("{}/session/{}/execute/sync", session.base, session.id);
        let value = send(&self.http, Method::POST, &url, Some(body)).await?;
        if value.as_bool() == Some(true) {
            return Err(BrowserError::NavigationFailed("failed to load page".to_string()));
        }
        Ok(())
    }
}

impl BrowserDriver for WebDriverBrowser {
    fn navigate(&self, url: &str) -> BoxFuture<'_, Result<(), BrowserError>> {
        let target = normalize_url(url);
        Box::pin(async move {
            let mut guard = self.session.lock().await;
            if guard.is_none() {
                *guard = Some(self.launch().await?);
            }
            let Some(session) = guard.as_ref() else {
                return Err(BrowserError::Other("browser session missing".to_string()));
            };

            debug!(url = %target, "navigating browser");
            let endpoint = format!("{}/session/{}/url", session.base, session.id);
            send(&self.http, Method::POST, &endpoint, Some(json!({ "url": target }))).await?;
            self.check_error_page(session).await
        })
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), BrowserError>> {
        Box::pin(async move {
            let guard = self.session.lock().await;
            let Some(session) = guard.as_ref() else {
                return Err(BrowserError::Other("browser was never started".to_string()));
            };

            let endpoint = format!("{}/session/{}/refresh", session.base, session.id);
            send(&self.http, Method::POST, &endpoint, Some(json!({}))).await?;
            self.check_error_page(session).await
        })
    }

    fn quit(&self) -> BoxFuture<'_, Result<(), BrowserError>> {
        Box::pin(async move {
            let Some(mut session) = self.session.lock().await.take() else {
                return Ok(());
            };

            let endpoint = format!("{}/session/{}", session.base, session.id);
            if let Err(err) = send(&self.http, Method::DELETE, &endpoint, None).await {
                debug!(error = %err, "closing webdriver session failed");
            }
            session
                .driver
                .kill()
                .await
                .map_err(|e| BrowserError::Other(format!("failed to stop webdriver: {e}")))?;
            info!(browser = %self.kind, "browser closed");
            Ok(())
        })
    }
}

/// Issue one WebDriver command and unwrap its `value`.
async fn send(
    http: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, BrowserError> {
    let mut req = http.request(method, url);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req
        .send()
        .await
        .map_err(|e| BrowserError::Other(format!("webdriver request to {url} failed: {e}")))?;
    let status = resp.status();
    let payload: Value = resp
        .json()
        .await
        .map_err(|e| BrowserError::Other(format!("invalid webdriver response: {e}")))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let error = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or_default();
    Err(classify(error, message))
}

/// Map a WebDriver error code and message to a [`BrowserError`].
pub fn classify(error: &str, message: &str) -> BrowserError {
    let text = if message.is_empty() {
        error.to_string()
    } else {
        message.to_string()
    };

    let missing_binary = (message.contains("cannot find") && message.contains("binary"))
        || message.contains("unable to find binary");
    if missing_binary {
        return BrowserError::BinaryNotFound(text);
    }

    if message.contains("net::ERR_") || message.contains("Reached error page") {
        return BrowserError::NavigationFailed(text);
    }

    BrowserError::Other(format!("{error}: {message}"))
}

/// WebDriver needs absolute URLs; `localhost:5000` becomes `http://localhost:5000`.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

fn free_port() -> Result<u16, BrowserError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| BrowserError::Other(format!("no free port for webdriver: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| BrowserError::Other(format!("no free port for webdriver: {e}")))?
        .port();
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_missing_chrome_binary_as_fatal() {
        let err = classify("session not created", "unknown error: cannot find Chrome binary");
        assert!(matches!(err, BrowserError::BinaryNotFound(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn classifies_missing_firefox_binary_as_fatal() {
        let err = classify(
            "session not created",
            "Expected browser binary location, but unable to find binary in default location",
        );
        assert!(matches!(err, BrowserError::BinaryNotFound(_)));
    }

    #[test]
    fn classifies_unreachable_pages_as_transient() {
        let chrome = classify("unknown error", "unknown error: net::ERR_CONNECTION_REFUSED");
        assert!(chrome.is_transient());

        let firefox = classify(
            "unknown error",
            "Reached error page: about:neterror?e=connectionFailure",
        );
        assert!(firefox.is_transient());
    }

    #[test]
    fn everything_else_is_other() {
        let err = classify("invalid session id", "session deleted");
        assert_eq!(
            err,
            BrowserError::Other("invalid session id: session deleted".to_string())
        );
    }

    #[test]
    fn urls_without_scheme_default_to_http() {
        assert_eq!(normalize_url("localhost:5000"), "http://localhost:5000");
        assert_eq!(normalize_url(" https://example.test/a "), "https://example.test/a");
    }
}
