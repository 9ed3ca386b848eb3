use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Boxed future returned across the `dyn` trait seams (process backend,
/// browser driver, trigger actions).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Browser that the reload engine drives through WebDriver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Firefox,
    Chrome,
    Edge,
    Safari,
}

impl BrowserKind {
    /// Name of the WebDriver binary that automates this browser.
    pub fn driver_binary(self) -> &'static str {
        match self {
            BrowserKind::Firefox => "geckodriver",
            BrowserKind::Chrome => "chromedriver",
            BrowserKind::Edge => "msedgedriver",
            BrowserKind::Safari => "safaridriver",
        }
    }

    /// `browserName` capability expected by the driver.
    pub fn capability_name(self) -> &'static str {
        match self {
            BrowserKind::Firefox => "firefox",
            BrowserKind::Chrome => "chrome",
            BrowserKind::Edge => "MicrosoftEdge",
            BrowserKind::Safari => "safari",
        }
    }

    /// Firefox reports failed page loads as WebDriver errors; the others
    /// silently show an error page, which has to be detected separately.
    pub fn reports_load_errors(self) -> bool {
        matches!(self, BrowserKind::Firefox)
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BrowserKind::Firefox => "firefox",
            BrowserKind::Chrome => "chrome",
            BrowserKind::Edge => "edge",
            BrowserKind::Safari => "safari",
        };
        f.write_str(s)
    }
}

impl FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firefox" => Ok(BrowserKind::Firefox),
            "chrome" => Ok(BrowserKind::Chrome),
            "edge" => Ok(BrowserKind::Edge),
            "safari" => Ok(BrowserKind::Safari),
            other => Err(format!(
                "invalid browser: {other} (expected firefox, chrome, edge or safari)"
            )),
        }
    }
}

/// Shell family the command builder targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `sh -c` semantics, `&&` chaining.
    Posix,
    /// Windows; `powershell` tells whether PowerShell was found on the PATH.
    Windows { powershell: bool },
}

impl Platform {
    /// The platform this binary runs on, probing for PowerShell on Windows.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows {
                powershell: crate::exec::shell::powershell_available(),
            }
        } else {
            Platform::Posix
        }
    }
}
