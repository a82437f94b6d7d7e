//! Plate Smoke
//!
//! A one-shot smoke test for canvas-based rendering. It serves a directory
//! over HTTP, drives a headless Chrome against it, and verifies that the
//! expected canvas element exists, emitted no console errors, has non-zero
//! dimensions, and actually rendered something (is not a uniform color).
//!
//! # Example
//!
//! ```no_run
//! use plate_smoke::SmokeConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SmokeConfig::default();
//! let verdict = plate_smoke::run(&config)?;
//! std::process::exit(verdict.exit_code());
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod browser;
pub mod checks;
pub mod server;

pub use checks::CanvasSize;

use browser::PageSession;
use log::info;
use server::StaticServer;

/// Configuration for one smoke-test run.
///
/// The defaults reproduce the fixed contract: serve the current directory on
/// port 8765, verify the element `plate-canvas`, and write `smoke-test.png`.
#[derive(Debug, Clone)]
pub struct SmokeConfig {
    /// TCP port for the local file server
    pub port: u16,
    /// Directory served as the page under test
    pub serve_root: PathBuf,
    /// DOM id of the canvas element to verify
    pub canvas_id: String,
    /// Where the screenshot artifact is written (overwritten each run)
    pub screenshot_path: PathBuf,
    /// Upper bound for rendering to settle after navigation
    pub settle: Duration,
    /// Browser viewport width
    pub viewport_width: u32,
    /// Browser viewport height
    pub viewport_height: u32,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            port: 8765,
            serve_root: PathBuf::from("."),
            canvas_id: "plate-canvas".to_string(),
            screenshot_path: PathBuf::from("smoke-test.png"),
            settle: Duration::from_millis(2000),
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// One console message emitted by the page, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
    /// Level such as "log", "warn", or "error"
    pub level: String,
    /// Textual content of the message
    pub text: String,
}

impl fmt::Display for ConsoleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.text)
    }
}

/// Outcome of the ordered verification checks.
///
/// Checks short-circuit, so each failing variant identifies the first check
/// that failed. Only [`Verdict::Passed`] maps to exit code 0.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Everything checked out; carries the measured canvas size
    Passed { width: u32, height: u32 },
    /// The expected canvas element is absent from the page
    CanvasMissing,
    /// Error-level console messages were emitted during load
    ConsoleErrors(Vec<ConsoleMessage>),
    /// The canvas has zero intrinsic width or height
    ZeroDimensions,
    /// Every pixel matches the first pixel; nothing was drawn
    BlankCanvas,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed { .. })
    }

    /// Process exit code for CI gating: 0 on pass, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_pass() {
            0
        } else {
            1
        }
    }
}

/// Run the whole smoke test: serve, navigate, settle, screenshot, check.
///
/// The server thread and the browser process are owned by this scope, so
/// both are released on every path out of it, error or not.
pub fn run(config: &SmokeConfig) -> Result<Verdict> {
    let server = StaticServer::bind(config.port, &config.serve_root)?;
    info!(
        "serving {} at {}",
        config.serve_root.display(),
        server.base_url()
    );

    let session = PageSession::launch(config)?;
    session.navigate(&server.base_url())?;
    session.settle(config.settle);

    // The screenshot lands before any pixel-based verdict so a failing run
    // still leaves an artifact to inspect.
    session.save_screenshot(&config.screenshot_path)?;

    checks::run_checks(&session, &config.canvas_id)
}
