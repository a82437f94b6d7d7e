//! Headless Chrome session driver.
//!
//! Owns one browser process and one tab for the lifetime of the run. Console
//! output is captured by exposing a binding function to the page and
//! installing a wrapper script on every new document that forwards
//! `console.*` calls (and uncaught page errors) to it. The browser and tab
//! are plain owned values, so the Chrome process is reclaimed on every exit
//! path, including early check failures.

use crate::{ConsoleMessage, Error, Result, SmokeConfig};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const CONSOLE_BINDING: &str = "__plate_console";

// Installed via Page.addScriptToEvaluateOnNewDocument so it runs before any
// page script. Uncaught errors are forwarded at error level so load-time
// exceptions fail the console check too.
const CONSOLE_WRAPPER: &str = r#"(function(){
    const bind = window.__plate_console;
    if (!bind) return;
    ['log','info','warn','error'].forEach(function(k){
        const orig = console[k];
        console[k] = function(...args){
            try{ bind(JSON.stringify({ level:k, args: args.map(a=>String(a)) })); }catch(e){}
            try{ orig.apply(console, args); }catch(e){}
        };
    });
    window.addEventListener('error', function(ev){
        try{ bind(JSON.stringify({ level:'error', args:[String(ev.message)] })); }catch(e){}
    });
})();"#;

const RENDER_DONE_JS: &str = r#"(function(){ return window.__plate_render_done === true; })()"#;

/// A live page in a headless Chrome instance.
pub struct PageSession {
    _browser: Browser,
    tab: Arc<Tab>,
    console: Arc<Mutex<Vec<ConsoleMessage>>>,
}

impl PageSession {
    /// Launch headless Chrome, open a tab, and install console capture.
    pub fn launch(config: &SmokeConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport_width, config.viewport_height)))
            .build()
            .map_err(|e| classify_launch_error(&e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| classify_launch_error(&e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::Launch(format!("failed to create tab: {}", e)))?;

        let console = Arc::new(Mutex::new(Vec::new()));
        install_console_capture(&tab, Arc::clone(&console))?;

        info!("headless Chrome launched");
        Ok(Self {
            _browser: browser,
            tab,
            console,
        })
    }

    /// Navigate to `url` and block until the driver reports the page loaded.
    pub fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::Load(format!("navigation to {} failed: {}", url, e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::Load(format!("wait for navigation failed: {}", e)))?;
        Ok(())
    }

    /// Give asynchronous rendering work time to finish.
    ///
    /// Polls for a `window.__plate_render_done` flag so pages that signal
    /// completion are not held for the whole budget; pages that never set the
    /// flag wait out the full settle time, matching the original fixed delay.
    pub fn settle(&self, budget: Duration) {
        let deadline = Instant::now() + budget;
        while Instant::now() < deadline {
            if let Ok(true) = self.evaluate_bool(RENDER_DONE_JS) {
                debug!("page signalled render completion early");
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        debug!("settle budget of {:?} elapsed", budget);
    }

    /// Messages collected so far, in arrival order.
    pub fn console_messages(&self) -> Vec<ConsoleMessage> {
        self.console.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Evaluate a script that yields a boolean.
    pub fn evaluate_bool(&self, script: &str) -> Result<bool> {
        let eval = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::Script(format!("evaluation failed: {}", e)))?;
        match eval.value {
            Some(serde_json::Value::Bool(b)) => Ok(b),
            other => Err(Error::Script(format!(
                "expected a boolean result, got {:?}",
                other
            ))),
        }
    }

    /// Evaluate a script that yields a `JSON.stringify`'d value and parse it.
    pub fn evaluate_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let eval = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::Script(format!("evaluation failed: {}", e)))?;

        let value = eval
            .value
            .ok_or_else(|| Error::Script("no value returned from evaluation".into()))?;
        let text = value
            .as_str()
            .ok_or_else(|| Error::Script(format!("expected a JSON string, got {}", value)))?;

        serde_json::from_str(text)
            .map_err(|e| Error::Script(format!("failed to parse page result: {}", e)))
    }

    /// Capture a PNG screenshot of the page and write it to `path`,
    /// overwriting any previous file.
    pub fn save_screenshot(&self, path: &Path) -> Result<()> {
        let png = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| Error::Screenshot(format!("capture failed: {}", e)))?;

        std::fs::write(path, png)
            .map_err(|e| Error::Screenshot(format!("could not write {:?}: {}", path, e)))?;
        debug!("screenshot written to {:?}", path);
        Ok(())
    }
}

/// A launch failure caused by a missing Chrome/Chromium install is the one
/// environment condition reported distinctly.
fn classify_launch_error(msg: &str) -> Error {
    let lowered = msg.to_lowercase();
    if lowered.contains("executable") || lowered.contains("auto detect") {
        Error::BrowserUnavailable(msg.to_string())
    } else {
        Error::Launch(msg.to_string())
    }
}

/// Expose the console binding and install the wrapper script on the tab.
fn install_console_capture(tab: &Arc<Tab>, sink: Arc<Mutex<Vec<ConsoleMessage>>>) -> Result<()> {
    tab.expose_function(
        CONSOLE_BINDING,
        Arc::new(move |payload: serde_json::Value| {
            // The binding receives a JSON string from the wrapper script.
            let msg = if payload.is_string() {
                let s = payload.as_str().unwrap_or("");
                match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(v) => v,
                    Err(_) => serde_json::Value::String(s.to_string()),
                }
            } else {
                payload
            };

            if let Some(level) = msg.get("level").and_then(|l| l.as_str()) {
                let text = match msg.get("args") {
                    Some(serde_json::Value::Array(args)) => args
                        .iter()
                        .map(|v| {
                            v.as_str()
                                .map(|s| s.to_string())
                                .unwrap_or_else(|| v.to_string())
                        })
                        .collect::<Vec<_>>()
                        .join(" "),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };

                if let Ok(mut messages) = sink.lock() {
                    messages.push(ConsoleMessage {
                        level: level.to_string(),
                        text,
                    });
                }
            }
        }),
    )
    .map_err(|e| Error::Launch(format!("failed to expose console binding: {}", e)))?;

    tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
        source: CONSOLE_WRAPPER.to_string(),
        world_name: None,
        include_command_line_api: None,
        run_immediately: None,
    })
    .map_err(|e| Error::Launch(format!("failed to install console wrapper: {}", e)))?;

    Ok(())
}
