//! Verification checks for the rendered page.
//!
//! The four checks run in a fixed order and short-circuit on the first
//! failure: element presence, console errors, intrinsic dimensions, and the
//! blank-pixel scan. Each check that inspects the page carries its JS as a
//! template with the element id substituted in.

use crate::browser::PageSession;
use crate::{ConsoleMessage, Error, Result, Verdict};
use serde::Deserialize;

const ID_TOKEN: &str = "{{CANVAS_ID}}";

/// Intrinsic canvas size as reported by the DOM
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

const EXISTS_JS: &str =
    r#"(function(){ return document.getElementById('{{CANVAS_ID}}') !== null; })()"#;

const SIZE_JS: &str = r#"(function(){
    const canvas = document.getElementById('{{CANVAS_ID}}');
    return JSON.stringify({ width: canvas.width, height: canvas.height });
})()"#;

// All pixels matching the first pixel's RGB means nothing was drawn.
const BLANK_JS: &str = r#"(function(){
    const canvas = document.getElementById('{{CANVAS_ID}}');
    const ctx = canvas.getContext('2d');
    const data = ctx.getImageData(0, 0, canvas.width, canvas.height).data;

    const firstR = data[0], firstG = data[1], firstB = data[2];

    for (let i = 0; i < data.length; i += 4) {
        if (data[i] !== firstR || data[i+1] !== firstG || data[i+2] !== firstB) {
            return false;
        }
    }
    return true;
})()"#;

fn with_id(template: &str, canvas_id: &str) -> String {
    template.replace(ID_TOKEN, canvas_id)
}

/// Pick out the error-level entries from the accumulated console messages.
pub fn console_errors(messages: &[ConsoleMessage]) -> Vec<ConsoleMessage> {
    messages
        .iter()
        .filter(|m| m.level == "error")
        .cloned()
        .collect()
}

/// Run the checks in order against a loaded page, stopping at the first
/// failing one.
pub fn run_checks(session: &PageSession, canvas_id: &str) -> Result<Verdict> {
    let exists = session.evaluate_bool(&with_id(EXISTS_JS, canvas_id))?;
    if !exists {
        return Ok(Verdict::CanvasMissing);
    }

    let errors = console_errors(&session.console_messages());
    if !errors.is_empty() {
        return Ok(Verdict::ConsoleErrors(errors));
    }

    let size: CanvasSize = session.evaluate_json(&with_id(SIZE_JS, canvas_id))?;
    if size.width == 0 || size.height == 0 {
        return Ok(Verdict::ZeroDimensions);
    }

    let blank = session
        .evaluate_bool(&with_id(BLANK_JS, canvas_id))
        .map_err(|e| match e {
            // A canvas holding a WebGL context refuses a 2d context; surface
            // that as a script failure rather than a verdict.
            Error::Script(msg) => Error::Script(format!("blank-pixel scan failed: {}", msg)),
            other => other,
        })?;
    if blank {
        return Ok(Verdict::BlankCanvas);
    }

    Ok(Verdict::Passed {
        width: size.width,
        height: size.height,
    })
}
