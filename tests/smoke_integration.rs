//! End-to-end runs against fixture pages served from temp directories.
//!
//! These drive a real headless Chrome, so they are `#[ignore]`d by default;
//! run them with `cargo test -- --ignored` on a machine with Chrome
//! installed.

use plate_smoke::{SmokeConfig, Verdict};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn write_page(dir: &Path, html: &str) {
    fs::write(dir.join("index.html"), html).expect("write fixture page");
}

fn config_for(port: u16, dir: &Path) -> SmokeConfig {
    SmokeConfig {
        port,
        serve_root: dir.to_path_buf(),
        screenshot_path: dir.join("smoke-test.png"),
        settle: Duration::from_millis(300),
        ..Default::default()
    }
}

const DRAWN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Drawn</title></head>
<body>
<canvas id="plate-canvas" width="64" height="64"></canvas>
<script>
const canvas = document.getElementById('plate-canvas');
const ctx = canvas.getContext('2d');
ctx.fillStyle = '#204060';
ctx.fillRect(0, 0, 64, 64);
ctx.fillStyle = '#f0a000';
ctx.fillRect(8, 8, 24, 24);
window.__plate_render_done = true;
</script>
</body>
</html>"#;

const BLANK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Blank</title></head>
<body>
<canvas id="plate-canvas" width="64" height="64"></canvas>
</body>
</html>"#;

const NO_CANVAS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>No canvas</title></head>
<body><p>nothing to see</p></body>
</html>"#;

const ZERO_DIM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Zero</title></head>
<body>
<canvas id="plate-canvas" width="0" height="0"></canvas>
</body>
</html>"#;

const CONSOLE_ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Erroring</title></head>
<body>
<canvas id="plate-canvas" width="64" height="64"></canvas>
<script>
console.error('renderer exploded');
window.__plate_render_done = true;
</script>
</body>
</html>"#;

const THROWING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Throwing</title></head>
<body>
<canvas id="plate-canvas" width="64" height="64"></canvas>
<script>
window.__plate_render_done = true;
undefinedFunctionCall();
</script>
</body>
</html>"#;

#[test]
#[ignore] // Requires Chrome to be installed
fn drawn_canvas_passes() {
    let dir = tempfile::tempdir().unwrap();
    write_page(dir.path(), DRAWN_PAGE);
    let config = config_for(18800, dir.path());

    let verdict = plate_smoke::run(&config).expect("run failed");
    match verdict {
        Verdict::Passed { width, height } => {
            assert_eq!(width, 64);
            assert_eq!(height, 64);
        }
        other => panic!("expected pass, got {:?}", other),
    }
    assert!(config.screenshot_path.exists());
}

#[test]
#[ignore] // Requires Chrome to be installed
fn blank_canvas_fails_but_screenshot_is_written() {
    let dir = tempfile::tempdir().unwrap();
    write_page(dir.path(), BLANK_PAGE);
    let config = config_for(18801, dir.path());

    let verdict = plate_smoke::run(&config).expect("run failed");
    assert!(matches!(verdict, Verdict::BlankCanvas));
    assert!(
        config.screenshot_path.exists(),
        "screenshot must be written before the blank verdict"
    );
}

#[test]
#[ignore] // Requires Chrome to be installed
fn missing_canvas_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    write_page(dir.path(), NO_CANVAS_PAGE);
    let config = config_for(18802, dir.path());

    let verdict = plate_smoke::run(&config).expect("run failed");
    assert!(matches!(verdict, Verdict::CanvasMissing));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn zero_dimensions_are_detected() {
    let dir = tempfile::tempdir().unwrap();
    write_page(dir.path(), ZERO_DIM_PAGE);
    let config = config_for(18803, dir.path());

    let verdict = plate_smoke::run(&config).expect("run failed");
    assert!(matches!(verdict, Verdict::ZeroDimensions));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn console_errors_are_collected() {
    let dir = tempfile::tempdir().unwrap();
    write_page(dir.path(), CONSOLE_ERROR_PAGE);
    let config = config_for(18804, dir.path());

    let verdict = plate_smoke::run(&config).expect("run failed");
    match verdict {
        Verdict::ConsoleErrors(errors) => {
            assert!(!errors.is_empty());
            assert!(errors.iter().any(|e| e.text.contains("renderer exploded")));
        }
        other => panic!("expected console errors, got {:?}", other),
    }
}

#[test]
#[ignore] // Requires Chrome to be installed
fn uncaught_exceptions_fail_the_console_check() {
    let dir = tempfile::tempdir().unwrap();
    write_page(dir.path(), THROWING_PAGE);
    let config = config_for(18805, dir.path());

    let verdict = plate_smoke::run(&config).expect("run failed");
    assert!(matches!(verdict, Verdict::ConsoleErrors(_)));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn repeated_runs_agree_and_overwrite_the_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    write_page(dir.path(), DRAWN_PAGE);
    let config = config_for(18806, dir.path());

    let first = plate_smoke::run(&config).expect("first run failed");
    assert!(first.is_pass());
    let first_meta = fs::metadata(&config.screenshot_path).expect("screenshot missing");

    // Same port, same page: the second run must bind, agree, and overwrite.
    let second = plate_smoke::run(&config).expect("second run failed");
    assert!(second.is_pass());
    let second_meta = fs::metadata(&config.screenshot_path).expect("screenshot missing");
    assert!(second_meta.modified().unwrap() >= first_meta.modified().unwrap());
}
