use clap::Parser;
use plate_smoke::{Error, SmokeConfig, Verdict};
use std::path::PathBuf;
use std::time::Duration;

/// Headless-browser smoke test for canvas rendering.
///
/// Serves a directory over HTTP, loads it in headless Chrome, and verifies
/// the canvas element rendered. Exits 0 on pass, 1 on any failure.
#[derive(Parser, Debug)]
#[command(name = "plate-smoke", version)]
struct Args {
    /// Port for the local file server
    #[arg(long, default_value_t = 8765)]
    port: u16,

    /// Directory to serve as the page under test
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// DOM id of the canvas element to verify
    #[arg(long, default_value = "plate-canvas")]
    canvas_id: String,

    /// Path of the screenshot artifact (overwritten each run)
    #[arg(long, default_value = "smoke-test.png")]
    screenshot: PathBuf,

    /// Upper bound in milliseconds for rendering to settle after load
    #[arg(long, default_value_t = 2000)]
    settle_ms: u64,
}

fn main() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .try_init();

    let args = Args::parse();
    let config = SmokeConfig {
        port: args.port,
        serve_root: args.root,
        canvas_id: args.canvas_id,
        screenshot_path: args.screenshot,
        settle: Duration::from_millis(args.settle_ms),
        ..Default::default()
    };

    std::process::exit(run(&config));
}

fn run(config: &SmokeConfig) -> i32 {
    match plate_smoke::run(config) {
        Ok(verdict) => {
            report(&verdict, config);
            verdict.exit_code()
        }
        Err(Error::BrowserUnavailable(msg)) => {
            println!("❌ Headless Chrome not available: {}", msg);
            println!("Install Chrome or Chromium and make sure it is on PATH,");
            println!("or point the CHROME environment variable at the executable.");
            1
        }
        Err(e) => {
            println!("❌ SMOKE TEST FAILED: {}", e);
            print_chain(&e);
            1
        }
    }
}

fn report(verdict: &Verdict, config: &SmokeConfig) {
    match verdict {
        Verdict::Passed { width, height } => {
            println!("✓ SMOKE TEST PASSED");
            println!("  Canvas size: {}x{}", width, height);
            println!("  Screenshot saved: {}", config.screenshot_path.display());
        }
        Verdict::CanvasMissing => {
            println!("❌ SMOKE TEST FAILED: Canvas element not found");
        }
        Verdict::ConsoleErrors(errors) => {
            println!("❌ SMOKE TEST FAILED: Console errors detected:");
            for err in errors {
                println!("  {}", err);
            }
        }
        Verdict::ZeroDimensions => {
            println!("❌ SMOKE TEST FAILED: Canvas has zero dimensions");
        }
        Verdict::BlankCanvas => {
            println!("❌ SMOKE TEST FAILED: Canvas is blank (no rendering detected)");
            println!(
                "  Screenshot saved to: {}",
                config.screenshot_path.display()
            );
        }
    }
}

fn print_chain(err: &dyn std::error::Error) {
    let mut source = err.source();
    while let Some(cause) = source {
        println!("  caused by: {}", cause);
        source = cause.source();
    }
}
