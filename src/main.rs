use clap::{Parser, Subcommand};
use std::error::Error;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use face_vision::capture::{CaptureSource, MockCamera};
use face_vision::config::parse_capture_size;
use face_vision::controller::SessionController;
use face_vision::predict::{HttpPredictClient, PredictConfig, check_health};
use face_vision::runner::{RunReport, run_attempt};
use face_vision::session::{Session, cleanup_old_sessions, list_sessions};

/// Face Vision - webcam face capture with prediction service classification
#[derive(Parser, Debug)]
#[command(
    name = "face-vision",
    about = "Capture a face from a webcam and classify it via a prediction service",
    after_help = "ENVIRONMENT VARIABLES:\n\
        FACE_VISION_ENDPOINT           Prediction service endpoint URL\n\
        FACE_VISION_CONNECT_TIMEOUT    Connection timeout (seconds)\n\
        FACE_VISION_REQUEST_TIMEOUT    Whole-request timeout (seconds)\n\
        FACE_VISION_SESSION_DIR        Base directory for sessions\n\
        FACE_VISION_DEVICE             V4L2 camera device path\n\
        FACE_VISION_CAPTURE_SIZE       Capture resolution preset or WxH"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture one frame and classify it
    Classify {
        /// Prediction service endpoint URL
        #[arg(long, env = "FACE_VISION_ENDPOINT", default_value = "http://127.0.0.1:8080/predict")]
        endpoint: String,

        /// Camera device path
        #[arg(short, long, env = "FACE_VISION_DEVICE", default_value = "/dev/video0")]
        device: String,

        /// Capture size: qvga (320x240), vga (640x480), hd (1280x720), fhd (1920x1080), or WxH
        #[arg(long, short = 's', env = "FACE_VISION_CAPTURE_SIZE", default_value = "vga")]
        size: String,

        /// Use the synthetic mock camera instead of a real device
        #[arg(long)]
        mock: bool,

        /// Output directory for frames (default: auto-generated in session dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep frames after completion (default: cleanup unless --output is specified)
        #[arg(long, short = 'k')]
        keep: bool,

        /// Output the attempt record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive capture session: classify, show the result, restart on demand
    Run {
        /// Prediction service endpoint URL
        #[arg(long, env = "FACE_VISION_ENDPOINT", default_value = "http://127.0.0.1:8080/predict")]
        endpoint: String,

        /// Camera device path
        #[arg(short, long, env = "FACE_VISION_DEVICE", default_value = "/dev/video0")]
        device: String,

        /// Capture size: qvga (320x240), vga (640x480), hd (1280x720), fhd (1920x1080), or WxH
        #[arg(long, short = 's', env = "FACE_VISION_CAPTURE_SIZE", default_value = "vga")]
        size: String,

        /// Use the synthetic mock camera instead of a real device
        #[arg(long)]
        mock: bool,

        /// Output directory for frames (default: auto-generated in session dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep frames after completion (default: cleanup unless --output is specified)
        #[arg(long, short = 'k')]
        keep: bool,

        /// Output the final run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored sessions, optionally removing old ones
    Sessions {
        /// Remove sessions older than this many hours
        #[arg(long, value_name = "HOURS")]
        cleanup_older_than: Option<u64>,
    },

    /// Create a synthetic face frame for testing
    Mock {
        /// Width in pixels
        #[arg(short = 'W', long, default_value = "640")]
        width: u32,

        /// Height in pixels
        #[arg(short = 'H', long, default_value = "480")]
        height: u32,

        /// Output file path
        #[arg(short, long, default_value = "./mock_face.png")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Classify {
            endpoint,
            device,
            size,
            mock,
            output,
            keep,
            json,
        }) => {
            let (width, height) = parse_capture_size(&size).ok_or_else(|| {
                format!("Invalid capture size '{}'. Use: qvga, vga, hd, fhd, or WxH", size)
            })?;

            let session = make_session(&output, keep, if mock { "mock" } else { "classify" });
            session.init()?;

            warn_if_unreachable(&endpoint, json);

            let mut controller =
                SessionController::new(HttpPredictClient::new(PredictConfig::new(&endpoint)));
            let mut source = make_source(mock, &device, width, height)?;

            let record = run_attempt(source.as_mut(), &mut controller, &session, 1)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                render_attempt(&controller);
                if let Some(path) = &record.frame_path {
                    println!("Frame: {}", path.display());
                }
            }

            // Keep session alive if needed (prevent Drop cleanup)
            if keep || output.is_some() {
                std::mem::forget(session);
            }
        }

        Some(Commands::Run {
            endpoint,
            device,
            size,
            mock,
            output,
            keep,
            json,
        }) => {
            let (width, height) = parse_capture_size(&size).ok_or_else(|| {
                format!("Invalid capture size '{}'. Use: qvga, vga, hd, fhd, or WxH", size)
            })?;

            let session = make_session(&output, keep, "run");
            session.init()?;

            warn_if_unreachable(&endpoint, json);

            let mut controller =
                SessionController::new(HttpPredictClient::new(PredictConfig::new(&endpoint)));
            let mut source = make_source(mock, &device, width, height)?;
            let mut token = controller.remount_token();

            let stdin = std::io::stdin();
            let mut lines = stdin.lock().lines();
            let mut attempts = Vec::new();
            let mut attempt = 0;

            loop {
                attempt += 1;
                let record = run_attempt(source.as_mut(), &mut controller, &session, attempt)?;
                if !json {
                    render_attempt(&controller);
                }
                attempts.push(record);

                if !json {
                    if controller.has_error() {
                        print!("Press Enter to restart capture (q to quit): ");
                    } else {
                        print!("Press Enter to capture again (q to quit): ");
                    }
                    std::io::stdout().flush()?;
                }

                match lines.next() {
                    Some(Ok(line)) if line.trim() != "q" && line.trim() != "quit" => {}
                    _ => break,
                }

                controller.reset();

                // An error recovery bumps the token; the camera must be
                // reopened so stale device state is torn down.
                if controller.remount_token() != token {
                    token = controller.remount_token();
                    source = make_source(mock, &device, width, height)?;
                }
            }

            let report = RunReport {
                success: true,
                error: None,
                attempts,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nSession: {}", session.dir.display());
            }

            // Keep session alive if needed (prevent Drop cleanup)
            if keep || output.is_some() {
                std::mem::forget(session);
            }
        }

        Some(Commands::Sessions { cleanup_older_than }) => {
            if let Some(hours) = cleanup_older_than {
                let max_age = std::time::Duration::from_secs(hours * 3600);
                let cleaned = cleanup_old_sessions(max_age)?;
                println!("Removed {} session(s) older than {}h", cleaned, hours);
            }

            let sessions = list_sessions()?;
            if sessions.is_empty() {
                println!("No stored sessions.");
            } else {
                for dir in &sessions {
                    println!("{}", dir.display());
                }
            }
        }

        Some(Commands::Mock {
            width,
            height,
            output,
        }) => {
            let mut cam = MockCamera::synthetic_face(width, height);
            let frame = cam.capture()?;
            std::fs::write(&output, &frame.image_data)?;

            println!("Created mock face frame: {}", output.display());
            println!("  Size: {}x{}", frame.width, frame.height);
        }

        None => {
            println!("Face Vision - webcam face capture with prediction service classification");
            println!();
            println!("Usage: face-vision <COMMAND>");
            println!();
            println!("Commands:");
            println!("  classify  Capture one frame and classify it");
            println!("  run       Interactive capture/classify session with restart");
            println!("  sessions  List stored sessions, optionally removing old ones");
            println!("  mock      Create a synthetic face frame for testing");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

/// Build the session for a command run, honoring --output/--keep the same
/// way for every subcommand.
fn make_session(output: &Option<PathBuf>, keep: bool, name: &str) -> Session {
    if let Some(dir) = output {
        Session::in_dir(dir.clone()).keep(true)
    } else {
        Session::with_name(name).keep(keep)
    }
}

/// Construct the capture source for this run.
fn make_source(
    mock: bool,
    device: &str,
    width: u32,
    height: u32,
) -> Result<Box<dyn CaptureSource>, Box<dyn Error>> {
    if mock {
        return Ok(Box::new(MockCamera::synthetic_face(width, height)));
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(face_vision::V4l2Camera::new(device, width, height)))
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = device;
        Err("webcam capture requires linux; use --mock on other platforms".into())
    }
}

/// Probe the endpoint before capturing so a dead service is reported early.
fn warn_if_unreachable(endpoint: &str, json: bool) {
    match check_health(endpoint, 5) {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            if !json {
                eprintln!("Warning: prediction service not responding at {}", endpoint);
                eprintln!("Captures will still be attempted.");
            }
        }
    }
}

/// Render the controller state the way the page showed it: plain result
/// text, or the error payload framed as the modal.
fn render_attempt<S: face_vision::predict::PredictService>(controller: &SessionController<S>) {
    match controller.display_text() {
        Some(text) if controller.is_modal_open() => {
            println!("+--- prediction failed ---");
            for line in text.lines() {
                println!("| {}", line);
            }
            println!("+-------------------------");
        }
        Some(text) => {
            println!("{}", text);
        }
        None => {
            println!("No result (capture device error, see log)");
        }
    }
}
