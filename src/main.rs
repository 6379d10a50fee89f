mod background;
mod capture;
mod compose;
mod config;
mod effects;
mod imgproc;
mod output;
mod pipeline;
mod segmentation;

use anyhow::{Context, Result};
use background::BackgroundSource;
use capture::{CaptureSource, WebcamCapture};
use clap::Parser;
use config::FrameSpec;
use effects::{Effect, Hologram, Shadow};
use output::{LoopbackOutput, OutputSink};
use pipeline::Pipeline;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image (jpg/png) or video (mp4) used as the replacement background
    #[arg(short, long)]
    background: PathBuf,

    /// Add a drop-shadow effect
    #[arg(long)]
    shadow: bool,

    /// Add a hologram effect
    #[arg(long)]
    hologram: bool,

    /// Initial background blur level
    #[arg(long, default_value_t = 0)]
    blur: u32,

    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Capture resolution width
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Camera frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Control-surface commands a driving loop may issue between iterations.
enum Command {
    CycleBlur,
    ToggleReplacement,
    AdvanceBackground,
    ResetModel,
    Quit,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Backdrop starting");
    tracing::info!("Capture: {}x{}@{}", args.width, args.height, args.fps);

    let spec = FrameSpec::new(args.width, args.height, args.fps);

    // Initialize capture
    let mut capture = WebcamCapture::new(args.input_device, &spec)
        .context("Failed to initialize webcam capture")?;

    // Initialize output
    let mut output = LoopbackOutput::new(&args.output_device, spec.width, spec.height)
        .context("Failed to initialize v4l2loopback output")?;

    // Load the replacement background and assemble the pipeline
    let background_source = BackgroundSource::open(&args.background, &spec)
        .with_context(|| format!("Failed to load background {}", args.background.display()))?;
    let mut pipeline = Pipeline::new(&spec, background_source);
    if args.shadow {
        pipeline.add_effect(Effect::Shadow(Shadow::default()));
    }
    if args.hologram {
        pipeline.add_effect(Effect::Hologram(Hologram));
    }
    if args.blur > 0 {
        pipeline.set_blur_level(args.blur);
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    let commands = spawn_control_reader();

    // Main loop
    run_pipeline(&mut capture, &mut output, &mut pipeline, &stop, &commands)?;

    tracing::info!("Backdrop stopped");
    Ok(())
}

/// Reads control keys from stdin on a dedicated thread. The pipeline itself
/// stays single-threaded; commands are drained between iterations.
fn spawn_control_reader() -> Receiver<Command> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim().chars().next() {
                Some('b') => Command::CycleBlur,
                Some('d') => Command::ToggleReplacement,
                Some('f') => Command::AdvanceBackground,
                Some('r') => Command::ResetModel,
                Some('q') => Command::Quit,
                _ => continue,
            };
            if sender.send(command).is_err() {
                break;
            }
        }
    });
    receiver
}

fn show_help() {
    tracing::info!(
        "(q)uit - (b)lur level - (f)orward bg video - (r)eset bg mask - (d)isable bg replace"
    );
}

fn run_pipeline<C, O>(
    capture: &mut C,
    output: &mut O,
    pipeline: &mut Pipeline,
    stop: &AtomicBool,
    commands: &Receiver<Command>,
) -> Result<()>
where
    C: CaptureSource,
    O: OutputSink,
{
    let mut frame_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_process_time = Duration::ZERO;
    let mut total_output_time = Duration::ZERO;
    let mut was_learning = true;

    tracing::info!("Starting main pipeline loop");
    show_help();

    while !stop.load(Ordering::SeqCst) {
        // Drain control commands between iterations
        while let Ok(command) = commands.try_recv() {
            match command {
                Command::CycleBlur => {
                    let level = pipeline.cycle_blur_level();
                    tracing::info!("blur level set to {}", level);
                }
                Command::ToggleReplacement => {
                    if pipeline.toggle_replacement() {
                        tracing::info!("background replacement enabled");
                    } else {
                        tracing::info!("background replacement disabled");
                    }
                }
                Command::AdvanceBackground => {
                    pipeline
                        .advance_background()
                        .context("Failed to advance background")?;
                }
                Command::ResetModel => pipeline.reset_model(),
                Command::Quit => return Ok(()),
            }
        }

        // Capture frame
        let capture_start = Instant::now();
        let frame = capture.capture_frame().context("Failed to capture frame")?;
        total_capture_time += capture_start.elapsed();

        // Segment, apply effects, composite
        let process_start = Instant::now();
        let output_frame = pipeline
            .process_frame(&frame)
            .context("Failed to process frame")?;
        total_process_time += process_start.elapsed();

        if was_learning && !pipeline.is_learning() {
            show_help();
        }
        was_learning = pipeline.is_learning();

        // Output frame
        let output_start = Instant::now();
        output
            .write_frame(&output_frame)
            .context("Failed to write frame")?;
        total_output_time += output_start.elapsed();

        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_process_ms = total_process_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_output_ms = total_output_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let total_ms = avg_capture_ms + avg_process_ms + avg_output_ms;
            let actual_fps = 1000.0 / total_ms;

            tracing::info!(
                "Frame {}: capture={:.1}ms, process={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
                frame_count,
                avg_capture_ms,
                avg_process_ms,
                avg_output_ms,
                total_ms,
                actual_fps
            );
        }
    }

    Ok(())
}
