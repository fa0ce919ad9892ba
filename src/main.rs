//! MRV Player CLI - Load a movie and play it against a simulated clock.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use mrv_player::{
    CpuPresenter, GpuPresenter, Player, PlayerConfig, PlayerError,
    render::gpu::GpuError,
};

struct Options {
    movie: PathBuf,
    frames: Option<usize>,
    config: Option<PathBuf>,
    gpu: bool,
    json: bool,
    highlight: bool,
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--example-config") {
        print_example_config();
        return;
    }

    let Some(options) = parse_args(&args) else {
        print_usage(&args[0]);
        std::process::exit(1);
    };

    if let Err(e) = run(options) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} <movie.mrv> [frames] [options]");
    eprintln!();
    eprintln!("Decode an MRV movie and play it against a simulated clock.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  movie.mrv        Zip archive holding data.bin or movie.abin");
    eprintln!("  frames           Number of frames to play (default: one full loop)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file>  Player configuration (JSON)");
    eprintln!("  --gpu            Present through wgpu instead of the CPU resolver");
    eprintln!("  --highlight      Highlight changed cells");
    eprintln!("  --json           Print the final state as JSON");
    eprintln!("  --example-config Print the default configuration");
}

fn parse_args(args: &[String]) -> Option<Options> {
    let mut movie = None;
    let mut frames = None;
    let mut config = None;
    let mut gpu = false;
    let mut json = false;
    let mut highlight = false;

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(rest.next()?)),
            "--gpu" => gpu = true,
            "--json" => json = true,
            "--highlight" => highlight = true,
            flag if flag.starts_with("--") => return None,
            value if movie.is_none() => movie = Some(PathBuf::from(value)),
            value if frames.is_none() => frames = Some(value.parse().ok()?),
            _ => return None,
        }
    }

    Some(Options {
        movie: movie?,
        frames,
        config,
        gpu,
        json,
        highlight,
    })
}

fn run(options: Options) -> Result<(), PlayerError> {
    let config = match &options.config {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|e| PlayerError::Container(e.into()))?;
            PlayerConfig::from_json(&json)?
        }
        None => PlayerConfig::default(),
    };

    let mut player = Player::new(config)?;

    println!("MRV Player");
    println!("==========");
    println!("Movie: {}", options.movie.display());

    let start = Instant::now();
    let mut last_message = String::new();
    let report = player.load_file(&options.movie, &mut |percent: f32, message: &str| {
        if message != last_message {
            println!("  [{percent:5.1}%] {message}");
            last_message = message.to_string();
        }
    })?;
    let load_time = start.elapsed();

    println!();
    println!("Layout: {} ({})", report.layout.name(), report.entry);
    println!("Grid: {}x{}", report.width, report.height);
    println!("Frames: {} ({} keyframes) at {} fps", report.frames, report.keyframes, report.fps);
    if let Some(truncation) = &report.truncation {
        println!("Warning: {truncation}");
    }
    println!("Load time: {:.2}s", load_time.as_secs_f32());
    println!();

    if options.gpu {
        let header = *player.header().ok_or(PlayerError::NotLoaded)?;
        match pollster::block_on(GpuPresenter::new(&header)) {
            Ok(presenter) => player.set_presenter(Box::new(presenter)),
            Err(GpuError::NoAdapter) => {
                log::warn!("no GPU adapter available, presenting on the CPU");
                player.set_presenter(Box::new(CpuPresenter::new()));
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        player.set_presenter(Box::new(CpuPresenter::new()));
    }
    player.set_highlight(options.highlight);

    // Simulated clock: one tick per nominal frame interval.
    let frames = options.frames.unwrap_or(report.frames);
    let interval = 1000.0 / report.fps as f64;

    println!("Playing {frames} frames...");
    let start = Instant::now();
    player.play(0.0)?;
    for i in 1..=frames {
        player.tick(i as f64 * interval)?;

        // Print progress every 10%
        if i % (frames / 10).max(1) == 0 {
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Tick {}/{}: frame={}, {:.1} frames/s",
                i,
                frames,
                player.current_frame().unwrap_or(0),
                i as f32 / elapsed.max(f32::EPSILON)
            );
        }
    }
    player.pause()?;
    let elapsed = start.elapsed();

    let snapshot = player.snapshot().ok_or(PlayerError::NotLoaded)?;
    let listing = player.delta_listing()?;

    println!();
    if options.json {
        let state = serde_json::json!({
            "load": report,
            "debug": snapshot,
            "delta": listing,
            "presented": player.presented(),
        });
        match serde_json::to_string_pretty(&state) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error serializing state: {e}"),
        }
    } else {
        println!("Final state:");
        print!("{snapshot}");
        println!();
        print!("{listing}");
        println!();
        println!("Presents: {}", player.presented());
    }
    println!(
        "Time: {:.2}s ({:.1} frames/s)",
        elapsed.as_secs_f32(),
        frames as f32 / elapsed.as_secs_f32().max(f32::EPSILON)
    );

    Ok(())
}

fn print_example_config() {
    let config = PlayerConfig::default();

    println!("Example configuration (player.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Error serializing config: {e}"),
    }
}
