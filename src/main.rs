use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use backtrace::Backtrace;
use clap::Parser;
use ringlog::*;

use wallclock_profiler::config::Config;
use wallclock_profiler::wallclock::filter::AllowList;
use wallclock_profiler::wallclock::recorder::InMemoryRecorder;
use wallclock_profiler::wallclock::{Args, Collaborators, Engine};

/// Runs the wall-clock sampling engine standalone against this process for
/// a fixed duration and reports how many samples it collected.
#[derive(Parser)]
#[command(version, about = "Wall-clock sampling engine demo", long_about = None)]
struct Cli {
    /// Path to a TOML config file. When omitted, built-in defaults are used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// How long to sample before stopping.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "2s")]
    duration: Duration,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    std::panic::set_hook(Box::new(|s| {
        eprintln!("{s}");
        eprintln!("{:?}", Backtrace::new());
        std::process::exit(101);
    }));

    let cli = Cli::parse();

    let config: Config = match &cli.config {
        Some(path) => match Config::load(&path) {
            Ok(c) => c,
            Err(error) => {
                eprintln!("error loading config file: {}\n{error}", path.display());
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let level = match cli.verbose {
        0 => config.log().level().unwrap_or(Level::Info),
        1 => Level::Debug,
        _ => Level::Trace,
    };

    let debug_output: Box<dyn Output> = Box::new(Stderr::new());

    let debug_log = if level <= Level::Info {
        LogBuilder::new().format(ringlog::default_format)
    } else {
        LogBuilder::new()
    }
    .output(debug_output)
    .build()
    .expect("failed to initialize debug log");

    let mut log = MultiLogBuilder::new()
        .level_filter(level.to_level_filter())
        .default(debug_log)
        .build()
        .start();

    let args: Args = match config.wallclock_args() {
        Ok(a) => a,
        Err(error) => {
            eprintln!("invalid wallclock config: {error}");
            std::process::exit(1);
        }
    };

    let recorder = Arc::new(InMemoryRecorder::new());
    let mut collaborators = Collaborators::linux_standalone(recorder.clone());

    let allowed_tids = config.general().allowed_tids();
    if !allowed_tids.is_empty() {
        collaborators.filter = Arc::new(AllowList::new(allowed_tids.iter().copied()));
    }

    let engine = match Engine::start(args, collaborators) {
        Ok(e) => e,
        Err(error) => {
            error!("failed to start wallclock engine: {error}");
            std::process::exit(1);
        }
    };

    info!("sampling self for {:?}", cli.duration);
    std::thread::sleep(cli.duration);

    engine.stop();

    let _ = log.flush();

    println!("recorded {} samples", recorder.len());
}
