use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use feature_cli::{
    default_threads, init_thread_pool, resolve_descriptor_name, resolve_detector_name, run, CliConfig, Output,
    PipelineError, PipelineResult, RunRequest, Task,
};
use log::{error, info, warn};

/// Detect, describe and match 2D image features.
#[derive(Parser, Debug)]
#[command(name = "feature2d", version, about = "Feature 2D", allow_negative_numbers = true)]
struct CliArgs {
    /// 1: detecting, 2: matching, 3: MSER regions
    #[arg(short = 't', long = "task")]
    task: i64,
    /// Keypoint detector: 1 AKAZE, 2 KAZE, 3 FAST, 4 BRISK, 5 ORB, 6 MSD, 7 Star, 8 AGAST, 9 GFTT
    #[arg(short = 'k', long = "keypoint")]
    keypoint: Option<i64>,
    /// Descriptor: 1 AKAZE, 2 KAZE, 3 BRISK, 4 ORB, 5 BRIEF, 6 DAISY, 7 BoostDesc, 8 FREAK, 9 LATCH,
    /// 10 LUCID, 11 VGG
    #[arg(short = 'd', long = "descriptor")]
    descriptor: Option<i64>,
    /// Input image 1
    #[arg(short = 'i', long = "input1", value_name = "FILE")]
    input1: PathBuf,
    /// Input image 2 (for matching)
    #[arg(short = 'j', long = "input2", value_name = "FILE")]
    input2: Option<PathBuf>,
    /// Output directory
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: PathBuf,
    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log filter, e.g. "info" or "feature_match=debug"
    #[arg(long)]
    log_level: Option<String>,
    /// Worker threads (0 = one per CPU)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
}

fn load_config(args: &CliArgs) -> PipelineResult<CliConfig> {
    let mut config = match &args.config {
        Some(path) => CliConfig::load_toml(path)?,
        None => CliConfig::default(),
    };
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    Ok(config)
}

fn init_logger(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.target(env_logger::Target::Stderr);
    builder.filter_level(log::LevelFilter::Info);
    builder.parse_filters(level);
    if let Ok(env) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env);
    }
    if let Err(err) = builder.try_init() {
        eprintln!("Failed to initialize logger: {}", err);
    }
}

fn execute(args: &CliArgs, config: &CliConfig) -> PipelineResult<()> {
    let task = Task::try_from(args.task)?;
    info!(
        "task {:?}, detector {}, descriptor {}",
        task,
        args.keypoint.map_or("-", resolve_detector_name),
        args.descriptor.map_or("-", resolve_descriptor_name)
    );

    let threads = if config.threads == 0 { default_threads() } else { config.threads };
    init_thread_pool(threads)?;

    let request = RunRequest {
        task,
        detector: args.keypoint,
        descriptor: args.descriptor,
        input1: args.input1.clone(),
        input2: args.input2.clone(),
    };

    match run(&request)? {
        Output::Produced(image) => {
            std::fs::create_dir_all(&args.output)?;
            let path = args.output.join(&config.output_name);
            image.save(&path)?;
            info!("Output saved to {}", path.display());
        }
        Output::Nothing(why) => warn!("nothing to write: {}", why),
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    init_logger(&config.log_level);

    match execute(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ (PipelineError::InvalidTask(_) | PipelineError::MissingInput(_) | PipelineError::Feature(_))) => {
            error!("{}", err);
            ExitCode::from(2)
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
