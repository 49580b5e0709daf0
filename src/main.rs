use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use click_spark::config::{default_config_path, AppConfig};
use click_spark::graphics::easing::Easing;
use click_spark::{RenderEventLoop, RenderLoopRunArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sparks burst from every click", long_about = None)]
struct Args {
    /// Config file, defaults to <config dir>/click_spark/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for reproducible spark bursts
    #[arg(long)]
    seed: Option<u64>,

    /// Sparks per click, clamped to 3..=20
    #[arg(long)]
    spark_count: Option<i64>,

    /// Spark lifetime in milliseconds
    #[arg(long)]
    duration: Option<f32>,

    /// linear, ease-in, ease-out or ease-in-out
    #[arg(long)]
    easing: Option<Easing>,

    /// Maximum number of live sparks
    #[arg(long)]
    max_sparks: Option<i64>,

    /// Hex color, e.g. "#1E6BFF"
    #[arg(long)]
    spark_color: Option<String>,
}

impl Args {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(count) = self.spark_count {
            config.spark.spark_count = count;
        }
        if let Some(duration) = self.duration {
            config.spark.duration = duration;
        }
        if let Some(easing) = self.easing {
            config.spark.easing = easing;
        }
        if let Some(max_sparks) = self.max_sparks {
            config.spark.max_sparks = max_sparks;
        }
        if let Some(color) = &self.spark_color {
            config.spark.spark_color = color.clone();
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match args.config.clone().or_else(default_config_path) {
        Some(path) => match AppConfig::load_or_default(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("main: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            log::warn!("main: no config directory, using defaults");
            AppConfig::default()
        }
    };
    args.apply_overrides(&mut config);

    let result = RenderEventLoop::new().and_then(|event_loop| {
        event_loop.run(RenderLoopRunArgs {
            config,
            seed: args.seed,
        })
    });
    if let Err(e) = result {
        log::error!("main: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
