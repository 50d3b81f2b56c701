use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// Log levels selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(about = "A Whitted-style ray tracer")]
pub struct Args {
    /// Scene description file (.txt)
    pub input: PathBuf,

    /// Average jittered shadow rays instead of a single hard test
    #[arg(short, long)]
    pub soft_shadows: bool,

    /// Output image (.png, anything else is written as PPM).
    /// Defaults to the input path with a .ppm extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed for the soft shadow jitter
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Bucket edge length in pixels
    #[arg(long, default_value_t = prism_renderer::DEFAULT_BUCKET_SIZE)]
    pub bucket_size: u32,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Logging level, overridden by RUST_LOG
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("ppm"))
    }
}

/// Scene files must carry a `.txt` extension.
pub fn has_scene_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "txt")
}

/// PNG output is chosen by extension, case-insensitively.
pub fn wants_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}
