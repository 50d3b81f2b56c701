//! `prism` - render a scene description file to an image.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{has_scene_extension, wants_png, Args};
use prism_renderer::{generate_buckets, render_with_progress, save_png, save_ppm, RenderConfig};

fn init_logger(args: &Args) {
    // RUST_LOG, when set, takes precedence over --log-level
    env_logger::Builder::new()
        .filter_level(args.log_level.into())
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args);

    if !has_scene_extension(&args.input) {
        bail!(
            "Scene file must have a .txt extension: {}",
            args.input.display()
        );
    }

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the worker thread pool")?;
    }

    let scene = prism_core::load_scene(&args.input)
        .with_context(|| format!("Failed to load scene {}", args.input.display()))?
        .with_soft_shadows(args.soft_shadows);

    let config = RenderConfig {
        bucket_size: args.bucket_size,
        seed: args.seed,
    };

    let bucket_count = generate_buckets(scene.width, scene.height, config.bucket_size).len();
    let pb = ProgressBar::new(bucket_count as u64);
    pb.set_style(ProgressStyle::default_bar().template("{bar:40} {pos}/{len} buckets ETA: {eta}")?);

    let image = render_with_progress(&scene, &config, |_| pb.inc(1));
    pb.finish_and_clear();

    let output = args.output_path();
    if wants_png(&output) {
        save_png(&image, &output)?;
    } else {
        save_ppm(&image, &output)?;
    }

    log::info!(
        "Saved {}x{} image to {}",
        image.width,
        image.height,
        output.display()
    );
    Ok(())
}
