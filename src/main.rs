use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ Parser, ValueEnum };
use log::{ error, info, warn, LevelFilter };

use bounce_tracer::canvas::{ Canvas, FrameSink, NullSink };
use bounce_tracer::color::Color;
use bounce_tracer::config::RenderConfig;
use bounce_tracer::consts::{ ENERGY_THRESHOLD, MAX_BOUNCE_DEPTH, OUT_DIR,
    OUT_FORMAT, PREVIEW_INTERVAL_MS };
use bounce_tracer::error::RenderError;
use bounce_tracer::scene::Scene;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
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

/// Renders JSON scene descriptions with a multithreaded ray tracer.
#[derive(Parser, Debug)]
#[clap(name = "bounce-tracer", version, about)]
struct Args {
    /// Scene files to render, one image each
    #[clap(required = true)]
    scenes: Vec<PathBuf>,

    /// Directory to write images to
    #[clap(short, long, default_value = OUT_DIR)]
    out_dir: PathBuf,

    /// Image file extension (ppm, png, ...)
    #[clap(short, long, default_value = OUT_FORMAT)]
    format: String,

    /// Worker threads; defaults to one less than the hardware threads
    #[clap(short = 'j', long)]
    threads: Option<usize>,

    /// Most bounces traced for any pixel
    #[clap(long, default_value_t = MAX_BOUNCE_DEPTH)]
    max_depth: u32,

    /// Stop tracing a pixel once its remaining energy drops below this
    #[clap(long, default_value_t = ENERGY_THRESHOLD)]
    energy_threshold: f64,

    /// Milliseconds between preview refreshes
    #[clap(long, default_value_t = PREVIEW_INTERVAL_MS)]
    preview_interval_ms: u64,

    /// Keep an image of the render in progress at this path
    #[clap(long)]
    preview: Option<PathBuf>,

    /// Set the logging level
    #[clap(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

/// Writes every refreshed frame to an image file.
struct PreviewFile {
    path: PathBuf,
    frame: Canvas,
    failed: bool,
}

impl FrameSink for PreviewFile {
    fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        self.frame.write_pixel(x, y, &color);
    }

    fn present(&mut self) {
        if let Err(e) = self.frame.save(&self.path) {
            // Only complain once per render.
            if !self.failed {
                warn!("Could not write preview to {}: {}", self.path.display(), e);
                self.failed = true;
            }
        }
    }
}

fn render_scene(scene: Scene, config: &RenderConfig, out: &Path,
    preview: Option<&Path>) -> Result<(), RenderError> {
    let Scene { world, camera } = scene;
    let world = Arc::new(world);

    let image = match preview {
        Some(path) => {
            let mut sink = PreviewFile {
                path: path.to_path_buf(),
                frame: Canvas::new(camera.width(), camera.height()),
                failed: false,
            };
            camera.render(world, config, &mut sink)?
        },
        None => camera.render(world, config, &mut NullSink)?,
    };

    image.save(out)?;
    info!("Saved render to {}.", out.display());

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    let config = RenderConfig {
        max_depth: args.max_depth,
        energy_threshold: args.energy_threshold,
        threads: args.threads,
        preview_interval: Duration::from_millis(args.preview_interval_ms),
    };

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let mut failures = 0;
    for path in args.scenes.iter() {
        let scene = match Scene::load(path) {
            Ok(scene) => scene,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                failures += 1;
                continue;
            },
        };

        let mut name = path.file_stem()
            .unwrap_or_else(|| path.as_os_str())
            .to_os_string();
        name.push(".");
        name.push(&args.format);
        let out = args.out_dir.join(name);

        match render_scene(scene, &config, &out, args.preview.as_deref()) {
            Ok(()) => {},
            Err(e @ RenderError::Spawn(_)) => {
                return Err(e).with_context(|| format!("rendering {}", path.display()));
            },
            Err(e) => {
                error!("Could not render {}: {}", path.display(), e);
                failures += 1;
            },
        }
    }

    if failures > 0 {
        warn!("{} of {} scenes failed", failures, args.scenes.len());
    }

    Ok(())
}
