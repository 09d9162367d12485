//! Tagalong terminal demo: a prop circles the origin and a label follows it.
//!
//! Controls:
//!   - WASD / Arrow Keys: Orbit the camera
//!   - IJKL: Pan
//!   - +/-: Zoom
//!   - Q/ESC: Quit

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tagalong_core::SceneConfig;
use tagalong_terminal::{PropSource, TerminalApp};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tagalong-terminal", version, about = "Screen-space label tracking in the terminal")]
struct Args {
    /// Scene configuration (TOML). Defaults reproduce the stock scene.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// STL model to use as the prop instead of the stock cylinder
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Override the configured frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Label text
    #[arg(short, long, default_value = "agent")]
    label: String,

    /// Log file; the terminal itself is taken by the renderer
    #[arg(long, default_value = "tagalong.log")]
    log_file: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let log = File::create(&args.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let mut config = match &args.config {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.target_fps = fps;
        config.validate()?;
    }

    println!("Tagalong Terminal Renderer - Loading...");
    let prop = PropSource::from_config(&config, args.model);
    let mut app = TerminalApp::new(&config, prop, args.label)?;
    app.run()?;

    Ok(())
}
