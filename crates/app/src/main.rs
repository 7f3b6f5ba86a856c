//! Entry point: logging + CLI flags, then the windowed viewer or a headless run.

mod args;

use anyhow::Result;
use platform::{ModelScene, ViewerConfig};
use renderer::{HeadlessBackend, HeadlessPass, RenderBackend};

use crate::args::AppArgs;

/// Simulated frame time of a headless run.
const HEADLESS_DT: f32 = 1.0 / 60.0;

/// Load the model and render `frames` frames on the headless backend.
fn run_headless(config: &ViewerConfig, frames: u32) -> Result<()> {
    let model = config.load_model()?;
    let backend = HeadlessBackend::new();
    let aspect = config.width as f32 / config.height as f32;
    let mut scene = ModelScene::new(&backend, model, aspect, config.anim_fps)?;

    let mut pass = HeadlessPass::new();
    for _ in 0..frames {
        scene.advance(&backend, HEADLESS_DT)?;
        scene.draw(&backend, &mut pass)?;
    }
    log::info!(
        "[{}] rendered {frames} frames: {} draws, {} vertices, final animation frame {:.2} of {}",
        backend.name(),
        pass.draws.len(),
        pass.vertices_drawn(),
        scene.frame(),
        scene.object().frame_count()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = AppArgs::from_env();
    let config = args.viewer_config()?;
    log::info!(
        "Starting model viewer. Model: {}, object: {:?}, backend: {:?}, window_size={}x{}",
        config.model.display(),
        config.object,
        config.backends,
        config.width,
        config.height
    );

    match args.headless {
        Some(frames) => run_headless(&config, frames)?,
        None => platform::run_viewer(config)?,
    }

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
