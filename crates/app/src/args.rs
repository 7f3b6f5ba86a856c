//! Command-line flags, all of the form `--flag=value`.

use std::path::PathBuf;

use anyhow::{Result, bail};
use asset::model::DEFAULT_SAMPLE_RATE;
use platform::ViewerConfig;

/// Frames rendered by a bare `--headless`.
pub const DEFAULT_HEADLESS_FRAMES: u32 = 120;

#[derive(Clone, Debug, PartialEq)]
pub struct AppArgs {
    pub model: Option<PathBuf>,
    pub object: Option<String>,
    pub animation: Option<String>,
    /// Playback speed in baked frames per second; defaults to the bake rate.
    pub anim_fps: Option<f32>,
    pub sample_rate: f32,
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    /// Frames to render on the headless backend instead of opening a window.
    pub headless: Option<u32>,
}

impl Default for AppArgs {
    fn default() -> Self {
        Self {
            model: None,
            object: None,
            animation: None,
            anim_fps: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            headless: None,
        }
    }
}

fn parse_backend(val: &str) -> wgpu::Backends {
    // auto|vulkan|dx12|metal|gl
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{other}', falling back to auto.");
            wgpu::Backends::all()
        }
    }
}

/// Positive, finite rate or `None` (with a warning).
fn parse_rate(flag: &str, val: &str) -> Option<f32> {
    match val.parse::<f32>() {
        Ok(v) if v.is_finite() && v > 0.0 => Some(v),
        _ => {
            log::warn!("Ignoring {flag}={val}: expected a positive number");
            None
        }
    }
}

fn non_empty(val: &str) -> Option<String> {
    (!val.is_empty()).then(|| val.to_string())
}

impl AppArgs {
    /// Parse flags, skipping the program name if present. Later flags win.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::default();
        let mut w: Option<u32> = None;
        let mut h: Option<u32> = None;

        for arg in args {
            let arg = arg.as_ref();
            if let Some(v) = arg.strip_prefix("--model=") {
                out.model = non_empty(v).map(PathBuf::from);
            } else if let Some(v) = arg.strip_prefix("--object=") {
                out.object = non_empty(v);
            } else if let Some(v) = arg.strip_prefix("--animation=") {
                out.animation = non_empty(v);
            } else if let Some(v) = arg.strip_prefix("--anim-fps=") {
                out.anim_fps = parse_rate("--anim-fps", v).or(out.anim_fps);
            } else if let Some(v) = arg.strip_prefix("--sample-rate=") {
                out.sample_rate = parse_rate("--sample-rate", v).unwrap_or(out.sample_rate);
            } else if let Some(v) = arg.strip_prefix("--gpu-backend=") {
                out.backends = parse_backend(v);
            } else if let Some(v) = arg.strip_prefix("--size=") {
                if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                    if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                        w = Some(pw);
                        h = Some(ph);
                    }
                }
            } else if let Some(v) = arg.strip_prefix("--width=") {
                if let Ok(pw) = v.parse::<u32>() {
                    w = Some(pw);
                }
            } else if let Some(v) = arg.strip_prefix("--height=") {
                if let Ok(ph) = v.parse::<u32>() {
                    h = Some(ph);
                }
            } else if arg == "--headless" {
                out.headless = Some(DEFAULT_HEADLESS_FRAMES);
            } else if let Some(v) = arg.strip_prefix("--headless=") {
                out.headless = Some(v.parse::<u32>().unwrap_or_else(|_| {
                    log::warn!("Ignoring --headless={v}: expected a frame count");
                    DEFAULT_HEADLESS_FRAMES
                }));
            } else if arg.starts_with("--") {
                log::warn!("Unknown flag '{arg}'");
            }
        }

        out.width = w.unwrap_or(out.width).max(1);
        out.height = h.unwrap_or(out.height).max(1);
        out
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    /// Viewer settings; fails when no model was given.
    pub fn viewer_config(&self) -> Result<ViewerConfig> {
        let Some(model) = &self.model else {
            bail!("No model given; pass --model=PATH (.gltf, .glb or .obj)");
        };
        let mut config = ViewerConfig::new(model);
        config.object = self.object.clone();
        config.animation = self.animation.clone();
        config.sample_rate = self.sample_rate;
        config.anim_fps = self.anim_fps.unwrap_or(self.sample_rate);
        config.backends = self.backends;
        config.width = self.width;
        config.height = self.height;
        Ok(config)
    }
}
