use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::audio::LogAudioOutput;
use crate::composer::{compose, reference_layout};
use crate::config::{LoadingGateSettings, SceneConfig};
use crate::frame_loop::{Clock, ManualClock};
use crate::gpu::renderer::Renderer;
use crate::hero::{EntranceTimeline, HeroContent};
use crate::pointer::CursorCell;
use crate::random::SmallRngSource;
use crate::scene::{SceneHost, SceneRoot, SceneStatus};
use crate::scene_graph::InstanceId;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render frames of the hero scene to disk
    Render {
        /// Output directory for frames
        #[arg(long)]
        out: PathBuf,

        /// Number of frames to render
        #[arg(long, default_value_t = 120)]
        frames: u32,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f64,

        /// Output width
        #[arg(long, default_value_t = 800)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 600)]
        height: u32,

        /// Seed for particle placement, entrance timing and click spins
        #[arg(long)]
        seed: Option<u64>,

        /// Click an instance on a frame, as FRAME:INSTANCE (repeatable)
        #[arg(long = "click", value_parser = parse_click)]
        clicks: Vec<ScriptedClick>,

        /// Scene config JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the composed model layout as JSON
    Layout {
        /// Scene config JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print sampled hero entrance styles as JSON lines
    Timeline {
        /// Hero content JSON file
        #[arg(long)]
        content: PathBuf,

        /// Samples per second
        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// Seed for the letter shuffle
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the loading overlay
        #[arg(long)]
        no_gate: bool,

        /// Scene config JSON file (loading overlay timing)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Open an interactive window
    View {
        /// Scene config JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// A click scheduled for a given frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptedClick {
    pub frame: u32,
    pub instance: usize,
}

fn parse_click(arg: &str) -> Result<ScriptedClick, String> {
    let (frame, instance) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected FRAME:INSTANCE, got '{}'", arg))?;
    let frame = frame
        .trim()
        .parse()
        .map_err(|e| format!("bad frame '{}': {}", frame, e))?;
    let instance = instance
        .trim()
        .parse()
        .map_err(|e| format!("bad instance '{}': {}", instance, e))?;
    Ok(ScriptedClick { frame, instance })
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            out,
            frames,
            fps,
            width,
            height,
            seed,
            clicks,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            pollster::block_on(render_offline(RenderJob {
                config,
                out_dir: out,
                frames,
                fps,
                width,
                height,
                seed,
                clicks,
            }))?;
        }
        Commands::Layout { config } => {
            // Validates the config even though the layout is fixed.
            load_config(config.as_deref())?;
            let layout = compose(&reference_layout());
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        Commands::Timeline {
            content,
            fps,
            seed,
            no_gate,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let json = std::fs::read_to_string(&content)
                .with_context(|| format!("failed to read content '{}'", content.display()))?;
            let content = HeroContent::from_json_str(&json)?;
            print_timeline(&content, fps, seed, gate_for(&config, no_gate))?;
        }
        Commands::View { config } => {
            let config = load_config(config.as_deref())?;
            crate::viewer::run(config)?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::from_json_file(path),
        None => Ok(SceneConfig::default()),
    }
}

fn rng_for(seed: Option<u64>) -> SmallRngSource {
    match seed {
        Some(seed) => SmallRngSource::seeded(seed),
        None => SmallRngSource::from_entropy(),
    }
}

fn gate_for(config: &SceneConfig, no_gate: bool) -> Option<&LoadingGateSettings> {
    if no_gate {
        None
    } else {
        config.loading_gate.active()
    }
}

fn print_timeline(
    content: &HeroContent,
    fps: f64,
    seed: Option<u64>,
    gate: Option<&LoadingGateSettings>,
) -> Result<()> {
    if !(fps > 0.0) {
        bail!("fps must be positive, got {}", fps);
    }
    let mut timeline = EntranceTimeline::new(content, gate);
    let mut rng = rng_for(seed);
    timeline.mount(0.0, &mut rng);

    let samples = (timeline.duration() as f64 * fps).ceil() as u64;
    for i in 0..=samples {
        let t = i as f64 / fps;
        timeline.frame(t);
        let line = serde_json::json!({
            "t": t,
            "elements": timeline.elements(),
        });
        println!("{}", line);
    }
    timeline.unmount();
    Ok(())
}

struct RenderJob {
    config: SceneConfig,
    out_dir: PathBuf,
    frames: u32,
    fps: f64,
    width: u32,
    height: u32,
    seed: Option<u64>,
    clicks: Vec<ScriptedClick>,
}

/// Offscreen colour target plus the padded buffer it is read back through.
struct FrameCapture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    buffer: wgpu::Buffer,
    size: wgpu::Extent3d,
    padded_bytes_per_row: u32,
}

impl FrameCapture {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Target Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Rows of a texture copy must be 256-byte aligned.
        let unpadded_bytes_per_row = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row + (align - unpadded_bytes_per_row % align) % align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            texture,
            view,
            buffer,
            size,
            padded_bytes_per_row,
        }
    }

    /// Copy the target into the readback buffer and return tightly packed
    /// RGBA rows.
    fn read(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<u8>> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.size.height),
                },
            },
            self.size,
        );
        queue.submit(Some(encoder.finish()));

        let slice = self.buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |v| {
            // The receiver outlives the poll below.
            let _ = tx.send(v);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .context("readback callback never ran")?
            .map_err(|e| anyhow!("failed to map output buffer: {}", e))?;

        let row_bytes = (self.size.width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * self.size.height as usize);
        {
            let data = slice.get_mapped_range();
            for row in 0..self.size.height as usize {
                let start = row * self.padded_bytes_per_row as usize;
                pixels.extend_from_slice(&data[start..start + row_bytes]);
            }
        }
        self.buffer.unmap();
        Ok(pixels)
    }
}

async fn render_offline(job: RenderJob) -> Result<()> {
    if !(job.fps > 0.0) {
        bail!("fps must be positive, got {}", job.fps);
    }
    if job.width == 0 || job.height == 0 {
        bail!("output size must be non-zero");
    }
    std::fs::create_dir_all(&job.out_dir)
        .with_context(|| format!("failed to create '{}'", job.out_dir.display()))?;

    // Scene first: a missing asset should fail before touching the GPU.
    let clock = ManualClock::new(0.0);
    let msaa = job.config.surface.msaa_samples;
    let host = SceneHost {
        rng: Box::new(rng_for(job.seed)),
        audio: Rc::new(LogAudioOutput),
        pointer: Rc::new(CursorCell::new()),
    };
    let mut scene = SceneRoot::mount(job.config, host, clock.now_secs());
    if let SceneStatus::Failed(reason) = scene.status() {
        bail!("scene failed to load: {}", reason);
    }
    scene.set_aspect(job.width as f32 / job.height as f32);

    // WGPU Init
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None, // Headless
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow!("No adapter found"))?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await?;

    let capture = FrameCapture::new(&device, job.width, job.height);
    let mut renderer = Renderer::new(device, queue, FrameCapture::FORMAT, job.width, job.height, msaa);

    println!("Rendering {} frames to {:?}...", job.frames, job.out_dir);

    let dt = 1.0 / job.fps;
    for i in 0..job.frames {
        let now = clock.now_secs();
        for click in job.clicks.iter().filter(|c| c.frame == i) {
            match scene.click(InstanceId(click.instance), now) {
                Some(outcome) => log::info!(
                    "Frame {}: clicked {} -> {} ({})",
                    i,
                    outcome.id,
                    outcome.material,
                    outcome.clip.as_deref().unwrap_or("silent")
                ),
                None => log::warn!("Frame {}: click on #{} had no effect", i, click.instance),
            }
        }

        scene.frame(now);
        renderer.render(&capture.view, &scene.snapshot());
        let pixels = capture.read(renderer.device(), renderer.queue())?;

        let frame_path = job.out_dir.join(format!("frame_{:05}.png", i));
        image::save_buffer(&frame_path, &pixels, job.width, job.height, image::ColorType::Rgba8)
            .with_context(|| format!("failed to write '{}'", frame_path.display()))?;

        clock.advance(dt);

        if i % 60 == 0 {
            print!(".");
            use std::io::Write;
            std::io::stdout().flush()?;
        }
    }
    scene.unmount();
    println!("\nDone.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_click() {
        assert_eq!(
            parse_click("12:3").unwrap(),
            ScriptedClick {
                frame: 12,
                instance: 3
            }
        );
        assert!(parse_click("12").is_err());
        assert!(parse_click("a:1").is_err());
        assert!(parse_click("1:-2").is_err());
    }

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "hero-shapes",
            "render",
            "--out",
            "frames",
            "--frames",
            "10",
            "--click",
            "2:1",
            "--click",
            "5:4",
        ])
        .unwrap();
        match cli.command {
            Commands::Render { frames, clicks, fps, .. } => {
                assert_eq!(frames, 10);
                assert_eq!(fps, 60.0);
                assert_eq!(clicks.len(), 2);
                assert_eq!(clicks[1].instance, 4);
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_timeline_gate_follows_config() {
        let cli = Cli::try_parse_from([
            "hero-shapes",
            "timeline",
            "--content",
            "hero.json",
            "--config",
            "scene.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Timeline { config, no_gate, .. } => {
                assert_eq!(config, Some(PathBuf::from("scene.json")));
                assert!(!no_gate);
            }
            _ => panic!("expected timeline"),
        }

        let mut config = SceneConfig::default();
        config.loading_gate.hold_secs = 3.0;
        assert_eq!(gate_for(&config, false).map(|g| g.hold_secs), Some(3.0));
        assert!(gate_for(&config, true).is_none());
        config.loading_gate.enabled = false;
        assert!(gate_for(&config, false).is_none());
    }

    #[test]
    fn test_load_default_config() {
        assert_eq!(load_config(None).unwrap(), SceneConfig::default());
    }
}
