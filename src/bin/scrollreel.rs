use std::{
    io::Write as _,
    ops::ControlFlow,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scrollreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the canvas at one scroll progress as a PNG.
    Frame(FrameArgs),
    /// Drive the player over a scripted scroll and print one JSON report per tick.
    Simulate(SimulateArgs),
    /// Print the default player configuration.
    Config,
}

#[derive(Parser, Debug)]
struct SceneArgs {
    /// Directory the sequence prefix is resolved against.
    #[arg(long)]
    frames: PathBuf,

    /// Player configuration JSON. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport width in CSS pixels.
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Viewport height in CSS pixels.
    #[arg(long, default_value_t = 720.0)]
    height: f64,

    /// Device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    dpr: f64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Scroll progress in [0, 1].
    #[arg(long)]
    progress: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Longest wait for frames to load, in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    wait_ms: u64,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Starting scroll progress.
    #[arg(long, default_value_t = 0.0)]
    from: f64,

    /// Final scroll progress.
    #[arg(long, default_value_t = 1.0)]
    to: f64,

    /// Number of ticks after the first.
    #[arg(long, default_value_t = 60)]
    steps: u32,

    /// Tick rate.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Load every frame before the first tick.
    #[arg(long)]
    wait: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrollreel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Simulate(args) => cmd_simulate(args),
        Command::Config => cmd_config(),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<scrollreel::PlayerConfig> {
    match path {
        Some(p) => scrollreel::PlayerConfig::from_path(p)
            .with_context(|| format!("load config '{}'", p.display())),
        None => Ok(scrollreel::PlayerConfig::default()),
    }
}

struct Scene {
    player: scrollreel::ScrollReelPlayer,
    viewport: scrollreel::Viewport,
    geometry: scrollreel::ScrollGeometry,
}

impl Scene {
    fn mount(args: &SceneArgs) -> anyhow::Result<Self> {
        let config = read_config(args.config.as_deref())?;
        let viewport = scrollreel::Viewport::new(args.width, args.height, args.dpr)?;
        let geometry = scrollreel::ScrollGeometry::from_viewport_multiple(
            0.0,
            config.viewport.container_height_vh,
            viewport.height,
        );
        let source = Arc::new(scrollreel::FsFrameSource::new(&args.frames));
        let player = scrollreel::ScrollReelPlayer::mount(config, source, Instant::now())?;
        Ok(Self {
            player,
            viewport,
            geometry,
        })
    }

    fn input(&self, now: Instant, progress: f64) -> scrollreel::TickInput {
        scrollreel::TickInput {
            now,
            viewport: self.viewport,
            scroll_y: self.geometry.scroll_offset_for(progress, self.viewport.height),
            geometry: self.geometry,
        }
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&args.progress) {
        anyhow::bail!("--progress must be within [0, 1]");
    }
    let mut scene = Scene::mount(&args.scene)?;

    let progress = scene.player.wait_for_frames(
        Instant::now() + Duration::from_millis(args.wait_ms),
        Instant::now(),
    );
    if scene.player.phase() == scrollreel::PlayerPhase::Loading {
        anyhow::bail!(
            "frames still loading after {} ms ({} loaded, {} failed of {})",
            args.wait_ms,
            progress.loaded,
            progress.failed,
            progress.total
        );
    }

    let input = scene.input(Instant::now(), args.progress);
    let report = scene.player.tick(input);
    if let Some(scrollreel::DrawOutcome::Missing { wanted }) = report.draw {
        anyhow::bail!("frame {} failed to load; nothing to draw", wanted.0);
    }

    let surface = scene
        .player
        .surface()
        .context("player has no canvas after the first tick")?;
    let img = surface.to_rgba_image()?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    img.save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} (frame position {:.2}, {}% loaded)",
        args.out.display(),
        report.frame_position,
        progress.percent()
    );
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let mut scene = Scene::mount(&args.scene)?;
    if args.wait {
        scene
            .player
            .wait_for_frames(Instant::now() + Duration::from_secs(60), Instant::now());
    }

    let render_loop = scrollreel::RenderLoop::from_hz(args.fps)?;
    scene.player.attach_loop(render_loop.handle());
    let steps = args.steps.max(1);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut failure: Option<anyhow::Error> = None;

    render_loop.run(|tick| {
        let t = (tick.index as f64 / f64::from(steps)).min(1.0);
        let progress = args.from + (args.to - args.from) * t;
        let input = scene.input(tick.now, progress);
        let report = scene.player.tick(input);

        let line = serde_json::to_string(&report).context("serialize tick report");
        let written = line.and_then(|l| writeln!(out, "{l}").context("write tick report"));
        if let Err(e) = written {
            failure = Some(e);
            return ControlFlow::Break(());
        }
        if tick.index >= u64::from(steps) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    if let Some(e) = failure {
        return Err(e);
    }
    scene.player.teardown();
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let text = scrollreel::PlayerConfig::default().to_json_pretty()?;
    println!("{text}");
    Ok(())
}
