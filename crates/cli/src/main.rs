use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use editor::{Editor, EditorConfig, LoadPlacement};
use media::{DurationProbe, MediaProbe, MediaResource, SimulatedMedia};
use serde::Serialize;
use timeline::TrackId;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod script;

use script::{parse_line, Command};

/// Simulated timeupdate cadence.
const TICK: f64 = 0.25;
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "duoclip", about = "Drive a two-track timeline session from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Load up to two clips and run session commands against them.
    Run(RunArgs),
    /// Print the probed duration of a media file.
    Probe { file: PathBuf },
}

#[derive(Args)]
struct RunArgs {
    /// Clip for track A: a file path or synthetic:<name>:<seconds>.
    #[arg(long)]
    a: Option<String>,
    #[arg(long)]
    b: Option<String>,
    /// JSON editor config.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    placement: Option<PlacementArg>,
    /// Timeline viewport width in pixels.
    #[arg(long)]
    width: Option<f32>,
    /// Pace `advance` in wall-clock time.
    #[arg(long)]
    realtime: bool,
    /// File with one command per line.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Commands, one per argument (e.g. "scrub 4.5").
    commands: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlacementArg {
    Origin,
    AfterOther,
}

impl From<PlacementArg> for LoadPlacement {
    fn from(p: PlacementArg) -> Self {
        match p {
            PlacementArg::Origin => LoadPlacement::Origin,
            PlacementArg::AfterOther => LoadPlacement::AfterOther,
        }
    }
}

#[derive(Serialize)]
struct Report<'a, S: Serialize, V: Serialize> {
    command: &'a str,
    state: S,
    #[serde(skip_serializing_if = "Option::is_none")]
    view: Option<V>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    match Cli::parse().command {
        Cmd::Run(args) => run(args).await,
        Cmd::Probe { file } => {
            let resource = MediaResource::file(&file);
            let duration = MediaProbe.probe(&resource).with_context(|| format!("probe {}", file.display()))?;
            println!("{}", serde_json::json!({ "file": file, "name": resource.name(), "duration": duration }));
            Ok(())
        }
    }
}

fn load_config(args: &RunArgs) -> Result<EditorConfig> {
    let mut config = match &args.config {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };
    if let Some(p) = args.placement { config.placement = p.into(); }
    if let Some(w) = args.width { config.initial_viewport_width = w; }
    Ok(config)
}

fn collect_lines(args: &RunArgs) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    if let Some(path) = &args.script {
        let text = std::fs::read_to_string(path).with_context(|| format!("read script {}", path.display()))?;
        lines.extend(text.lines().map(str::to_string));
    }
    lines.extend(args.commands.iter().cloned());
    Ok(lines)
}

async fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    let lines = collect_lines(&args)?;
    let probe: Arc<dyn DurationProbe> = Arc::new(MediaProbe);
    let mut ed = Editor::new(config, SimulatedMedia::new(), SimulatedMedia::new(), probe);

    for (id, res) in [(TrackId::A, &args.a), (TrackId::B, &args.b)] {
        if let Some(res) = res { ed.load(id, MediaResource::parse(res)?)?; }
    }
    if args.a.is_some() || args.b.is_some() {
        let committed = ed.wait_for_loads(LOAD_TIMEOUT)?;
        info!(committed, "initial loads finished");
    }
    report(&ed, "init", false)?;

    for (n, line) in lines.iter().enumerate() {
        let Some(cmd) = parse_line(line).with_context(|| format!("line {}", n + 1))? else { continue; };
        let show = cmd == Command::Show;
        execute(&mut ed, cmd, args.realtime).await?;
        ed.poll_loads();
        report(&ed, line.trim(), show)?;
    }
    Ok(())
}

async fn execute(ed: &mut Editor<SimulatedMedia>, cmd: Command, realtime: bool) -> Result<()> {
    match cmd {
        Command::Load(id, res) => { ed.load(id, res)?; }
        Command::Wait => { ed.wait_for_loads(LOAD_TIMEOUT)?; }
        Command::Scrub(t) => ed.scrub(t),
        Command::Toggle => {
            ed.toggle_play();
            ed.poll_media();
        }
        Command::Advance(secs) => advance(ed, secs, realtime).await,
        Command::Drag(id, dx) => {
            if !ed.drag_begin(id) {
                warn!(track = %id, "cannot drag an empty track");
                return Ok(());
            }
            ed.drag_move(dx);
            ed.drag_end(dx);
        }
        Command::Resize(px) => ed.resize(px),
        Command::Hover(on) => ed.set_hovering(on),
        Command::Show => {}
    }
    Ok(())
}

/// Run the simulated clock forward, delivering media events every tick.
async fn advance(ed: &mut Editor<SimulatedMedia>, secs: f64, realtime: bool) {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(TICK));
    let mut left = secs;
    while left > 0.0 {
        if realtime { interval.tick().await; }
        let dt = left.min(TICK);
        ed.advance_clock(dt);
        left -= dt;
    }
}

fn report(ed: &Editor<SimulatedMedia>, command: &str, with_view: bool) -> Result<()> {
    let out = Report { command, state: ed.state(), view: with_view.then(|| ed.view()) };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
