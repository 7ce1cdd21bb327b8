use std::{ffi::OsString, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use filmgrain::{GrainParameters, GrainType, Pipeline, PipelineConfig, ServerConfig, SourceImage};

#[derive(Parser, Debug)]
#[command(name = "filmgrain", version, about = "Apply film grain to images via filmgrainer")]
struct Cli {
    /// Grain tool to run (name on PATH or a path).
    #[arg(
        long,
        global = true,
        env = "FILMGRAIN_EXECUTABLE",
        default_value = filmgrain::DEFAULT_EXECUTABLE
    )]
    executable: OsString,

    /// Directory for temporary files (defaults to the system temp dir).
    #[arg(long, global = true, env = "FILMGRAIN_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Kill the grain tool after this many seconds.
    #[arg(long, global = true, env = "FILMGRAIN_TIMEOUT_SECS")]
    timeout_secs: Option<f64>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grain a single image file.
    Apply(ApplyArgs),
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Input image (any supported format).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    grain: GrainArgs,
}

#[derive(Args, Debug)]
struct GrainArgs {
    /// Resize factor.
    #[arg(long)]
    scale: Option<f64>,

    /// Grain type: 1 small fine, 2 small coarse, 3 large fine, 4 large coarse.
    #[arg(long = "type")]
    grain_type: Option<GrainType>,

    /// Grain saturation.
    #[arg(long = "sat")]
    saturation: Option<f64>,

    /// Sharpening passes.
    #[arg(long)]
    sharpen: Option<u32>,

    /// Grayscale output.
    #[arg(long, default_value_t = false)]
    gray: bool,

    /// Overall grain strength.
    #[arg(long)]
    power: Option<f64>,

    /// Grain strength in highlights.
    #[arg(long)]
    highs: Option<f64>,

    /// Grain strength in shadows.
    #[arg(long)]
    shadows: Option<f64>,
}

impl From<GrainArgs> for GrainParameters {
    fn from(args: GrainArgs) -> Self {
        Self {
            scale: args.scale,
            grain_power: args.power,
            shadows: args.shadows,
            highs: args.highs,
            grain_type: args.grain_type,
            grain_saturation: args.saturation,
            sharpen: args.sharpen,
            gray: args.gray,
        }
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen address.
    #[arg(long, env = "FILMGRAIN_BIND", default_value = filmgrain::server::config::DEFAULT_BIND)]
    bind: SocketAddr,

    /// Largest accepted upload in bytes.
    #[arg(
        long,
        env = "FILMGRAIN_MAX_UPLOAD_BYTES",
        default_value_t = filmgrain::server::config::DEFAULT_MAX_UPLOAD_BYTES
    )]
    max_upload_bytes: usize,

    /// Maximum concurrent grain runs (unbounded when omitted).
    #[arg(long, env = "FILMGRAIN_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    filmgrain::logging::init(&cli.log_level);

    let timeout = match cli.timeout_secs {
        Some(secs) => Some(
            Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid --timeout-secs {secs}"))?,
        ),
        None => None,
    };
    let mut config = PipelineConfig::default()
        .with_executable(cli.executable)
        .with_timeout(timeout);
    if let Some(dir) = cli.work_dir {
        config = config.with_work_dir(dir);
    }
    let pipeline = Pipeline::new(config).context("configure pipeline")?;

    match cli.cmd {
        Command::Apply(args) => cmd_apply(&pipeline, args),
        Command::Serve(args) => cmd_serve(pipeline, args),
    }
}

fn cmd_apply(pipeline: &Pipeline, args: ApplyArgs) -> anyhow::Result<()> {
    let source = SourceImage::from_path(&args.in_path)?;
    let params = GrainParameters::from(args.grain);

    let image = pipeline.apply_grain(&source, &params)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let written = image
        .persist(&args.out)
        .with_context(|| format!("write '{}'", args.out.display()))?;

    eprintln!("wrote {}", written.display());
    Ok(())
}

fn cmd_serve(pipeline: Pipeline, args: ServeArgs) -> anyhow::Result<()> {
    if !filmgrain::tool_responds(pipeline.executable()) {
        tracing::warn!(
            executable = %pipeline.executable().to_string_lossy(),
            "grain tool did not respond to --help; /process requests will fail until it is installed"
        );
    }

    let config = ServerConfig {
        bind: args.bind,
        max_upload_bytes: args.max_upload_bytes,
        max_concurrent: args.max_concurrent,
    };

    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    runtime.block_on(filmgrain::server::routes::serve(Arc::new(pipeline), config))
}
