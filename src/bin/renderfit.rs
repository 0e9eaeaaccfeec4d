use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use renderfit::{FitReport, FitSession, ImageSize, MinimizerKind, RunOutcome, SessionOpts};

#[derive(Parser, Debug)]
#[command(name = "renderfit", version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the free parameters of a model file to observation data.
    Fit(FitArgs),
    /// Render a model file to a grayscale PNG.
    Render(RenderArgs),
    /// List the minimizers and the ordinals that select them.
    Minimizers,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Image side length in pixels.
    #[arg(long, default_value_t = 128)]
    size: u32,

    /// Angular size of one pixel (mas).
    #[arg(long, default_value_t = 0.1)]
    scale: f64,
}

#[derive(Parser, Debug)]
struct FitArgs {
    /// Model file (JSON) whose free parameters are fitted.
    #[arg(long)]
    models: PathBuf,

    /// Observation data file (JSON); repeat for several files.
    #[arg(long, required = true)]
    data: Vec<PathBuf>,

    /// Minimizer ordinal (see `renderfit minimizers`).
    #[arg(long, default_value_t = 1)]
    minimizer: u32,

    /// Base name of the exported result files.
    #[arg(long, default_value = renderfit::DEFAULT_SAVE_BASENAME)]
    out: String,

    /// Do not write result files.
    #[arg(long, default_value_t = false)]
    no_export: bool,

    /// Override the Levenberg-Marquardt iteration limit.
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Render/statistic cycles for the benchmark minimizer.
    #[arg(long, default_value_t = 100)]
    benchmark_cycles: usize,

    /// Grid points per free parameter for the grid search.
    #[arg(long, default_value_t = 10)]
    grid_steps: usize,

    /// Resampled refits for the bootstrap minimizer.
    #[arg(long, default_value_t = 100)]
    bootstrap_iterations: usize,

    /// Seed of the bootstrap resampling.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Stop the minimizer after this many seconds.
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Write the best-fit models to this file.
    #[arg(long)]
    save_models: Option<PathBuf>,

    /// Print the fit report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(flatten)]
    view: ViewArgs,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Model file (JSON).
    #[arg(long)]
    models: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Scene time to render at; defaults to the time stored in the model file.
    #[arg(long)]
    time: Option<f64>,

    #[command(flatten)]
    view: ViewArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Fit(args) => cmd_fit(args),
        Command::Render(args) => cmd_render(args),
        Command::Minimizers => {
            for kind in MinimizerKind::ALL {
                println!("{}\t{}", kind.ordinal(), kind.name());
            }
            Ok(())
        }
    }
}

fn session_opts(view: &ViewArgs) -> anyhow::Result<SessionOpts> {
    let mut opts = SessionOpts::default();
    opts.engine.size = ImageSize::square(view.size)?;
    opts.raster.scale = view.scale;
    Ok(opts)
}

fn cmd_fit(args: FitArgs) -> anyhow::Result<()> {
    let mut opts = session_opts(&args.view)?;
    opts.minimizer.kind = MinimizerKind::from_ordinal(args.minimizer);
    opts.minimizer.export = !args.no_export;
    opts.minimizer.benchmark_cycles = args.benchmark_cycles;
    opts.minimizer.grid_steps = args.grid_steps;
    opts.minimizer.bootstrap_iterations = args.bootstrap_iterations;
    opts.minimizer.bootstrap_seed = args.seed;
    if let Some(n) = args.max_iterations {
        opts.minimizer.levmar.max_iterations = n;
    }
    if !opts.minimizer.set_save_basename(args.out) {
        tracing::warn!(
            kept = opts.minimizer.save_basename(),
            "empty --out ignored"
        );
    }

    let mut session = FitSession::new(opts).context("start render engine")?;
    session
        .open_models(&args.models)
        .with_context(|| format!("open models '{}'", args.models.display()))?;
    for path in &args.data {
        let sets = session
            .load_data(path)
            .with_context(|| format!("load data '{}'", path.display()))?;
        tracing::info!(sets, path = %path.display(), "data loaded");
    }

    session.start_fit()?;
    if let Some(secs) = args.timeout_secs {
        let deadline = Instant::now() + Duration::from_secs_f64(secs.max(0.0));
        while session.is_fit_running() {
            if Instant::now() >= deadline {
                tracing::info!(secs, "timeout reached, stopping minimizer");
                session.stop_fit();
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
    let outcome = session.join_fit().context("minimizer run failed")?;

    match &outcome {
        RunOutcome::Fit(report) if args.json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        RunOutcome::Grid(report) if args.json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        RunOutcome::Bootstrap(report) if args.json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        RunOutcome::Fit(report) => print_fit(report),
        RunOutcome::Grid(report) => {
            println!(
                "Grid search evaluated {} points ({} per parameter).",
                report.evaluated, report.steps
            );
            for (i, p) in report.params.iter().enumerate() {
                println!("  P[{i}] = {:.6} ({})", p.value, p.name);
            }
            for s in &report.sets {
                println!("  set {}: chi2r = {:.6}", s.set, s.chi2r);
            }
        }
        RunOutcome::Bootstrap(report) => {
            print_fit(&report.fit);
            println!("Bootstrap completed {} resamples.", report.resamples);
            for (i, p) in report.params.iter().enumerate() {
                let sd = p.std_dev.unwrap_or(f64::NAN);
                println!("  P[{i}] = {:.6} +/- {:.6} ({})", p.mean, sd, p.name);
            }
        }
        RunOutcome::Benchmark(b) => {
            println!(
                "benchmark: {} cycles in {:.3} s ({:.1} per second)",
                b.cycles,
                b.elapsed.as_secs_f64(),
                b.per_second()
            );
        }
    }

    if let Some(path) = &args.save_models {
        session
            .save_models(path)
            .with_context(|| format!("save models '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    session.shutdown()?;
    Ok(())
}

fn print_fit(report: &FitReport) {
    println!("Levmar executed {} iterations.", report.iterations);
    for (i, p) in report.params.iter().enumerate() {
        let err = p.std_error.unwrap_or(f64::NAN);
        println!("  P[{i}] = {:.6} +/- {:.6} ({})", p.value, err, p.name);
    }
    for s in &report.sets {
        println!("  set {}: chi2r = {:.6}", s.set, s.chi2r);
    }
    println!("exit {}: {}", report.exit.code(), report.exit_message());
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let session = FitSession::new(session_opts(&args.view)?).context("start render engine")?;
    session
        .open_models(&args.models)
        .with_context(|| format!("open models '{}'", args.models.display()))?;
    if let Some(t) = args.time {
        session.set_time(t)?;
    }
    session.render()?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    session
        .save_image(&args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    session.shutdown()?;
    Ok(())
}
