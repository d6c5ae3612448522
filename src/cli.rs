use crate::{
    config::Config,
    engine::{Engine, ghostscript::GhostscriptEngine},
    extract::LopdfExtractor,
    pipeline::Pipeline,
    report::PageSummary,
    util::ensure_dir,
};
use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "pdf-segregate.toml";

#[derive(Parser, Debug)]
#[command(name = "pdf-segregate")]
#[command(about = "Segregate a PDF into color and B&W pages/sheets")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./pdf-segregate.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that Ghostscript is available.
    Doctor {},
    /// Print per-page ink coverage and type.
    Classify {
        document: PathBuf,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        jobs: Option<u32>,
    },
    /// Print how the page range would be split into measurement jobs.
    Plan {
        document: PathBuf,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        jobs: Option<u32>,
    },
    /// Write `<name>_color.pdf` and `<name>_bw.pdf`.
    Run {
        document: PathBuf,
        /// Number of parallel Ghostscript jobs, at least 1 (default: all cores).
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        jobs: Option<u32>,
        /// Group pages for consistent two-sided printing.
        #[arg(long)]
        two_sided: bool,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let mut cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    apply_overrides(&mut cfg, &args.cmd);

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Classify { document, .. } => classify(&cfg, document),
        Command::Plan { document, .. } => plan(&cfg, document),
        Command::Run { document, .. } => run(&cfg, document),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from(DEFAULT_CONFIG);
    default.exists().then_some(default)
}

/// Command-line flags win over the config file.
fn apply_overrides(cfg: &mut Config, cmd: &Command) {
    match cmd {
        Command::Doctor {} => {}
        Command::Classify { jobs, .. } | Command::Plan { jobs, .. } => {
            if let Some(n) = jobs {
                cfg.jobs.requested = *n as usize;
            }
        }
        Command::Run {
            jobs,
            two_sided,
            out_dir,
            ..
        } => {
            if let Some(n) = jobs {
                cfg.jobs.requested = *n as usize;
            }
            if *two_sided {
                cfg.grouping.two_sided = true;
            }
            if let Some(dir) = out_dir {
                cfg.paths.out_dir = dir.display().to_string();
            }
        }
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries JSON results; logs go to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.out_dir).join("pdf-segregate.log"))
}

fn pipeline(cfg: &Config) -> Result<Pipeline<GhostscriptEngine, LopdfExtractor>> {
    let engine = GhostscriptEngine::new(cfg)?;
    Ok(Pipeline::new(cfg, engine, LopdfExtractor))
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = GhostscriptEngine::new(cfg)?;
    let diag = engine.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    if !diag.ok {
        bail!("ghostscript is not usable: {}", engine.gs_exe().display());
    }
    Ok(())
}

fn classify(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(cfg, input)?;
    let pages = pipeline(cfg)?.classify(input)?;
    let summary: Vec<PageSummary> = pages.iter().map(PageSummary::from).collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "pages": summary,
        }))?
    );
    Ok(())
}

fn plan(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(cfg, input)?;
    let (_, plan) = pipeline(cfg)?.plan(input)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn run(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(cfg, input)?;

    if cfg.debug.dump_effective_config {
        write_effective_config(cfg)?;
    }

    let report = pipeline(cfg)?.run_job(input)?;

    if cfg.output.write_report_json {
        let path = Path::new(&cfg.paths.out_dir).join(&cfg.output.report_filename);
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report: {}", path.display()))?;
        info!("report written to {}", path.display());
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "color_pdf": report.outputs.color_pdf,
                "bw_pdf": report.outputs.bw_pdf,
                "counts": report.counts,
                "dropped_page": report.dropped_page,
                "elapsed_seconds": report.elapsed_seconds,
                "status": "ok"
            }))?
        );
    }

    Ok(())
}

fn write_effective_config(cfg: &Config) -> Result<PathBuf> {
    let out_dir = Path::new(&cfg.paths.out_dir);
    ensure_dir(out_dir)?;
    let path = out_dir.join("effective-config.toml");
    let raw = toml::to_string(cfg).with_context(|| "serializing effective config")?;
    std::fs::write(&path, raw)
        .with_context(|| format!("writing effective config: {}", path.display()))?;
    Ok(path)
}

pub fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    match input.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => {}
        _ => bail!("Unknown file extension: {}", input.display()),
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}
