use super::{Engine, types::*};
use crate::{config::Config, job_plan::PageRange};
use anyhow::{Context, Result, anyhow};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct GhostscriptEngine {
    gs_exe: PathBuf,
    timeout: Option<Duration>,
    extra_args: Vec<String>,
    keep_stderr: bool,
}

impl GhostscriptEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        let gs_exe = resolve_gs_exe(&cfg.ghostscript.exe);
        let timeout = (cfg.ghostscript.timeout_seconds > 0)
            .then(|| Duration::from_secs(cfg.ghostscript.timeout_seconds));
        Ok(Self {
            gs_exe,
            timeout,
            extra_args: cfg.ghostscript.extra_args.clone(),
            keep_stderr: cfg.debug.keep_gs_stderr,
        })
    }

    pub fn gs_exe(&self) -> &Path {
        &self.gs_exe
    }

    fn inkcov_args(&self, input: &Path, range: PageRange) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-q",
            "-dSAFER",
            "-dBATCH",
            "-dNOPAUSE",
            "-sDEVICE=inkcov",
            "-sOutputFile=-",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(format!("-dFirstPage={}", range.start_page).into());
        args.push(format!("-dLastPage={}", range.end_page).into());
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push(input.as_os_str().to_owned());
        args
    }

    fn run(&self, args: &[OsString]) -> Result<Output> {
        debug!(
            "gs run {} {:?} timeout={:?}",
            self.gs_exe.display(),
            args,
            self.timeout
        );
        let mut child = Command::new(&self.gs_exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning ghostscript: {}", self.gs_exe.display()))?;

        let output = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
            None => child
                .wait_with_output()
                .with_context(|| "waiting for ghostscript")?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "ghostscript failed ({}): {}",
                output.status,
                stderr.trim()
            ));
        }

        if self.keep_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("gs stderr: {}", stderr.trim());
        }

        Ok(output)
    }
}

fn resolve_gs_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("PDF_SEGREGATE_GS") {
            return expand_tilde(&env_val);
        }
        return PathBuf::from(if cfg!(windows) { "gswin64c" } else { "gs" });
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

impl Engine for GhostscriptEngine {
    fn doctor(&self) -> Result<DocDiag> {
        let gs_exe = self.gs_exe.display().to_string();
        match self.run(&[OsString::from("--version")]) {
            Ok(out) => Ok(DocDiag {
                gs_exe,
                gs_version: Some(String::from_utf8_lossy(&out.stdout).trim().to_string()),
                ok: true,
                error: None,
            }),
            Err(err) => Ok(DocDiag {
                gs_exe,
                gs_version: None,
                ok: false,
                error: Some(format!("{err:#}")),
            }),
        }
    }

    fn measure_ink(&self, input: &Path, range: PageRange) -> Result<InkcovOut> {
        let args = self.inkcov_args(input, range);
        let out = self.run(&args).with_context(|| {
            format!(
                "inkcov pages {}-{} of {}",
                range.start_page,
                range.end_page,
                input.display()
            )
        })?;
        Ok(InkcovOut {
            start_page: range.start_page,
            end_page: range.end_page,
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
        })
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a chatty child can't block on a full pipe.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    let (status, timed_out) = loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            break (status, false);
        }
        if start.elapsed() > timeout {
            warn!("ghostscript timed out after {:?}", timeout);
            let _ = child.kill();
            break (child.wait().with_context(|| "wait after kill")?, true);
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    let stdout = stdout_thread
        .join()
        .map_err(|_| anyhow!("stdout reader thread panicked"))??;
    let stderr = stderr_thread
        .join()
        .map_err(|_| anyhow!("stderr reader thread panicked"))??;

    if timed_out {
        return Err(anyhow!(
            "ghostscript exceeded timeout ({:?}); stderr: {}",
            timeout,
            String::from_utf8_lossy(&stderr)
        ));
    }

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}
