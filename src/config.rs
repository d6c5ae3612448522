use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub hashing: Hashing,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub jobs: Jobs,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub grouping: Grouping,
    #[serde(default)]
    pub ghostscript: Ghostscript,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs.min_pages_per_job == 0 {
            bail!("jobs.min_pages_per_job must be >= 1");
        }
        let t = self.classification.zero_threshold;
        if !t.is_finite() || t < 0.0 {
            bail!("classification.zero_threshold must be a finite value >= 0: {t}");
        }
        if self.output.color_suffix == self.output.bw_suffix {
            bail!(
                "output.color_suffix and output.bw_suffix must differ: {}",
                self.output.color_suffix
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
    /// Keep the raw inkcov output of each chunk under `paths.work_dir`.
    pub keep_intermediates: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
            keep_intermediates: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub out_dir: String,
    pub work_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: ".".into(),
            work_dir: ".pdf-segregate-work".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Hashing {
    pub mode: String,
    pub fast_window_bytes: u64,
}
impl Default for Hashing {
    fn default() -> Self {
        Self {
            mode: "fast_2x16mb".into(),
            fast_window_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_input_file_bytes: u64,
    pub max_input_pages: u32,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_file_bytes: 2 * 1024 * 1024 * 1024,
            max_input_pages: 20000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Jobs {
    /// 0 means one job per available core.
    pub requested: usize,
    pub min_pages_per_job: u32,
}
impl Default for Jobs {
    fn default() -> Self {
        Self {
            requested: 0,
            min_pages_per_job: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub zero_threshold: f64,
}
impl Default for Classification {
    fn default() -> Self {
        Self {
            zero_threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Grouping {
    pub two_sided: bool,
    pub include_trailing_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ghostscript {
    pub exe: String,
    pub timeout_seconds: u64,
    pub chunk_retries: u32,
    #[serde(default)]
    pub extra_args: Vec<String>,
}
impl Default for Ghostscript {
    fn default() -> Self {
        Self {
            exe: "gs".into(),
            timeout_seconds: 600,
            chunk_retries: 1,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub color_suffix: String,
    pub bw_suffix: String,
    pub write_report_json: bool,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            color_suffix: "_color".into(),
            bw_suffix: "_bw".into(),
            write_report_json: false,
            report_filename: "report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub keep_gs_stderr: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_gs_stderr: true,
            dump_effective_config: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str("[grouping]\ntwo_sided = true\ninclude_trailing_page = false\n").unwrap();
        assert!(cfg.grouping.two_sided);
        assert_eq!(cfg.jobs.min_pages_per_job, 10);
        assert_eq!(cfg.ghostscript.exe, "gs");
    }

    #[test]
    fn single_key_in_section_keeps_other_defaults() {
        let cfg: Config = toml::from_str("[jobs]\nmin_pages_per_job = 5\n").unwrap();
        assert_eq!(cfg.jobs.min_pages_per_job, 5);
        assert_eq!(cfg.jobs.requested, 0);

        let cfg: Config = toml::from_str("[grouping]\ntwo_sided = true\n").unwrap();
        assert!(cfg.grouping.two_sided);
        assert!(!cfg.grouping.include_trailing_page);

        let cfg: Config = toml::from_str("[ghostscript]\ntimeout_seconds = 5\n").unwrap();
        assert_eq!(cfg.ghostscript.timeout_seconds, 5);
        assert_eq!(cfg.ghostscript.exe, "gs");
        assert_eq!(cfg.ghostscript.chunk_retries, 1);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.jobs.min_pages_per_job = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.classification.zero_threshold = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.output.bw_suffix = cfg.output.color_suffix.clone();
        assert!(cfg.validate().is_err());
    }
}
