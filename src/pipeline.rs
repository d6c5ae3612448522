use crate::{
    config::Config,
    engine::Engine,
    extract::PageExtractor,
    grouping::{GroupingOptions, PartitionResult, group_pages},
    ingest,
    job_plan::{JobPlan, PageRange},
    page::PageRecord,
    probe::{self, ProbeInput},
    report::{ChunkReport, Outputs, PageCounts, PartitionReport},
    util::{ensure_dir, hash_file, now_rfc3339},
};
use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Pipeline<E: Engine, X: PageExtractor> {
    cfg: Config,
    engine: E,
    extractor: X,
}

/// Pages measured across all chunks, in document order.
pub struct Measurement {
    pub pages: Vec<PageRecord>,
    pub chunk_reports: Vec<ChunkReport>,
}

impl<E: Engine, X: PageExtractor> Pipeline<E, X> {
    pub fn new(cfg: &Config, engine: E, extractor: X) -> Self {
        Self {
            cfg: cfg.clone(),
            engine,
            extractor,
        }
    }

    pub fn plan(&self, input: &Path) -> Result<(ProbeInput, JobPlan)> {
        let probe_res = probe::probe_pdf(&self.cfg, &self.extractor, input)?;
        let available = available_parallelism();
        let requested = match self.cfg.jobs.requested {
            0 => available,
            n => n,
        };
        let plan = JobPlan::from_page_count(
            probe_res.page_count,
            requested,
            available,
            self.cfg.jobs.min_pages_per_job,
        );
        Ok((probe_res, plan))
    }

    pub fn classify(&self, input: &Path) -> Result<Vec<PageRecord>> {
        let (_, plan) = self.plan(input)?;
        Ok(self.measure(input, &plan)?.pages)
    }

    pub fn run_job(&self, input: &Path) -> Result<PartitionReport> {
        let started = Instant::now();
        let started_at = now_rfc3339();

        let (probe_res, plan) = self.plan(input)?;
        info!(
            "probe page_count={} file_bytes={}",
            probe_res.page_count, probe_res.file_bytes
        );
        info!(
            "plan jobs={} pages_per_job={} (requested={} available={})",
            plan.jobs, plan.pages_per_job, plan.requested_jobs, plan.available_parallelism
        );
        debug!(?plan, "job plan");

        let input_hash = hash_file(&self.cfg.hashing, input)
            .with_context(|| format!("hashing input: {}", input.display()))?;

        let measured = self.measure(input, &plan)?;
        let counts = PageCounts::tally(&measured.pages);
        info!(
            "classified color={} bw={} blank={} black={}",
            counts.color, counts.bw, counts.blank, counts.black
        );

        let opts = GroupingOptions {
            two_sided: self.cfg.grouping.two_sided,
            include_trailing_page: self.cfg.grouping.include_trailing_page,
        };
        let partition = group_pages(&measured.pages, opts);
        info!(
            "grouped two_sided={} color_pages={} bw_pages={}",
            opts.two_sided,
            partition.color_pages.len(),
            partition.bw_pages.len()
        );

        let outputs = self.write_outputs(input, &partition)?;
        let elapsed = started.elapsed().as_secs_f64();
        info!("done in {:.2} seconds", elapsed);

        Ok(PartitionReport {
            input: probe_res,
            input_hash,
            plan,
            two_sided: opts.two_sided,
            counts,
            color_pages: partition.color_pages.len() as u32,
            bw_pages: partition.bw_pages.len() as u32,
            dropped_page: partition.dropped_page,
            outputs,
            chunk_reports: measured.chunk_reports,
            started: started_at,
            finished: now_rfc3339(),
            elapsed_seconds: elapsed,
        })
    }

    /// Measure every chunk of `plan` concurrently and reassemble in chunk
    /// order. Any chunk that still fails after its retries aborts the run.
    pub fn measure(&self, input: &Path, plan: &JobPlan) -> Result<Measurement> {
        let results: Vec<Result<(Vec<PageRecord>, ChunkReport)>> = std::thread::scope(|s| {
            let handles: Vec<_> = plan
                .chunks
                .iter()
                .enumerate()
                .map(|(i, range)| s.spawn(move || self.measure_chunk(input, i, *range)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(anyhow!("measurement thread panicked")))
                })
                .collect()
        });

        let mut pages = Vec::with_capacity(plan.page_count as usize);
        let mut chunk_reports = Vec::with_capacity(results.len());
        for res in results {
            let (chunk_pages, report) = res?;
            pages.extend(chunk_pages);
            chunk_reports.push(report);
        }

        if pages.len() != plan.page_count as usize {
            bail!(
                "measured {} pages but the document has {}",
                pages.len(),
                plan.page_count
            );
        }

        let threshold = self.cfg.classification.zero_threshold;
        let pages = pages
            .into_iter()
            .map(|p| p.with_zero_threshold(threshold))
            .collect();

        Ok(Measurement {
            pages,
            chunk_reports,
        })
    }

    fn measure_chunk(
        &self,
        input: &Path,
        index: usize,
        range: PageRange,
    ) -> Result<(Vec<PageRecord>, ChunkReport)> {
        let started = Instant::now();
        let attempts = self.cfg.ghostscript.chunk_retries + 1;
        let mut last_err = None;

        for attempt in 1..=attempts {
            info!(
                "chunk {} pages {}-{} attempt {}/{}",
                index, range.start_page, range.end_page, attempt, attempts
            );
            match self.try_measure_chunk(input, index, range) {
                Ok(pages) => {
                    let report = ChunkReport {
                        chunk_index: index as u32,
                        start_page: range.start_page,
                        end_page: range.end_page,
                        records: pages.len() as u32,
                        attempts: attempt,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    };
                    return Ok((pages, report));
                }
                Err(err) => {
                    warn!("chunk {} attempt {} failed: {:#}", index, attempt, err);
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("no attempts made"))).with_context(|| {
            format!(
                "chunk {} (pages {}-{}) failed after {} attempt(s)",
                index, range.start_page, range.end_page, attempts
            )
        })
    }

    fn try_measure_chunk(
        &self,
        input: &Path,
        index: usize,
        range: PageRange,
    ) -> Result<Vec<PageRecord>> {
        let out = self.engine.measure_ink(input, range)?;

        if self.cfg.global.keep_intermediates {
            let work_dir = Path::new(&self.cfg.paths.work_dir);
            ensure_dir(work_dir)?;
            let dump = work_dir.join(format!("{}_inkcov_{:03}.txt", file_stem(input), index));
            std::fs::write(&dump, &out.stdout)
                .with_context(|| format!("writing {}", dump.display()))?;
        }

        let pages = ingest::parse_records(out.stdout.lines(), range.start_page);
        if pages.len() != range.len() as usize {
            bail!(
                "expected {} inkcov records for pages {}-{}, got {}",
                range.len(),
                range.start_page,
                range.end_page,
                pages.len()
            );
        }
        Ok(pages)
    }

    fn write_outputs(&self, input: &Path, partition: &PartitionResult) -> Result<Outputs> {
        let out_dir = PathBuf::from(&self.cfg.paths.out_dir);
        ensure_dir(&out_dir)?;

        let color_pdf = output_path(&out_dir, input, &self.cfg.output.color_suffix);
        let bw_pdf = output_path(&out_dir, input, &self.cfg.output.bw_suffix);

        Ok(Outputs {
            color_pdf: self.write_subset(input, &partition.color_pages, &color_pdf)?,
            bw_pdf: self.write_subset(input, &partition.bw_pages, &bw_pdf)?,
        })
    }

    fn write_subset(
        &self,
        input: &Path,
        pages: &BTreeSet<u32>,
        output: &Path,
    ) -> Result<Option<String>> {
        if pages.is_empty() {
            // A file left over from an earlier run would not match this report.
            if output.exists() {
                std::fs::remove_file(output)
                    .with_context(|| format!("removing stale output: {}", output.display()))?;
                warn!("no pages for {}; removed previous output", output.display());
            } else {
                warn!("no pages for {}; not written", output.display());
            }
            return Ok(None);
        }
        self.extractor.extract_pages(input, pages, output)?;
        Ok(Some(output.display().to_string()))
    }
}

pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `{dir}/{stem}{suffix}.{ext}`, keeping the input's extension.
pub fn output_path(out_dir: &Path, input: &Path, suffix: &str) -> PathBuf {
    let ext = input
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("pdf");
    out_dir.join(format!("{}{}.{}", file_stem(input), suffix, ext))
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_follow_input() {
        let p = output_path(Path::new("out"), Path::new("/docs/Thesis.PDF"), "_color");
        assert_eq!(p, Path::new("out/Thesis_color.PDF"));
        let p = output_path(Path::new("."), Path::new("report.pdf"), "_bw");
        assert_eq!(p, Path::new("./report_bw.pdf"));
    }
}
