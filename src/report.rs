use crate::{
    job_plan::JobPlan,
    page::{PageRecord, PageType},
    probe::ProbeInput,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCounts {
    pub color: u32,
    pub blank: u32,
    pub bw: u32,
    /// Pages with black ink only; a subset of `bw`.
    pub black: u32,
}

impl PageCounts {
    pub fn tally(pages: &[PageRecord]) -> Self {
        let mut counts = PageCounts::default();
        for page in pages {
            match page.page_type() {
                PageType::Color => counts.color += 1,
                PageType::Blank => counts.blank += 1,
                PageType::Bw => counts.bw += 1,
            }
            if page.is_black_page() {
                counts.black += 1;
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.color + self.blank + self.bw
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionReport {
    pub input: ProbeInput,
    pub input_hash: String,
    pub plan: JobPlan,
    pub two_sided: bool,
    pub counts: PageCounts,
    pub color_pages: u32,
    pub bw_pages: u32,
    pub dropped_page: Option<u32>,
    pub outputs: Outputs,
    pub chunk_reports: Vec<ChunkReport>,
    pub started: String,
    pub finished: String,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outputs {
    pub color_pdf: Option<String>,
    pub bw_pdf: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkReport {
    pub chunk_index: u32,
    pub start_page: u32,
    pub end_page: u32,
    pub records: u32,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

/// Per-page line of `classify` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: u32,
    pub c: f64,
    pub m: f64,
    pub y: f64,
    pub k: f64,
    #[serde(rename = "type")]
    pub page_type: PageType,
}

impl From<&PageRecord> for PageSummary {
    fn from(p: &PageRecord) -> Self {
        let cov = p.coverage();
        Self {
            page: p.page_number(),
            c: cov.c,
            m: cov.m,
            y: cov.y,
            k: cov.k,
            page_type: p.page_type(),
        }
    }
}
