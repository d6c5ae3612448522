use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPlan {
    pub page_count: u32,
    pub requested_jobs: usize,
    pub available_parallelism: usize,
    pub min_pages_per_job: u32,
    pub pages_per_job: u32,
    pub jobs: usize,
    pub chunks: Vec<PageRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start_page: u32, // 1-based inclusive
    pub end_page: u32,   // 1-based inclusive
}

impl PageRange {
    pub fn len(&self) -> u32 {
        self.end_page + 1 - self.start_page
    }

    pub fn is_empty(&self) -> bool {
        self.end_page < self.start_page
    }
}

impl JobPlan {
    /// Split `[1, page_count]` into contiguous chunks for concurrent
    /// measurement.
    ///
    /// The job count is clamped to `[1, available_parallelism]`, then each job
    /// gets at least `min_pages_per_job` pages, which can lower the job count
    /// again. The last chunk absorbs the remainder.
    pub fn from_page_count(
        page_count: u32,
        requested_jobs: usize,
        available_parallelism: usize,
        min_pages_per_job: u32,
    ) -> JobPlan {
        let available = available_parallelism.max(1);
        let minp = min_pages_per_job.max(1);
        let clamped = requested_jobs.clamp(1, available);

        if page_count == 0 {
            return JobPlan {
                page_count,
                requested_jobs,
                available_parallelism: available,
                min_pages_per_job: minp,
                pages_per_job: 0,
                jobs: 0,
                chunks: Vec::new(),
            };
        }

        let per_job = page_count / clamped as u32;
        let pages_per_job = per_job.max(minp).min(page_count);
        // Truncating division can leave more whole chunks than the clamp
        // allows (11 pages / 4 jobs -> 5 chunks of 2); cap it there.
        let jobs = (page_count / pages_per_job).min(clamped as u32);

        let mut chunks = Vec::with_capacity(jobs as usize);
        for i in 0..jobs {
            let start_page = i * pages_per_job + 1;
            let end_page = if i + 1 == jobs {
                page_count
            } else {
                (i + 1) * pages_per_job
            };
            chunks.push(PageRange {
                start_page,
                end_page,
            });
        }

        JobPlan {
            page_count,
            requested_jobs,
            available_parallelism: available,
            min_pages_per_job: minp,
            pages_per_job,
            jobs: jobs as usize,
            chunks,
        }
    }
}
