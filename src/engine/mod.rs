pub mod ghostscript;
pub mod types;

use crate::job_plan::PageRange;
use anyhow::Result;
use std::path::Path;

pub use types::{DocDiag, InkcovOut};

/// Measures per-page ink coverage. Chunks are measured concurrently, so
/// implementations must be shareable across threads.
pub trait Engine: Sync {
    fn doctor(&self) -> Result<DocDiag>;
    fn measure_ink(&self, input: &Path, range: PageRange) -> Result<InkcovOut>;
}
