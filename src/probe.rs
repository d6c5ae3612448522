use crate::{config::Config, extract::PageExtractor};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeInput {
    pub path: String,
    pub file_bytes: u64,
    pub page_count: u32,
}

pub fn probe_pdf(cfg: &Config, extractor: &dyn PageExtractor, input: &Path) -> Result<ProbeInput> {
    let meta = std::fs::metadata(input).with_context(|| "stat input")?;
    let file_bytes = meta.len();
    if file_bytes > cfg.limits.max_input_file_bytes {
        anyhow::bail!("input exceeds max_input_file_bytes: {}", file_bytes);
    }

    let page_count = extractor
        .page_count(input)
        .with_context(|| "counting pages")?;

    if page_count > cfg.limits.max_input_pages {
        anyhow::bail!("input exceeds max_input_pages: {}", page_count);
    }
    if page_count == 0 {
        anyhow::bail!("input has zero pages");
    }

    Ok(ProbeInput {
        path: input.display().to_string(),
        file_bytes,
        page_count,
    })
}
