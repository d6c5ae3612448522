use anyhow::{Context, Result, anyhow, bail};
use lopdf::Document;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Reads page counts and writes page subsets of a source document.
pub trait PageExtractor: Sync {
    fn page_count(&self, input: &Path) -> Result<u32>;

    /// Write a new document holding exactly `pages` (1-based) in ascending
    /// order.
    fn extract_pages(&self, input: &Path, pages: &BTreeSet<u32>, output: &Path) -> Result<()>;
}

pub struct LopdfExtractor;

impl LopdfExtractor {
    fn load(input: &Path) -> Result<Document> {
        Document::load(input).with_context(|| format!("loading PDF: {}", input.display()))
    }
}

impl PageExtractor for LopdfExtractor {
    fn page_count(&self, input: &Path) -> Result<u32> {
        let doc = Self::load(input)?;
        Ok(doc.get_pages().len() as u32)
    }

    fn extract_pages(&self, input: &Path, pages: &BTreeSet<u32>, output: &Path) -> Result<()> {
        if pages.is_empty() {
            bail!("no pages to extract into {}", output.display());
        }

        let mut doc = Self::load(input)?;
        let page_count = doc.get_pages().len() as u32;
        if let Some(&bad) = pages.iter().find(|&&p| p == 0 || p > page_count) {
            return Err(anyhow!(
                "page {} does not exist (document has {} pages)",
                bad,
                page_count
            ));
        }

        let to_delete: Vec<u32> = (1..=page_count)
            .filter(|p| !pages.contains(p))
            .collect();
        doc.delete_pages(&to_delete);
        let pruned = doc.prune_objects();
        doc.compress();
        debug!(
            deleted = to_delete.len(),
            pruned = pruned.len(),
            "pages removed"
        );

        doc.save(output)
            .with_context(|| format!("writing PDF: {}", output.display()))?;
        info!("wrote {} pages to {}", pages.len(), output.display());
        Ok(())
    }
}
