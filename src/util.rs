use crate::config::Hashing;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Identify an input file for the report. `fast_2x16mb` hashes only the head
/// and tail windows plus the size.
pub fn hash_file(hashing: &Hashing, path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = f.metadata().with_context(|| "metadata")?.len();
    let mut h = Sha256::new();

    match hashing.mode.as_str() {
        "full_sha256" => {
            let mut buf = vec![0u8; 1024 * 1024];
            loop {
                let n = f.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                h.update(&buf[..n]);
            }
        }
        "fast_2x16mb" => {
            let w = hashing.fast_window_bytes.min(size);
            let mut buf = vec![0u8; w as usize];
            if w > 0 {
                f.read_exact(&mut buf)?;
                h.update(&buf);
                if size > w {
                    f.seek(SeekFrom::Start(size - w))?;
                    f.read_exact(&mut buf)?;
                    h.update(&buf);
                }
            }
            h.update(size.to_le_bytes());
        }
        other => anyhow::bail!("unknown hashing.mode: {other}"),
    }

    Ok(format!("{:x}", h.finalize()))
}
