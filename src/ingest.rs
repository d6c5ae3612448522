use crate::page::{CoverageVector, PageRecord};
use tracing::debug;

const RECORD_FIELDS: usize = 6;

/// Parse inkcov output lines into page records numbered from `first_page`.
///
/// A record is a line of exactly six whitespace-separated fields whose first
/// four are the C, M, Y, K coverages. Everything else (banners, summaries) is
/// skipped. Numbering follows record order, not anything printed in the line.
pub fn parse_records<I, S>(lines: I, first_page: u32) -> Vec<PageRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pages = Vec::new();
    for (lineno, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        match parse_line(line) {
            Some(cov) => {
                let number = first_page + pages.len() as u32;
                pages.push(PageRecord::new(number, cov));
            }
            None => {
                if !line.trim().is_empty() {
                    debug!(line = lineno + 1, "skipping non-record line: {}", line.trim());
                }
            }
        }
    }
    pages
}

/// Parse a whole inkcov dump, numbering pages from 1.
pub fn parse_inkcov(text: &str) -> Vec<PageRecord> {
    parse_records(text.lines(), 1)
}

fn parse_line(line: &str) -> Option<CoverageVector> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != RECORD_FIELDS {
        return None;
    }
    let mut cmyk = [0f64; 4];
    for (slot, raw) in cmyk.iter_mut().zip(&fields[..4]) {
        *slot = raw.parse().ok()?;
    }
    CoverageVector::new(cmyk[0], cmyk[1], cmyk[2], cmyk[3])
}
