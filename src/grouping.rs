use crate::page::PageRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GroupingOptions {
    /// Keep both sides of a physical sheet in the same output.
    pub two_sided: bool,
    /// Route a trailing unpaired page instead of dropping it.
    pub include_trailing_page: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionResult {
    pub color_pages: BTreeSet<u32>,
    pub bw_pages: BTreeSet<u32>,
    /// Trailing page of an odd-length document that went to neither output.
    pub dropped_page: Option<u32>,
}

/// Split pages into color and black-and-white sets.
///
/// Pages are taken two at a time. In two-sided mode a pair is one sheet: if
/// either side has color, both sides go to the color set. Otherwise each page
/// is routed on its own.
pub fn group_pages(pages: &[PageRecord], opts: GroupingOptions) -> PartitionResult {
    let mut out = PartitionResult::default();

    let mut sheets = pages.chunks_exact(2);
    for sheet in sheets.by_ref() {
        route_sheet(&mut out, sheet, opts.two_sided);
    }

    if let [last] = sheets.remainder() {
        if opts.include_trailing_page {
            route_sheet(&mut out, std::slice::from_ref(last), opts.two_sided);
        } else {
            warn!(
                page = last.page_number(),
                "odd page count; trailing page is not written to either output"
            );
            out.dropped_page = Some(last.page_number());
        }
    }

    out
}

fn route_sheet(out: &mut PartitionResult, sheet: &[PageRecord], two_sided: bool) {
    if two_sided {
        let target = if sheet.iter().any(PageRecord::is_color_page) {
            &mut out.color_pages
        } else {
            &mut out.bw_pages
        };
        target.extend(sheet.iter().map(PageRecord::page_number));
        return;
    }

    for page in sheet {
        if page.is_color_page() {
            out.color_pages.insert(page.page_number());
        } else {
            out.bw_pages.insert(page.page_number());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::CoverageVector;

    fn bw(n: u32) -> PageRecord {
        PageRecord::new(n, CoverageVector::new(0.0, 0.0, 0.0, 0.2).unwrap())
    }

    fn color(n: u32) -> PageRecord {
        PageRecord::new(n, CoverageVector::new(0.1, 0.0, 0.05, 0.2).unwrap())
    }

    fn blank(n: u32) -> PageRecord {
        PageRecord::new(n, CoverageVector::new(0.0, 0.0, 0.0, 0.0).unwrap())
    }

    fn set(v: &[u32]) -> BTreeSet<u32> {
        v.iter().copied().collect()
    }

    const DUPLEX: GroupingOptions = GroupingOptions {
        two_sided: true,
        include_trailing_page: false,
    };

    #[test]
    fn two_sided_keeps_sheets_together() {
        let pages = [bw(1), color(2), bw(3), bw(4)];
        let out = group_pages(&pages, DUPLEX);
        assert_eq!(out.color_pages, set(&[1, 2]));
        assert_eq!(out.bw_pages, set(&[3, 4]));
        assert_eq!(out.dropped_page, None);
    }

    #[test]
    fn independent_mode_routes_each_page() {
        let pages = [bw(1), color(2), blank(3), color(4)];
        let out = group_pages(&pages, GroupingOptions::default());
        assert_eq!(out.color_pages, set(&[2, 4]));
        assert_eq!(out.bw_pages, set(&[1, 3]));
    }

    #[test]
    fn blank_back_of_color_sheet_follows_color() {
        let pages = [color(1), blank(2)];
        let out = group_pages(&pages, DUPLEX);
        assert_eq!(out.color_pages, set(&[1, 2]));
        assert!(out.bw_pages.is_empty());
    }

    #[test]
    fn odd_trailing_page_dropped_by_default() {
        let pages = [bw(1), bw(2), color(3)];
        let out = group_pages(&pages, GroupingOptions::default());
        assert_eq!(out.bw_pages, set(&[1, 2]));
        assert!(out.color_pages.is_empty());
        assert_eq!(out.dropped_page, Some(3));
    }

    #[test]
    fn odd_trailing_page_routed_when_enabled() {
        let pages = [bw(1), bw(2), color(3)];
        let opts = GroupingOptions {
            two_sided: true,
            include_trailing_page: true,
        };
        let out = group_pages(&pages, opts);
        assert_eq!(out.color_pages, set(&[3]));
        assert_eq!(out.dropped_page, None);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let out = group_pages(&[], DUPLEX);
        assert_eq!(out, PartitionResult::default());
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        let pages: Vec<PageRecord> = (1..=9)
            .map(|n| match n % 3 {
                0 => color(n),
                1 => bw(n),
                _ => blank(n),
            })
            .collect();
        for two_sided in [false, true] {
            let opts = GroupingOptions {
                two_sided,
                include_trailing_page: false,
            };
            let out = group_pages(&pages, opts);
            assert!(out.color_pages.is_disjoint(&out.bw_pages));
            let mut all: BTreeSet<u32> = out.color_pages.union(&out.bw_pages).copied().collect();
            all.extend(out.dropped_page);
            assert_eq!(all, (1..=9).collect());
        }
    }
}
