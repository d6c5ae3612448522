use pdf_segregate::{
    grouping::{GroupingOptions, group_pages},
    ingest::parse_inkcov,
    page::PageType,
};
use std::collections::BTreeSet;

// 1=B&W 2=Color 3=B&W 4=B&W 5=Blank 6=Color 7=Blank
const DUMP: &str = "\
 0.00000  0.00000  0.00000  0.05000 CMYK OK
 0.10000  0.00000  0.00000  0.05000 CMYK OK
 0.00000  0.00000  0.00000  0.05000 CMYK OK
 0.00000  0.00000  0.00000  0.02000 CMYK OK
 0.00000  0.00000  0.00000  0.00000 CMYK OK
 0.00000  0.00000  0.20000  0.00000 CMYK OK
 0.00000  0.00000  0.00000  0.00000 CMYK OK
";

fn set(v: &[u32]) -> BTreeSet<u32> {
    v.iter().copied().collect()
}

#[test]
fn parsed_dump_groups_by_sheet() {
    let pages = parse_inkcov(DUMP);
    assert_eq!(pages.len(), 7);
    assert_eq!(pages[4].page_type(), PageType::Blank);

    let out = group_pages(
        &pages,
        GroupingOptions {
            two_sided: true,
            include_trailing_page: false,
        },
    );
    assert_eq!(out.color_pages, set(&[1, 2, 5, 6]));
    assert_eq!(out.bw_pages, set(&[3, 4]));
    assert_eq!(out.dropped_page, Some(7));
}

#[test]
fn parsed_dump_groups_by_page() {
    let pages = parse_inkcov(DUMP);
    let out = group_pages(
        &pages,
        GroupingOptions {
            two_sided: false,
            include_trailing_page: true,
        },
    );
    assert_eq!(out.color_pages, set(&[2, 6]));
    assert_eq!(out.bw_pages, set(&[1, 3, 4, 5, 7]));
    assert_eq!(out.dropped_page, None);
}

#[test]
fn two_sided_never_splits_a_sheet() {
    let pages = parse_inkcov(DUMP);
    let out = group_pages(
        &pages,
        GroupingOptions {
            two_sided: true,
            include_trailing_page: true,
        },
    );
    for sheet in pages.chunks(2) {
        let in_color = sheet
            .iter()
            .filter(|p| out.color_pages.contains(&p.page_number()))
            .count();
        assert!(in_color == 0 || in_color == sheet.len());
        if sheet.iter().any(|p| p.is_color_page()) {
            assert_eq!(in_color, sheet.len());
        }
    }
}
