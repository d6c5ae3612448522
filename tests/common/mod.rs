#![allow(dead_code)]

use anyhow::Result;
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_segregate::{
    engine::{DocDiag, Engine, InkcovOut},
    job_plan::PageRange,
};
use std::path::Path;
use std::sync::Mutex;

/// Write an `n`-page PDF whose page `i` carries a `/PageLabelTag (i)` entry.
pub fn write_test_pdf(path: &Path, num_pages: u32) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for i in 1..=num_pages {
        let content = format!("BT /F1 12 Tf 72 720 Td (Page {i}) Tj ET");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );
        page.set("Contents", Object::Reference(content_id));
        page.set("PageLabelTag", Object::Integer(i as i64));
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(num_pages as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).unwrap();
}

/// Tags of the pages in a PDF written by [`write_test_pdf`], in page order.
pub fn page_tags(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            doc.get_dictionary(*id)
                .unwrap()
                .get(b"PageLabelTag")
                .unwrap()
                .as_i64()
                .unwrap()
        })
        .collect()
}

/// Serves inkcov lines from a fixed per-page coverage table.
pub struct FakeEngine {
    pub coverage: Vec<[f64; 4]>,
    /// Number of calls that return one record short before behaving.
    pub short_calls: Mutex<u32>,
    pub calls: Mutex<Vec<PageRange>>,
}

impl FakeEngine {
    pub fn new(coverage: Vec<[f64; 4]>) -> Self {
        Self {
            coverage,
            short_calls: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(self, n: u32) -> Self {
        *self.short_calls.lock().unwrap() = n;
        self
    }
}

impl Engine for FakeEngine {
    fn doctor(&self) -> Result<DocDiag> {
        Ok(DocDiag {
            gs_exe: "fake".into(),
            gs_version: Some("0".into()),
            ok: true,
            error: None,
        })
    }

    fn measure_ink(&self, _input: &Path, range: PageRange) -> Result<InkcovOut> {
        self.calls.lock().unwrap().push(range);
        let mut end = range.end_page;
        {
            let mut short = self.short_calls.lock().unwrap();
            if *short > 0 {
                *short -= 1;
                end -= 1;
            }
        }
        let mut stdout = String::from("GPL Ghostscript 10.0 banner line\n");
        for page in range.start_page..=end {
            let [c, m, y, k] = self.coverage[(page - 1) as usize];
            stdout.push_str(&format!(" {c:.5}  {m:.5}  {y:.5}  {k:.5} CMYK OK\n"));
        }
        Ok(InkcovOut {
            start_page: range.start_page,
            end_page: range.end_page,
            stdout,
        })
    }
}

pub const BW: [f64; 4] = [0.0, 0.0, 0.0, 0.12];
pub const COLOR: [f64; 4] = [0.03, 0.01, 0.0, 0.12];
pub const BLANK: [f64; 4] = [0.0, 0.0, 0.0, 0.0];
