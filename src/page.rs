use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-page ink coverage fractions as reported by the inkcov device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageVector {
    pub c: f64,
    pub m: f64,
    pub y: f64,
    pub k: f64,
}

impl CoverageVector {
    /// Returns `None` if any channel is negative or not finite.
    pub fn new(c: f64, m: f64, y: f64, k: f64) -> Option<Self> {
        let ok = [c, m, y, k].iter().all(|v| v.is_finite() && *v >= 0.0);
        ok.then_some(Self { c, m, y, k })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageType {
    Color,
    Blank,
    #[serde(rename = "B&W")]
    Bw,
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageType::Color => "Color",
            PageType::Blank => "Blank",
            PageType::Bw => "B&W",
        };
        f.write_str(s)
    }
}

/// One measured page. Derived coverages are computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRecord {
    page_number: u32,
    coverage: CoverageVector,
    color_coverage: f64,
    ink_coverage: f64,
    zero_threshold: f64,
}

impl PageRecord {
    pub fn new(page_number: u32, coverage: CoverageVector) -> Self {
        let color_coverage = coverage.c + coverage.m + coverage.y;
        Self {
            page_number,
            coverage,
            color_coverage,
            ink_coverage: color_coverage + coverage.k,
            zero_threshold: 0.0,
        }
    }

    /// Coverage at or below `threshold` counts as no ink. `0.0` keeps strict
    /// zero semantics.
    pub fn with_zero_threshold(mut self, threshold: f64) -> Self {
        self.zero_threshold = threshold;
        self
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn coverage(&self) -> CoverageVector {
        self.coverage
    }

    pub fn black_coverage(&self) -> f64 {
        self.coverage.k
    }

    pub fn color_coverage(&self) -> f64 {
        self.color_coverage
    }

    pub fn ink_coverage(&self) -> f64 {
        self.ink_coverage
    }

    /// Any chromatic ink makes the page a color page, whatever the black level.
    pub fn is_color_page(&self) -> bool {
        self.color_coverage > self.zero_threshold
    }

    pub fn is_black_page(&self) -> bool {
        !self.is_color_page() && self.coverage.k > self.zero_threshold
    }

    pub fn is_white_page(&self) -> bool {
        self.ink_coverage <= self.zero_threshold
    }

    pub fn is_blank_page(&self) -> bool {
        self.is_white_page()
    }

    pub fn page_type(&self) -> PageType {
        if self.is_color_page() {
            PageType::Color
        } else if self.is_blank_page() {
            PageType::Blank
        } else {
            PageType::Bw
        }
    }
}

impl fmt::Display for PageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Page: {}: {}>", self.page_number, self.page_type())
    }
}
