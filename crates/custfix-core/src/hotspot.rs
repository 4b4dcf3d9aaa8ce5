//! SKU hotspot extraction.
//!
//! Walks every page of a document, searches for each SKU as literal text and
//! records one [`Hotspot`] per match. Geometry comes from a [`TextSearch`]
//! implementation; see [`crate::pdf::PdfTextSearch`] for the PDF one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Axis-aligned box in page space, origin top-left, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub sku: String,
    /// 1-based page number.
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub trait TextSearch {
    fn page_count(&self) -> usize;

    /// Every occurrence of `needle` on the 0-based `page`.
    fn search_for(&self, page: usize, needle: &str) -> Result<Vec<Rect>>;
}

/// Hotspots ordered by page, then by the order of `skus`, then by match order.
pub fn extract_hotspots(doc: &dyn TextSearch, skus: &[String]) -> Result<Vec<Hotspot>> {
    let mut hotspots = Vec::new();
    for page in 0..doc.page_count() {
        for sku in skus.iter().filter(|s| !s.is_empty()) {
            for rect in doc.search_for(page, sku)? {
                hotspots.push(Hotspot {
                    sku: sku.clone(),
                    page: page + 1,
                    x: rect.x0,
                    y: rect.y0,
                    width: rect.width(),
                    height: rect.height(),
                });
            }
        }
    }
    tracing::info!(
        pages = doc.page_count(),
        skus = skus.len(),
        hotspots = hotspots.len(),
        "hotspot scan finished"
    );
    Ok(hotspots)
}

pub fn write_hotspots(path: &Path, hotspots: &[Hotspot]) -> Result<()> {
    let json = serde_json::to_string_pretty(hotspots)?;
    crate::io::atomic_write(path, json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Pages as maps from needle to match boxes.
    struct FakeDoc(Vec<HashMap<&'static str, Vec<Rect>>>);

    impl TextSearch for FakeDoc {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn search_for(&self, page: usize, needle: &str) -> Result<Vec<Rect>> {
            Ok(self.0[page].get(needle).cloned().unwrap_or_default())
        }
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect { x0, y0, x1, y1 }
    }

    fn skus(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn orders_by_page_then_sku() {
        let doc = FakeDoc(vec![
            HashMap::from([
                ("17468", vec![rect(10.0, 20.0, 40.0, 32.0)]),
                ("9479", vec![rect(100.0, 50.0, 124.0, 62.0)]),
            ]),
            HashMap::from([("9479", vec![rect(1.0, 2.0, 3.0, 4.0), rect(5.0, 6.0, 9.0, 10.0)])]),
        ]);

        let hs = extract_hotspots(&doc, &skus(&["9479", "17468", "51274"])).unwrap();
        let order: Vec<(usize, &str)> = hs.iter().map(|h| (h.page, h.sku.as_str())).collect();
        assert_eq!(
            order,
            vec![(1, "9479"), (1, "17468"), (2, "9479"), (2, "9479")]
        );
        assert_eq!(hs[1].x, 10.0);
        assert_eq!(hs[1].y, 20.0);
        assert_eq!(hs[1].width, 30.0);
        assert_eq!(hs[1].height, 12.0);
    }

    #[test]
    fn empty_skus_are_skipped() {
        let doc = FakeDoc(vec![HashMap::from([("", vec![rect(0.0, 0.0, 1.0, 1.0)])])]);
        assert!(extract_hotspots(&doc, &skus(&[""])).unwrap().is_empty());
    }

    #[test]
    fn writes_pretty_json_with_expected_keys() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("hotspots.json");
        let hs = vec![Hotspot {
            sku: "9479".to_string(),
            page: 3,
            x: 1.5,
            y: 2.0,
            width: 10.0,
            height: 4.0,
        }];
        write_hotspots(&out, &hs).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("\n  {\n    \"sku\": \"9479\""));
        let parsed: Vec<Hotspot> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, hs);
    }
}
