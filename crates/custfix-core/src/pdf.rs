//! lopdf-backed [`TextSearch`].
//!
//! Each page's content stream is decoded once on open and interpreted just
//! far enough to place glyphs: the text matrix operators plus the text-show
//! operators. Fonts are not consulted, so every glyph advances by half the
//! font size. Boxes are good enough to anchor a hotspot, not to typeset.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};

use crate::error::{CustfixError, Result};
use crate::hotspot::{Rect, TextSearch};

const DEFAULT_PAGE_HEIGHT: f64 = 792.0;
const MAX_PAGE_TREE_DEPTH: usize = 32;
const GLYPH_ADVANCE_EM: f64 = 0.5;
const ASCENT_EM: f64 = 0.8;
const DESCENT_EM: f64 = 0.2;

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[derive(Debug, Clone)]
struct Glyph {
    ch: char,
    x: f64,
    advance: f64,
}

/// Glyphs placed by a single text-show operator.
#[derive(Debug, Clone)]
struct TextRun {
    glyphs: Vec<Glyph>,
    baseline: f64,
    font_size: f64,
}

#[derive(Debug, Clone, Default)]
struct PageText {
    /// MediaBox top edge; y is flipped against it.
    top: f64,
    runs: Vec<TextRun>,
}

pub struct PdfTextSearch {
    pages: Vec<PageText>,
}

impl PdfTextSearch {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .map_err(|e| CustfixError::Pdf(format!("{}: {e}", path.display())))?;
        Ok(Self::from_document(&doc))
    }

    pub fn from_document(doc: &Document) -> Self {
        let mut pages = Vec::new();
        for (&page_num, &page_id) in doc.get_pages().iter() {
            let top = page_top(doc, page_id);
            let ops = match doc
                .get_page_content(page_id)
                .and_then(|bytes| Content::decode(&bytes))
            {
                Ok(content) => content.operations,
                Err(e) => {
                    tracing::warn!(page = page_num, error = %e, "unreadable content stream");
                    Vec::new()
                }
            };
            pages.push(PageText::interpret(&ops, top));
        }
        Self { pages }
    }
}

impl TextSearch for PdfTextSearch {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn search_for(&self, page: usize, needle: &str) -> Result<Vec<Rect>> {
        let Some(text) = self.pages.get(page) else {
            return Err(CustfixError::Pdf(format!(
                "page index {page} out of range ({} pages)",
                self.pages.len()
            )));
        };
        Ok(text.search(needle))
    }
}

// ---------------------------------------------------------------------------
// Content-stream interpretation
// ---------------------------------------------------------------------------

struct TextState {
    tm: Matrix,
    tlm: Matrix,
    font_size: f64,
    leading: f64,
}

impl TextState {
    fn new() -> Self {
        Self {
            tm: IDENTITY,
            tlm: IDENTITY,
            font_size: 0.0,
            leading: 0.0,
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        let m = self.tlm;
        self.tlm[4] = tx * m[0] + ty * m[2] + m[4];
        self.tlm[5] = tx * m[1] + ty * m[3] + m[5];
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn h_scale(&self) -> f64 {
        self.tm[0].hypot(self.tm[1])
    }

    fn v_scale(&self) -> f64 {
        self.tm[2].hypot(self.tm[3])
    }

    /// Shift the pen along the baseline by `dx` text-space units.
    fn advance(&mut self, dx: f64) {
        self.tm[4] += dx * self.tm[0];
        self.tm[5] += dx * self.tm[1];
    }

    fn place(&mut self, text: &str, run: &mut Vec<Glyph>) {
        let step = GLYPH_ADVANCE_EM * self.font_size;
        for ch in text.chars() {
            run.push(Glyph {
                ch,
                x: self.tm[4],
                advance: step * self.h_scale(),
            });
            self.advance(step);
        }
    }
}

impl PageText {
    fn interpret(ops: &[Operation], top: f64) -> Self {
        let mut state = TextState::new();
        let mut runs = Vec::new();

        for op in ops {
            let nums: Vec<f64> = op.operands.iter().filter_map(number).collect();
            let mut glyphs = Vec::new();
            let baseline = state.tm[5];
            match op.operator.as_str() {
                "BT" => {
                    state.tm = IDENTITY;
                    state.tlm = IDENTITY;
                }
                "Tf" => {
                    if let Some(size) = op.operands.get(1).and_then(number) {
                        state.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(&l) = nums.first() {
                        state.leading = l;
                    }
                }
                "Td" if nums.len() >= 2 => state.move_line(nums[0], nums[1]),
                "TD" if nums.len() >= 2 => {
                    state.leading = -nums[1];
                    state.move_line(nums[0], nums[1]);
                }
                "Tm" if nums.len() >= 6 => {
                    let m = [nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]];
                    state.tm = m;
                    state.tlm = m;
                }
                "T*" => state.next_line(),
                "Tj" => {
                    if let Some(s) = op.operands.first().and_then(decode_string) {
                        state.place(&s, &mut glyphs);
                    }
                }
                "'" | "\"" => {
                    state.next_line();
                    if let Some(s) = op.operands.last().and_then(decode_string) {
                        state.place(&s, &mut glyphs);
                    }
                }
                "TJ" => {
                    let items = op
                        .operands
                        .first()
                        .and_then(|o| o.as_array().ok())
                        .map(|a| a.as_slice())
                        .unwrap_or(&[]);
                    for item in items {
                        if let Some(s) = decode_string(item) {
                            state.place(&s, &mut glyphs);
                        } else if let Some(adj) = number(item) {
                            state.advance(-adj / 1000.0 * state.font_size);
                        }
                    }
                }
                _ => {}
            }

            if !glyphs.is_empty() {
                let baseline = if matches!(op.operator.as_str(), "'" | "\"") {
                    state.tm[5]
                } else {
                    baseline
                };
                runs.push(TextRun {
                    glyphs,
                    baseline,
                    font_size: state.font_size * state.v_scale(),
                });
            }
        }

        Self { top, runs }
    }

    fn search(&self, needle: &str) -> Vec<Rect> {
        let needle: Vec<char> = needle.chars().collect();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for run in &self.runs {
            let chars: Vec<char> = run.glyphs.iter().map(|g| g.ch).collect();
            let mut i = 0;
            while i + needle.len() <= chars.len() {
                if chars[i..i + needle.len()] == needle[..] {
                    let first = &run.glyphs[i];
                    let last = &run.glyphs[i + needle.len() - 1];
                    hits.push(Rect {
                        x0: first.x,
                        y0: self.top - (run.baseline + ASCENT_EM * run.font_size),
                        x1: last.x + last.advance,
                        y1: self.top - (run.baseline - DESCENT_EM * run.font_size),
                    });
                    i += needle.len();
                } else {
                    i += 1;
                }
            }
        }
        hits
    }
}

// ---------------------------------------------------------------------------
// Object helpers
// ---------------------------------------------------------------------------

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// UTF-16BE with BOM, then UTF-8, then Latin-1.
fn decode_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return Some(s);
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Some(s.to_string());
    }
    Some(bytes.iter().map(|&b| b as char).collect())
}

/// Top edge of the page's MediaBox in user space. The box is inheritable, so
/// the `/Parent` chain is walked when the page itself has none.
fn page_top(doc: &Document, page_id: ObjectId) -> f64 {
    media_box(doc, page_id)
        .map(|[_, y0, _, y1]| y0.max(y1))
        .unwrap_or(DEFAULT_PAGE_HEIGHT)
}

fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f64; 4]> {
    let mut id = page_id;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let dict = doc.get_object(id).and_then(Object::as_dict).ok()?;
        if let Ok(obj) = dict.get(b"MediaBox") {
            let obj = match obj {
                Object::Reference(r) => doc.get_object(*r).ok()?,
                other => other,
            };
            let arr = obj.as_array().ok()?;
            let nums: Vec<f64> = arr.iter().filter_map(number).collect();
            return match nums[..] {
                [x0, y0, x1, y1] => Some([x0, y0, x1, y1]),
                _ => None,
            };
        }
        id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotspot::extract_hotspots;
    use lopdf::{Dictionary, Stream};

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn int(i: i64) -> Object {
        Object::Integer(i)
    }

    fn text(s: &str) -> Object {
        Object::string_literal(s)
    }

    fn setup(x: i64, y: i64) -> Vec<Operation> {
        vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(10)]),
            op("Td", vec![int(x), int(y)]),
        ]
    }

    #[test]
    fn finds_sku_inside_tj_run() {
        let mut ops = setup(100, 700);
        ops.push(op("Tj", vec![text("SKU 9479 Widget")]));
        ops.push(op("ET", vec![]));
        let page = PageText::interpret(&ops, 792.0);

        let hits = page.search("9479");
        assert_eq!(hits.len(), 1);
        let r = hits[0];
        // 4 glyphs in at 5pt each, 4 glyphs wide
        assert_eq!(r.x0, 120.0);
        assert_eq!(r.x1, 140.0);
        assert_eq!(r.y0, 792.0 - 708.0);
        assert_eq!(r.y1, 792.0 - 698.0);
    }

    #[test]
    fn tj_array_kerning_moves_pen() {
        let mut ops = setup(0, 0);
        ops.push(op(
            "TJ",
            vec![Object::Array(vec![text("94"), int(-1000), text("79")])],
        ));
        let page = PageText::interpret(&ops, 792.0);

        let hits = page.search("9479");
        assert_eq!(hits.len(), 1);
        // two glyphs (10pt) + 1000/1000 em kerning (10pt) + two glyphs (10pt)
        assert_eq!(hits[0].x0, 0.0);
        assert_eq!(hits[0].x1, 30.0);
    }

    #[test]
    fn next_line_operators_use_leading() {
        let mut ops = setup(50, 500);
        ops.push(op("TL", vec![int(12)]));
        ops.push(op("Tj", vec![text("first")]));
        ops.push(op("'", vec![text("17468")]));
        let page = PageText::interpret(&ops, 800.0);

        let hits = page.search("17468");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].x0, 50.0);
        assert_eq!(hits[0].y1, 800.0 - (488.0 - 2.0));
    }

    #[test]
    fn tm_sets_absolute_position_and_scale() {
        let mut ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(1)]),
            op("Tm", vec![int(20), int(0), int(0), int(20), int(10), int(100)]),
            op("Tj", vec![text("51274")]),
        ];
        ops.push(op("ET", vec![]));
        let page = PageText::interpret(&ops, 792.0);

        let hits = page.search("51274");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].x0, 10.0);
        assert_eq!(hits[0].x1, 60.0);
        assert_eq!(hits[0].height(), 20.0);
    }

    #[test]
    fn multiple_and_missing_matches() {
        let mut ops = setup(0, 0);
        ops.push(op("Tj", vec![text("9479/9479")]));
        let page = PageText::interpret(&ops, 792.0);
        assert_eq!(page.search("9479").len(), 2);
        assert!(page.search("51274").is_empty());
        assert!(page.search("").is_empty());
    }

    #[test]
    fn utf16_strings_decode() {
        let obj = Object::String(
            vec![0xFE, 0xFF, 0x00, b'9', 0x00, b'4'],
            lopdf::StringFormat::Hexadecimal,
        );
        assert_eq!(decode_string(&obj).as_deref(), Some("94"));
        assert_eq!(decode_string(&int(3)), None);
    }

    fn show_at(x: i64, y: i64, s: &str) -> Content {
        let mut operations = setup(x, y);
        operations.push(op("Tj", vec![text(s)]));
        operations.push(op("ET", vec![]));
        Content { operations }
    }

    fn rect_array(b: [i64; 4]) -> Object {
        Object::Array(b.iter().map(|&v| int(v)).collect())
    }

    /// Two pages: the first inherits an A4 MediaBox from the page tree, the
    /// second carries its own box with a raised origin.
    fn catalogue() -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for (content, media_box) in [
            (show_at(100, 800, "9479"), None),
            (show_at(50, 700, "17468 9479"), Some([0, 100, 612, 892])),
        ] {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                content.encode().unwrap(),
            ));
            let mut page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ]);
            if let Some(b) = media_box {
                page.set("MediaBox", rect_array(b));
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", int(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
            ("MediaBox", rect_array([0, 0, 595, 842])),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let search = PdfTextSearch::from_document(&catalogue());
        assert_eq!(search.page_count(), 2);

        let hits = search.search_for(0, "9479").unwrap();
        assert_eq!(
            hits,
            vec![Rect {
                x0: 100.0,
                y0: 842.0 - 808.0,
                x1: 120.0,
                y1: 842.0 - 798.0,
            }]
        );
    }

    #[test]
    fn media_box_origin_is_respected() {
        let search = PdfTextSearch::from_document(&catalogue());
        let hits = search.search_for(1, "17468").unwrap();
        assert_eq!(hits.len(), 1);
        // measured from the box top (892), not its height (792)
        assert_eq!(hits[0].y0, 892.0 - 708.0);
        assert_eq!(hits[0].y1, 892.0 - 698.0);
        assert!(search.search_for(2, "9479").is_err());
    }

    #[test]
    fn extracts_hotspots_from_document() {
        let search = PdfTextSearch::from_document(&catalogue());
        let skus = vec!["9479".to_string(), "17468".to_string()];
        let hs = extract_hotspots(&search, &skus).unwrap();

        let order: Vec<(usize, &str, f64)> =
            hs.iter().map(|h| (h.page, h.sku.as_str(), h.x)).collect();
        assert_eq!(
            order,
            vec![(1, "9479", 100.0), (2, "9479", 80.0), (2, "17468", 50.0)]
        );
        assert!(hs.iter().all(|h| h.y >= 0.0));
        assert_eq!((hs[0].width, hs[0].height), (20.0, 10.0));
    }

    #[test]
    fn open_missing_file_is_pdf_error() {
        let err = PdfTextSearch::open(Path::new("/nonexistent/catalogue.pdf"))
            .err()
            .unwrap();
        assert!(matches!(err, CustfixError::Pdf(_)));
    }
}
