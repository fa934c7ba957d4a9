// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ruled tables: grids drawn with path operators.
//
// The page content stream is interpreted just far enough to collect stroked
// or filled straight segments (`m`, `l`, `re`, `h`) and the start point of
// every text show. Horizontal and vertical segments that touch form a grid;
// text is assigned to the grid cell containing its start point.

use lopdf::Object;
use lopdf::content::Operation;

/// Coordinates closer than this (in points) are the same line.
const SNAP: f32 = 2.0;

/// Shorter segments are glyph strokes or ticks, not rules.
const MIN_RULE_LENGTH: f32 = 8.0;

/// `TJ` adjustments wider than this (thousandths of an em) are a word gap.
const TJ_SPACE: f32 = 250.0;

/// Approximate glyph advance as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;

const MIN_ROWS: usize = 2;
const MIN_COLUMNS: usize = 2;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m` applied first, then `n`.
fn concat(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// A horizontal rule at `at` spanning `from..to`, or a vertical one.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rule {
    at: f32,
    from: f32,
    to: f32,
}

impl Rule {
    fn new(at: f32, a: f32, b: f32) -> Self {
        Self {
            at,
            from: a.min(b),
            to: a.max(b),
        }
    }

    fn covers(&self, value: f32) -> bool {
        value >= self.from - SNAP && value <= self.to + SNAP
    }
}

/// Text shown at a point, in page space.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// What the content stream draws that matters for table detection.
#[derive(Debug, Default)]
pub struct PageGraphics {
    horizontal: Vec<Rule>,
    vertical: Vec<Rule>,
    pub texts: Vec<PlacedText>,
    /// Text was shown in a font whose bytes are not single-byte codes.
    pub undecodable_text: bool,
}

impl PageGraphics {
    pub fn has_rules(&self) -> bool {
        !self.horizontal.is_empty() && !self.vertical.is_empty()
    }

    /// Interpret content stream operations. `is_composite` says whether a
    /// font resource name refers to a multi-byte (Type0) font.
    pub fn from_operations(operations: &[Operation], is_composite: impl Fn(&[u8]) -> bool) -> Self {
        let mut graphics = PageGraphics::default();
        let mut interpreter = Interpreter::default();
        for op in operations {
            interpreter.step(op, &mut graphics, &is_composite);
        }
        graphics
    }

    fn add_segment(&mut self, (x0, y0): (f32, f32), (x1, y1): (f32, f32)) {
        let (dx, dy) = ((x1 - x0).abs(), (y1 - y0).abs());
        if dy <= SNAP && dx >= MIN_RULE_LENGTH {
            self.horizontal.push(Rule::new((y0 + y1) / 2.0, x0, x1));
        } else if dx <= SNAP && dy >= MIN_RULE_LENGTH {
            self.vertical.push(Rule::new((x0 + x1) / 2.0, y0, y1));
        }
    }

    /// Grids with at least two rows and two columns, top of the page first.
    /// Each grid is returned as rows of cell text.
    pub fn ruled_tables(&self) -> Vec<Vec<Vec<String>>> {
        let mut grids = self.connected_grids();
        grids.sort_by(|a, b| b.top().total_cmp(&a.top()));
        grids
            .iter()
            .filter_map(|grid| grid.fill(&self.texts))
            .collect()
    }

    /// Group rules that touch each other.
    fn connected_grids(&self) -> Vec<Grid> {
        let h = self.horizontal.len();
        let mut parent: Vec<usize> = (0..h + self.vertical.len()).collect();

        fn root(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for (i, hr) in self.horizontal.iter().enumerate() {
            for (j, vr) in self.vertical.iter().enumerate() {
                if hr.covers(vr.at) && vr.covers(hr.at) {
                    let (a, b) = (root(&mut parent, i), root(&mut parent, h + j));
                    parent[a] = b;
                }
            }
        }

        let mut groups: Vec<(usize, Grid)> = Vec::new();
        for index in 0..parent.len() {
            let key = root(&mut parent, index);
            let slot = match groups.iter().position(|(k, _)| *k == key) {
                Some(slot) => slot,
                None => {
                    groups.push((key, Grid::default()));
                    groups.len() - 1
                }
            };
            let grid = &mut groups[slot].1;
            if index < h {
                grid.horizontal.push(self.horizontal[index]);
            } else {
                grid.vertical.push(self.vertical[index - h]);
            }
        }
        groups
            .into_iter()
            .map(|(_, grid)| grid)
            .filter(|grid| !grid.horizontal.is_empty() && !grid.vertical.is_empty())
            .collect()
    }
}

#[derive(Debug, Default)]
struct Grid {
    horizontal: Vec<Rule>,
    vertical: Vec<Rule>,
}

impl Grid {
    fn top(&self) -> f32 {
        self.horizontal
            .iter()
            .map(|r| r.at)
            .chain(self.vertical.iter().map(|r| r.to))
            .fold(f32::MIN, f32::max)
    }

    /// Column edges left to right. The horizontal rules' extents count as
    /// edges so tables without outer side borders still close.
    fn column_edges(&self) -> Vec<f32> {
        let mut edges: Vec<f32> = self.vertical.iter().map(|r| r.at).collect();
        edges.extend(self.horizontal.iter().flat_map(|r| [r.from, r.to]));
        snap(edges)
    }

    /// Row edges top to bottom.
    fn row_edges(&self) -> Vec<f32> {
        let mut edges: Vec<f32> = self.horizontal.iter().map(|r| r.at).collect();
        edges.extend(self.vertical.iter().flat_map(|r| [r.from, r.to]));
        let mut edges = snap(edges);
        edges.reverse();
        edges
    }

    /// Place text into cells. Empty rows and columns are dropped; `None` when
    /// fewer than two of either remain.
    fn fill(&self, texts: &[PlacedText]) -> Option<Vec<Vec<String>>> {
        let columns = self.column_edges();
        let rows = self.row_edges();
        if columns.len() <= MIN_COLUMNS || rows.len() <= MIN_ROWS {
            return None;
        }

        let mut cells = vec![vec![String::new(); columns.len() - 1]; rows.len() - 1];
        let mut ordered: Vec<&PlacedText> = texts.iter().collect();
        ordered.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

        for text in ordered {
            let row = rows.windows(2).position(|w| text.y < w[0] && text.y >= w[1] - SNAP);
            let column = columns
                .windows(2)
                .position(|w| text.x >= w[0] - SNAP && text.x < w[1]);
            if let (Some(row), Some(column)) = (row, column) {
                let cell = &mut cells[row][column];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(&text.text);
            }
        }

        let keep: Vec<usize> = (0..columns.len() - 1)
            .filter(|&c| cells.iter().any(|row| !row[c].is_empty()))
            .collect();
        let table: Vec<Vec<String>> = cells
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|row| keep.iter().map(|&c| row[c].clone()).collect())
            .collect();

        (table.len() >= MIN_ROWS && keep.len() >= MIN_COLUMNS).then_some(table)
    }
}

/// Sorted, with values within `SNAP` of each other merged.
fn snap(mut values: Vec<f32>) -> Vec<f32> {
    values.sort_by(f32::total_cmp);
    let mut merged: Vec<f32> = Vec::with_capacity(values.len());
    for value in values {
        match merged.last() {
            Some(&last) if value - last <= SNAP => {}
            _ => merged.push(value),
        }
    }
    merged
}

// -- Content stream interpretation ---------------------------------------------

#[derive(Debug)]
struct Interpreter {
    ctm: Matrix,
    saved: Vec<Matrix>,
    path: Vec<((f32, f32), (f32, f32))>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f32,
    leading: f32,
    composite_font: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            saved: Vec::new(),
            path: Vec::new(),
            current: None,
            subpath_start: None,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            composite_font: false,
        }
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(operands.get(..N)?) {
        *slot = number(operand)?;
    }
    Some(out)
}

impl Interpreter {
    fn step(&mut self, op: &Operation, graphics: &mut PageGraphics, is_composite: &dyn Fn(&[u8]) -> bool) {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => self.ctm = self.saved.pop().unwrap_or(IDENTITY),
            "cm" => {
                if let Some(m) = numbers::<6>(operands) {
                    self.ctm = concat(&m, &self.ctm);
                }
            }

            "m" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    let p = apply(&self.ctm, x, y);
                    self.current = Some(p);
                    self.subpath_start = Some(p);
                }
            }
            "l" => {
                if let (Some([x, y]), Some(from)) = (numbers::<2>(operands), self.current) {
                    let to = apply(&self.ctm, x, y);
                    self.path.push((from, to));
                    self.current = Some(to);
                }
            }
            "re" => {
                if let Some([x, y, w, h]) = numbers::<4>(operands) {
                    let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
                        .map(|(px, py)| apply(&self.ctm, px, py));
                    for i in 0..4 {
                        self.path.push((corners[i], corners[(i + 1) % 4]));
                    }
                    self.current = Some(corners[0]);
                    self.subpath_start = Some(corners[0]);
                }
            }
            "h" => self.close_subpath(),
            "c" | "v" | "y" => {
                let end = operands.len().checked_sub(2).and_then(|i| numbers::<2>(&operands[i..]));
                if let Some([x, y]) = end {
                    self.current = Some(apply(&self.ctm, x, y));
                }
            }
            "s" | "b" | "b*" => {
                self.close_subpath();
                self.paint(graphics);
            }
            "S" | "f" | "F" | "f*" | "B" | "B*" => self.paint(graphics),
            "n" => self.clear_path(),

            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.composite_font = is_composite(name.as_slice());
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.leading = leading;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.next_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.leading = -ty;
                    self.next_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(0.0, -self.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(decode_simple(bytes), graphics);
                }
            }
            "'" => {
                self.next_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(decode_simple(bytes), graphics);
                }
            }
            "\"" => {
                self.next_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(decode_simple(bytes), graphics);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&decode_simple(bytes)),
                            other if number(other).is_some_and(|n| -n > TJ_SPACE) => text.push(' '),
                            _ => {}
                        }
                    }
                    self.show(text, graphics);
                }
            }
            _ => {}
        }
    }

    fn close_subpath(&mut self) {
        if let (Some(from), Some(to)) = (self.current, self.subpath_start) {
            self.path.push((from, to));
            self.current = Some(to);
        }
    }

    fn paint(&mut self, graphics: &mut PageGraphics) {
        for (from, to) in self.path.drain(..) {
            graphics.add_segment(from, to);
        }
        self.clear_path();
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.current = None;
        self.subpath_start = None;
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = concat(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Record the text at the current origin, then advance by an estimate of
    /// its width so a following show on the same line lands further right.
    fn show(&mut self, text: String, graphics: &mut PageGraphics) {
        if self.composite_font {
            graphics.undecodable_text = true;
            return;
        }
        let (x, y) = apply(&concat(&self.text_matrix, &self.ctm), 0.0, 0.0);
        let advance = text.chars().count() as f32 * self.font_size * GLYPH_WIDTH;
        self.text_matrix = concat(&translation(advance, 0.0), &self.text_matrix);

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            graphics.texts.push(PlacedText {
                x,
                y,
                text: trimmed.split_whitespace().collect::<Vec<_>>().join(" "),
            });
        }
    }
}

/// Single-byte string codes read as WinAnsi (Latin-1 plus typographic
/// punctuation in 0x80..0x9F).
fn decode_simple(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80 => '€',
            0x85 => '…',
            0x91 => '‘',
            0x92 => '’',
            0x93 => '“',
            0x94 => '”',
            0x95 => '•',
            0x96 => '–',
            0x97 => '—',
            _ => b as char,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(name: &str, operands: Vec<Object>) -> Operation {
        Operation::new(name, operands)
    }

    fn text_at(x: i64, y: i64, text: &str) -> Vec<Operation> {
        vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op("Td", vec![x.into(), y.into()]),
            op("Tj", vec![Object::string_literal(text)]),
            op("ET", vec![]),
        ]
    }

    /// Two columns (100..200, 200..300) and two rows (700..720, 680..700),
    /// drawn as a box plus inner lines.
    fn grid_ops() -> Vec<Operation> {
        let mut ops = vec![
            op("re", vec![100.into(), 680.into(), 200.into(), 40.into()]),
            op("S", vec![]),
            op("m", vec![200.into(), 680.into()]),
            op("l", vec![200.into(), 720.into()]),
            op("m", vec![100.into(), 700.into()]),
            op("l", vec![300.into(), 700.into()]),
            op("S", vec![]),
        ];
        ops.extend(text_at(104, 706, "Region"));
        ops.extend(text_at(204, 706, "Total"));
        ops.extend(text_at(104, 686, "North"));
        ops.extend(text_at(204, 686, "340.5"));
        ops
    }

    #[test]
    fn grid_cells_collect_their_text() {
        let graphics = PageGraphics::from_operations(&grid_ops(), |_| false);
        assert!(graphics.has_rules());
        assert_eq!(
            graphics.ruled_tables(),
            vec![vec![
                vec!["Region".to_string(), "Total".to_string()],
                vec!["North".to_string(), "340.5".to_string()],
            ]]
        );
    }

    #[test]
    fn unpainted_paths_are_ignored() {
        let ops = vec![
            op("re", vec![100.into(), 680.into(), 200.into(), 40.into()]),
            op("W", vec![]),
            op("n", vec![]),
        ];
        let graphics = PageGraphics::from_operations(&ops, |_| false);
        assert!(!graphics.has_rules());
        assert!(graphics.ruled_tables().is_empty());
    }

    #[test]
    fn a_framed_paragraph_is_not_a_table() {
        let mut ops = vec![
            op("re", vec![50.into(), 600.into(), 400.into(), 100.into()]),
            op("S", vec![]),
        ];
        ops.extend(text_at(60, 680, "Important notice"));
        ops.extend(text_at(60, 660, "Please read carefully"));
        let graphics = PageGraphics::from_operations(&ops, |_| false);
        assert!(graphics.ruled_tables().is_empty());
    }

    #[test]
    fn transforms_apply_to_rules_and_text() {
        let mut ops = vec![
            op("q", vec![]),
            op("cm", vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), (-100).into()]),
        ];
        ops.extend(grid_ops());
        ops.push(op("Q", vec![]));
        let graphics = PageGraphics::from_operations(&ops, |_| false);
        let tables = graphics.ruled_tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0][1], vec!["North", "340.5"]);
        assert!(graphics.texts.iter().all(|t| t.x > 150.0 && t.y < 620.0));
    }

    #[test]
    fn tj_arrays_keep_word_gaps() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), 500.into()]),
            op(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Net"),
                    Object::Integer(-30),
                    Object::string_literal("t"),
                    Object::Integer(-600),
                    Object::string_literal("due"),
                ])],
            ),
            op("ET", vec![]),
        ];
        let graphics = PageGraphics::from_operations(&ops, |_| false);
        assert_eq!(
            graphics.texts,
            vec![PlacedText { x: 72.0, y: 500.0, text: "Nett due".into() }]
        );
    }

    #[test]
    fn composite_fonts_mark_the_page() {
        let graphics = PageGraphics::from_operations(&grid_ops(), |name| name == b"F1");
        assert!(graphics.undecodable_text);
        assert!(graphics.texts.is_empty());
    }

    #[test]
    fn winansi_punctuation() {
        assert_eq!(decode_simple(b"caf\xe9 \x93ok\x94"), "café “ok”");
    }
}
