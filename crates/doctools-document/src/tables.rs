// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table reconstruction from layout text.
//
// Layout text keeps columns aligned with runs of spaces. A line with two or
// more cells (text separated by at least two spaces or a tab) is a candidate
// row. Consecutive candidate rows form a table when their cells are mostly
// short or numeric, and either a "river" (character positions blank in every
// row) cuts them into two or more columns or the run has at least three rows.
// Prose that happens to contain double spaces fails the first test.

use doctools_core::types::DetectedTable;

/// Minimum gap between cells, in characters.
const MIN_GAP: usize = 2;

/// Rows needed before a run of candidate lines counts as a table.
const MIN_ROWS: usize = 2;

/// Rows needed when no river lines the columns up.
const MIN_UNALIGNED_ROWS: usize = 3;

/// Cells with more words than this read as prose.
const MAX_CELL_WORDS: usize = 3;

/// A piece of page content in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A line of running text, trimmed.
    Text(String),
    /// One or more blank lines.
    Gap,
    /// Rectangular table rows; row 0 is the header.
    Table(Vec<Vec<String>>),
}

/// Split a line into cells on runs of two or more spaces, or tabs.
pub fn split_cells(line: &str) -> Vec<String> {
    let line = expand_tabs(line);
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut spaces = 0;

    for ch in line.trim().chars() {
        if ch == ' ' {
            spaces += 1;
            continue;
        }
        if spaces >= MIN_GAP && !current.is_empty() {
            cells.push(std::mem::take(&mut current));
        } else if spaces > 0 {
            current.push(' ');
        }
        spaces = 0;
        current.push(ch);
    }
    if !current.is_empty() {
        cells.push(current);
    }
    cells
}

fn is_candidate_row(line: &str) -> bool {
    split_cells(line).len() >= 2
}

/// Segment a page into text lines, gaps and tables.
///
/// A single blank line inside a run of candidate rows does not end the table.
pub fn segment_page(lines: &[String]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if is_candidate_row(&lines[i]) {
            let mut last_row = i;
            let mut j = i + 1;
            while j < lines.len() {
                if is_candidate_row(&lines[j]) {
                    last_row = j;
                    j += 1;
                } else if lines[j].trim().is_empty()
                    && lines.get(j + 1).is_some_and(|next| is_candidate_row(next))
                {
                    j += 1;
                } else {
                    break;
                }
            }

            let rows: Vec<&str> = lines[i..=last_row]
                .iter()
                .map(String::as_str)
                .filter(|line| !line.trim().is_empty())
                .collect();
            if rows.len() >= MIN_ROWS {
                let (table, aligned) = build_table(&rows);
                if (aligned || rows.len() >= MIN_UNALIGNED_ROWS) && looks_tabular(&table) {
                    blocks.push(Block::Table(table));
                    i = last_row + 1;
                    continue;
                }
            }
        }

        let trimmed = lines[i].trim();
        if trimmed.is_empty() {
            if !matches!(blocks.last(), Some(Block::Gap) | None) {
                blocks.push(Block::Gap);
            }
        } else {
            blocks.push(Block::Text(collapse_spaces(trimmed)));
        }
        i += 1;
    }

    if matches!(blocks.last(), Some(Block::Gap)) {
        blocks.pop();
    }
    blocks
}

/// Tables found on one page.
pub fn detect_tables(page: usize, lines: &[String]) -> Vec<DetectedTable> {
    segment_page(lines)
        .into_iter()
        .filter_map(|block| match block {
            Block::Table(rows) => Some(DetectedTable { page, rows }),
            _ => None,
        })
        .collect()
}

/// Put ruled tables in place of the whitespace tables of the same page, in
/// order. Ruled tables left over are appended after the page content, and
/// text lines made up only of their words are dropped.
pub fn with_ruled_tables(blocks: Vec<Block>, ruled: Vec<Vec<Vec<String>>>) -> Vec<Block> {
    if ruled.is_empty() {
        return blocks;
    }
    let replaced = blocks.iter().filter(|b| matches!(b, Block::Table(_))).count();
    let leftover_words: Vec<&str> = ruled
        .iter()
        .skip(replaced)
        .flatten()
        .flatten()
        .flat_map(|cell| cell.split_whitespace())
        .collect();
    let in_leftover = |text: &str| {
        let mut words = text.split_whitespace().peekable();
        words.peek().is_some() && words.all(|word| leftover_words.contains(&word))
    };

    let mut merged = Vec::with_capacity(blocks.len() + ruled.len());
    let mut tables = ruled.iter();
    for block in blocks {
        match block {
            Block::Table(rows) => merged.push(Block::Table(tables.next().cloned().unwrap_or(rows))),
            Block::Text(text) if in_leftover(&text) => {}
            other => merged.push(other),
        }
    }
    merged.extend(tables.cloned().map(Block::Table));
    merged
}

/// At least half of the non-empty cells are short or numeric.
fn looks_tabular(rows: &[Vec<String>]) -> bool {
    let cells: Vec<&String> = rows.iter().flatten().filter(|cell| !cell.is_empty()).collect();
    let short = cells
        .iter()
        .filter(|cell| cell.split_whitespace().count() <= MAX_CELL_WORDS || is_numeric(cell))
        .count();
    !cells.is_empty() && short * 2 >= cells.len()
}

fn is_numeric(cell: &str) -> bool {
    cell.chars().any(|c| c.is_ascii_digit())
        && cell
            .chars()
            .all(|c| c.is_ascii_digit() || " .,+-%$()".contains(c) || !c.is_ascii())
}

/// Cut rows into columns. Uses whitespace rivers when they yield at least two
/// columns, otherwise splits each row on its own gaps and pads to the widest.
/// The flag is true when rivers were used.
fn build_table(rows: &[&str]) -> (Vec<Vec<String>>, bool) {
    let grid: Vec<Vec<char>> = rows.iter().map(|r| expand_tabs(r).chars().collect()).collect();
    let columns = column_spans(&grid);

    if columns.len() >= 2 {
        let table = grid
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|&(start, end)| {
                        let end = end.min(row.len());
                        if start >= end {
                            String::new()
                        } else {
                            collapse_spaces(row[start..end].iter().collect::<String>().trim())
                        }
                    })
                    .collect()
            })
            .collect();
        return (table, true);
    }

    let mut split: Vec<Vec<String>> = rows.iter().map(|r| split_cells(r)).collect();
    let width = split.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut split {
        row.resize(width, String::new());
    }
    (split, false)
}

/// Half-open character ranges holding content in at least one row, separated
/// by at least `MIN_GAP` columns that are blank in every row.
fn column_spans(grid: &[Vec<char>]) -> Vec<(usize, usize)> {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let occupied: Vec<bool> = (0..width)
        .map(|x| grid.iter().any(|row| row.get(x).is_some_and(|c| !c.is_whitespace())))
        .collect();

    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut blank_run = 0;

    for (x, &filled) in occupied.iter().enumerate() {
        if filled {
            if start.is_none() {
                start = Some(x);
            }
            blank_run = 0;
        } else if let Some(s) = start {
            blank_run += 1;
            if blank_run == MIN_GAP {
                spans.push((s, x + 1 - MIN_GAP));
                start = None;
            }
        }
    }
    if let Some(s) = start {
        spans.push((s, width - blank_run));
    }
    spans
}

fn expand_tabs(line: &str) -> String {
    line.replace('\t', "  ")
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn cells_split_on_wide_gaps_only() {
        assert_eq!(split_cells("  Unit price   12.50  "), vec!["Unit price", "12.50"]);
        assert_eq!(split_cells("a\tb"), vec!["a", "b"]);
        assert_eq!(split_cells("just a sentence"), vec!["just a sentence"]);
        assert!(split_cells("   ").is_empty());
    }

    #[test]
    fn aligned_columns_become_a_table() {
        let page = lines(
            "Invoice 42\n\
             \n\
             Name      Qty   Price\n\
             Apple     3     1.20\n\
             Banana    12    0.50\n\
             \n\
             Thank you.",
        );
        let blocks = segment_page(&page);
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0], Block::Text("Invoice 42".into()));
        assert_eq!(blocks[1], Block::Gap);
        assert_eq!(
            blocks[2],
            Block::Table(vec![
                vec!["Name".into(), "Qty".into(), "Price".into()],
                vec!["Apple".into(), "3".into(), "1.20".into()],
                vec!["Banana".into(), "12".into(), "0.50".into()],
            ])
        );
        assert_eq!(blocks[4], Block::Text("Thank you.".into()));
    }

    #[test]
    fn single_candidate_row_is_text() {
        let page = lines("Total    99\nThe end");
        assert!(detect_tables(1, &page).is_empty());
        assert_eq!(
            segment_page(&page),
            vec![Block::Text("Total 99".into()), Block::Text("The end".into())]
        );
    }

    #[test]
    fn one_blank_line_inside_a_table_is_tolerated() {
        let page = lines("A    B\n1    2\n\n3    4\n\n\n5    6");
        let tables = detect_tables(7, &page);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page, 7);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[2], vec!["3", "4"]);
    }

    #[test]
    fn empty_cells_keep_their_column() {
        let page = lines("Item      Note      Amount\nPens                4\nInk       refill    2");
        let tables = detect_tables(1, &page);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[1], vec!["Pens", "", "4"]);
        assert_eq!(tables[0].column_count(), 3);
    }

    #[test]
    fn misaligned_rows_fall_back_to_per_row_split() {
        // No blank column runs through every row.
        let page = lines("ab  cd  ef\nabcdefgh  z\na  bcdefghijk");
        let tables = detect_tables(1, &page);
        assert_eq!(tables.len(), 1);
        let rows = &tables[0].rows;
        assert_eq!(rows[0], vec!["ab", "cd", "ef"]);
        assert_eq!(rows[1], vec!["abcdefgh", "z", ""]);
        assert_eq!(rows[2], vec!["a", "bcdefghijk", ""]);
    }

    #[test]
    fn two_tables_on_one_page() {
        let page = lines("a  b\nc  d\nsome prose here\ne  f\ng  h");
        assert_eq!(detect_tables(1, &page).len(), 2);
    }

    #[test]
    fn double_spaced_prose_is_not_a_table() {
        let page = vec![
            "The contract starts in May.  Payment is due monthly.".to_string(),
            "Either party may cancel.  Notice must be in writing.".to_string(),
        ];
        assert!(detect_tables(1, &page).is_empty());
        assert_eq!(
            segment_page(&page)[0],
            Block::Text("The contract starts in May. Payment is due monthly.".into())
        );
    }

    #[test]
    fn two_unaligned_rows_are_not_enough() {
        let page = lines("ab  cd
abcdefgh  z");
        assert!(detect_tables(1, &page).is_empty());
    }

    #[test]
    fn long_numeric_cells_still_count() {
        assert!(is_numeric("1 250 000.00"));
        assert!(is_numeric("(42%)"));
        assert!(!is_numeric("May 2026"));
        let rows = vec![vec!["Net amount due this quarter".to_string(), "1 250 000.00".to_string()]];
        assert!(looks_tabular(&rows));
    }

    #[test]
    fn ruled_tables_replace_whitespace_tables_in_order() {
        let blocks = segment_page(&lines("Intro\na  b\nc  d\nOutro"));
        let ruled = vec![
            vec![vec!["A".to_string(), "B".to_string()], vec!["C".to_string(), "D".to_string()]],
            vec![vec!["x".to_string(), "y".to_string()], vec!["1".to_string(), "2".to_string()]],
        ];
        let merged = with_ruled_tables(blocks, ruled.clone());
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0], Block::Text("Intro".into()));
        assert_eq!(merged[1], Block::Table(ruled[0].clone()));
        assert_eq!(merged[2], Block::Text("Outro".into()));
        assert_eq!(merged[3], Block::Table(ruled[1].clone()));

        let plain = segment_page(&lines("a  b\nc  d"));
        assert_eq!(with_ruled_tables(plain.clone(), Vec::new()), plain);
    }

    #[test]
    fn text_repeated_by_an_appended_grid_is_dropped() {
        let blocks = segment_page(&lines("Heading\nLong cell one  Long cell two\nFooter"));
        let ruled = vec![vec![
            vec!["Long cell one".to_string(), "Long cell two".to_string()],
            vec!["x".to_string(), "y".to_string()],
        ]];
        assert_eq!(
            with_ruled_tables(blocks, ruled.clone()),
            vec![
                Block::Text("Heading".into()),
                Block::Text("Footer".into()),
                Block::Table(ruled[0].clone()),
            ]
        );
    }

    #[test]
    fn empty_page_has_no_blocks() {
        assert!(segment_page(&[]).is_empty());
        assert!(segment_page(&lines("\n\n  \n")).is_empty());
    }
}
