// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Excel (.xlsx) output: one worksheet per detected table.

use doctools_core::error::DoctoolsError;
use doctools_core::types::DetectedTable;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::{debug, instrument};

use super::clean_text;

fn writer_error(err: XlsxError) -> DoctoolsError {
    DoctoolsError::Writer {
        format: "Excel",
        detail: err.to_string(),
    }
}

/// Write every table to its own sheet named `Table_1`, `Table_2`, ...
///
/// Row 0 of each table is written bold as the header. Body cells that look
/// like plain numbers are stored as numbers so they can be summed.
///
/// # Errors
///
/// [`DoctoolsError::NoTablesFound`] when `tables` is empty.
#[instrument(skip_all, fields(tables = tables.len()))]
pub fn tables_to_workbook(tables: &[DetectedTable]) -> Result<Vec<u8>, DoctoolsError> {
    if tables.is_empty() {
        return Err(DoctoolsError::NoTablesFound);
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for (index, table) in tables.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(format!("Table_{}", index + 1))
            .map_err(writer_error)?;

        for (r, row) in table.rows.iter().enumerate() {
            let r = r as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                let text = clean_text(cell);
                if r == 0 {
                    sheet
                        .write_string_with_format(r, c, text, &header)
                        .map_err(writer_error)?;
                } else if let Some(number) = parse_number(&text) {
                    sheet.write_number(r, c, number).map_err(writer_error)?;
                } else if !text.is_empty() {
                    sheet.write_string(r, c, text).map_err(writer_error)?;
                }
            }
        }
        sheet.autofit();
        debug!(sheet = index + 1, page = table.page, rows = table.rows.len(), "Sheet written");
    }

    workbook.save_to_buffer().map_err(writer_error)
}

/// Parse plain decimal numbers, allowing `,` thousands separators.
///
/// Leading zeros (`007`), exponents and words like `inf` stay text.
fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    let digits = cell.strip_prefix(['-', '+']).unwrap_or(cell);
    if digits.is_empty()
        || !digits.starts_with(|c: char| c.is_ascii_digit())
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.") {
        return None;
    }

    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if fraction.contains(['.', ',']) {
        return None;
    }
    if integer.contains(',') {
        let mut groups = integer.split(',');
        let first_ok = groups.next().is_some_and(|g| (1..=3).contains(&g.len()));
        if !first_ok || !groups.all(|g| g.len() == 3) {
            return None;
        }
    }

    cell.replace(',', "").parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_recognised() {
        assert_eq!(parse_number("12"), Some(12.0));
        assert_eq!(parse_number("-3.5"), Some(-3.5));
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number("0.25"), Some(0.25));
        assert_eq!(parse_number("0"), Some(0.0));
        assert_eq!(parse_number("+4.75"), Some(4.75));
        assert_eq!(parse_number("+1,000"), Some(1000.0));
    }

    #[test]
    fn identifiers_and_words_stay_text() {
        assert_eq!(parse_number("007"), None);
        assert_eq!(parse_number("1,20"), None);
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("1e5"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("+-1"), None);
        assert_eq!(parse_number("12 kg"), None);
    }

    #[test]
    fn no_tables_is_an_error() {
        assert!(matches!(tables_to_workbook(&[]), Err(DoctoolsError::NoTablesFound)));
    }

    #[test]
    fn workbook_bytes_are_a_zip_package() {
        let table = DetectedTable {
            page: 1,
            rows: vec![vec!["Item".into(), "Qty".into()], vec!["Pens".into(), "4".into()]],
        };
        let bytes = tables_to_workbook(&[table]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
