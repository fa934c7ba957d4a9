// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office output: Word documents via `docx-rs`, Excel workbooks via
// `rust_xlsxwriter`.

pub mod docx;
pub mod xlsx;

pub use docx::WordDocument;
pub use xlsx::tables_to_workbook;

/// Drop characters that are not allowed in OOXML text (control characters
/// other than tab), which PDF text layers sometimes contain.
pub(crate) fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\t' || !c.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_characters_are_removed() {
        assert_eq!(clean_text("a\u{0}b\u{7}\tc\u{1b}"), "ab\tc");
        assert_eq!(clean_text("Grüße"), "Grüße");
    }
}
