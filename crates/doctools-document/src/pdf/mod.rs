// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: text layer, embedded images, layout-preserving text, ruled
// tables.

pub mod layout;
pub mod reader;
pub mod rulings;

pub use layout::{LayoutTextSource, NativeLayout, PageLines, PdftotextLayout, layout_source};
pub use reader::{PageText, PdfReader};
