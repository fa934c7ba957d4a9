// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line client for doctools. Talks to a doctools server, or runs the
// same conversions in-process with `--local`.

pub mod client;
pub mod commands;

pub use client::ApiClient;
pub use commands::Backend;
