// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redaction layer for the Navalha concierge.
//!
//! Customer phone numbers and credentials must never reach log output;
//! every tracing writer in the binaries goes through [`RedactingWriter`].

pub mod redact;

pub use redact::{RedactingWriter, add_secret_value, redact, redact_phone};
