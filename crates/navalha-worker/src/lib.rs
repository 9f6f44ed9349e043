// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message worker for the Navalha concierge.
//!
//! Consumes jobs the webhook enqueued, runs the conversation pipeline
//! (rate limit, per-chat lock, manual mode, AI completion with tool calls),
//! and sends the reply through the outbound provider. Runs as its own
//! process; everything it shares with the webhook lives in SQLite.

pub mod backoff;
pub mod pool;
pub mod processor;
pub mod tools;

pub use backoff::BackoffPolicy;
pub use pool::WorkerPool;
pub use processor::{MessageProcessor, ProcessOutcome};
pub use tools::{ToolCall, ToolError, tool_specs};
