// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Navalha integration tests.
//!
//! Mock implementations of the collaborator traits (responder, sender,
//! scheduling, retrieval) plus a harness that seeds a temp SQLite store
//! with one salon, so tests can drive the webhook and worker pipelines
//! without any external service.

pub mod harness;
pub mod mock_responder;
pub mod mock_scheduling;
pub mod mock_sender;

pub use harness::TestHarness;
pub use mock_responder::MockResponder;
pub use mock_scheduling::{MockScheduling, StaticRetriever};
pub use mock_sender::{MockSender, SentMessage};
