// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod chats;
pub mod idempotency;
pub mod inbound;
pub mod lock;
pub mod messages;
pub mod queue;
pub mod ratelimit;
pub mod salons;
