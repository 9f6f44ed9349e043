// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio transport adapter for the Navalha concierge.
//!
//! Two halves: webhook signature validation for the ingress side, and the
//! outbound send client implementing [`navalha_core::OutboundSender`].

pub mod client;
pub mod signature;

pub use client::TwilioClient;
