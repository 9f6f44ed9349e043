// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the webhook and worker.
//!
//! Everything with an external implementation (AI completion, outbound
//! send, salon lookup, scheduling, knowledge retrieval) sits behind one of
//! these traits so tests can inject fakes without global state.

pub mod directory;
pub mod responder;
pub mod retrieval;
pub mod scheduling;
pub mod sender;

pub use directory::SalonDirectory;
pub use responder::{
    ChatTurn, ReplyBlock, ResponderAdapter, ResponderReply, ResponderRequest, ToolSpec, TurnBlock,
};
pub use retrieval::KnowledgeRetriever;
pub use scheduling::{BookingConfirmation, BookingRequest, SchedulingBackend, ServiceListing};
pub use sender::OutboundSender;
