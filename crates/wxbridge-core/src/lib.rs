// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the wxbridge WeChat gateway.
//!
//! This crate provides the canonical message model, raw protocol shapes,
//! the error type, and the trait seams (session client, event bus, adapter
//! lifecycle) shared by every other crate in the workspace.

pub mod error;
pub mod ids;
pub mod protocol;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BridgeError;
pub use ids::{canonical_id, is_group_id, raw_id};
pub use types::{
    Account, CanonicalMessage, Contact, FileSource, HealthStatus, Media, Member, MessageType,
    PostType, Segment, SendOutcome, Sender,
};

pub use traits::{
    BusEvent, EventBus, PluginAdapter, SessionClient, SessionFactory, publish_scoped,
};
