// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wxbridge.
//!
//! Provides an in-memory session client, a factory handing those out, a bus
//! that records everything published to it, and raw protocol fixtures.
//!
//! # Components
//!
//! - [`MockSession`] - scripted session client capturing sends and revokes
//! - [`MockSessionFactory`] - queue-backed [`SessionFactory`](wxbridge_core::SessionFactory)
//! - [`RecordingBus`] - [`EventBus`](wxbridge_core::EventBus) that keeps every event

pub mod fixtures;
pub mod mock_bus;
pub mod mock_session;

pub use mock_bus::RecordingBus;
pub use mock_session::{MockSession, MockSessionFactory, SentItem};
