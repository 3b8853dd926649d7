// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams of the gateway.
//!
//! Every trait uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>`.

pub mod adapter;
pub mod bus;
pub mod session;

pub use adapter::PluginAdapter;
pub use bus::{BusEvent, EventBus, publish_scoped};
pub use session::{SessionClient, SessionFactory};
