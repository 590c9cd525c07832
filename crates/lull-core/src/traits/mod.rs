// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability trait definitions.
//!
//! External collaborators extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod completion;
pub mod image;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use completion::CompletionAdapter;
pub use image::ImageAdapter;
pub use storage::{MessageStore, PendingQueue, StorageAdapter, UsageStore};
pub use transport::TransportAdapter;
