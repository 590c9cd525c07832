// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Lull integration tests.
//!
//! Provides mock capabilities and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockTransport`] - Scriptable inbound events and captured replies
//! - [`MockCompletion`] - Completion capability with pre-configured results
//! - [`MockImageGenerator`] - Image capability returning fixed URLs
//! - [`TestHarness`] - Full engine on a temp SQLite database

pub mod harness;
pub mod mock_completion;
pub mod mock_image;
pub mod mock_transport;

pub use harness::{TestHarness, init_tracing};
pub use mock_completion::MockCompletion;
pub use mock_image::MockImageGenerator;
pub use mock_transport::MockTransport;
