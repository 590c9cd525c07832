// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage accounting for the Lull response engine.
//!
//! This crate provides:
//! - **Usage ledger**: per-conversation running spend, incremented with a
//!   single atomic upsert on the shared SQLite engine
//! - **Pricing**: configurable per-model token rates and a flat image charge

pub mod ledger;
pub mod pricing;

pub use ledger::UsageLedger;
pub use pricing::{ModelPricing, PricingTable, calculate_cost};
