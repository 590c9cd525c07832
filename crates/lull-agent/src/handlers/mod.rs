// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in dispatch handlers.

pub mod balance;
pub mod image;
pub mod misunderstanding;

use std::sync::Arc;

use lull_config::model::RepliesConfig;
use lull_core::{ImageAdapter, UsageStore};
use lull_cost::PricingTable;

pub use balance::BalanceHandler;
pub use image::ImageHandler;
pub use misunderstanding::MisunderstandingHandler;

use crate::handler::HandlerRegistry;

/// A registry with the balance and image handlers and the misunderstanding fallback.
pub fn register_builtins(
    replies: &RepliesConfig,
    pricing: &PricingTable,
    ledger: Arc<dyn UsageStore>,
    image: Arc<dyn ImageAdapter>,
) -> HandlerRegistry {
    let mut registry =
        HandlerRegistry::with_fallback(Arc::new(MisunderstandingHandler::new(&replies.fallback)));
    registry.register(Arc::new(BalanceHandler::new(
        Arc::clone(&ledger),
        &replies.balance_template,
    )));
    registry.register(Arc::new(ImageHandler::new(
        image,
        ledger,
        pricing.image_usd(),
    )));
    registry
}
