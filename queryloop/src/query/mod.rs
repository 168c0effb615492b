// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query instances and loop execution
//!
//! - [`QueryInstance`]: resolved parameters, result, pagination and loop state
//! - Run logic on [`RenderSession`](crate::session::RenderSession): history
//!   reuse, preparation, cached backend execution
//! - Loop execution with a scoped [`LoopGuard`]

mod instance;
mod looping;
mod runner;

pub use instance::QueryInstance;
pub use looping::{LoopGuard, RenderItem};
