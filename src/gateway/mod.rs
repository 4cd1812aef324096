// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Caller-facing entry points. Each gateway owns a clone of the orchestrator
//! and whatever caches it needs; nothing here is global.

pub mod embedding;
pub mod generation;
pub mod weather;

pub use embedding::EmbeddingGateway;
pub use generation::GenerationGateway;
pub use weather::{normalize_location, WeatherGateway, WeatherLookup};
