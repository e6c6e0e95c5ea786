//! Configuration module for product collection
//!
//! This module provides the `CollectConfig` struct and its type-safe builder
//! for configuring extraction timing, download policy and browser launch.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::{CollectConfigBuilder, WithDownloadRoot};
pub use types::{CollectConfig, DownloadPolicy, RevealPolicy, SkuTiming};
