//! FramePipe Media - Synthetic clip engine
//!
//! This crate provides a frame source that behaves like a real rendering
//! engine:
//! - Clip description files (JSON)
//! - A worker pool rendering frames out of order
//! - Deterministic test patterns with padded source rows
//! - Outstanding frame accounting

pub mod clip;
pub mod engine;
pub mod pattern;

pub use clip::ClipSpec;
pub use engine::PatternEngine;
pub use pattern::{pattern_sample, PatternFrame, PADDING_BYTE};
