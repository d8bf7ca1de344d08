//! Testing utilities for studio pipelines.
//!
//! This module provides:
//! - Scriptable provider mocks that need no network
//! - Sample artifacts and a helper that approves stages in order

mod fixtures;
mod mocks;

pub use fixtures::{approve_through, complete_stage, sample_artifact};
pub use mocks::{
    MapFetcher, SequenceImageGenerator, SequenceVideoGenerator, StaticSpeechSynthesizer,
    StaticTextGenerator,
};
