//! Core domain model types for studioflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage identifiers and artifact status
//! - Stage artifacts and their item types
//! - Lifecycle events

mod artifact;
mod event;
mod status;

pub use artifact::{GeneratedImage, GeneratedVideo, ImagePrompt, StageArtifact};
pub use event::StageEvent;
pub use status::{ArtifactStatus, StageId};
