//! # Studioflow
//!
//! An approval-gated content generation pipeline.
//!
//! A studio project moves through six stages, each producing an artifact
//! that a person must approve before the next stage may run:
//!
//! - **Script**: a narration script generated by a text model
//! - **Narration**: speech synthesized from the approved script
//! - **Image prompts**: one visual prompt per scene of the script
//! - **Images**: one generated image per approved prompt
//! - **Videos**: one short clip animated from each approved image
//! - **Export**: a readiness check, then a zip bundle of approved assets
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use studioflow::prelude::*;
//!
//! let store = Arc::new(PipelineStore::new("launch-teaser"));
//! let driver = StageDriver::new(store.clone(), Arc::new(LoggingEventSink::default()));
//!
//! driver.run(&ScriptRunner::new(text_model, "A 60s teaser"), &RunContext::new()).await?;
//! ApprovalGate::new(store.clone()).approve(StageId::Script)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod export;
pub mod gate;
pub mod observability;
pub mod providers;
pub mod retry;
pub mod runners;
pub mod store;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::StudioConfig;
    pub use crate::core::{
        ArtifactStatus, GeneratedImage, GeneratedVideo, ImagePrompt, StageArtifact, StageEvent,
        StageId,
    };
    pub use crate::errors::{GateError, ProviderError, StudioError};
    pub use crate::events::{
        ChannelEventSink, CollectingEventSink, EventSink, EventStream, LoggingEventSink,
        NoOpEventSink,
    };
    pub use crate::export::{ExportAggregator, ExportBundle, ExportManifest};
    pub use crate::gate::ApprovalGate;
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::providers::{
        AssetFetcher, ImageGenerator, ProviderSet, SpeechSynthesizer, TextGenerator,
        VideoGenerator,
    };
    pub use crate::runners::{
        ExportReadinessRunner, ImagePromptRunner, ImageRunner, NarrationRunner, RunContext,
        RunnerInputs, ScriptRunner, StageDriver, StageRunner, VideoRunner,
    };
    pub use crate::store::{JsonFileBackend, MemoryBackend, PipelineStore, StageState, StoreBackend};
    pub use crate::utils::{generate_uuid, iso_timestamp};
    pub use std::sync::Arc;
}
