//! Stage runners.
//!
//! A runner turns approved upstream artifacts into its own stage's artifact
//! by calling a generation provider. Runners never touch the store; the
//! [`StageDriver`] checks the gate, marks the stage as generating, runs the
//! runner and records the outcome.

mod context;
mod driver;
mod image_prompts;
mod inputs;
mod media;
mod narration;
mod readiness;
mod script;

pub use context::RunContext;
pub use driver::StageDriver;
pub use image_prompts::ImagePromptRunner;
pub use inputs::RunnerInputs;
pub use media::{ImageRunner, VideoRunner};
pub use narration::NarrationRunner;
pub use readiness::ExportReadinessRunner;
pub use script::ScriptRunner;

use crate::core::{StageArtifact, StageId};
use crate::errors::StudioError;
use async_trait::async_trait;

/// Produces the artifact of one stage.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// The stage this runner fills.
    fn stage(&self) -> StageId;

    /// Generates the artifact from approved upstream inputs.
    async fn run(&self, inputs: &RunnerInputs, ctx: &RunContext)
        -> Result<StageArtifact, StudioError>;
}
