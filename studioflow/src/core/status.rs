//! Stage identifiers and artifact status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six stages of a studio project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Narration script text.
    Script,
    /// Synthesized speech for the script.
    Narration,
    /// One visual prompt per scene.
    ImagePrompts,
    /// Generated still images.
    Images,
    /// Clips animated from the images.
    Videos,
    /// Export readiness check.
    Export,
}

impl StageId {
    /// All stages in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::Script,
        Self::Narration,
        Self::ImagePrompts,
        Self::Images,
        Self::Videos,
        Self::Export,
    ];

    /// The stages that must be approved before this one may run.
    #[must_use]
    pub fn upstream(self) -> &'static [Self] {
        match self {
            Self::Script => &[],
            Self::Narration | Self::ImagePrompts => &[Self::Script],
            Self::Images => &[Self::ImagePrompts],
            Self::Videos => &[Self::Images],
            Self::Export => &[Self::Narration, Self::Images, Self::Videos],
        }
    }

    /// The stages that list this one as upstream.
    #[must_use]
    pub fn downstream(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|s| s.upstream().contains(&self))
            .collect()
    }

    /// Returns the snake_case name of the stage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Narration => "narration",
            Self::ImagePrompts => "image_prompts",
            Self::Images => "images",
            Self::Videos => "videos",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// Generation status of a stage's artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Nothing generated yet, or cleared by rejection.
    #[default]
    Pending,
    /// A runner is currently working on the stage.
    Generating,
    /// The artifact is populated.
    Completed,
    /// The last run failed.
    Error,
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Generating => write!(f, "generating"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl ArtifactStatus {
    /// Returns true if no run is in flight.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Generating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_chain() {
        assert!(StageId::Script.upstream().is_empty());
        assert_eq!(StageId::Narration.upstream(), &[StageId::Script]);
        assert_eq!(StageId::ImagePrompts.upstream(), &[StageId::Script]);
        assert_eq!(StageId::Images.upstream(), &[StageId::ImagePrompts]);
        assert_eq!(StageId::Videos.upstream(), &[StageId::Images]);
        assert_eq!(
            StageId::Export.upstream(),
            &[StageId::Narration, StageId::Images, StageId::Videos]
        );
    }

    #[test]
    fn test_downstream() {
        assert_eq!(
            StageId::Script.downstream(),
            vec![StageId::Narration, StageId::ImagePrompts]
        );
        assert_eq!(
            StageId::Images.downstream(),
            vec![StageId::Videos, StageId::Export]
        );
        assert!(StageId::Export.downstream().is_empty());
    }

    #[test]
    fn test_upstream_always_earlier() {
        for stage in StageId::ALL {
            for up in stage.upstream() {
                assert!(up < &stage, "{up} should precede {stage}");
            }
        }
    }

    #[test]
    fn test_stage_id_parse() {
        assert_eq!("image_prompts".parse::<StageId>(), Ok(StageId::ImagePrompts));
        assert!("thumbnail".parse::<StageId>().is_err());
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serde_json::to_string(&StageId::ImagePrompts).unwrap(), r#""image_prompts""#);
        assert_eq!(serde_json::to_string(&ArtifactStatus::Generating).unwrap(), r#""generating""#);
        assert_eq!(ArtifactStatus::default(), ArtifactStatus::Pending);
    }
}
