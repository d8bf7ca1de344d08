//! Stage artifact types.

use super::StageId;
use serde::{Deserialize, Serialize};

/// A visual prompt derived from one scene of the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePrompt {
    /// Zero-based position in the sequence.
    pub index: usize,
    /// The scene text the prompt illustrates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    /// The prompt sent to the image model.
    pub prompt: String,
}

/// An image produced by an image model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Position of the prompt it was generated from.
    pub index: usize,
    /// The prompt used.
    pub prompt: String,
    /// Where the image can be fetched.
    pub url: String,
    /// Pixel width, when the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height, when the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A clip animated from a generated image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedVideo {
    /// Position of the source image.
    pub index: usize,
    /// URL of the image the clip was animated from.
    pub source_image_url: String,
    /// Where the clip can be fetched.
    pub url: String,
    /// Clip length, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// The output held by a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageArtifact {
    /// Narration script.
    Script {
        /// Full script text.
        text: String,
        /// The script split into scenes.
        scenes: Vec<String>,
    },
    /// Synthesized narration audio.
    Narration {
        /// `https://` or `data:` URL of the audio.
        audio_url: String,
        /// Voice used for synthesis.
        voice_id: String,
        /// Audio length, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_seconds: Option<f64>,
    },
    /// Visual prompts, one per scene.
    ImagePrompts {
        /// The prompts in order.
        prompts: Vec<ImagePrompt>,
    },
    /// Generated images.
    Images {
        /// The images in order.
        images: Vec<GeneratedImage>,
    },
    /// Generated clips.
    Videos {
        /// The clips in order.
        videos: Vec<GeneratedVideo>,
    },
    /// Result of the export readiness check.
    ExportReadiness {
        /// Number of assets that will be bundled.
        items: usize,
        /// When the check ran (ISO 8601).
        checked_at: String,
    },
}

impl StageArtifact {
    /// Creates a script artifact, splitting the text into scenes.
    #[must_use]
    pub fn script(text: impl Into<String>) -> Self {
        let text = text.into();
        let scenes = crate::utils::split_scenes(&text);
        Self::Script { text, scenes }
    }

    /// The stage this artifact belongs to.
    #[must_use]
    pub fn stage(&self) -> StageId {
        match self {
            Self::Script { .. } => StageId::Script,
            Self::Narration { .. } => StageId::Narration,
            Self::ImagePrompts { .. } => StageId::ImagePrompts,
            Self::Images { .. } => StageId::Images,
            Self::Videos { .. } => StageId::Videos,
            Self::ExportReadiness { .. } => StageId::Export,
        }
    }

    /// Number of items the artifact holds.
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::Script { scenes, .. } => scenes.len(),
            Self::Narration { .. } => 1,
            Self::ImagePrompts { prompts } => prompts.len(),
            Self::Images { images } => images.len(),
            Self::Videos { videos } => videos.len(),
            Self::ExportReadiness { items, .. } => *items,
        }
    }

    /// Returns true if the artifact carries no usable content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Script { text, .. } => text.trim().is_empty(),
            Self::Narration { audio_url, .. } => audio_url.is_empty(),
            Self::ImagePrompts { prompts } => prompts.is_empty(),
            Self::Images { images } => images.is_empty(),
            Self::Videos { videos } => videos.is_empty(),
            Self::ExportReadiness { items, .. } => *items == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_splits_scenes() {
        let artifact = StageArtifact::script("Opening shot.\n\nThe product reveal.\n\nCall to action.");

        assert_eq!(artifact.stage(), StageId::Script);
        assert_eq!(artifact.item_count(), 3);
        assert!(!artifact.is_empty());
    }

    #[test]
    fn test_empty_artifacts() {
        assert!(StageArtifact::script("   ").is_empty());
        assert!(StageArtifact::Images { images: vec![] }.is_empty());
        assert!(StageArtifact::ExportReadiness {
            items: 0,
            checked_at: String::new()
        }
        .is_empty());
    }

    #[test]
    fn test_tagged_serialization() {
        let artifact = StageArtifact::Narration {
            audio_url: "https://cdn.example/voice.mp3".to_string(),
            voice_id: "rachel".to_string(),
            duration_seconds: None,
        };

        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["type"], "narration");
        assert!(json.get("duration_seconds").is_none());

        let back: StageArtifact = serde_json::from_value(json).unwrap();
        assert_eq!(back, artifact);
    }
}
