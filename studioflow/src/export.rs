//! Export aggregation.
//!
//! Collects the approved narration, images and clips of a project, fetches
//! each asset and packs them into a zip archive together with the script,
//! the image prompts and a `manifest.json` describing every file.
//!
//! A failed fetch skips that one asset: an `export.item_failed` event is
//! emitted and the rest of the bundle is still produced.

use crate::core::{StageArtifact, StageEvent, StageId};
use crate::errors::StudioError;
use crate::events::{EventSink, NoOpEventSink};
use crate::providers::{extension_for_mime, AssetFetcher};
use crate::store::PipelineStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Name of the manifest entry inside the archive.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One file inside the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path inside the archive.
    pub path: String,
    /// Stage the file came from.
    pub stage: StageId,
    /// Item index within the stage, for batch stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Remote URL the bytes were fetched from; absent for inline data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Size in bytes.
    pub bytes: u64,
    /// Hex SHA-256 of the contents.
    pub sha256: String,
}

/// An asset left out of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFailure {
    /// Stage the asset belongs to.
    pub stage: StageId,
    /// Item index within the stage, for batch stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Where it should have been fetched from.
    pub source_url: String,
    /// Why it was skipped.
    pub error: String,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    /// Project id.
    pub project_id: Uuid,
    /// Project name.
    pub project_name: String,
    /// When the bundle was built (ISO 8601).
    pub exported_at: String,
    /// Files in the archive, excluding the manifest itself.
    pub files: Vec<ManifestEntry>,
    /// Assets that could not be fetched.
    #[serde(default)]
    pub skipped: Vec<ExportFailure>,
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    /// Zip archive bytes.
    pub archive: Vec<u8>,
    /// What the archive contains.
    pub manifest: ExportManifest,
    /// Assets that were skipped.
    pub failures: Vec<ExportFailure>,
}

impl ExportBundle {
    /// Suggested file name, e.g. `launch-teaser-2025-01-31.zip`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let date = self
            .manifest
            .exported_at
            .get(..10)
            .unwrap_or(&self.manifest.exported_at);
        format!("{}-{date}.zip", crate::utils::slugify(&self.manifest.project_name))
    }

    /// Writes the archive. If `path` is a directory the suggested file name
    /// is used inside it. Returns the path written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<PathBuf, StudioError> {
        let path = path.as_ref();
        let target = if path.is_dir() {
            path.join(self.file_name())
        } else {
            path.to_path_buf()
        };
        std::fs::write(&target, &self.archive)?;
        info!(path = %target.display(), bytes = self.archive.len(), "Export written");
        Ok(target)
    }
}

#[derive(Debug)]
struct PlannedAsset {
    stage: StageId,
    index: Option<usize>,
    path: String,
    url: String,
}

/// Builds export bundles from approved stages.
pub struct ExportAggregator {
    store: Arc<PipelineStore>,
    fetcher: Arc<dyn AssetFetcher>,
    events: Arc<dyn EventSink>,
}

impl ExportAggregator {
    /// Creates an aggregator.
    #[must_use]
    pub fn new(store: Arc<PipelineStore>, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            store,
            fetcher,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Builds the bundle.
    ///
    /// Fails only if no stage with exportable content is approved or the
    /// archive itself cannot be written.
    pub async fn export(&self) -> Result<ExportBundle, StudioError> {
        let script = self.store.approved_artifact(StageId::Script);
        let prompts = self.store.approved_artifact(StageId::ImagePrompts);
        let assets = self.plan_assets();

        if script.is_none() && prompts.is_none() && assets.is_empty() {
            return Err(StudioError::Export("nothing approved to export".to_string()));
        }

        let mut archive = ArchiveBuilder::new();
        let mut files = Vec::new();
        let mut failures = Vec::new();

        if let Some(StageArtifact::Script { text, .. }) = &script {
            files.push(archive.add("script.txt", StageId::Script, None, None, text.as_bytes())?);
        }
        if let Some(StageArtifact::ImagePrompts { prompts }) = &prompts {
            let listing: String = prompts
                .iter()
                .map(|p| format!("{}. {}\n", p.index + 1, p.prompt))
                .collect();
            files.push(archive.add(
                "image_prompts.txt",
                StageId::ImagePrompts,
                None,
                None,
                listing.as_bytes(),
            )?);
        }

        for asset in assets {
            match self.fetcher.fetch(&asset.url).await {
                Ok(bytes) => {
                    let source = (!asset.url.starts_with("data:")).then(|| asset.url.clone());
                    files.push(archive.add(&asset.path, asset.stage, asset.index, source, &bytes)?);
                }
                Err(e) => {
                    warn!(stage = %asset.stage, item = ?asset.index, error = %e, "Skipping export item");
                    let failure = ExportFailure {
                        stage: asset.stage,
                        index: asset.index,
                        source_url: truncate_url(&asset.url),
                        error: e.to_string(),
                    };
                    self.events
                        .emit(
                            StageEvent::new("export.item_failed")
                                .add_data("stage", serde_json::json!(failure.stage))
                                .add_data("index", serde_json::json!(failure.index))
                                .add_data("url", serde_json::json!(failure.source_url))
                                .add_data("error", serde_json::json!(failure.error)),
                        )
                        .await;
                    failures.push(failure);
                }
            }
        }

        let manifest = ExportManifest {
            project_id: self.store.project_id(),
            project_name: self.store.name().to_string(),
            exported_at: crate::utils::iso_timestamp(),
            files,
            skipped: failures.clone(),
        };
        let archive = archive.finish(&manifest)?;

        info!(
            project = %manifest.project_id,
            files = manifest.files.len(),
            skipped = failures.len(),
            bytes = archive.len(),
            "Export bundle built"
        );
        self.events
            .emit(
                StageEvent::new("export.completed")
                    .add_data("files", serde_json::json!(manifest.files.len()))
                    .add_data("skipped", serde_json::json!(failures.len()))
                    .add_data("bytes", serde_json::json!(archive.len())),
            )
            .await;

        Ok(ExportBundle {
            archive,
            manifest,
            failures,
        })
    }

    /// Binary assets of approved stages: narration, then images, then clips.
    fn plan_assets(&self) -> Vec<PlannedAsset> {
        let mut assets = Vec::new();

        if let Some(StageArtifact::Narration { audio_url, .. }) =
            self.store.approved_artifact(StageId::Narration)
        {
            assets.push(PlannedAsset {
                stage: StageId::Narration,
                index: None,
                path: format!("narration.{}", asset_extension(&audio_url, "mp3")),
                url: audio_url,
            });
        }
        if let Some(StageArtifact::Images { images }) = self.store.approved_artifact(StageId::Images) {
            assets.extend(images.into_iter().map(|image| PlannedAsset {
                stage: StageId::Images,
                index: Some(image.index),
                path: format!(
                    "images/image_{:02}.{}",
                    image.index + 1,
                    asset_extension(&image.url, "png")
                ),
                url: image.url,
            }));
        }
        if let Some(StageArtifact::Videos { videos }) = self.store.approved_artifact(StageId::Videos) {
            assets.extend(videos.into_iter().map(|video| PlannedAsset {
                stage: StageId::Videos,
                index: Some(video.index),
                path: format!(
                    "videos/clip_{:02}.{}",
                    video.index + 1,
                    asset_extension(&video.url, "mp4")
                ),
                url: video.url,
            }));
        }

        debug!(count = assets.len(), "Planned export assets");
        assets
    }
}

impl std::fmt::Debug for ExportAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportAggregator")
            .field("project_id", &self.store.project_id())
            .finish_non_exhaustive()
    }
}

struct ArchiveBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ArchiveBuilder {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated),
        }
    }

    fn add(
        &mut self,
        path: &str,
        stage: StageId,
        index: Option<usize>,
        source_url: Option<String>,
        bytes: &[u8],
    ) -> Result<ManifestEntry, StudioError> {
        self.write_entry(path, bytes)?;
        Ok(ManifestEntry {
            path: path.to_string(),
            stage,
            index,
            source_url,
            bytes: bytes.len() as u64,
            sha256: hex::encode(Sha256::digest(bytes)),
        })
    }

    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> Result<(), StudioError> {
        self.zip
            .start_file(path, self.options)
            .map_err(|e| StudioError::Export(format!("failed to add zip entry {path}: {e}")))?;
        self.zip
            .write_all(bytes)
            .map_err(|e| StudioError::Export(format!("failed to write zip entry {path}: {e}")))
    }

    fn finish(mut self, manifest: &ExportManifest) -> Result<Vec<u8>, StudioError> {
        let json = serde_json::to_vec_pretty(manifest)?;
        self.write_entry(MANIFEST_FILE, &json)?;
        let cursor = self
            .zip
            .finish()
            .map_err(|e| StudioError::Export(format!("failed to finish zip: {e}")))?;
        Ok(cursor.into_inner())
    }
}

/// File extension for an asset URL: the MIME type for `data:` URLs, the
/// path suffix otherwise.
fn asset_extension(url: &str, fallback: &'static str) -> String {
    if let Some(rest) = url.strip_prefix("data:") {
        let mime = rest.split([';', ',']).next().unwrap_or_default();
        return match extension_for_mime(mime) {
            "bin" => fallback.to_string(),
            ext => ext.to_string(),
        };
    }

    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => fallback.to_string(),
    }
}

/// Keeps inline `data:` URLs out of manifests and events.
fn truncate_url(url: &str) -> String {
    if url.starts_with("data:") {
        let header = url.split(',').next().unwrap_or(url);
        format!("{header},...")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::gate::ApprovalGate;
    use crate::testing::{approve_through, complete_stage, sample_artifact, MapFetcher};
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use zip::ZipArchive;

    fn entry_names(archive: &[u8]) -> Vec<String> {
        let zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut names: Vec<String> = zip.file_names().map(ToString::to_string).collect();
        names.sort();
        names
    }

    fn read_entry(archive: &[u8], name: &str) -> Vec<u8> {
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut file = zip.by_name(name).unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_asset_extension() {
        assert_eq!(asset_extension("https://fal.media/x/abc.JPEG?sig=1", "png"), "jpeg");
        assert_eq!(asset_extension("https://fal.media/x/abc", "png"), "png");
        assert_eq!(asset_extension("data:audio/wav;base64,AAAA", "mp3"), "wav");
        assert_eq!(asset_extension("data:application/x-unknown;base64,AA", "mp3"), "mp3");
    }

    #[tokio::test]
    async fn test_full_export() {
        let store = Arc::new(PipelineStore::new("Launch Teaser"));
        approve_through(&store, StageId::Videos).unwrap();
        let sink = Arc::new(CollectingEventSink::new());

        let bundle = ExportAggregator::new(store, Arc::new(MapFetcher::new()))
            .with_events(sink.clone())
            .export()
            .await
            .unwrap();

        assert_eq!(
            entry_names(&bundle.archive),
            vec![
                "image_prompts.txt",
                "images/image_01.png",
                "images/image_02.png",
                "manifest.json",
                "narration.mp3",
                "script.txt",
                "videos/clip_01.mp4",
                "videos/clip_02.mp4",
            ]
        );
        assert!(bundle.failures.is_empty());
        assert_eq!(sink.event_types(), vec!["export.completed"]);
        assert!(bundle.file_name().starts_with("launch-teaser-"));

        let manifest: ExportManifest =
            serde_json::from_slice(&read_entry(&bundle.archive, MANIFEST_FILE)).unwrap();
        assert_eq!(manifest, bundle.manifest);
        let clip = manifest
            .files
            .iter()
            .find(|f| f.path == "videos/clip_01.mp4")
            .unwrap();
        assert_eq!(clip.source_url.as_deref(), Some("https://videos.test/0.mp4"));
        assert_eq!(clip.sha256, hex::encode(Sha256::digest(b"https://videos.test/0.mp4")));

        let narration = manifest.files.iter().find(|f| f.path == "narration.mp3").unwrap();
        assert!(narration.source_url.is_none());
    }

    #[tokio::test]
    async fn test_only_approved_content_exported() {
        let store = Arc::new(PipelineStore::new("demo"));
        approve_through(&store, StageId::Images).unwrap();
        // Completed but never approved.
        complete_stage(&store, StageId::Videos, sample_artifact(StageId::Videos)).unwrap();
        // Approved, then rejected.
        ApprovalGate::new(store.clone()).reject(StageId::Narration).unwrap();

        let fetcher = Arc::new(MapFetcher::new());
        let bundle = ExportAggregator::new(store, fetcher.clone())
            .export()
            .await
            .unwrap();

        let names = entry_names(&bundle.archive);
        assert!(!names.iter().any(|n| n.starts_with("videos/")));
        assert!(!names.iter().any(|n| n.starts_with("narration")));
        assert_eq!(
            fetcher.fetched(),
            vec!["https://images.test/0.png", "https://images.test/1.png"]
        );
    }

    #[tokio::test]
    async fn test_failed_item_is_skipped() {
        let store = Arc::new(PipelineStore::new("demo"));
        approve_through(&store, StageId::Videos).unwrap();
        let sink = Arc::new(CollectingEventSink::new());
        let fetcher = MapFetcher::new()
            .with_asset("https://images.test/0.png", b"\x89PNG".to_vec())
            .failing("https://images.test/1.png");

        let bundle = ExportAggregator::new(store, Arc::new(fetcher))
            .with_events(sink.clone())
            .export()
            .await
            .unwrap();

        let names = entry_names(&bundle.archive);
        assert!(names.contains(&"images/image_01.png".to_string()));
        assert!(!names.contains(&"images/image_02.png".to_string()));
        assert!(names.contains(&"videos/clip_02.mp4".to_string()));
        assert_eq!(read_entry(&bundle.archive, "images/image_01.png"), b"\x89PNG");

        assert_eq!(bundle.failures.len(), 1);
        assert_eq!(bundle.failures[0].index, Some(1));
        assert_eq!(bundle.manifest.skipped, bundle.failures);
        assert_eq!(
            sink.event_types(),
            vec!["export.item_failed", "export.completed"]
        );
    }

    #[tokio::test]
    async fn test_nothing_approved() {
        let store = Arc::new(PipelineStore::new("demo"));
        let err = ExportAggregator::new(store, Arc::new(MapFetcher::new()))
            .export()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "export");
    }

    #[tokio::test]
    async fn test_write_to_directory() {
        let store = Arc::new(PipelineStore::new("demo"));
        approve_through(&store, StageId::Script).unwrap();
        let bundle = ExportAggregator::new(store, Arc::new(MapFetcher::new()))
            .export()
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = bundle.write_to(dir.path()).unwrap();
        assert_eq!(written.file_name().unwrap().to_string_lossy(), bundle.file_name());
        assert_eq!(std::fs::read(written).unwrap(), bundle.archive);
    }
}
